//! Thin wrapper around the `git` CLI plus remote-URL parsing.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitCli: Send + Sync {
    /// URL of the `origin` remote of the current repository.
    async fn origin_url(&self) -> Result<String>;

    async fn fetch_origin(&self) -> Result<()>;

    /// Checks out a branch or commit. Returns false when the revision does
    /// not exist.
    async fn checkout(&self, rev: &str) -> Result<bool>;

    async fn checkout_new_branch(&self, branch: &str) -> Result<()>;

    /// True when the work tree differs from HEAD.
    async fn has_unstaged_changes(&self) -> Result<bool>;
}

pub struct RealGitCli;

#[async_trait]
impl GitCli for RealGitCli {
    #[tracing::instrument(skip(self))]
    async fn origin_url(&self) -> Result<String> {
        let output = Command::new("git")
            .args(["remote", "get-url", "origin"])
            .output()
            .await
            .context("Failed to run git")?;
        if !output.status.success() {
            bail!(
                "Could not read the origin remote. \
                 Make sure you run this command inside the project repository."
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_origin(&self) -> Result<()> {
        let status = Command::new("git")
            .args(["fetch", "origin"])
            .status()
            .await
            .context("Failed to run git")?;
        debug!("git fetch origin exited with {}", status);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn checkout(&self, rev: &str) -> Result<bool> {
        let status = Command::new("git")
            .args(["checkout", rev])
            .status()
            .await
            .context("Failed to run git")?;
        Ok(status.success())
    }

    #[tracing::instrument(skip(self))]
    async fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        let status = Command::new("git")
            .args(["checkout", "-b", branch])
            .status()
            .await
            .context("Failed to run git")?;
        if !status.success() {
            bail!("Could not create the branch {}", branch);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn has_unstaged_changes(&self) -> Result<bool> {
        let status = Command::new("git")
            .args(["diff-index", "--quiet", "HEAD", "--"])
            .status()
            .await
            .context("Failed to run git")?;
        Ok(!status.success())
    }
}

/// Resolves the `owner/repo` name Hutte knows the project by.
#[tracing::instrument(skip(git))]
pub async fn project_repo_from_origin<G: GitCli>(git: &G) -> Result<String> {
    let url = git.origin_url().await?;
    Ok(extract_repo_name(&url))
}

/// Extracts `owner/repo` from a git remote URL.
///
/// Handles https, scp-style ssh (`git@host:owner/repo.git`) and `ssh://`
/// URLs, strips a trailing `.git` and the `scm/` path prefix that
/// Bitbucket Server inserts.
pub fn extract_repo_name(remote_url: &str) -> String {
    let mut path = match remote_url.find("://") {
        Some(scheme_end) => {
            let rest = &remote_url[scheme_end + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => rest,
            }
        }
        None => remote_url,
    };
    if let Some(stripped) = path.strip_prefix('/') {
        path = stripped;
    }
    if let Some(colon) = path.find(':') {
        path = &path[colon + 1..];
    }
    let path = path.strip_suffix(".git").unwrap_or(path);
    let path = path.strip_prefix("scm/").unwrap_or(path);
    path.to_string()
}
