use anyhow::{Context, Result, bail};
use dialoguer::FuzzySelect;
use log::info;

use crate::api::{HutteApi, ScratchOrg};
use crate::config;
use crate::git::{GitCli, project_repo_from_origin};
use crate::runtime::Runtime;
use crate::sfdx::{SfdxCli, dev_hub_sfdx_login, flag_as_scratch_org, sfdx_login};

#[derive(clap::Args, Debug)]
pub struct AuthorizeArgs {
    /// The api token. Only needed if you have not previously logged in
    /// using `hutte auth login`
    #[arg(short = 't', long = "api-token")]
    pub api_token: Option<String>,

    /// The name of the org to authorize
    #[arg(short = 'n', long = "org-name")]
    pub org_name: Option<String>,

    /// Don't checkout the scratch org's git branch
    #[arg(long = "no-git")]
    pub no_git: bool,

    /// Don't pull the source code from the scratch org
    #[arg(long = "no-pull")]
    pub no_pull: bool,
}

/// Authorizes a scratch org from hutte.io in the current project.
#[tracing::instrument(skip(runtime, api, git, sfdx, args))]
pub async fn authorize<R: Runtime, A: HutteApi, G: GitCli, S: SfdxCli>(
    runtime: &R,
    api: &A,
    git: &G,
    sfdx: &S,
    args: AuthorizeArgs,
) -> Result<()> {
    let repo_name = project_repo_from_origin(git).await?;
    let api_token = match args.api_token {
        Some(token) => token,
        None => config::api_token(runtime)?,
    };

    let orgs = api.scratch_orgs(&api_token, &repo_name, false).await?;
    let org = match args.org_name {
        Some(name) => find_org_by_name(orgs, &name)?,
        None => choose_org(orgs)?,
    };

    if !args.no_git {
        if git.has_unstaged_changes().await? {
            bail!("You have unstaged changes. Please commit or stash them before proceeding.");
        }
        checkout_git_branch(git, &org).await?;
    }

    dev_hub_sfdx_login(sfdx, &org).await?;
    sfdx_login(sfdx, &org).await?;
    flag_as_scratch_org(runtime, sfdx).await?;

    if !args.no_pull {
        sfdx.source_pull().await?;
    }
    Ok(())
}

fn find_org_by_name(orgs: Vec<ScratchOrg>, name: &str) -> Result<ScratchOrg> {
    orgs.into_iter().find(|org| org.org_name == name).context(
        "There is not any scratch org to authorize by the provided name.\n\
         Remove this flag to choose it from a list or access https://app.hutte.io \
         to see the available orgs.",
    )
}

fn choose_org(orgs: Vec<ScratchOrg>) -> Result<ScratchOrg> {
    if orgs.is_empty() {
        bail!("You don't have any scratch orgs to authorize. Access https://app.hutte.io to create one");
    }
    if orgs.len() == 1 {
        return orgs.into_iter().next().context("No org selected!");
    }

    let labels: Vec<String> = orgs
        .iter()
        .map(|org| format!("{} - {}", org.org_name, org.project_name))
        .collect();
    let index = FuzzySelect::new()
        .with_prompt("Which scratch org would you like to authorize?")
        .items(&labels)
        .default(0)
        .interact()?;
    orgs.into_iter().nth(index).context("No org selected!")
}

async fn checkout_git_branch<G: GitCli>(git: &G, org: &ScratchOrg) -> Result<()> {
    git.fetch_origin().await?;
    info!("Checking out remote branch {}", org.branch_name);
    if !git.checkout(&org.branch_name).await? {
        info!(
            "Remote branch does not exist. Creating based on {}...",
            org.commit_sha
        );
        git.checkout(&org.commit_sha).await?;
        git.checkout_new_branch(&org.branch_name).await?;
    }
    Ok(())
}
