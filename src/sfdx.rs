//! Wrapper around the `sfdx` CLI and the local org-authorization steps
//! shared by `org authorize` and `pool take`.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

use crate::api::ScratchOrg;
use crate::runtime::Runtime;

/// Alias under which the Hutte dev hub is authorized locally.
pub const DEV_HUB_ALIAS: &str = "cli@hutte.io";

/// Scratch file the auth URL is passed through; removed after the call.
const AUTH_URL_FILE: &str = "tmp_hutte_login";

/// The default org as reported by `sfdx force:org:display`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrgInfo {
    pub id: String,
    pub username: String,
}

#[derive(Deserialize)]
struct DisplayResponse {
    result: OrgInfo,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SfdxCli: Send + Sync {
    /// Authorizes an org from an sfdx auth URL under the given alias.
    /// With `default_dev_hub` the org becomes the default dev hub,
    /// otherwise the default username.
    async fn store_auth_url(
        &self,
        auth_url: &str,
        alias: &str,
        default_dev_hub: bool,
    ) -> Result<()>;

    /// Reads the default org via `sfdx force:org:display --json`.
    async fn display_default_org(&self) -> Result<OrgInfo>;

    /// Pulls the source from the default scratch org.
    async fn source_pull(&self) -> Result<()>;

    /// Logs out of the default org.
    async fn logout_default(&self) -> Result<()>;
}

pub struct RealSfdxCli<R: Runtime> {
    runtime: R,
}

impl<R: Runtime> RealSfdxCli<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<R: Runtime> SfdxCli for RealSfdxCli<R> {
    #[tracing::instrument(skip(self, auth_url))]
    async fn store_auth_url(
        &self,
        auth_url: &str,
        alias: &str,
        default_dev_hub: bool,
    ) -> Result<()> {
        self.runtime
            .write(Path::new(AUTH_URL_FILE), auth_url.as_bytes())?;

        let mut args = vec!["force:auth:sfdxurl:store", "-f", AUTH_URL_FILE, "-a", alias];
        if default_dev_hub {
            args.push("-d");
        } else {
            args.push("--setdefaultusername");
        }
        debug!("Running sfdx {}", args.join(" "));

        let status = Command::new("sfdx").args(&args).status().await;
        // The auth URL grants full org access; never leave it on disk.
        let _ = self.runtime.remove_file(Path::new(AUTH_URL_FILE));

        let status = status.context("Failed to run sfdx")?;
        if !status.success() {
            if default_dev_hub {
                bail!("The devhub login failed.");
            }
            bail!("The sfdx login failed.");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn display_default_org(&self) -> Result<OrgInfo> {
        let output = Command::new("sfdx")
            .args(["force:org:display", "--json"])
            .output()
            .await
            .context("Failed to run sfdx")?;
        if !output.status.success() {
            bail!(
                "Could not read the default org. Is a default org set?\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }
        let display: DisplayResponse = serde_json::from_slice(&output.stdout)
            .context("Failed to parse the output of sfdx force:org:display")?;
        Ok(display.result)
    }

    #[tracing::instrument(skip(self))]
    async fn source_pull(&self) -> Result<()> {
        let output = Command::new("sfdx")
            .args(["force:source:pull", "-f"])
            .output()
            .await
            .context("Failed to run sfdx")?;
        if !output.status.success() {
            bail!(
                "{}\n{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn logout_default(&self) -> Result<()> {
        let status = Command::new("sfdx")
            .args(["force:auth:logout", "--noprompt"])
            .status()
            .await
            .context("Failed to run sfdx")?;
        if !status.success() {
            bail!("The sfdx logout failed.");
        }
        Ok(())
    }
}

/// Authorizes the scratch org itself and makes it the default username.
#[tracing::instrument(skip(sfdx, org))]
pub async fn sfdx_login<S: SfdxCli>(sfdx: &S, org: &ScratchOrg) -> Result<()> {
    let auth_url = org
        .sfdx_auth_url
        .as_deref()
        .context("The scratch org has no sfdx auth url")?;
    sfdx.store_auth_url(auth_url, &format!("hutte-{}", org.slug), false)
        .await
}

/// Authorizes the org's dev hub under the fixed [`DEV_HUB_ALIAS`].
#[tracing::instrument(skip(sfdx, org))]
pub async fn dev_hub_sfdx_login<S: SfdxCli>(sfdx: &S, org: &ScratchOrg) -> Result<()> {
    let auth_url = org
        .devhub_sfdx_auth_url
        .as_deref()
        .context("The scratch org has no devhub sfdx auth url")?;
    sfdx.store_auth_url(auth_url, DEV_HUB_ALIAS, true).await
}

/// Marks the freshly authorized default org as a scratch org by writing
/// `devHubUsername` into its `~/.sfdx/<username>.json` config.
#[tracing::instrument(skip(runtime, sfdx))]
pub async fn flag_as_scratch_org<R: Runtime, S: SfdxCli>(runtime: &R, sfdx: &S) -> Result<()> {
    let info = sfdx.display_default_org().await?;
    let home = runtime
        .home_dir()
        .context("Could not determine the home directory")?;
    let config_path = home.join(".sfdx").join(format!("{}.json", info.username));

    let raw = runtime.read_to_string(&config_path)?;
    let mut config: serde_json::Value =
        serde_json::from_str(&raw).context("Failed to parse the sfdx org config")?;
    let object = config
        .as_object_mut()
        .context("Unexpected sfdx org config format")?;
    object.insert(
        "devHubUsername".to_string(),
        serde_json::Value::String(DEV_HUB_ALIAS.to_string()),
    );

    runtime.write(&config_path, serde_json::to_string_pretty(&config)?.as_bytes())
}

/// Local post-processing after an org has been obtained from Hutte:
/// dev hub login, org login, then flag the org as a scratch org.
#[tracing::instrument(skip(runtime, sfdx, org))]
pub async fn process_org<R: Runtime, S: SfdxCli>(
    runtime: &R,
    sfdx: &S,
    org: &ScratchOrg,
) -> Result<()> {
    dev_hub_sfdx_login(sfdx, org).await?;
    sfdx_login(sfdx, org).await?;
    flag_as_scratch_org(runtime, sfdx).await
}
