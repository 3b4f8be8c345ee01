//! Persistent user configuration under `~/.hutte`.
//!
//! `config.yml` records who is logged in; `credentials.yml` holds API
//! tokens keyed by user id, with owner-only permissions. Both live behind
//! the [`Runtime`] seam so every path is mockable.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::runtime::Runtime;

const CONFIG_DIR: &str = ".hutte";
const CONFIG_FILE: &str = "config.yml";
const CREDENTIALS_FILE: &str = "credentials.yml";

/// Shown when a command needs a token but no login has happened yet.
pub const NOT_LOGGED_IN: &str =
    "You need to authorize the client before. Run `hutte auth login -h` for more information.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
}

#[derive(Serialize, Deserialize)]
struct ConfigFile {
    current_user: UserInfo,
}

#[derive(Serialize, Deserialize, Default)]
struct CredentialsFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

fn config_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    runtime
        .home_dir()
        .map(|home| home.join(CONFIG_DIR))
        .context("Could not determine the home directory")
}

/// Records the logged-in user in `config.yml`.
#[tracing::instrument(skip(runtime))]
pub fn store_user_info<R: Runtime>(runtime: &R, user: &UserInfo) -> Result<()> {
    let dir = config_dir(runtime)?;
    runtime.create_dir_all(&dir)?;
    let contents = serde_yaml_ng::to_string(&ConfigFile {
        current_user: user.clone(),
    })
    .context("Failed to serialize the config file")?;
    runtime.write(&dir.join(CONFIG_FILE), contents.as_bytes())
}

/// Reads the logged-in user from `config.yml`.
#[tracing::instrument(skip(runtime))]
pub fn current_user<R: Runtime>(runtime: &R) -> Result<UserInfo> {
    let path = config_dir(runtime)?.join(CONFIG_FILE);
    let raw = runtime
        .read_to_string(&path)
        .map_err(|_| anyhow!(NOT_LOGGED_IN))?;
    let config: ConfigFile = serde_yaml_ng::from_str(&raw).map_err(|_| anyhow!(NOT_LOGGED_IN))?;
    Ok(config.current_user)
}

/// Stores an API token for the given user id in `credentials.yml`.
///
/// The file stands in for the OS keychain of the original client; it is
/// chmodded to 0600 after every write.
#[tracing::instrument(skip(runtime, api_token))]
pub fn store_api_token<R: Runtime>(runtime: &R, user_id: &str, api_token: &str) -> Result<()> {
    let dir = config_dir(runtime)?;
    runtime.create_dir_all(&dir)?;
    let path = dir.join(CREDENTIALS_FILE);

    let mut credentials: CredentialsFile = if runtime.exists(&path) {
        serde_yaml_ng::from_str(&runtime.read_to_string(&path)?)
            .context("Failed to parse the credentials file")?
    } else {
        CredentialsFile::default()
    };
    credentials
        .tokens
        .insert(user_id.to_string(), api_token.to_string());

    let contents =
        serde_yaml_ng::to_string(&credentials).context("Failed to serialize the credentials file")?;
    runtime.write(&path, contents.as_bytes())?;
    runtime.set_permissions(&path, 0o600)
}

/// Looks up the API token of the currently logged-in user.
#[tracing::instrument(skip(runtime))]
pub fn api_token<R: Runtime>(runtime: &R) -> Result<String> {
    let user = current_user(runtime)?;
    let path = config_dir(runtime)?.join(CREDENTIALS_FILE);
    let raw = runtime
        .read_to_string(&path)
        .map_err(|_| anyhow!("Could not get api token from credential store"))?;
    let credentials: CredentialsFile =
        serde_yaml_ng::from_str(&raw).context("Failed to parse the credentials file")?;
    credentials
        .tokens
        .get(&user.id)
        .cloned()
        .context("Could not get api token from credential store")
}
