use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::types::{Credentials, ScratchOrg, ScratchOrgResponse};

/// Production Hutte API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.hutte.io/cli_api";

/// Shown whenever the API rejects our token.
pub const AUTH_ERROR: &str =
    "There is an error with authorization. Run `hutte auth login -h` for more information.";

/// Every response body is wrapped in a `data` envelope.
#[derive(serde::Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(serde::Deserialize)]
struct CredentialsResponse {
    api_token: String,
    user_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HutteApi: Send + Sync {
    /// Exchanges account credentials for an API token.
    async fn login(&self, email: &str, password: &str) -> Result<Credentials>;

    /// Lists the scratch orgs of the project backed by `repo_name`. Only
    /// active orgs unless `include_all` is set.
    async fn scratch_orgs(
        &self,
        api_token: &str,
        repo_name: &str,
        include_all: bool,
    ) -> Result<Vec<ScratchOrg>>;

    /// Claims an org from the project's pool.
    async fn take_from_pool(
        &self,
        api_token: &str,
        repo_name: &str,
        project_id: Option<String>,
        name: Option<String>,
    ) -> Result<ScratchOrg>;

    /// Terminates the org with the given Hutte id.
    async fn terminate_org(
        &self,
        api_token: &str,
        repo_name: &str,
        org_id: &str,
        project_id: Option<String>,
    ) -> Result<()>;
}

pub struct HutteClient {
    client: Client,
    api_url: String,
}

impl HutteClient {
    #[tracing::instrument(skip(api_url))]
    pub fn new(api_url: Option<String>) -> Self {
        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            client: Client::new(),
            api_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn token_header(api_token: &str) -> String {
        format!("Token token={}", api_token)
    }
}

#[async_trait]
impl HutteApi for HutteClient {
    #[tracing::instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &str) -> Result<Credentials> {
        let url = self.url("/api_tokens");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to send request to the Hutte API")?;

        if !response.status().is_success() {
            bail!("Invalid credentials");
        }

        let body: Data<CredentialsResponse> = response
            .json()
            .await
            .context("Failed to parse JSON response from the Hutte API")?;
        Ok(Credentials {
            user_id: body.data.user_id,
            api_token: body.data.api_token,
        })
    }

    #[tracing::instrument(skip(self, api_token))]
    async fn scratch_orgs(
        &self,
        api_token: &str,
        repo_name: &str,
        include_all: bool,
    ) -> Result<Vec<ScratchOrg>> {
        let url = self.url("/scratch_orgs");
        debug!("GET {} repo_name={}", url, repo_name);

        let all = include_all.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[("repo_name", repo_name), ("all", all.as_str())])
            .header("Accept", "application/json")
            .header("Authorization", Self::token_header(api_token))
            .send()
            .await
            .context("Failed to send request to the Hutte API")?;

        if !response.status().is_success() {
            bail!(AUTH_ERROR);
        }

        let body: Data<Vec<ScratchOrgResponse>> = response
            .json()
            .await
            .context("Failed to parse JSON response from the Hutte API")?;
        Ok(body.data.into_iter().map(ScratchOrg::from).collect())
    }

    #[tracing::instrument(skip(self, api_token))]
    async fn take_from_pool(
        &self,
        api_token: &str,
        repo_name: &str,
        project_id: Option<String>,
        name: Option<String>,
    ) -> Result<ScratchOrg> {
        let url = self.url("/take_from_pool");
        debug!("POST {} repo_name={}", url, repo_name);

        let mut query = vec![("repo_name", repo_name.to_string())];
        if let Some(name) = name {
            query.push(("name", name));
        }
        if let Some(project_id) = project_id {
            query.push(("project_id", project_id));
        }

        let response = self
            .client
            .post(&url)
            .query(&query)
            .header("Accept", "application/json")
            .header("Authorization", Self::token_header(api_token))
            .send()
            .await
            .context("Failed to send request to the Hutte API")?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                bail!(AUTH_ERROR);
            }
            let body = response.text().await.unwrap_or_default();
            if body.contains("no_pool") {
                bail!(
                    "This project doesn't have a pool defined. \
                     Setup a pool with at least one organization first."
                );
            }
            if body.contains("no_active_org") {
                bail!("There is no active pool at the moment, try again later.");
            }
            bail!("Request to hutte failed {} {}", status.as_u16(), body);
        }

        let body: Data<ScratchOrgResponse> = response
            .json()
            .await
            .context("Failed to parse JSON response from the Hutte API")?;
        Ok(ScratchOrg::from(body.data))
    }

    #[tracing::instrument(skip(self, api_token))]
    async fn terminate_org(
        &self,
        api_token: &str,
        repo_name: &str,
        org_id: &str,
        project_id: Option<String>,
    ) -> Result<()> {
        let url = self.url(&format!("/scratch_orgs/{}/terminate", org_id));
        debug!("POST {}", url);

        let mut query = vec![("repo_name", repo_name.to_string())];
        if let Some(project_id) = project_id {
            query.push(("project_id", project_id));
        }

        let response = self
            .client
            .post(&url)
            .query(&query)
            .header("Accept", "application/json")
            .header("Authorization", Self::token_header(api_token))
            .send()
            .await
            .context("Failed to send request to the Hutte API")?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            bail!(
                "Could not find the scratch org on hutte. \
                 Are you sure you are in the correct project or the default org is set?"
            );
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            bail!(AUTH_ERROR);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Request to hutte failed {} {}", status.as_u16(), body);
        }

        Ok(())
    }
}
