use anyhow::Result;
use log::info;

use crate::api::HutteApi;
use crate::config;
use crate::git::{GitCli, project_repo_from_origin};
use crate::runtime::Runtime;
use crate::sfdx::SfdxCli;

#[derive(clap::Args, Debug)]
pub struct TerminateArgs {
    /// The api token. Only needed if you have not previously logged in
    /// using `hutte auth login`
    #[arg(short = 't', long = "api-token")]
    pub api_token: Option<String>,

    /// The id of the project. Useful when multiple projects use the same
    /// git repository.
    #[arg(short = 'p', long = "project-id")]
    pub project_id: Option<String>,
}

/// Terminates the default org on hutte.io and logs out locally.
#[tracing::instrument(skip(runtime, api, git, sfdx, args))]
pub async fn terminate<R: Runtime, A: HutteApi, G: GitCli, S: SfdxCli>(
    runtime: &R,
    api: &A,
    git: &G,
    sfdx: &S,
    args: TerminateArgs,
) -> Result<()> {
    let repo_name = project_repo_from_origin(git).await?;
    let org_info = sfdx.display_default_org().await?;
    let api_token = match args.api_token {
        Some(token) => token,
        None => config::api_token(runtime)?,
    };

    api.terminate_org(&api_token, &repo_name, &org_info.id, args.project_id)
        .await?;
    info!("Terminated org {}", org_info.id);

    sfdx.logout_default().await
}
