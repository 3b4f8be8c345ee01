use anyhow::Result;
use dialoguer::{Input, Password};
use log::info;

use crate::api::HutteApi;
use crate::config::{self, UserInfo};
use crate::runtime::Runtime;

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// The email address of your account on hutte.io
    #[arg(short, long)]
    pub email: Option<String>,

    /// The password of your account on hutte.io
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Authorizes the hutte.io account and stores its API token locally.
#[tracing::instrument(skip(runtime, api, args))]
pub async fn login<R: Runtime, A: HutteApi>(runtime: &R, api: &A, args: LoginArgs) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = match args.password {
        Some(password) => password,
        None => Password::new().with_prompt("Password").interact()?,
    };

    let credentials = api.login(&email, &password).await?;
    info!("Logged in as user {}", credentials.user_id);

    config::store_api_token(runtime, &credentials.user_id, &credentials.api_token)?;
    config::store_user_info(
        runtime,
        &UserInfo {
            id: credentials.user_id.clone(),
            email,
        },
    )?;

    println!("{}", serde_json::json!({ "userId": credentials.user_id }));
    Ok(())
}
