use anyhow::Result;
use log::info;
use std::time::Duration;

use crate::api::{HutteApi, ScratchOrg};
use crate::config;
use crate::git::{GitCli, project_repo_from_origin};
use crate::retry::{RetryPolicy, retry_with_timeout};
use crate::runtime::Runtime;
use crate::sfdx::{SfdxCli, process_org};

#[derive(clap::Args, Debug)]
pub struct TakeArgs {
    /// The api token. Only needed if you have not previously logged in
    /// using `hutte auth login`
    #[arg(short = 't', long = "api-token")]
    pub api_token: Option<String>,

    /// The name of the org
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// The id of the project. Useful when multiple projects use the same
    /// git repository.
    #[arg(short = 'p', long = "project-id")]
    pub project_id: Option<String>,

    /// The timeout period in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Waits until an org becomes available
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Print the org as JSON
    #[arg(long)]
    pub json: bool,
}

/// Takes a scratch org from the pool and authorizes it locally.
#[tracing::instrument(skip(runtime, api, git, sfdx, args))]
pub async fn take<R: Runtime, A: HutteApi, G: GitCli, S: SfdxCli>(
    runtime: &R,
    api: &A,
    git: &G,
    sfdx: &S,
    args: TakeArgs,
) -> Result<ScratchOrg> {
    // Without --wait a single attempt is made, whatever --timeout says.
    let timeout = if args.wait {
        Duration::from_secs(args.timeout.unwrap_or(0))
    } else {
        Duration::ZERO
    };
    take_with_policy(runtime, api, git, sfdx, args, RetryPolicy::with_timeout(timeout)).await
}

async fn take_with_policy<R: Runtime, A: HutteApi, G: GitCli, S: SfdxCli>(
    runtime: &R,
    api: &A,
    git: &G,
    sfdx: &S,
    args: TakeArgs,
    policy: RetryPolicy,
) -> Result<ScratchOrg> {
    let repo_name = project_repo_from_origin(git).await?;
    let api_token = match args.api_token {
        Some(token) => token,
        None => config::api_token(runtime)?,
    };

    let org = retry_with_timeout(
        || {
            api.take_from_pool(
                &api_token,
                &repo_name,
                args.project_id.clone(),
                args.name.clone(),
            )
        },
        |e: &anyhow::Error| e.to_string().contains("try again later"),
        policy,
    )
    .await?;
    info!("Took org {} from the pool", org.org_name);

    process_org(runtime, sfdx, &org).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&org)?);
    } else {
        println!(
            "Authorized the pooled org {} ({})",
            org.org_name, org.project_name
        );
    }
    Ok(org)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockHutteApi;
    use crate::git::MockGitCli;
    use crate::runtime::MockRuntime;
    use crate::sfdx::{MockSfdxCli, OrgInfo};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn org() -> ScratchOrg {
        ScratchOrg {
            id: "org-1".to_string(),
            branch_name: "feature/one".to_string(),
            commit_sha: "abc123".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            created_by: "John Doe".to_string(),
            devhub_id: "devhub-1".to_string(),
            devhub_sfdx_auth_url: Some("force://devhub".to_string()),
            domain: "example.my.salesforce.com".to_string(),
            global_id: "gid-1".to_string(),
            initial_branch_name: "main".to_string(),
            org_name: "Pooled Org".to_string(),
            project_id: "project-1".to_string(),
            project_name: "Test Project".to_string(),
            remaining_days: 5,
            revision_number: None,
            salesforce_id: "00D000000000001".to_string(),
            sfdx_auth_url: Some("force://org".to_string()),
            slug: "pooled-org".to_string(),
            state: "active".to_string(),
            pool: true,
        }
    }

    fn mock_git() -> MockGitCli {
        let mut git = MockGitCli::new();
        git.expect_origin_url()
            .returning(|| Ok("https://github.com/mock-org/mock-repo.git".to_string()));
        git
    }

    fn mock_runtime() -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{}".to_string()));
        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
    }

    fn mock_sfdx() -> MockSfdxCli {
        let mut sfdx = MockSfdxCli::new();
        sfdx.expect_store_auth_url().returning(|_, _, _| Ok(()));
        sfdx.expect_display_default_org().returning(|| {
            Ok(OrgInfo {
                id: "mockOrgId".to_string(),
                username: "john.doe@example.com".to_string(),
            })
        });
        sfdx
    }

    fn args() -> TakeArgs {
        TakeArgs {
            api_token: Some("t123".to_string()),
            name: None,
            project_id: None,
            timeout: None,
            wait: false,
            json: false,
        }
    }

    #[tokio::test]
    async fn takes_an_org_and_processes_it() {
        let mut api = MockHutteApi::new();
        api.expect_take_from_pool()
            .withf(|token, repo, project_id, name| {
                token == "t123"
                    && repo == "mock-org/mock-repo"
                    && project_id.is_none()
                    && name.is_none()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(org()));

        let taken = take(&mock_runtime(), &api, &mock_git(), &mock_sfdx(), args())
            .await
            .unwrap();
        assert_eq!(taken.org_name, "Pooled Org");
    }

    #[tokio::test]
    async fn does_not_retry_without_wait() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut api = MockHutteApi::new();
        api.expect_take_from_pool().returning(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!(
                "There is no active pool at the moment, try again later."
            ))
        });

        let mut no_wait = args();
        no_wait.timeout = Some(60);

        let err = take(
            &MockRuntime::new(),
            &api,
            &mock_git(),
            &MockSfdxCli::new(),
            no_wait,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("try again later"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_while_the_pool_is_empty() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut api = MockHutteApi::new();
        api.expect_take_from_pool().returning(move |_, _, _, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow::anyhow!(
                    "There is no active pool at the moment, try again later."
                ))
            } else {
                Ok(org())
            }
        });

        let policy = RetryPolicy {
            timeout: Duration::from_millis(20),
            sleep: Duration::from_millis(10),
        };
        let taken = take_with_policy(
            &mock_runtime(),
            &api,
            &mock_git(),
            &mock_sfdx(),
            args(),
            policy,
        )
        .await
        .unwrap();
        assert_eq!(taken.org_name, "Pooled Org");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_missing_pool_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut api = MockHutteApi::new();
        api.expect_take_from_pool().returning(move |_, _, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!(
                "This project doesn't have a pool defined. \
                 Setup a pool with at least one organization first."
            ))
        });

        let policy = RetryPolicy {
            timeout: Duration::from_millis(50),
            sleep: Duration::from_millis(10),
        };
        let err = take_with_policy(
            &MockRuntime::new(),
            &api,
            &mock_git(),
            &MockSfdxCli::new(),
            args(),
            policy,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("doesn't have a pool defined"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
