use anyhow::Result;
use clap::Parser;

use hutte::api::HutteClient;
use hutte::commands::{AuthorizeArgs, ListArgs, LoginArgs, TakeArgs, TerminateArgs};
use hutte::git::RealGitCli;
use hutte::runtime::RealRuntime;
use hutte::sfdx::RealSfdxCli;

/// hutte - manage Hutte scratch orgs from the command line
///
/// Authorize, list, take-from-pool and terminate the scratch orgs of the
/// Hutte project backed by the current git repository.
///
/// Examples:
///   hutte auth login --email john.doe@example.org
///   hutte org list
///   hutte pool take --wait --timeout 300
#[derive(Parser, Debug)]
#[command(author, version = env!("HUTTE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Hutte API URL (defaults to https://api.hutte.io/cli_api)
    #[arg(long = "api-url", env = "HUTTE_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage the hutte.io account
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Work with the scratch orgs of the current repository
    #[command(subcommand)]
    Org(OrgCommands),

    /// Work with the scratch org pool
    #[command(subcommand)]
    Pool(PoolCommands),
}

#[derive(clap::Subcommand, Debug)]
enum AuthCommands {
    /// Authorize your hutte-io account
    Login(LoginArgs),
}

#[derive(clap::Subcommand, Debug)]
enum OrgCommands {
    /// List hutte scratch orgs from the current repository
    List(ListArgs),

    /// Authorize a scratch org from hutte.io
    Authorize(AuthorizeArgs),

    /// Terminate the default org on hutte.io and log out locally
    Terminate(TerminateArgs),
}

#[derive(clap::Subcommand, Debug)]
enum PoolCommands {
    /// Take a scratch org from the pool
    Take(TakeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let runtime = RealRuntime;
    let api = HutteClient::new(cli.api_url);
    let git = RealGitCli;
    let sfdx = RealSfdxCli::new(RealRuntime);

    match cli.command {
        Commands::Auth(AuthCommands::Login(args)) => {
            hutte::commands::login(&runtime, &api, args).await?
        }
        Commands::Org(OrgCommands::List(args)) => {
            hutte::commands::list(&runtime, &api, &git, args).await.map(|_| ())?
        }
        Commands::Org(OrgCommands::Authorize(args)) => {
            hutte::commands::authorize(&runtime, &api, &git, &sfdx, args).await?
        }
        Commands::Org(OrgCommands::Terminate(args)) => {
            hutte::commands::terminate(&runtime, &api, &git, &sfdx, args).await?
        }
        Commands::Pool(PoolCommands::Take(args)) => {
            hutte::commands::take(&runtime, &api, &git, &sfdx, args).await.map(|_| ())?
        }
    }
    Ok(())
}
