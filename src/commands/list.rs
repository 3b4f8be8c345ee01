use anyhow::Result;
use log::debug;
use tabled::{Table, Tabled, settings::Style};

use crate::api::{HutteApi, ScratchOrg};
use crate::config;
use crate::git::{GitCli, project_repo_from_origin};
use crate::runtime::Runtime;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// The api token. Only needed if you have not previously logged in
    /// using `hutte auth login`
    #[arg(short = 't', long = "api-token")]
    pub api_token: Option<String>,

    /// Include all orgs of the hutte project, not just active ones
    #[arg(long)]
    pub all: bool,

    /// Include all information of the scratch orgs, such as auth urls
    #[arg(long)]
    pub verbose: bool,

    /// Print the orgs as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ScratchOrgRow {
    #[tabled(rename = "Project Name")]
    project_name: String,
    #[tabled(rename = "Org Name")]
    org_name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Branch Name")]
    branch_name: String,
    #[tabled(rename = "Remaining Days")]
    remaining_days: i64,
    #[tabled(rename = "Created By")]
    created_by: String,
}

impl From<&ScratchOrg> for ScratchOrgRow {
    fn from(org: &ScratchOrg) -> Self {
        Self {
            project_name: org.project_name.clone(),
            org_name: org.org_name.clone(),
            state: org.state.clone(),
            branch_name: org.branch_name.clone(),
            remaining_days: org.remaining_days,
            created_by: org.created_by.clone(),
        }
    }
}

/// Lists the hutte scratch orgs of the current repository.
#[tracing::instrument(skip(runtime, api, git, args))]
pub async fn list<R: Runtime, A: HutteApi, G: GitCli>(
    runtime: &R,
    api: &A,
    git: &G,
    args: ListArgs,
) -> Result<Vec<ScratchOrg>> {
    let repo_name = project_repo_from_origin(git).await?;
    let api_token = match args.api_token {
        Some(token) => token,
        None => config::api_token(runtime)?,
    };

    let mut orgs = api.scratch_orgs(&api_token, &repo_name, args.all).await?;
    debug!("Found {} scratch org(s) for {}", orgs.len(), repo_name);

    if !args.verbose {
        orgs = orgs.into_iter().map(ScratchOrg::without_auth_urls).collect();
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&orgs)?);
    } else {
        let rows: Vec<ScratchOrgRow> = orgs.iter().map(ScratchOrgRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    Ok(orgs)
}
