use serde::{Deserialize, Serialize};

/// A scratch org as the Hutte API serves it (snake_case wire format).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScratchOrgResponse {
    pub id: String,
    pub branch_name: String,
    pub commit_sha: String,
    pub created_at: String,
    pub created_by: String,
    pub devhub_id: String,
    #[serde(default)]
    pub devhub_sfdx_auth_url: Option<String>,
    pub domain: String,
    pub gid: String,
    pub initial_branch_name: String,
    pub name: String,
    pub project_id: String,
    pub project_name: String,
    /// The API serves this as a string.
    pub remaining_days: String,
    pub revision_number: Option<String>,
    pub salesforce_id: String,
    #[serde(default)]
    pub sfdx_auth_url: Option<String>,
    pub slug: String,
    pub state: String,
    pub pool: bool,
}

/// A Hutte scratch org. Serializes as camelCase JSON, matching the output
/// of the original `sf` plugin.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScratchOrg {
    pub id: String,
    pub branch_name: String,
    pub commit_sha: String,
    pub created_at: String,
    pub created_by: String,
    pub devhub_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devhub_sfdx_auth_url: Option<String>,
    pub domain: String,
    pub global_id: String,
    pub initial_branch_name: String,
    pub org_name: String,
    pub project_id: String,
    pub project_name: String,
    pub remaining_days: i64,
    pub revision_number: Option<String>,
    pub salesforce_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sfdx_auth_url: Option<String>,
    pub slug: String,
    pub state: String,
    pub pool: bool,
}

impl From<ScratchOrgResponse> for ScratchOrg {
    fn from(org: ScratchOrgResponse) -> Self {
        Self {
            id: org.id,
            branch_name: org.branch_name,
            commit_sha: org.commit_sha,
            created_at: org.created_at,
            created_by: org.created_by,
            devhub_id: org.devhub_id,
            devhub_sfdx_auth_url: org.devhub_sfdx_auth_url,
            domain: org.domain,
            global_id: org.gid,
            initial_branch_name: org.initial_branch_name,
            org_name: org.name,
            project_id: org.project_id,
            project_name: org.project_name,
            remaining_days: org.remaining_days.trim().parse().unwrap_or(0),
            revision_number: org.revision_number,
            salesforce_id: org.salesforce_id,
            sfdx_auth_url: org.sfdx_auth_url,
            slug: org.slug,
            state: org.state,
            pool: org.pool,
        }
    }
}

impl ScratchOrg {
    /// Strips the auth URLs, which grant full access to the orgs.
    pub fn without_auth_urls(mut self) -> Self {
        self.sfdx_auth_url = None;
        self.devhub_sfdx_auth_url = None;
        self
    }
}

/// The user id / API token pair returned by a successful login.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub user_id: String,
    pub api_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> ScratchOrgResponse {
        ScratchOrgResponse {
            id: "org-1".to_string(),
            branch_name: "feature/one".to_string(),
            commit_sha: "abc123".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            created_by: "John Doe".to_string(),
            devhub_id: "devhub-1".to_string(),
            devhub_sfdx_auth_url: Some("force://devhub".to_string()),
            domain: "example.my.salesforce.com".to_string(),
            gid: "gid-1".to_string(),
            initial_branch_name: "main".to_string(),
            name: "Test Org".to_string(),
            project_id: "project-1".to_string(),
            project_name: "Test Project".to_string(),
            remaining_days: "5".to_string(),
            revision_number: None,
            salesforce_id: "00D000000000001".to_string(),
            sfdx_auth_url: Some("force://org".to_string()),
            slug: "test-org".to_string(),
            state: "active".to_string(),
            pool: false,
        }
    }

    #[test]
    fn maps_wire_fields_to_domain_names() {
        let org = ScratchOrg::from(response());
        assert_eq!(org.org_name, "Test Org");
        assert_eq!(org.global_id, "gid-1");
        assert_eq!(org.remaining_days, 5);
    }

    #[test]
    fn unparsable_remaining_days_becomes_zero() {
        let mut wire = response();
        wire.remaining_days = "n/a".to_string();
        assert_eq!(ScratchOrg::from(wire).remaining_days, 0);
    }

    #[test]
    fn without_auth_urls_strips_both_urls() {
        let org = ScratchOrg::from(response()).without_auth_urls();
        assert_eq!(org.sfdx_auth_url, None);
        assert_eq!(org.devhub_sfdx_auth_url, None);
    }

    #[test]
    fn serializes_as_camel_case() {
        let json = serde_json::to_value(ScratchOrg::from(response())).unwrap();
        assert_eq!(json["orgName"], "Test Org");
        assert_eq!(json["globalId"], "gid-1");
        assert_eq!(json["remainingDays"], 5);
        assert_eq!(json["sfdxAuthUrl"], "force://org");
    }

    #[test]
    fn stripped_auth_urls_are_omitted_from_json() {
        let json = serde_json::to_value(ScratchOrg::from(response()).without_auth_urls()).unwrap();
        assert!(json.get("sfdxAuthUrl").is_none());
        assert!(json.get("devhubSfdxAuthUrl").is_none());
    }
}
