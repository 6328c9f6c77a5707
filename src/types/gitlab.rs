//! GitLab API models used by the combination run.

use serde::{Deserialize, Serialize};

use super::MrIid;

/// Project metadata needed to build a workspace.
///
/// Fetched fresh for every run so a changed default branch is picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub default_branch: String,

    /// SSH clone URL of the project.
    #[serde(rename = "ssh_url_to_repo")]
    pub clone_url: String,
}

/// One open merge request eligible for combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub iid: MrIid,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_info_reads_gitlab_project_fields() {
        let json = r#"{
            "id": 3,
            "default_branch": "main",
            "ssh_url_to_repo": "git@gitlab.example.com:group/app.git",
            "http_url_to_repo": "https://gitlab.example.com/group/app.git"
        }"#;
        let info: RepoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.default_branch, "main");
        assert_eq!(info.clone_url, "git@gitlab.example.com:group/app.git");
    }

    #[test]
    fn merge_request_ignores_extra_fields() {
        let json = r#"[{"id": 99, "iid": 7, "title": "Add login", "state": "opened"}]"#;
        let mrs: Vec<MergeRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(
            mrs,
            vec![MergeRequest {
                iid: MrIid(7),
                title: "Add login".to_string()
            }]
        );
    }
}
