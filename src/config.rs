//! Process configuration read from environment variables.
//!
//! | Variable          | Required | Default               |
//! |-------------------|----------|-----------------------|
//! | `TRIGGER_MESSAGE` | yes      |                       |
//! | `TRIGGER_TAG`     | yes      |                       |
//! | `GITLAB_TOKEN`    | yes      |                       |
//! | `TARGET_BRANCH`   | no       | `develop`             |
//! | `GITLAB_URL`      | no       | `https://gitlab.com/` |
//! | `GIT_USER`        | no       | `vcs`                 |
//! | `GIT_EMAIL`       | no       | `vcs@example.com`     |
//! | `SECRET_TOKEN`    | no       | unset (no check)      |
//! | `PORT`            | no       | `8080`                |
//! | `WORKSPACE_DIR`   | no       | `/gitlab-combiner`    |
//!
//! Empty values count as unset.

use std::path::PathBuf;

use thiserror::Error;

use crate::git::CommitIdentity;
use crate::webhooks::TriggerRules;

const DEFAULT_TARGET_BRANCH: &str = "develop";
const DEFAULT_GITLAB_URL: &str = "https://gitlab.com/";
const DEFAULT_GIT_USER: &str = "vcs";
const DEFAULT_GIT_EMAIL: &str = "vcs@example.com";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WORKSPACE_DIR: &str = "/gitlab-combiner";

/// Errors raised while reading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required env variable: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Comment text that triggers a combination when posted on an MR.
    pub trigger_message: String,

    /// Label that marks MRs eligible for combination. Also triggers a
    /// combination when added to an MR.
    pub trigger_tag: String,

    /// Target branch when the webhook URL carries no `branch` parameter.
    pub target_branch: String,

    /// GitLab instance root, e.g. `https://gitlab.com/`.
    pub gitlab_url: String,

    /// Token sent as `Authorization: Bearer`.
    pub gitlab_token: String,

    /// Identity recorded on merge commits.
    pub commit_identity: CommitIdentity,

    /// Expected `X-Gitlab-Token` value. `None` disables the check.
    pub secret_token: Option<String>,

    pub port: u16,

    /// Parent directory of the per-project working copies.
    pub workspace_dir: PathBuf,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: value.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            trigger_message: required("TRIGGER_MESSAGE")?,
            trigger_tag: required("TRIGGER_TAG")?,
            gitlab_token: required("GITLAB_TOKEN")?,
            target_branch: get("TARGET_BRANCH").unwrap_or_else(|| DEFAULT_TARGET_BRANCH.into()),
            gitlab_url: get("GITLAB_URL").unwrap_or_else(|| DEFAULT_GITLAB_URL.into()),
            commit_identity: CommitIdentity {
                name: get("GIT_USER").unwrap_or_else(|| DEFAULT_GIT_USER.into()),
                email: get("GIT_EMAIL").unwrap_or_else(|| DEFAULT_GIT_EMAIL.into()),
            },
            secret_token: get("SECRET_TOKEN"),
            port,
            workspace_dir: get("WORKSPACE_DIR")
                .unwrap_or_else(|| DEFAULT_WORKSPACE_DIR.into())
                .into(),
        })
    }

    /// The classifier's view of this configuration.
    pub fn trigger_rules(&self) -> TriggerRules {
        TriggerRules::new(&self.trigger_message, &self.trigger_tag)
    }
}
