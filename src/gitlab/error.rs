//! GitLab API error types.

use thiserror::Error;

/// A failed GitLab API call.
///
/// The `Display` text is what ends up in the run report, so it carries the
/// raw response body for non-2xx answers.
#[derive(Debug, Error)]
pub enum GitLabApiError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitLab answered with a non-2xx status.
    #[error("GitLab API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response with nothing in the body.
    #[error("empty response from GitLab API")]
    EmptyResponse,

    #[error("invalid JSON from GitLab API: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GitLabApiError {
    /// HTTP status code, for errors that have one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitLabApiError::Status { status, .. } => Some(*status),
            GitLabApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
