//! Webhook endpoint handler.
//!
//! Classifies GitLab webhook deliveries and, for triggers, admits the project
//! and starts a combination in the background before answering 200. The
//! outcome of the run is reported on the MR, never in the HTTP response.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::git::GitRunner;
use crate::gitlab::GitLabApi;
use crate::guard::GuardError;
use crate::webhooks::{ParseError, is_valid_branch_name, parse_webhook, verify_token};

/// Header carrying the webhook secret configured in GitLab.
const HEADER_TOKEN: &str = "x-gitlab-token";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The body is not a JSON object.
    #[error("Invalid request body")]
    InvalidBody(#[from] ParseError),

    /// The `branch` query parameter is not a usable branch name.
    #[error("Invalid branch name: {0}")]
    InvalidBranch(String),

    /// A combination for the project is already running.
    #[error("Project is already being processed")]
    ProjectBusy,

    /// `X-Gitlab-Token` missing or wrong.
    #[error("Invalid secret token")]
    InvalidToken,

    #[error("Failed to process event")]
    Guard(#[from] GuardError),
}

impl WebhookError {
    fn status(&self) -> StatusCode {
        match self {
            WebhookError::InvalidBody(_) | WebhookError::InvalidBranch(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::ProjectBusy => StatusCode::TOO_MANY_REQUESTS,
            WebhookError::InvalidToken => StatusCode::UNAUTHORIZED,
            WebhookError::Guard(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "webhook processing failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Query parameters of the webhook URL.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookParams {
    /// Target branch override.
    pub branch: Option<String>,
}

/// Successful response body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookReply {
    pub message: &'static str,
}

impl WebhookReply {
    const OK: WebhookReply = WebhookReply { message: "OK" };
    const IGNORED: WebhookReply = WebhookReply {
        message: "Event ignored",
    };
}

/// Webhook handler.
///
/// # Response
///
/// - 200 `{"message":"OK"}`: combination started
/// - 200 `{"message":"Event ignored"}`: not a trigger
/// - 400: body is not a JSON object, or bad `branch` parameter or query string
/// - 401: `X-Gitlab-Token` does not match the configured secret
/// - 429: a combination for the project is already running
/// - 500: admission state is unusable
pub async fn webhook_handler<A: GitLabApi, G: GitRunner>(
    State(app_state): State<AppState<A, G>>,
    query: Result<Query<WebhookParams>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReply>, WebhookError> {
    let event = parse_webhook(&body).inspect_err(|e| {
        debug!(error = %e, "rejecting webhook body");
    })?;

    let Some(trigger) = event.and_then(|event| app_state.rules().classify(&event)) else {
        debug!("event ignored");
        return Ok(Json(WebhookReply::IGNORED));
    };

    let requested = match query {
        Ok(Query(params)) => params.branch,
        Err(rejection) => {
            let detail = rejection.body_text();
            warn!(%trigger, error = %detail, "rejecting unreadable query string");
            return Err(WebhookError::InvalidBranch(detail));
        }
    };

    let target_branch = match requested.filter(|b| !b.is_empty()) {
        Some(branch) if is_valid_branch_name(&branch) => branch,
        Some(branch) => {
            warn!(%trigger, branch = %branch, "rejecting invalid branch parameter");
            return Err(WebhookError::InvalidBranch(branch));
        }
        None => app_state.default_target().to_string(),
    };

    if app_state.active().is_active(trigger.project) {
        info!(project = %trigger.project, "project busy, rejecting trigger");
        return Err(WebhookError::ProjectBusy);
    }

    let Some(lease) = app_state.active().try_admit(trigger.project)? else {
        info!(project = %trigger.project, "project admitted concurrently, rejecting trigger");
        return Err(WebhookError::ProjectBusy);
    };

    let provided = headers.get(HEADER_TOKEN).map(|v| v.as_bytes());
    if !verify_token(app_state.secret_token(), provided) {
        warn!(project = %trigger.project, "invalid webhook token");
        drop(lease);
        return Err(WebhookError::InvalidToken);
    }

    info!(
        project = %trigger.project,
        request = %trigger.request,
        branch = %target_branch,
        "starting combination"
    );

    let report = app_state.reports().open(trigger);
    let combiner = app_state.combiner().clone();
    tokio::spawn(async move {
        let _lease = lease;
        combiner.run(report, target_branch).await;
    });

    Ok(Json(WebhookReply::OK))
}
