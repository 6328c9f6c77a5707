//! HTTP server for the combiner.
//!
//! # Endpoints
//!
//! - `POST /` - Accepts GitLab webhooks; starts a combination when the event
//!   is a trigger
//! - `GET /health` - Returns 200 if the server is running
//!
//! Anything else gets a JSON 404.

use std::sync::Arc;

pub mod health;
pub mod webhook;

pub use health::{health_handler, not_found_handler};
pub use webhook::webhook_handler;

use crate::combine::Combiner;
use crate::git::GitRunner;
use crate::gitlab::GitLabApi;
use crate::guard::ActiveProjects;
use crate::report::ReportBuffer;
use crate::webhooks::TriggerRules;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<A, G> {
    inner: Arc<AppStateInner<A, G>>,
}

struct AppStateInner<A, G> {
    combiner: Combiner<A, G>,
    rules: TriggerRules,

    /// Target branch when the webhook URL has no `branch` parameter.
    default_target: String,

    /// Expected `X-Gitlab-Token`; `None` disables the check.
    secret_token: Option<String>,

    active: ActiveProjects,
    reports: ReportBuffer,
}

impl<A, G> Clone for AppState<A, G> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: GitLabApi, G: GitRunner> AppState<A, G> {
    pub fn new(
        combiner: Combiner<A, G>,
        rules: TriggerRules,
        default_target: impl Into<String>,
        secret_token: Option<String>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                combiner,
                rules,
                default_target: default_target.into(),
                secret_token,
                active: ActiveProjects::new(),
                reports: ReportBuffer::new(),
            }),
        }
    }

    pub fn combiner(&self) -> &Combiner<A, G> {
        &self.inner.combiner
    }

    pub fn rules(&self) -> &TriggerRules {
        &self.inner.rules
    }

    pub fn default_target(&self) -> &str {
        &self.inner.default_target
    }

    pub fn secret_token(&self) -> Option<&str> {
        self.inner.secret_token.as_deref()
    }

    pub fn active(&self) -> &ActiveProjects {
        &self.inner.active
    }

    pub fn reports(&self) -> &ReportBuffer {
        &self.inner.reports
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<A: GitLabApi, G: GitRunner>(app_state: AppState<A, G>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/", post(webhook_handler::<A, G>).fallback(not_found_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(app_state)
}
