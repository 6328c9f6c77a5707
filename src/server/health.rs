//! Health check and fallback handlers.

use axum::Json;
use axum::http::{Method, StatusCode, Uri};
use serde_json::{Value, json};

/// Health check handler.
///
/// Returns 200 OK with the text "OK".
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Answers every unrouted request with a JSON 404.
pub async fn not_found_handler(method: Method, uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::warn!(%method, %uri, "route not found");
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}
