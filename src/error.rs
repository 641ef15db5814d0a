//! Resolution error kinds and their HTTP status mapping.

use axum::http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Every way a resolution can fail.
///
/// `NotFound` is kept apart from transport and upstream failures so callers
/// can tell "nothing matched" from "the corpus is unreachable".
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Blank query. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// A pipeline stage produced no usable candidate.
    #[error("No result found")]
    NotFound,

    /// The corpus answered with an error payload.
    #[error("upstream error (HTTP {status}): {}", upstream_message(.payload))]
    Upstream { status: u16, payload: Value },

    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ResolveError {
    pub fn status(&self) -> StatusCode {
        match self {
            ResolveError::Validation(_) => StatusCode::BAD_REQUEST,
            ResolveError::NotFound => StatusCode::NOT_FOUND,
            ResolveError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ResolveError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        ResolveError::Transport(err.to_string())
    }
}

/// Best human-readable message out of a Stack Exchange error payload.
fn upstream_message(payload: &Value) -> String {
    payload
        .get("error_message")
        .or_else(|| payload.get("error_name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}
