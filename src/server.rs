//! HTTP server exposing the resolver to chat clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Resolve `{ "query": "..." }` to the best answer |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Response Envelope
//!
//! Every `/query` response, success or failure, uses the same shape, and the
//! HTTP status matches the `status` field:
//!
//! ```json
//! { "status": 404, "data": { "message": "No result found" } }
//! ```
//!
//! | Status | Meaning | `data` |
//! |--------|---------|--------|
//! | 200 | resolved | the answer, including its `body` markup |
//! | 400 | blank or missing query | `{ "message" }` |
//! | 404 | no usable question or answer | `{ "message" }` |
//! | 502 | corpus returned an error | the corpus error payload |
//! | 500 | corpus unreachable or unreadable | `{ "message" }` |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the widget can be
//! embedded on any page.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::corpus::StackExchangeClient;
use crate::error::ResolveError;
use crate::models::Query;
use crate::resolver::Resolver;

#[derive(Clone)]
struct AppState {
    resolver: Arc<Resolver>,
}

/// Starts the server on `[server].bind` and runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let corpus = Arc::new(StackExchangeClient::new(&config.corpus)?);
    let resolver = Arc::new(Resolver::new(corpus, &config.corpus));
    let app = build_router(resolver);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, corpus = %config.corpus.base_url, "server listening");
    println!("Stack Help listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Router with every route and the CORS layer, ready to serve.
pub fn build_router(resolver: Arc<Resolver>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { resolver })
}

// ============ Envelope ============

/// `{ status, data }` body shared by every `/query` response.
#[derive(Serialize)]
struct Envelope {
    status: u16,
    data: Value,
}

struct QueryResponse {
    status: StatusCode,
    data: Value,
}

impl QueryResponse {
    fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }
}

impl From<ResolveError> for QueryResponse {
    fn from(err: ResolveError) -> Self {
        let status = err.status();
        let data = match err {
            ResolveError::Upstream { payload, .. } => payload,
            other => json!({ "message": other.to_string() }),
        };
        Self { status, data }
    }
}

impl IntoResponse for QueryResponse {
    fn into_response(self) -> Response {
        let body = Envelope {
            status: self.status.as_u16(),
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<Value>,
}

/// Accepts strings and scalars; anything else counts as missing.
fn query_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> QueryResponse {
    let raw = match &body {
        Ok(Json(request)) => query_text(request.query.as_ref()),
        Err(_) => String::new(),
    };

    let query = match Query::parse(&raw) {
        Ok(q) => q,
        Err(e) => return e.into(),
    };

    match state.resolver.resolve(&query).await {
        Ok(answer) => match serde_json::to_value(&answer) {
            Ok(data) => QueryResponse::ok(data),
            Err(e) => ResolveError::Transport(e.to_string()).into(),
        },
        Err(e) => e.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text_accepts_scalars() {
        assert_eq!(query_text(Some(&json!("abc"))), "abc");
        assert_eq!(query_text(Some(&json!(42))), "42");
        assert_eq!(query_text(Some(&json!(["a"]))), "");
        assert_eq!(query_text(None), "");
    }

    #[test]
    fn test_upstream_payload_is_forwarded() {
        let payload = json!({"error_id": 502, "error_name": "throttle_violation"});
        let response: QueryResponse = ResolveError::Upstream {
            status: 400,
            payload: payload.clone(),
        }
        .into();
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(response.data, payload);
    }

    #[test]
    fn test_not_found_message() {
        let response: QueryResponse = ResolveError::NotFound.into();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.data, json!({"message": "No result found"}));
    }
}
