//! HTTP tests: the query server over a fake corpus, the HTTP chat backend
//! against that server, and the Stack Exchange client against a stub API.

mod common;

use axum::{extract::Query as QueryParams, http::StatusCode, routing::get, Json, Router};
use common::*;
use serde_json::{json, Value};
use stackhelp::config::CorpusConfig;
use stackhelp::corpus::{Corpus, CorpusRoute, StackExchangeClient};
use stackhelp::dialogue::{HttpBackend, ResolutionOutcome, ResolveBackend};
use stackhelp::error::ResolveError;
use stackhelp::models::SearchFilters;
use stackhelp::server::build_router;
use std::collections::HashMap;
use std::sync::Arc;

/// Serves `router` on an ephemeral loopback port and returns its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn spawn_query_server(corpus: Arc<FakeCorpus>) -> String {
    spawn(build_router(Arc::new(resolver_for(corpus)))).await
}

async fn post_query(base: &str, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_query_success_envelope() {
    let base = spawn_query_server(Arc::new(segfault_corpus())).await;

    let (status, body) = post_query(&base, json!({ "query": "segfault pointer" })).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"]["answer_id"], 101);
    assert_eq!(
        body["data"]["body"],
        "<p>Check for <code>NULL</code> before dereferencing.</p>"
    );
    assert_eq!(body["data"]["owner"]["display_name"], "helper");
}

#[tokio::test]
async fn test_blank_query_is_rejected_before_corpus() {
    let corpus = Arc::new(segfault_corpus());
    let base = spawn_query_server(corpus.clone()).await;

    for body in [json!({ "query": "   " }), json!({}), json!({ "query": null })] {
        let (status, response) = post_query(&base, body).await;
        assert_eq!(status, 400);
        assert_eq!(response["status"], 400);
        assert_eq!(response["data"]["message"], "query is required");
    }
    assert!(corpus.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let corpus = Arc::new(segfault_corpus());
    let base = spawn_query_server(corpus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(corpus.calls().is_empty());
}

#[tokio::test]
async fn test_not_found_is_404() {
    let base = spawn_query_server(Arc::new(FakeCorpus::new())).await;

    let (status, body) = post_query(&base, json!({ "query": "nothing matches" })).await;

    assert_eq!(status, 404);
    assert_eq!(body["data"]["message"], "No result found");
}

#[tokio::test]
async fn test_upstream_error_is_forwarded() {
    let payload = json!({ "error_id": 400, "error_name": "bad_parameter", "error_message": "site is required" });
    let corpus = Arc::new(FakeCorpus::new().on(
        CorpusRoute::AdvancedSearch,
        Reply::Upstream(400, payload.clone()),
    ));
    let base = spawn_query_server(corpus).await;

    let (status, body) = post_query(&base, json!({ "query": "segfault" })).await;

    assert_eq!(status, 502);
    assert_eq!(body["data"], payload);
}

#[tokio::test]
async fn test_health() {
    let base = spawn_query_server(Arc::new(FakeCorpus::new())).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_http_backend_outcomes() {
    let base = spawn_query_server(Arc::new(segfault_corpus())).await;
    let backend = HttpBackend::new(format!("{}/query", base));

    assert_eq!(
        backend.resolve("segfault pointer").await,
        ResolutionOutcome::Answer("<p>Check for <code>NULL</code> before dereferencing.</p>".into())
    );
    assert_eq!(backend.resolve("no match here").await, ResolutionOutcome::Rejected);
    assert_eq!(backend.resolve("   ").await, ResolutionOutcome::Rejected);
}

#[tokio::test]
async fn test_http_backend_unreachable_server_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(format!("http://{}/query", addr));
    assert!(matches!(
        backend.resolve("segfault pointer").await,
        ResolutionOutcome::Failed(_)
    ));
}

// ─── Stack Exchange client against a stub API ─────────────────────────

fn stub_api() -> Router {
    Router::new()
        .route(
            "/2.3/search/advanced",
            get(|QueryParams(params): QueryParams<HashMap<String, String>>| async move {
                if params.get("site").map(String::as_str) != Some("stackoverflow") {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "error_id": 400,
                            "error_name": "bad_parameter",
                            "error_message": "site is required",
                        })),
                    );
                }
                let title = params.get("title").cloned().unwrap_or_default();
                (
                    StatusCode::OK,
                    Json(json!({
                        "items": [{ "question_id": 1, "title": title, "tags": [], "score": 1 }],
                        "has_more": false,
                    })),
                )
            }),
        )
        .route(
            "/2.3/questions/{id}/answers",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "message": "throttled, try again later" })),
                )
            }),
        )
        .route(
            "/2.3/answers/{id}",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
}

async fn stub_client() -> StackExchangeClient {
    let base = spawn(stub_api()).await;
    StackExchangeClient::new(&CorpusConfig {
        base_url: format!("{}/2.3", base),
        ..CorpusConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_client_sends_filters() {
    let client = stub_client().await;
    let filters = CorpusConfig::default()
        .default_filters()
        .with("title", "null pointer & friends");

    let raw = client
        .search(CorpusRoute::AdvancedSearch, &filters)
        .await
        .unwrap();

    assert_eq!(raw["items"][0]["title"], "null pointer & friends");
}

#[tokio::test]
async fn test_client_maps_error_payload_to_upstream() {
    let client = stub_client().await;

    let err = client
        .search(CorpusRoute::AdvancedSearch, &SearchFilters::new())
        .await
        .unwrap_err();

    match err {
        ResolveError::Upstream { status, payload } => {
            assert_eq!(status, 400);
            assert_eq!(payload["error_name"], "bad_parameter");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_maps_any_json_failure_to_upstream() {
    let client = stub_client().await;

    let err = client
        .search(CorpusRoute::QuestionAnswers(42), &SearchFilters::new())
        .await
        .unwrap_err();

    match err {
        ResolveError::Upstream { status, payload } => {
            assert_eq!(status, 503);
            assert_eq!(payload["message"], "throttled, try again later");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_maps_plain_failure_to_transport() {
    let client = stub_client().await;

    let err = client
        .search(CorpusRoute::Answer(7), &SearchFilters::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Transport(_)), "{:?}", err);
}
