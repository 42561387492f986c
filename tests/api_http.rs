// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /dedupe  (happy path + threshold validation)
// - POST /compile followed by GET /items  (shared state)
// - POST /regenerate  (unknown item -> 404)

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use story_compiler::embed::HashingEmbedder;
use story_compiler::error::Result;
use story_compiler::generate::{GenerationClient, GenerationRequest};
use story_compiler::storage::MemoryStore;
use story_compiler::{create_router, AppState, PipelineConfig};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

struct StubClient;

impl GenerationClient for StubClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let out = if request.system.contains("hook") {
            "Hook text."
        } else if request.system.contains("summary") {
            "Summary text."
        } else {
            "Story label"
        }
        .to_string();
        Box::pin(async move { Ok(out) })
    }
    fn provider_name(&self) -> &'static str {
        "stub"
    }
}

/// Build the same Router the binary uses, with test backends behind it.
fn test_router() -> Router {
    let state = AppState {
        store: Arc::new(MemoryStore::new()),
        embedder: Arc::new(HashingEmbedder::new(256)),
        generator: Arc::new(StubClient),
        config: Arc::new(PipelineConfig::default()),
    };
    create_router(state)
}

fn batch_json() -> Json {
    json!([
        {
            "id": "a1",
            "title": "Quantum startup announces error-corrected chip",
            "url": "https://example.test/a1",
            "source": "feed-a"
        },
        {
            "id": "a2",
            "title": "Quantum startup announces error-corrected chip",
            "url": "https://example.test/a2",
            "source": "feed-b"
        },
        {
            "id": "b1",
            "title": "Major bank reports record quarterly profit",
            "description": "Beats analyst expectations on trading revenue",
            "url": "https://example.test/b1",
            "source": "feed-a"
        }
    ])
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok", "health body should be 'ok'");
}

#[tokio::test]
async fn api_dedupe_groups_and_annotates() {
    let app = test_router();

    let payload = json!({ "headlines": batch_json() });
    let req = Request::builder()
        .method("POST")
        .uri("/dedupe")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /dedupe");

    let resp = app.oneshot(req).await.expect("oneshot /dedupe");
    assert_eq!(resp.status(), StatusCode::OK, "dedupe should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse dedupe json");

    assert_eq!(v["headlines"], 3);
    let groups = v["groups"].as_array().expect("groups array");
    assert_eq!(groups.len(), 2);

    // Hottest first: the identical pair.
    assert_eq!(groups[0]["heat_score"], 2);
    assert_eq!(groups[0]["representative_id"], "a1");
    assert_eq!(groups[0]["member_ids"], json!(["a1", "a2"]));
    assert_eq!(groups[0]["topic"], "Story label");
    assert_eq!(groups[1]["heat_score"], 1);
}

#[tokio::test]
async fn api_dedupe_rejects_bad_threshold_with_400() {
    let app = test_router();

    let payload = json!({ "headlines": batch_json(), "threshold": 1.5 });
    let req = Request::builder()
        .method("POST")
        .uri("/dedupe")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /dedupe");

    let resp = app.oneshot(req).await.expect("oneshot /dedupe");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse error json");
    let msg = v["error"].as_str().expect("error message");
    assert!(
        msg.contains("similarity threshold"),
        "unexpected error body: {msg}"
    );
}

#[tokio::test]
async fn api_compile_persists_items_visible_via_items_route() {
    let app = test_router();

    let payload = json!({ "headlines": batch_json(), "tone": "dry" });
    let req = Request::builder()
        .method("POST")
        .uri("/compile")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /compile");

    let resp = app.clone().oneshot(req).await.expect("oneshot /compile");
    assert_eq!(resp.status(), StatusCode::OK, "compile should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse compile json");

    assert_eq!(v["groups"], 2);
    assert_eq!(v["skipped"], 0);
    let items = v["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["heat_score"], 2);
    assert_eq!(items[0]["hook"], "Hook text.");
    assert_eq!(items[0]["source_headline_ids"], json!(["a1", "a2"]));

    // Same router, same state: the items are now listable.
    let req = Request::builder()
        .method("GET")
        .uri("/items")
        .body(Body::empty())
        .expect("build GET /items");
    let resp = app.oneshot(req).await.expect("oneshot /items");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let listed: Json = serde_json::from_slice(&bytes).expect("parse items json");
    assert_eq!(listed.as_array().expect("array").len(), 2);
    assert_eq!(listed[0]["heat_score"], 2, "listing is heat-descending");
}

#[tokio::test]
async fn api_regenerate_unknown_item_is_404() {
    let app = test_router();

    let payload = json!({ "item_id": "no-such-item", "instructions": "shorter" });
    let req = Request::builder()
        .method("POST")
        .uri("/regenerate")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /regenerate");

    let resp = app.oneshot(req).await.expect("oneshot /regenerate");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse error json");
    assert!(
        v["error"].as_str().expect("error message").contains("not found"),
        "unexpected error body: {v}"
    );
}
