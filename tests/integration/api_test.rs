//! API integration tests: the full router exercised request-by-request.

use crate::common::{create_test_pool, test_registry};
use http_body_util::BodyExt;
use plenum::cache::ElementCache;
use plenum::history::HistoryLog;
use plenum::notify::ChangeNotifier;
use plenum::routes::create_router;
use plenum::server::AppState;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tower::ServiceExt;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;

async fn app() -> Router<()> {
    let registry = test_registry();
    let notifier = Arc::new(ChangeNotifier::new(registry.clone()));
    let history = Arc::new(HistoryLog::new(create_test_pool().await));

    let mut cache = ElementCache::new(registry);
    cache.add_hook(notifier.clone());
    create_router(AppState {
        cache: Arc::new(cache),
        notifier,
        history,
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_elements(json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/elements")
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn tag_batch() -> serde_json::Value {
    serde_json::json!([{
        "collection_string": "core/tag",
        "id": 1,
        "full_data": {"id": 1, "name": "Important"},
        "information": [],
        "user_id": null,
        "disable_history": false,
        "restricted": false
    }])
}

#[tokio::test]
async fn test_version_starts_at_zero_and_advances() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await, serde_json::json!({"version": 0}));

    let response = app.clone().oneshot(post_elements(tag_batch())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({"version": 1}));
}

#[tokio::test]
async fn test_full_sync_is_access_filtered() {
    let app = app().await;
    app.clone().oneshot(post_elements(tag_batch())).await.unwrap();
    app.clone()
        .oneshot(post_elements(serde_json::json!([{
            "collection_string": "core/chat-message",
            "id": 1,
            "full_data": {"id": 1, "message": "secret"},
            "information": [],
            "user_id": null,
            "disable_history": false,
            "restricted": false
        }])))
        .await
        .unwrap();

    // Anonymous: only the tag.
    let response = app
        .clone()
        .oneshot(Request::get("/elements").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["version"], 2);
    assert_eq!(body["elements"]["core/tag"][0]["name"], "Important");
    assert!(body["elements"].get("core/chat-message").is_none());

    // With the chat permission, the message too.
    let response = app
        .clone()
        .oneshot(
            Request::get("/elements")
                .header("x-user-id", "7")
                .header("x-permissions", "core.can_use_chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["elements"]["core/chat-message"][0]["message"], "secret");
}

#[tokio::test]
async fn test_changed_since_returns_window() {
    let app = app().await;
    app.clone().oneshot(post_elements(tag_batch())).await.unwrap();
    app.clone()
        .oneshot(post_elements(serde_json::json!([{
            "collection_string": "core/tag",
            "id": 2,
            "full_data": {"id": 2, "name": "Later"},
            "information": [],
            "user_id": null,
            "disable_history": false,
            "restricted": false
        }])))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::get("/elements/changed?since=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["version"], 2);
    assert_eq!(body["changed"]["core/tag"].as_array().unwrap().len(), 1);
    assert_eq!(body["changed"]["core/tag"][0]["name"], "Later");
}

#[tokio::test]
async fn test_invalid_batch_returns_400_error_body() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(post_elements(serde_json::json!([{
            "collection_string": "unknown/collection",
            "id": 1,
            "full_data": {"id": 1},
            "information": [],
            "user_id": null,
            "disable_history": false,
            "restricted": false
        }])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("unknown/collection"));

    // The failed batch did not advance the version.
    let response = app
        .oneshot(Request::get("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(response).await["version"], 0);
}

#[tokio::test]
async fn test_history_requires_permission() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(
            Request::get("/history")
                .header("x-user-id", "1")
                .header("x-permissions", "core.can_see_history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Superusers hold every permission implicitly.
    let response = app
        .clone()
        .oneshot(
            Request::get("/history/core/tag:1")
                .header("x-superuser", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_falls_back_to_404() {
    let app = app().await;
    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json_or_text(response).await, "404 Not Found");
}

async fn body_json_or_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
