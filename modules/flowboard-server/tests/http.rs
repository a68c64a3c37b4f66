//! Route-level tests against the in-memory event log.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use flowboard_engine::{BoardProjector, EventLog, MemoryLog, Producer};
use flowboard_server::routes::{build_router, AppState};

fn test_app() -> (Router, Arc<dyn EventLog>) {
    let log: Arc<dyn EventLog> = Arc::new(MemoryLog::default());
    let state = Arc::new(AppState {
        producer: Producer::new(log.clone()),
        projector: BoardProjector::new(log.clone(), 50),
        push_interval: Duration::from_millis(100),
    });
    (build_router(state), log)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_appends_and_returns_pending() {
    let (app, log) = test_app();

    let response = app
        .oneshot(post_json(
            "/workflow/submit",
            r#"{"docId":"D1","userId":"U1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "PENDING");

    let events = log.recent_events(10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(body["messageId"], events[0].id.as_str());
}

#[tokio::test]
async fn approve_returns_approved() {
    let (app, _log) = test_app();

    let response = app
        .oneshot(post_json(
            "/workflow/approve",
            r#"{"docId":"D1","approverId":"A1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "APPROVED");
}

#[tokio::test]
async fn submit_without_user_id_is_rejected_without_append() {
    let (app, log) = test_app();

    let response = app
        .oneshot(post_json("/workflow/submit", r#"{"docId":"D1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation error: userId is required");

    assert!(log.recent_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn submit_with_blank_doc_id_is_rejected() {
    let (app, log) = test_app();

    let response = app
        .oneshot(post_json(
            "/workflow/submit",
            r#"{"docId":"   ","userId":"U1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(log.recent_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn approve_without_approver_id_is_rejected_without_append() {
    let (app, log) = test_app();

    let response = app
        .oneshot(post_json("/workflow/approve", r#"{"docId":"D1"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(log.recent_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn health_answers_ok() {
    let (app, _log) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
