//! HTTP surface: submit/approve actions and the live status stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures::Stream;
use serde::Deserialize;
use tokio::time::MissedTickBehavior;
use tracing::warn;
use tower_http::cors::{Any, CorsLayer};

use flowboard_common::WorkflowError;
use flowboard_engine::{BoardProjector, Producer};

pub struct AppState {
    pub producer: Producer,
    pub projector: BoardProjector,
    pub push_interval: Duration,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/workflow/submit", post(submit))
        .route("/workflow/approve", post(approve))
        .route("/workflow/status-stream", get(status_stream))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

#[derive(Deserialize)]
struct SubmitRequest {
    #[serde(rename = "docId")]
    doc_id: Option<String>,
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Deserialize)]
struct ApproveRequest {
    #[serde(rename = "docId")]
    doc_id: Option<String>,
    #[serde(rename = "approverId")]
    approver_id: Option<String>,
}

/// A required request field: present and non-empty after trimming.
fn required_field(value: Option<&str>, name: &str) -> Result<String, WorkflowError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(WorkflowError::Validation(format!("{name} is required"))),
    }
}

fn validation_failure(err: WorkflowError) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "message": err.to_string() })),
    )
        .into_response()
}

fn append_failure(error: impl std::fmt::Display) -> axum::response::Response {
    warn!(error = %error, "Failed to append workflow event");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "success": false, "message": error.to_string() })),
    )
        .into_response()
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> impl IntoResponse {
    let doc_id = match required_field(body.doc_id.as_deref(), "docId") {
        Ok(v) => v,
        Err(err) => return validation_failure(err),
    };
    let user_id = match required_field(body.user_id.as_deref(), "userId") {
        Ok(v) => v,
        Err(err) => return validation_failure(err),
    };

    match state.producer.submit_document(&doc_id, &user_id).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => append_failure(e),
    }
}

async fn approve(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ApproveRequest>,
) -> impl IntoResponse {
    let doc_id = match required_field(body.doc_id.as_deref(), "docId") {
        Ok(v) => v,
        Err(err) => return validation_failure(err),
    };
    let approver_id = match required_field(body.approver_id.as_deref(), "approverId") {
        Ok(v) => v,
        Err(err) => return validation_failure(err),
    };

    match state.producer.approve_document(&doc_id, &approver_id).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => append_failure(e),
    }
}

/// One board per second for the lifetime of the connection. Each tick awaits
/// a single projection; ticks that would overlap an in-flight projection are
/// skipped rather than queued. Dropping the subscriber drops the stream.
async fn status_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let projector = state.projector.clone();
    let push_interval = state.push_interval;

    let stream = async_stream::stream! {
        let mut ticker = tokio::time::interval(push_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let board = projector.project().await;
            match serde_json::to_string(&board) {
                Ok(json) => yield Ok::<_, Infallible>(Event::default().data(json)),
                Err(e) => warn!(error = %e, "Failed to serialize board"),
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_accepts_plain_value() {
        assert_eq!(required_field(Some("D1"), "docId").unwrap(), "D1");
    }

    #[test]
    fn required_field_trims_whitespace() {
        assert_eq!(required_field(Some("  D1 "), "docId").unwrap(), "D1");
    }

    #[test]
    fn required_field_rejects_missing() {
        let err = required_field(None, "docId").unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: docId is required");
    }

    #[test]
    fn required_field_rejects_empty_and_blank() {
        assert!(matches!(
            required_field(Some(""), "userId"),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            required_field(Some("   "), "userId"),
            Err(WorkflowError::Validation(_))
        ));
    }
}
