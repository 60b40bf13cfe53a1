//! Dispatcher HTTP handlers.
//!
//! DESIGN
//! ======
//! Thin protocol translation over the dispatcher and task table: handlers
//! decode the body, call the service, and map the outcome onto a status
//! code. The retrieval endpoint deliberately uses the table's
//! get-and-maybe-remove so a COMPLETED record is handed out exactly once.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use crate::services::dispatcher::{self, SubmitOutcome};
use crate::state::AppState;
use crate::task::DataProcessingRequest;

/// POST `/api/process` — start work immediately, answer within the SLA.
pub async fn submit_process(
    State(state): State<AppState>,
    payload: Result<Json<DataProcessingRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!(error = %rejection, "rejected malformed process request");
            let body = serde_json::json!({ "error": rejection.body_text() });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    match dispatcher::submit(&state, request).await {
        SubmitOutcome::CompletedWithinSla(record) => (StatusCode::OK, Json(record)).into_response(),
        SubmitOutcome::FailedWithinSla(record) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(record)).into_response()
        }
        SubmitOutcome::AcceptedForBackground(record) => {
            (StatusCode::ACCEPTED, Json(record)).into_response()
        }
    }
}

/// GET `/api/task/result/{task_id}` (alias `/api/tasks/{task_id}`).
/// A COMPLETED record is removed as it is returned; PROCESSING and FAILED
/// reads are idempotent.
pub async fn get_task_result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    match state.tasks.get_and_maybe_remove(&task_id) {
        Some(record) => {
            info!(%task_id, status = ?record.status, "task result retrieved");
            (StatusCode::OK, Json(record)).into_response()
        }
        None => {
            warn!(%task_id, "no result found for task");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// GET `/api/task/list` (alias `/api/tasks`).
pub async fn list_task_ids(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.tasks.list_ids())
}

/// GET `/api/health`.
pub async fn health() -> &'static str {
    "async dispatcher up"
}

#[cfg(test)]
#[path = "process_test.rs"]
mod tests;
