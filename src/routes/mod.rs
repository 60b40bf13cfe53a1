//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The process serves two listeners: the dispatcher HTTP API and the chat
//! bus websocket endpoint. Each gets its own router over the same shared
//! `AppState`.

pub mod chat;
pub mod process;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Dispatcher HTTP API. Both path spellings of the task endpoints are
/// served for client compatibility.
pub fn dispatcher_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/process", post(process::submit_process))
        .route("/api/task/result/{task_id}", get(process::get_task_result))
        .route("/api/tasks/{task_id}", get(process::get_task_result))
        .route("/api/task/list", get(process::list_task_ids))
        .route("/api/tasks", get(process::list_task_ids))
        .route("/api/health", get(process::health))
        .layer(cors)
        .with_state(state)
}

/// Chat bus websocket endpoint.
pub fn chat_app(state: AppState) -> Router {
    Router::new()
        .route("/chat", get(chat::handle_chat))
        .with_state(state)
}
