//! Chat routes — the `ask` contract over HTTP.
//!
//! The caller owns the conversation: every request carries the history it
//! wants considered, and the answer is appended on the caller's side.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use healthrag_chat::ChatTurn;
use healthrag_core::Error;
use serde::Deserialize;
use tracing::info;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/status", get(get_status))
        .route("/chat", post(chat))
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.status())
}

// ---------------------------------------------------------------
// Ask
// ---------------------------------------------------------------

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let start = Instant::now();

    match state.orchestrator.ask(&req.question, &req.history).await {
        Ok(result) => {
            info!(
                "Answered in {}ms with {} sources",
                start.elapsed().as_millis(),
                result.unique_sources.len()
            );
            (StatusCode::OK, Json(serde_json::json!(result)))
        }
        Err(e) => error_response(&e),
    }
}

/// Map pipeline failures to a status code and an error body, never an answer body.
pub fn error_response(err: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let (status, kind) = match err {
        e if e.is_fatal_config() => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
        Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        Error::Generation { .. } => (StatusCode::BAD_GATEWAY, "generation"),
        Error::Retrieval { .. } => (StatusCode::BAD_GATEWAY, "retrieval"),
        Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };

    (
        status,
        Json(serde_json::json!({
            "error": err.to_string(),
            "kind": kind,
        })),
    )
}
