//! Request handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use orderdesk_core::message::ThreadId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::SharedState;

const MISSING_FIELDS: &str = "Missing question or thread ID";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default, rename = "threadId")]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure modes of `/chat`, mapped to status and body.
#[derive(Debug)]
pub enum ChatError {
    MissingFields,
    Internal(String),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ChatError::MissingFields => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: MISSING_FIELDS.into(),
                    details: None,
                },
            ),
            ChatError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Internal Server Error".into(),
                    details: Some(details),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

pub async fn root_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": ":)" }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent_status: String,
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let agent_status = if state.agent().await.is_some() {
        "ready"
    } else {
        "initializing"
    };
    Json(HealthResponse {
        status: "ok".into(),
        agent_status: agent_status.into(),
    })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected chat body");
        ChatError::MissingFields
    })?;

    let (question, thread_id) = match (payload.question, payload.thread_id) {
        (Some(q), Some(t)) if !q.trim().is_empty() && !t.trim().is_empty() => (q, ThreadId::new(t)),
        _ => {
            warn!("Missing question or thread ID on request");
            return Err(ChatError::MissingFields);
        }
    };

    let agent = state
        .agent()
        .await
        .ok_or_else(|| ChatError::Internal("Agent is still initializing".into()))?;

    info!(thread_id = %thread_id, "Chat request");
    match agent.run_turn(&thread_id, &question).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.answer,
        })),
        Err(e) => {
            error!(thread_id = %thread_id, kind = e.kind(), error = %e, "Error processing question");
            Err(ChatError::Internal(e.to_string()))
        }
    }
}
