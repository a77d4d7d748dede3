//! Error types for the orderdesk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] aggregates the ones
//! that can fail a whole turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for a turn.
///
/// Tool-level failures never appear here: the registry turns them into error
/// [`ToolResult`](crate::tool::ToolResult)s that are fed back to the model.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inbound request errors ---
    #[error("Validation error: {0}")]
    Validation(String),

    // --- Model errors ---
    #[error("Model invocation failed: {0}")]
    Model(#[from] ProviderError),

    // --- Tool host errors ---
    #[error("Tool host transport failed: {0}")]
    Transport(#[from] TransportError),

    // --- Loop errors ---
    #[error(
        "The assistant could not finish answering within {max_iterations} reasoning steps. Please rephrase or narrow the question."
    )]
    LoopBudgetExceeded { max_iterations: u32 },

    // --- Persistence errors ---
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the caller may transparently retry the failed operation.
    ///
    /// Model and transport failures are never retried automatically: a
    /// repeated turn could re-run non-idempotent tools.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Checkpoint(CheckpointError::Conflict { .. }))
    }

    /// A short machine-friendly name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "ValidationError",
            Error::Model(_) => "ModelInvocationError",
            Error::Transport(_) => "TransportError",
            Error::LoopBudgetExceeded { .. } => "LoopBudgetExceeded",
            Error::Checkpoint(_) => "CheckpointError",
            Error::Internal(_) => "InternalError",
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the channel to the tool host process, as opposed to failures
/// of an individual tool.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("failed to start tool host: {0}")]
    SpawnFailed(String),

    #[error("tool host connection is closed")]
    Closed,

    #[error("tool host process exited: {0}")]
    ProcessExited(String),

    #[error("malformed frame from tool host: {0}")]
    MalformedFrame(String),

    #[error("tool host did not answer '{method}' within {timeout_ms}ms")]
    Timeout { method: String, timeout_ms: u64 },

    #[error("tool host i/o error: {0}")]
    Io(String),

    #[error("tool host protocol error {code}: {message}")]
    Protocol { code: i64, message: String },
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::UnexpectedEof => {
                TransportError::Closed
            }
            _ => TransportError::Io(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool {tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Classification recorded on every error tool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolErrorKind {
    UnknownTool,
    SchemaValidation,
    Execution,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorKind::UnknownTool => "UnknownTool",
            ToolErrorKind::SchemaValidation => "SchemaValidationError",
            ToolErrorKind::Execution => "ToolExecutionError",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Checkpoint conflict on thread {thread_id}: expected version {expected}, found {actual}")]
    Conflict {
        thread_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),
}
