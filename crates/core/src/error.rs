//! Error types for the StepStream domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all StepStream operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Protocol errors ---
    #[error("Delta error: {0}")]
    Delta(#[from] DeltaError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model returned an unusable reply: {0}")]
    InvalidReply(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum DeltaError {
    #[error("Malformed payload for delta kind '{kind}': {reason}")]
    MalformedPayload { kind: String, reason: String },

    #[error("Delta is missing a kind")]
    MissingKind,
}
