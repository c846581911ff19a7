//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed
    #[error("request build error: {0}")]
    RequestBuild(String),

    /// Response body reading failed
    #[error("body read error: {0}")]
    BodyRead(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Form encoding failed
    #[error("form error: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),

    /// Header name or value is invalid
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}
