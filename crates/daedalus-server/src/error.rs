//! Server errors.
//!
//! These are startup and I/O failures. Request failures never surface here:
//! the lifecycle turns them into a terminal response.

use daedalus_config::ConfigError;
use daedalus_router::RouterError;
use thiserror::Error;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The route table could not be compiled.
    #[error("route compilation failed: {0}")]
    Router(#[from] RouterError),

    /// Failed to bind to the configured address.
    #[error("bind error: {0}")]
    Bind(String),

    /// I/O error during server operation.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Creates a bind error.
    pub fn bind(message: impl Into<String>) -> Self {
        Self::Bind(message.into())
    }
}

/// Result alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let error = ServerError::bind("address in use");
        assert_eq!(error.to_string(), "bind error: address in use");
    }

    #[test]
    fn test_config_error_converts() {
        let error: ServerError = ConfigError::InvalidValue {
            field: "server.http_addr".into(),
            reason: "empty".into(),
        }
        .into();
        assert!(error.to_string().starts_with("invalid configuration"));
    }
}
