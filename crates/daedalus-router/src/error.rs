//! Route compilation errors.

use thiserror::Error;

/// Errors raised while compiling the route table.
///
/// All of them are startup errors: a table that compiled never fails later.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A path template or access-rule pattern is not a valid regex.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// The regex engine's complaint.
        #[source]
        source: regex::Error,
    },
}

impl RouterError {
    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}

/// Result alias for route compilation.
pub type RouterResult<T> = Result<T, RouterError>;
