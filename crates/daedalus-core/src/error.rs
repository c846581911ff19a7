//! Error types for Daedalus.
//!
//! Every failure a request can hit is turned into exactly one
//! [`DaedalusError`]. The lifecycle converts it into a terminal
//! [`Outcome`](crate::Outcome) using [`DaedalusError::status_code`].

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`DaedalusError`].
pub type DaedalusResult<T> = Result<T, DaedalusError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed request input.
    Validation,
    /// Access rule denied the caller.
    Authorization,
    /// No route accepts the request.
    NotFound,
    /// Rate limiting.
    RateLimited,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Standard error type for Daedalus.
///
/// # Example
///
/// ```
/// use daedalus_core::{DaedalusError, ErrorCategory};
///
/// let error = DaedalusError::route_not_found("/blog");
/// assert_eq!(error.category(), ErrorCategory::NotFound);
/// assert_eq!(error.to_string(), "route [/blog] not found");
/// ```
#[derive(Error, Debug)]
pub enum DaedalusError {
    /// Request input could not be understood.
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
    },

    /// No route matched the request path and method.
    #[error("route [{path}] not found")]
    RouteNotFound {
        /// The request path.
        path: String,
    },

    /// The caller does not hold the rights an access rule requires.
    #[error("insufficient rights")]
    InsufficientRights {
        /// Name of the rule that failed.
        rule: Option<String>,
    },

    /// Rate limit exceeded.
    #[error("Too Many Requests")]
    RateLimited,

    /// A handler asked for a dependency that was never registered.
    #[error("dependency [{type_name}] does not exist")]
    MissingDependency {
        /// The type that could not be resolved.
        type_name: &'static str,
    },

    /// A handler panicked.
    #[error("handler panicked: {message}")]
    Panic {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DaedalusError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a route-not-found error for `path`.
    #[must_use]
    pub fn route_not_found(path: impl Into<String>) -> Self {
        Self::RouteNotFound { path: path.into() }
    }

    /// Creates an insufficient-rights error, optionally naming the rule.
    #[must_use]
    pub fn insufficient_rights(rule: Option<impl Into<String>>) -> Self {
        Self::InsufficientRights {
            rule: rule.map(Into::into),
        }
    }

    /// Creates a missing-dependency error for `T`.
    #[must_use]
    pub fn missing_dependency<T: ?Sized>() -> Self {
        Self::MissingDependency {
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::RouteNotFound { .. } => ErrorCategory::NotFound,
            Self::InsufficientRights { .. } => ErrorCategory::Authorization,
            Self::RateLimited => ErrorCategory::RateLimited,
            Self::MissingDependency { .. } | Self::Panic { .. } | Self::Internal { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Renders the error and its source chain, one cause per line.
    #[must_use]
    pub fn chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\ncaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

impl From<crate::InjectionError> for DaedalusError {
    fn from(err: crate::InjectionError) -> Self {
        Self::MissingDependency {
            type_name: err.type_name,
        }
    }
}

impl From<anyhow::Error> for DaedalusError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_message() {
        let error = DaedalusError::route_not_found("/missing");
        assert_eq!(error.to_string(), "route [/missing] not found");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_insufficient_rights() {
        let error = DaedalusError::insufficient_rights(Some("admin"));
        assert_eq!(error.to_string(), "insufficient rights");
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_missing_dependency_names_type() {
        struct Mailer;
        let error = DaedalusError::missing_dependency::<Mailer>();
        assert!(error.to_string().starts_with("dependency ["));
        assert!(error.to_string().contains("Mailer"));
        assert!(error.to_string().ends_with("] does not exist"));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited() {
        let error = DaedalusError::RateLimited;
        assert_eq!(error.to_string(), "Too Many Requests");
        assert_eq!(error.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_chain_includes_sources() {
        let source = anyhow::anyhow!("connection refused");
        let error = DaedalusError::internal_with_source("cache unavailable", source);
        let chain = error.chain();
        assert!(chain.contains("cache unavailable"));
        assert!(chain.contains("caused by: connection refused"));
    }

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::Validation,
            ErrorCategory::Authorization,
            ErrorCategory::NotFound,
            ErrorCategory::RateLimited,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {:?} should map to error status code, got {}",
                category,
                status
            );
        }
    }
}
