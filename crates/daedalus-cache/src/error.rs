//! Cache errors.

use thiserror::Error;

/// Errors returned by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be encoded or decoded.
    #[error("cache value for [{key}] is not valid json: {source}")]
    Serialization {
        /// Affected key.
        key: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The backend could not be reached.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Creates a serialization error for `key`.
    pub fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            source,
        }
    }
}

impl From<CacheError> for daedalus_core::DaedalusError {
    fn from(err: CacheError) -> Self {
        Self::internal_with_source("cache operation failed", err)
    }
}
