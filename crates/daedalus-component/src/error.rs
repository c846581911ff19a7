//! Codec and state errors.

use daedalus_cache::CacheError;
use daedalus_core::DaedalusError;
use thiserror::Error;

/// Errors raised while encoding, decoding or persisting component state.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The query string could not be parsed or built.
    #[error("invalid query string: {0}")]
    Query(String),

    /// Component data could not be (de)serialized.
    #[error("component state of `{component}` could not be serialized: {source}")]
    Serialization {
        /// Component name, empty for route-level state.
        component: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl CodecError {
    /// Creates a serialization error.
    pub fn serialization(component: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            component: component.into(),
            source,
        }
    }
}

impl From<CodecError> for DaedalusError {
    fn from(error: CodecError) -> Self {
        Self::internal_with_source("component state failure", error)
    }
}

/// Result alias for this crate.
pub type CodecResult<T> = Result<T, CodecError>;
