//! Session errors.

use daedalus_cache::CacheError;
use daedalus_core::DaedalusError;
use thiserror::Error;

/// Errors raised by the session, CSRF and flash stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The cache failed.
    #[error("session store failure: {0}")]
    Cache(#[from] CacheError),
}

impl From<SessionError> for DaedalusError {
    fn from(error: SessionError) -> Self {
        Self::internal_with_source("session failure", error)
    }
}

/// Result alias for this crate.
pub type SessionResult<T> = Result<T, SessionError>;
