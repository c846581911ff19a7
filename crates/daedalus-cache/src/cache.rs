//! The cache contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::CacheError;

/// A shared, type-erased cache handle.
pub type SharedCache = Arc<dyn Cache>;

/// A key/value store with per-entry expiry.
///
/// Values are JSON strings. An empty string is treated like a missing value
/// by [`CacheExt::get_json`].
#[async_trait]
pub trait Cache: Send + Sync + 'static {
    /// Returns `true` if `key` holds a live entry.
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Reads the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`.
    async fn destroy(&self, key: &str) -> Result<(), CacheError>;
}

/// Typed JSON helpers available on every [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Reads and decodes the value stored under `key`.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) if !raw.is_empty() => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| CacheError::serialization(key, e)),
            _ => Ok(None),
        }
    }

    /// Encodes `value` and stores it under `key` for `ttl`.
    async fn set_json<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value).map_err(|e| CacheError::serialization(key, e))?;
        self.set(key, raw, ttl).await
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[async_trait]
impl<C: Cache + ?Sized> Cache for Arc<C> {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        (**self).exists(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        (**self).set(key, value, ttl).await
    }

    async fn destroy(&self, key: &str) -> Result<(), CacheError> {
        (**self).destroy(key).await
    }
}
