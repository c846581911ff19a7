//! In-process cache backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use daedalus_core::ShutdownSignal;

use crate::{Cache, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// A cache held in process memory.
///
/// Expired entries are invisible to readers immediately and are physically
/// removed by [`MemoryCache::spawn_sweeper`]. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Starts a task that sweeps every `interval` until `shutdown` fires.
    pub fn spawn_sweeper(&self, interval: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            tracing::trace!(removed, "memory cache sweep");
                        }
                    }
                    () = shutdown.recv() => {
                        tracing::debug!("memory cache sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn destroy(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        value: String,
    }

    #[tokio::test]
    async fn test_set_get_destroy() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));

        cache.destroy("k").await.unwrap();
        assert!(!cache.exists("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MemoryCache::new();
        let record = Record {
            value: "test".into(),
        };
        cache
            .set_json("record", &record, Duration::from_secs(60))
            .await
            .unwrap();

        let loaded: Option<Record> = cache.get_json("record").await.unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_empty_value_reads_as_missing() {
        let cache = MemoryCache::new();
        cache
            .set("blank", String::new(), Duration::from_secs(60))
            .await
            .unwrap();
        let loaded: Option<Record> = cache.get_json("blank").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_invalid_json_is_error() {
        let cache = MemoryCache::new();
        cache
            .set("bad", "{".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let result: Result<Option<Record>, _> = cache.get_json("bad").await;
        assert!(matches!(result, Err(CacheError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_expired_entry_hidden_then_swept() {
        let cache = MemoryCache::new();
        cache
            .set("short", "v".to_string(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert!(!cache.exists("short").await.unwrap());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.sweep(), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let cache = MemoryCache::new();
        let shutdown = ShutdownSignal::new();
        let handle = cache.spawn_sweeper(Duration::from_millis(5), shutdown.clone());

        cache
            .set("gone", "v".to_string(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.is_empty());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shared_through_dyn() {
        let cache: crate::SharedCache = Arc::new(MemoryCache::new());
        cache
            .set_json("n", &42u32, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(cache.get_json::<u32>("n").await.unwrap(), Some(42));
    }
}
