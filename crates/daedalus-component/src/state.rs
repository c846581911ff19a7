//! Cache-backed component state.
//!
//! A state entry lives in the cache under `state[-name]:<token>`. The token
//! travels in the `X-State[-name]` cookie. Entries remember the client that
//! wrote them and are ignored when read by anyone else.

use std::time::Duration;

use daedalus_cache::{CacheExt, SharedCache};
use daedalus_core::names::{scoped, STATE_COOKIE};
use daedalus_core::{new_token, Cookies, Fingerprint, SetCookie};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// How long a state entry and its cookie live after the last write.
pub const STATE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const RESET_TTL: Duration = Duration::from_millis(1);

const STATE_KEY: &str = "state";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateEntry {
    exists: bool,
    #[serde(flatten)]
    fingerprint: Fingerprint,
    data: serde_json::Value,
}

/// State of one component, or of the route when unnamed.
///
/// # Example
///
/// ```rust
/// use daedalus_cache::{MemoryCache, SharedCache};
/// use daedalus_component::StateStore;
/// use daedalus_core::{Cookies, Fingerprint};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let cache: SharedCache = Arc::new(MemoryCache::new());
/// let client = Fingerprint { lang: "en".into(), ip: "10.0.0.1".into(), user_agent: "ua".into() };
///
/// let mut store = StateStore::load(cache.clone(), &Cookies::new(), "cart", client.clone())
///     .await
///     .unwrap();
/// let cookie = store.set(&vec![1, 2, 3]).await.unwrap().unwrap();
/// assert_eq!(cookie.name(), "X-State-cart");
///
/// let cookies = Cookies::parse(&format!("X-State-cart={}", cookie.value()));
/// let store = StateStore::load(cache, &cookies, "cart", client).await.unwrap();
/// assert_eq!(store.get::<Vec<i32>>().unwrap(), Some(vec![1, 2, 3]));
/// # });
/// ```
#[derive(Clone)]
pub struct StateStore {
    cache: SharedCache,
    name: String,
    token: String,
    fingerprint: Fingerprint,
    entry: Option<StateEntry>,
    reset: bool,
}

impl StateStore {
    /// Loads the entry referenced by the request cookies.
    ///
    /// A token is minted when the cookie is missing. Entries written by a
    /// different client are treated as absent.
    pub async fn load(
        cache: SharedCache,
        cookies: &Cookies,
        name: &str,
        fingerprint: Fingerprint,
    ) -> CodecResult<Self> {
        let cookie = scoped(STATE_COOKIE, name);
        let token = match cookies.get(&cookie) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => new_token(),
        };

        let mut store = Self {
            cache,
            name: name.to_string(),
            token,
            fingerprint,
            entry: None,
            reset: false,
        };

        let entry: Option<StateEntry> = store.cache.get_json(&store.cache_key()).await?;
        store.entry = entry.filter(|entry| {
            let same = entry.exists && entry.fingerprint == store.fingerprint;
            if !same {
                debug!(key = %store.cache_key(), "state written by another client, ignoring");
            }
            same
        });
        Ok(store)
    }

    /// Component name, empty for route state.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque token stored in the cookie.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Cookie carrying the token.
    pub fn cookie_name(&self) -> String {
        scoped(STATE_COOKIE, &self.name)
    }

    /// Cache key of the entry.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", scoped(STATE_KEY, &self.name), self.token)
    }

    /// True when a valid entry was loaded or written.
    pub fn exists(&self) -> bool {
        self.entry.is_some()
    }

    /// Decodes the stored data.
    pub fn get<T: DeserializeOwned>(&self) -> CodecResult<Option<T>> {
        self.entry
            .as_ref()
            .map(|entry| {
                serde_json::from_value(entry.data.clone())
                    .map_err(|e| CodecError::serialization(&self.name, e))
            })
            .transpose()
    }

    /// Stores `data` and returns the cookie refreshing the token.
    ///
    /// Does nothing once the store was reset during this request.
    pub async fn set<T: Serialize + ?Sized>(&mut self, data: &T) -> CodecResult<Option<SetCookie>> {
        if self.reset {
            return Ok(None);
        }
        let data =
            serde_json::to_value(data).map_err(|e| CodecError::serialization(&self.name, e))?;
        let entry = StateEntry {
            exists: true,
            fingerprint: self.fingerprint.clone(),
            data,
        };
        self.cache
            .set_json(&self.cache_key(), &entry, STATE_TTL)
            .await?;
        self.entry = Some(entry);
        Ok(Some(SetCookie::site(self.cookie_name(), &self.token, STATE_TTL)))
    }

    /// Drops the entry and returns the cookie removing the token.
    pub async fn reset(&mut self) -> CodecResult<SetCookie> {
        self.reset = true;
        self.entry = None;
        self.cache
            .set(&self.cache_key(), String::new(), RESET_TTL)
            .await?;
        Ok(SetCookie::remove(self.cookie_name()))
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("name", &self.name)
            .field("token", &self.token)
            .field("exists", &self.entry.is_some())
            .field("reset", &self.reset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_cache::MemoryCache;
    use std::sync::Arc;

    fn client() -> Fingerprint {
        Fingerprint {
            lang: "cs".into(),
            ip: "192.168.1.10".into(),
            user_agent: "Firefox".into(),
        }
    }

    fn cache() -> SharedCache {
        Arc::new(MemoryCache::new())
    }

    async fn persisted(cache: &SharedCache, name: &str) -> Cookies {
        let mut store = StateStore::load(cache.clone(), &Cookies::new(), name, client())
            .await
            .unwrap();
        let cookie = store.set(&serde_json::json!({"page": 4})).await.unwrap().unwrap();
        Cookies::parse(&format!("{}={}", cookie.name(), cookie.value()))
    }

    #[tokio::test]
    async fn test_keys_are_scoped() {
        let route = StateStore::load(cache(), &Cookies::parse("X-State=tok"), "", client())
            .await
            .unwrap();
        assert_eq!(route.cookie_name(), "X-State");
        assert_eq!(route.cache_key(), "state:tok");

        let named = StateStore::load(cache(), &Cookies::parse("X-State-grid=abc"), "grid", client())
            .await
            .unwrap();
        assert_eq!(named.cookie_name(), "X-State-grid");
        assert_eq!(named.cache_key(), "state-grid:abc");
    }

    #[tokio::test]
    async fn test_missing_cookie_mints_token() {
        let store = StateStore::load(cache(), &Cookies::new(), "grid", client())
            .await
            .unwrap();
        assert_eq!(store.token().len(), 43);
        assert!(!store.exists());
        assert_eq!(store.get::<serde_json::Value>().unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_load() {
        let cache = cache();
        let cookies = persisted(&cache, "grid").await;

        let store = StateStore::load(cache.clone(), &cookies, "grid", client())
            .await
            .unwrap();
        assert!(store.exists());
        let data: serde_json::Value = store.get().unwrap().unwrap();
        assert_eq!(data["page"], 4);
    }

    #[tokio::test]
    async fn test_fingerprint_mismatch_is_absent() {
        let cache = cache();
        let cookies = persisted(&cache, "grid").await;

        for other in [
            Fingerprint {
                lang: "en".into(),
                ..client()
            },
            Fingerprint {
                ip: "10.0.0.1".into(),
                ..client()
            },
            Fingerprint {
                user_agent: "curl".into(),
                ..client()
            },
        ] {
            let store = StateStore::load(cache.clone(), &cookies, "grid", other)
                .await
                .unwrap();
            assert!(!store.exists());
        }
    }

    #[tokio::test]
    async fn test_components_do_not_share_state() {
        let cache = cache();
        let cookies = persisted(&cache, "grid").await;
        let other = StateStore::load(cache, &cookies, "form", client())
            .await
            .unwrap();
        assert!(!other.exists());
    }

    #[tokio::test]
    async fn test_reset_blocks_later_set() {
        let cache = cache();
        let cookies = persisted(&cache, "grid").await;

        let mut store = StateStore::load(cache.clone(), &cookies, "grid", client())
            .await
            .unwrap();
        let removal = store.reset().await.unwrap();
        assert!(removal.is_removal());
        assert_eq!(removal.name(), "X-State-grid");
        assert!(store.set(&1).await.unwrap().is_none());
        assert!(!store.exists());

        let reloaded = StateStore::load(cache, &cookies, "grid", client())
            .await
            .unwrap();
        assert!(!reloaded.exists());
    }

    #[tokio::test]
    async fn test_set_refreshes_cookie() {
        let mut store = StateStore::load(cache(), &Cookies::parse("X-State=tok"), "", client())
            .await
            .unwrap();
        let cookie = store.set("payload").await.unwrap().unwrap();
        assert_eq!(cookie.value(), "tok");
        assert!(cookie
            .to_header_value()
            .contains(&format!("Max-Age={}", STATE_TTL.as_secs())));
    }
}
