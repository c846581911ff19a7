//! CSRF tokens.
//!
//! A form asks for a token under a cookie key, usually its route name. The
//! token is stored with the form name and the client that asked for it, and
//! is destroyed once a submission consumed it.

use std::time::Duration;

use daedalus_cache::{Cache, CacheExt, SharedCache};
use daedalus_config::CsrfConfig;
use daedalus_core::names::{scoped, CSRF_COOKIE, SUBROUTE_DIVIDER};
use daedalus_core::{new_token, Cookies, Fingerprint, SetCookie};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionResult;

/// Lifetime used when the configured one is shorter than an hour.
pub const DEFAULT_CSRF_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const MIN_CSRF_TTL: Duration = Duration::from_secs(60 * 60);

/// A stored CSRF token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfToken {
    /// Form name the token was issued for.
    pub name: String,
    /// Client address.
    pub ip: String,
    /// Client user agent.
    pub user_agent: String,
    /// The token itself.
    pub token: String,
}

impl CsrfToken {
    /// True when `client` is the client the token was issued to.
    pub fn issued_to(&self, client: &Fingerprint) -> bool {
        self.ip == client.ip && self.user_agent == client.user_agent
    }
}

/// Issues and checks CSRF tokens.
#[derive(Clone)]
pub struct CsrfManager {
    cache: SharedCache,
    ttl: Duration,
}

impl CsrfManager {
    /// Creates a manager using the `security.csrf` settings.
    pub fn new(cache: SharedCache, config: &CsrfConfig) -> Self {
        let mut ttl = config.duration();
        if ttl < MIN_CSRF_TTL {
            ttl = DEFAULT_CSRF_TTL;
        }
        Self { cache, ttl }
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for form `name`, stored under cookie `X-Csrf-<key>`.
    pub async fn create(
        &self,
        key: &str,
        name: &str,
        client: &Fingerprint,
    ) -> SessionResult<(String, SetCookie)> {
        let token = new_token();
        let record = CsrfToken {
            name: name.to_string(),
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            token: token.clone(),
        };
        self.cache
            .set_json(&csrf_key(&token), &record, self.ttl)
            .await?;
        let cookie = SetCookie::site(scoped(CSRF_COOKIE, key), &token, self.ttl);
        Ok((token, cookie))
    }

    /// Reads a token issued for form `name`.
    pub async fn get(&self, token: &str, name: &str) -> SessionResult<Option<CsrfToken>> {
        let record: Option<CsrfToken> = self.cache.get_json(&csrf_key(token)).await?;
        Ok(record.filter(|record| record.name == name))
    }

    /// Checks a submitted token and consumes it when valid.
    ///
    /// ```rust
    /// use daedalus_cache::{MemoryCache, SharedCache};
    /// use daedalus_config::CsrfConfig;
    /// use daedalus_core::Fingerprint;
    /// use daedalus_session::CsrfManager;
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let cache: SharedCache = Arc::new(MemoryCache::new());
    /// let csrf = CsrfManager::new(cache, &CsrfConfig::default());
    /// let client = Fingerprint::default();
    ///
    /// let (token, _) = csrf.create("contact", "contact-form", &client).await.unwrap();
    /// assert!(csrf.verify(&token, "contact-form", &client).await.unwrap());
    /// assert!(!csrf.verify(&token, "contact-form", &client).await.unwrap());
    /// # });
    /// ```
    pub async fn verify(&self, token: &str, name: &str, client: &Fingerprint) -> SessionResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        let Some(record) = self.get(token, name).await? else {
            debug!(form = name, "csrf token unknown");
            return Ok(false);
        };
        if !record.issued_to(client) {
            debug!(form = name, "csrf token issued to another client");
            return Ok(false);
        }
        self.destroy(token).await?;
        Ok(true)
    }

    /// Removes a token.
    pub async fn destroy(&self, token: &str) -> SessionResult<()> {
        self.cache.destroy(&csrf_key(token)).await?;
        Ok(())
    }

    /// Drops every token the request still carries.
    ///
    /// Cookies of other routes are removed. The cookie of `route` stays so
    /// the page can overwrite it with a fresh token.
    pub async fn clean(&self, cookies: &Cookies, route: &str) -> SessionResult<Vec<SetCookie>> {
        let prefix = format!("{CSRF_COOKIE}{SUBROUTE_DIVIDER}");
        let mut removals = Vec::new();
        for (name, token) in cookies.iter() {
            let Some(key) = name.strip_prefix(&prefix) else {
                continue;
            };
            if !token.is_empty() {
                self.destroy(token).await?;
            }
            if key != route {
                removals.push(SetCookie::remove(name));
            }
        }
        Ok(removals)
    }
}

impl std::fmt::Debug for CsrfManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn csrf_key(token: &str) -> String {
    format!("csrf:{token}")
}
