//! Authenticated sessions.

use std::time::Duration;

use daedalus_cache::{Cache, CacheExt, SharedCache};
use daedalus_config::SecurityConfig;
use daedalus_core::names::SESSION_COOKIE;
use daedalus_core::{new_token, Cookies, Fingerprint, SetCookie};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionResult;

/// Lifetime used when the configuration asks for zero.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const SESSION_KEY: &str = "session";
const DESTROY_TTL: Duration = Duration::from_millis(1);

/// The user a session is opened for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUser {
    /// User id.
    pub id: i64,
    /// Login email.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
}

/// A stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// User id.
    pub id: i64,
    /// Login email.
    pub email: String,
    /// Granted roles.
    pub roles: Vec<String>,
    /// True when one of the roles is a super role.
    #[serde(rename = "super")]
    pub is_super: bool,
    /// Address the session was opened from.
    pub ip: String,
    /// User agent the session was opened with.
    pub user_agent: String,
}

impl Session {
    /// True when the session holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Opens, reads, renews and closes sessions.
///
/// # Example
///
/// ```rust
/// use daedalus_cache::{MemoryCache, SharedCache};
/// use daedalus_config::SecurityConfig;
/// use daedalus_core::{Cookies, Fingerprint};
/// use daedalus_session::{SessionManager, SessionUser};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let cache: SharedCache = Arc::new(MemoryCache::new());
/// let sessions = SessionManager::new(cache, &SecurityConfig::default());
/// let client = Fingerprint::default();
///
/// let user = SessionUser { id: 7, email: "ada@example.com".into(), roles: vec![] };
/// let (_, cookie) = sessions.create(user, &client).await.unwrap();
///
/// let cookies = Cookies::parse(&format!("X-Session={}", cookie.value()));
/// let session = sessions.get(&cookies).await.unwrap().unwrap();
/// assert_eq!(session.id, 7);
/// # });
/// ```
#[derive(Clone)]
pub struct SessionManager {
    cache: SharedCache,
    ttl: Duration,
    super_roles: Vec<String>,
}

impl SessionManager {
    /// Creates a manager using the session and role settings.
    pub fn new(cache: SharedCache, security: &SecurityConfig) -> Self {
        let mut ttl = security.session.duration();
        if ttl.is_zero() {
            ttl = DEFAULT_SESSION_TTL;
        }
        Self {
            cache,
            ttl,
            super_roles: security.super_roles().map(str::to_string).collect(),
        }
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Token from the request cookies.
    pub fn token<'a>(&self, cookies: &'a Cookies) -> Option<&'a str> {
        cookies.get(SESSION_COOKIE).filter(|token| !token.is_empty())
    }

    /// True when the request carries a live session.
    pub async fn exists(&self, cookies: &Cookies) -> SessionResult<bool> {
        match self.token(cookies) {
            Some(token) => Ok(self.cache.exists(&session_key(token)).await?),
            None => Ok(false),
        }
    }

    /// Reads the session of the request.
    pub async fn get(&self, cookies: &Cookies) -> SessionResult<Option<Session>> {
        match self.token(cookies) {
            Some(token) => Ok(self.cache.get_json(&session_key(token)).await?),
            None => Ok(None),
        }
    }

    /// Opens a session for `user` and returns it with its cookie.
    pub async fn create(
        &self,
        user: SessionUser,
        client: &Fingerprint,
    ) -> SessionResult<(Session, SetCookie)> {
        let is_super = user
            .roles
            .iter()
            .any(|role| self.super_roles.contains(role));
        let session = Session {
            id: user.id,
            email: user.email,
            roles: user.roles,
            is_super,
            ip: client.ip.clone(),
            user_agent: client.user_agent.clone(),
        };

        let token = new_token();
        self.cache
            .set_json(&session_key(&token), &session, self.ttl)
            .await?;
        debug!(user = session.id, "session created");
        Ok((session, SetCookie::site(SESSION_COOKIE, token, self.ttl)))
    }

    /// Extends the session of the request.
    ///
    /// Refused when the session was opened from another address or user
    /// agent.
    pub async fn renew(
        &self,
        cookies: &Cookies,
        client: &Fingerprint,
    ) -> SessionResult<Option<SetCookie>> {
        let Some(token) = self.token(cookies) else {
            return Ok(None);
        };
        let Some(session) = self.get(cookies).await? else {
            return Ok(None);
        };
        if session.ip != client.ip || session.user_agent != client.user_agent {
            debug!(user = session.id, "session renew refused for another client");
            return Ok(None);
        }
        self.cache
            .set_json(&session_key(token), &session, self.ttl)
            .await?;
        Ok(Some(SetCookie::site(SESSION_COOKIE, token, self.ttl)))
    }

    /// Closes the session of the request and returns the removal cookie.
    pub async fn destroy(&self, cookies: &Cookies) -> SessionResult<SetCookie> {
        if let Some(token) = self.token(cookies) {
            self.cache
                .set(&session_key(token), String::new(), DESTROY_TTL)
                .await?;
        }
        Ok(SetCookie::remove(SESSION_COOKIE))
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("super_roles", &self.super_roles)
            .finish_non_exhaustive()
    }
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY}:{token}")
}
