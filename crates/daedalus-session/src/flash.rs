//! Flash messages carried to the next page view.

use std::fmt;
use std::time::Duration;

use daedalus_cache::{Cache, CacheExt, SharedCache};
use daedalus_core::names::FLASH_COOKIE;
use daedalus_core::{new_token, Cookies, SetCookie};
use serde::{Deserialize, Serialize};

use crate::error::SessionResult;

/// How long stored messages wait for the next page view.
pub const FLASH_TTL: Duration = Duration::from_secs(60 * 60);

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    /// Something worked.
    Success,
    /// Something needs attention.
    Warning,
    /// Something failed.
    Error,
}

impl fmt::Display for FlashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    /// Severity.
    #[serde(rename = "type")]
    pub kind: FlashKind,
    /// Headline.
    pub title: String,
    /// Optional detail, empty if none.
    pub subtitle: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredMessages {
    messages: Vec<FlashMessage>,
}

/// Messages collected during one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    messages: Vec<FlashMessage>,
}

impl Flash {
    /// Empty message list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a success message.
    pub fn success(&mut self, title: impl Into<String>, subtitle: impl Into<String>) -> &mut Self {
        self.push(FlashKind::Success, title, subtitle)
    }

    /// Adds a warning.
    pub fn warning(&mut self, title: impl Into<String>, subtitle: impl Into<String>) -> &mut Self {
        self.push(FlashKind::Warning, title, subtitle)
    }

    /// Adds an error message built from `error`.
    pub fn error(
        &mut self,
        error: &dyn std::error::Error,
        subtitle: impl Into<String>,
    ) -> &mut Self {
        self.push(FlashKind::Error, error.to_string(), subtitle)
    }

    fn push(
        &mut self,
        kind: FlashKind,
        title: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> &mut Self {
        self.messages.push(FlashMessage {
            kind,
            title: title.into(),
            subtitle: subtitle.into(),
        });
        self
    }

    /// Collected messages.
    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    /// True when nothing was added.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Moves flash messages between requests.
///
/// # Example
///
/// ```rust
/// use daedalus_cache::{MemoryCache, SharedCache};
/// use daedalus_core::Cookies;
/// use daedalus_session::{Flash, FlashStore};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let cache: SharedCache = Arc::new(MemoryCache::new());
/// let store = FlashStore::new(cache);
///
/// let mut flash = Flash::new();
/// flash.success("Saved", "");
/// let cookie = store.store(&flash).await.unwrap().unwrap();
///
/// let cookies = Cookies::parse(&format!("X-Flash={}", cookie.value()));
/// let (messages, _) = store.take(&cookies).await.unwrap();
/// assert_eq!(messages[0].title, "Saved");
///
/// let (again, _) = store.take(&cookies).await.unwrap();
/// assert!(again.is_empty());
/// # });
/// ```
#[derive(Clone)]
pub struct FlashStore {
    cache: SharedCache,
}

impl FlashStore {
    /// Creates a store.
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }

    /// Persists the collected messages under a fresh token.
    ///
    /// Returns `None` when there is nothing to store.
    pub async fn store(&self, flash: &Flash) -> SessionResult<Option<SetCookie>> {
        if flash.is_empty() {
            return Ok(None);
        }
        let token = new_token();
        let stored = StoredMessages {
            messages: flash.messages.clone(),
        };
        self.cache
            .set_json(&flash_key(&token), &stored, FLASH_TTL)
            .await?;
        Ok(Some(SetCookie::site(FLASH_COOKIE, token, FLASH_TTL)))
    }

    /// Reads and consumes the messages referenced by the request.
    ///
    /// The returned cookie removes the flash token from the client.
    pub async fn take(&self, cookies: &Cookies) -> SessionResult<(Vec<FlashMessage>, Option<SetCookie>)> {
        let Some(token) = cookies.get(FLASH_COOKIE).filter(|t| !t.is_empty()) else {
            return Ok((Vec::new(), None));
        };
        let key = flash_key(token);
        let stored: Option<StoredMessages> = self.cache.get_json(&key).await?;
        self.cache.destroy(&key).await?;
        let messages = stored.map(|s| s.messages).unwrap_or_default();
        Ok((messages, Some(SetCookie::remove(FLASH_COOKIE))))
    }
}

impl fmt::Debug for FlashStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashStore").finish_non_exhaustive()
    }
}

fn flash_key(token: &str) -> String {
    format!("flash:{token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_cache::MemoryCache;
    use std::sync::Arc;

    fn store() -> FlashStore {
        FlashStore::new(Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_flash_collects_kinds() {
        let mut flash = Flash::new();
        let failure = std::io::Error::other("disk full");
        flash
            .success("Saved", "")
            .warning("Check input", "email")
            .error(&failure, "upload");

        let kinds: Vec<_> = flash.messages().iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            [FlashKind::Success, FlashKind::Warning, FlashKind::Error]
        );
        assert_eq!(flash.messages()[2].title, "disk full");
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let message = FlashMessage {
            kind: FlashKind::Warning,
            title: "t".into(),
            subtitle: String::new(),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""type":"warning""#));
    }

    #[tokio::test]
    async fn test_empty_flash_not_stored() {
        assert!(store().store(&Flash::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_take_without_cookie() {
        let (messages, cookie) = store().take(&Cookies::new()).await.unwrap();
        assert!(messages.is_empty());
        assert!(cookie.is_none());
    }

    #[tokio::test]
    async fn test_take_consumes_messages() {
        let store = store();
        let mut flash = Flash::new();
        flash.success("Created", "article");
        let cookie = store.store(&flash).await.unwrap().unwrap();
        assert_eq!(cookie.name(), "X-Flash");

        let cookies = Cookies::parse(&format!("X-Flash={}", cookie.value()));
        let (messages, removal) = store.take(&cookies).await.unwrap();
        assert_eq!(messages, flash.messages());
        assert!(removal.unwrap().is_removal());

        let (again, _) = store.take(&cookies).await.unwrap();
        assert!(again.is_empty());
    }
}
