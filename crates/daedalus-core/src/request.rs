//! Request identification.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::names;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate and sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client properties bound to server-side state.
///
/// Stored alongside component state, sessions and CSRF tokens. A record
/// whose fingerprint differs from the current request is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Active language code.
    pub lang: String,
    /// Client address.
    pub ip: String,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl Fingerprint {
    /// Builds a fingerprint from the request headers and the active language.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ip: client_ip(headers),
            user_agent: headers
                .get(http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Compares client address and user agent, ignoring the language.
    #[must_use]
    pub fn same_client(&self, other: &Self) -> bool {
        self.ip == other.ip && self.user_agent == other.user_agent
    }
}

/// Client address from `X-Forwarded-For`, then `X-Real-Ip`.
///
/// Falls back to `localhost` when neither header is present.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get(names::FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get(names::REAL_IP_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        let ip = real_ip.trim();
        if !ip.is_empty() {
            return ip.to_string();
        }
    }

    "localhost".to_string()
}

/// Mints an opaque, URL-safe token for cookies and cache keys.
///
/// 32 random bytes, base64 encoded without padding.
#[must_use]
pub fn new_token() -> String {
    let mut bytes = [0_u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}
