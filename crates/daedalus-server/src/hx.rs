//! Partial page updates for htmx clients.
//!
//! A request carrying `HX-Request: true` asks for a fragment, not a page.
//! [`Context::render`](crate::Context::render) skips the route layout for
//! such requests, and the handler can steer the swap on the client through
//! [`Context::hx`](crate::Context::hx).
//!
//! # Example
//!
//! ```rust
//! use daedalus_core::{DaedalusResult, Outcome};
//! use daedalus_server::hx::Swap;
//! use daedalus_server::Context;
//!
//! async fn add_comment(ctx: Context) -> DaedalusResult<Outcome> {
//!     ctx.hx(|hx| {
//!         hx.update("comments").swap(Swap::BeforeEnd);
//!         hx.trigger(["comment-added"]);
//!     });
//!     ctx.render("<li>new comment</li>")
//! }
//! ```

use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::warn;

/// Request header sent by htmx on every request it issues.
pub const REQUEST_HEADER: &str = "hx-request";

/// Request header naming the element that triggered the request.
pub const TRIGGER_REQUEST_HEADER: &str = "hx-trigger";

/// Request header naming the target element.
pub const TARGET_REQUEST_HEADER: &str = "hx-target";

const LOCATION: &str = "hx-location";
const PUSH_URL: &str = "hx-push-url";
const REDIRECT: &str = "hx-redirect";
const REFRESH: &str = "hx-refresh";
const REPLACE_URL: &str = "hx-replace-url";
const TRIGGER: &str = "hx-trigger";
const TRIGGER_AFTER_SETTLE: &str = "hx-trigger-after-settle";
const TRIGGER_AFTER_SWAP: &str = "hx-trigger-after-swap";
const RETARGET: &str = "hx-retarget";
const RESWAP: &str = "hx-reswap";

/// True when `headers` come from an htmx request.
pub fn is_hx_request(headers: &HeaderMap) -> bool {
    headers
        .get(REQUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// How the client inserts the returned fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Swap {
    /// Replace the children of the target.
    InnerHtml,
    /// Replace the target itself.
    #[default]
    OuterHtml,
    /// Insert before the target.
    BeforeBegin,
    /// Insert as the first child of the target.
    AfterBegin,
    /// Insert as the last child of the target.
    BeforeEnd,
    /// Insert after the target.
    AfterEnd,
    /// Remove the target.
    Delete,
    /// Leave the target alone.
    None,
}

impl Swap {
    /// Value of the swap in `HX-Reswap`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InnerHtml => "innerHTML",
            Self::OuterHtml => "outerHTML",
            Self::BeforeBegin => "beforebegin",
            Self::AfterBegin => "afterbegin",
            Self::BeforeEnd => "beforeend",
            Self::AfterEnd => "afterend",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Swap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response headers for an htmx client.
///
/// Nothing is sent until a field is set. The writer adds the headers to
/// whatever outcome the request ends with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HxResponse {
    location: Option<String>,
    push_url: Option<String>,
    redirect: Option<String>,
    refresh: Option<bool>,
    replace_url: Option<String>,
    trigger: Option<String>,
    trigger_after_settle: Option<String>,
    trigger_after_swap: Option<String>,
    target: Option<String>,
    swap: Option<Swap>,
    modifier: Option<String>,
}

impl HxResponse {
    /// Client-side navigation to `url` without a full reload.
    pub fn location(&mut self, url: impl Into<String>) -> &mut Self {
        self.location = Some(url.into());
        self
    }

    /// Pushes `url` onto the browser history.
    pub fn push_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.push_url = Some(url.into());
        self
    }

    /// Full client-side redirect to `url`.
    pub fn redirect(&mut self, url: impl Into<String>) -> &mut Self {
        self.redirect = Some(url.into());
        self
    }

    /// Asks the client to reload the page.
    pub fn refresh(&mut self, refresh: bool) -> &mut Self {
        self.refresh = Some(refresh);
        self
    }

    /// Replaces the current URL without a history entry.
    pub fn replace_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.replace_url = Some(url.into());
        self
    }

    /// Events fired on the client once the response arrives.
    pub fn trigger<I, S>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger = join(events);
        self
    }

    /// A single event fired with `detail` as its payload.
    pub fn trigger_detail(&mut self, event: impl Into<String>, detail: Value) -> &mut Self {
        let mut payload = Map::new();
        payload.insert(event.into(), detail);
        self.trigger = Some(Value::Object(payload).to_string());
        self
    }

    /// Events fired after the settle step.
    pub fn trigger_after_settle<I, S>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_after_settle = join(events);
        self
    }

    /// Events fired after the swap step.
    pub fn trigger_after_swap<I, S>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_after_swap = join(events);
        self
    }

    /// Retargets the swap to the element with `id`. A leading `#` is added
    /// when missing.
    pub fn update(&mut self, id: &str) -> &mut Self {
        let id = id.trim();
        self.target = Some(if id.starts_with('#') {
            id.to_string()
        } else {
            format!("#{id}")
        });
        self
    }

    /// Swap style for the retargeted element.
    pub fn swap(&mut self, swap: Swap) -> &mut Self {
        self.swap = Some(swap);
        self
    }

    /// Appends the fragment to the target.
    pub fn append(&mut self) -> &mut Self {
        self.swap(Swap::BeforeEnd)
    }

    /// Removes the target.
    pub fn delete(&mut self) -> &mut Self {
        self.swap(Swap::Delete)
    }

    /// Swap modifier such as `scroll:bottom` or `settle:1s`.
    pub fn modifier(&mut self, modifier: impl Into<String>) -> &mut Self {
        self.modifier = Some(modifier.into());
        self
    }

    /// Scrolls the target to its bottom after the swap.
    pub fn scroll_bottom(&mut self) -> &mut Self {
        self.modifier("scroll:bottom")
    }

    /// Selector the swap was retargeted to.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// True when the swap was retargeted to the element with `id`.
    pub fn targets(&self, id: &str) -> bool {
        self.target
            .as_deref()
            .and_then(|target| target.strip_prefix('#'))
            .is_some_and(|target| target == id.trim_start_matches('#'))
    }

    /// True when no header would be sent.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes the headers into `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let refresh = self.refresh.map(|r| r.to_string());
        let fields = [
            (LOCATION, self.location.as_deref()),
            (PUSH_URL, self.push_url.as_deref()),
            (REDIRECT, self.redirect.as_deref()),
            (REFRESH, refresh.as_deref()),
            (REPLACE_URL, self.replace_url.as_deref()),
            (TRIGGER, self.trigger.as_deref()),
            (TRIGGER_AFTER_SETTLE, self.trigger_after_settle.as_deref()),
            (TRIGGER_AFTER_SWAP, self.trigger_after_swap.as_deref()),
            (RETARGET, self.target.as_deref()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                insert(headers, name, value);
            }
        }

        if self.target.is_some() {
            let swap = self.swap.unwrap_or_default();
            let reswap = match &self.modifier {
                Some(modifier) => format!("{swap} {modifier}"),
                None => swap.to_string(),
            };
            insert(headers, RESWAP, &reswap);
        }
    }
}

fn join<I, S>(events: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let events: Vec<String> = events.into_iter().map(Into::into).collect();
    (!events.is_empty()).then(|| events.join(" "))
}

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(e) => warn!(header = name, error = %e, "invalid htmx header skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers_of(hx: &HxResponse) -> HeaderMap {
        let mut headers = HeaderMap::new();
        hx.apply(&mut headers);
        headers
    }

    #[test]
    fn test_detects_hx_request() {
        let mut headers = HeaderMap::new();
        assert!(!is_hx_request(&headers));
        headers.insert(REQUEST_HEADER, HeaderValue::from_static("true"));
        assert!(is_hx_request(&headers));
        headers.insert(REQUEST_HEADER, HeaderValue::from_static("false"));
        assert!(!is_hx_request(&headers));
    }

    #[test]
    fn test_empty_response_sends_nothing() {
        let hx = HxResponse::default();
        assert!(hx.is_empty());
        assert!(headers_of(&hx).is_empty());
    }

    #[test]
    fn test_update_defaults_to_outer_html() {
        let mut hx = HxResponse::default();
        hx.update("comments");
        let headers = headers_of(&hx);
        assert_eq!(headers["hx-retarget"], "#comments");
        assert_eq!(headers["hx-reswap"], "outerHTML");
        assert!(hx.targets("comments"));
        assert!(hx.targets("#comments"));
        assert!(!hx.targets("posts"));
    }

    #[test]
    fn test_swap_with_modifier() {
        let mut hx = HxResponse::default();
        hx.update("#chat").append().scroll_bottom();
        let headers = headers_of(&hx);
        assert_eq!(headers["hx-retarget"], "#chat");
        assert_eq!(headers["hx-reswap"], "beforeend scroll:bottom");
    }

    #[test]
    fn test_swap_without_target_is_not_sent() {
        let mut hx = HxResponse::default();
        hx.delete();
        assert!(!headers_of(&hx).contains_key("hx-reswap"));
    }

    #[test]
    fn test_history_and_triggers() {
        let mut hx = HxResponse::default();
        hx.push_url("/blog/2")
            .refresh(false)
            .trigger(["saved", "closed"])
            .trigger_after_swap(["focus"]);
        let headers = headers_of(&hx);
        assert_eq!(headers["hx-push-url"], "/blog/2");
        assert_eq!(headers["hx-refresh"], "false");
        assert_eq!(headers["hx-trigger"], "saved closed");
        assert_eq!(headers["hx-trigger-after-swap"], "focus");
        assert!(!headers.contains_key("hx-redirect"));
    }

    #[test]
    fn test_trigger_detail_is_json() {
        let mut hx = HxResponse::default();
        hx.trigger_detail("saved", json!({ "id": 7 }));
        let headers = headers_of(&hx);
        let value: Value = serde_json::from_slice(headers["hx-trigger"].as_bytes()).unwrap();
        assert_eq!(value, json!({ "saved": { "id": 7 } }));
    }

    #[test]
    fn test_invalid_value_is_skipped() {
        let mut hx = HxResponse::default();
        hx.redirect("/bad\nurl").location("/ok");
        let headers = headers_of(&hx);
        assert!(!headers.contains_key("hx-redirect"));
        assert_eq!(headers["hx-location"], "/ok");
    }
}
