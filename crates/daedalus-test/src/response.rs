//! Test response wrapper.

use std::fmt;

use bytes::Bytes;
use daedalus_server::HttpResponse;
use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

use crate::error::TestError;

/// One `Set-Cookie` of a response, reduced to what tests look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Whether the cookie deletes the client's copy.
    pub removal: bool,
}

impl ResponseCookie {
    fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;
        let expired = parts.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
            removal: expired || value.is_empty(),
        })
    }
}

/// A collected response with helpers for assertions.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects a response produced by [`App::handle`].
    ///
    /// [`App::handle`]: daedalus_server::App::handle
    pub async fn from_http(response: HttpResponse) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    /// Creates a test response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true for `301`, `302`, `303`, `307` and `308`.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(CONTENT_TYPE.as_str())
    }

    /// Redirect target.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(LOCATION.as_str())
    }

    /// Every `Set-Cookie` in order.
    #[must_use]
    pub fn cookies(&self) -> Vec<ResponseCookie> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(ResponseCookie::parse)
            .collect()
    }

    /// The last `Set-Cookie` named `name`.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<ResponseCookie> {
        self.cookies().into_iter().rev().find(|c| c.name == name)
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    // Assertion methods

    /// Asserts that the status code equals the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "expected status {expected}, got {}",
            self.status
        );
        self
    }

    /// Asserts that the response is successful (2xx).
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.is_success(),
            "expected success status, got {}",
            self.status
        );
        self
    }

    /// Asserts a redirect to `location`.
    ///
    /// # Panics
    ///
    /// Panics if the response is not a redirect or points elsewhere.
    pub fn assert_redirect(&self, location: impl AsRef<str>) -> &Self {
        assert!(self.is_redirect(), "expected a redirect, got {}", self.status);
        assert_eq!(self.location(), Some(location.as_ref()), "redirect target mismatch");
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("header '{name}' not found"));
        assert_eq!(actual, expected.as_ref(), "header '{name}' mismatch");
        self
    }

    /// Asserts that a cookie named `name` was set, and not removed.
    ///
    /// # Panics
    ///
    /// Panics if no such cookie was set.
    pub fn assert_cookie(&self, name: &str) -> &Self {
        match self.cookie(name) {
            Some(cookie) => assert!(!cookie.removal, "cookie '{name}' was removed"),
            None => panic!("cookie '{name}' not set"),
        }
        self
    }

    /// Asserts that the body contains the expected substring.
    ///
    /// # Panics
    ///
    /// Panics if the body doesn't contain the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(
            body.contains(expected),
            "body should contain '{expected}', got: {body}"
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, cookies: &[&'static str], body: &'static str) -> TestResponse {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(SET_COOKIE, HeaderValue::from_static(cookie));
        }
        TestResponse::new(StatusCode::from_u16(status).unwrap(), headers, Bytes::from(body))
    }

    #[test]
    fn test_cookie_parsing() {
        let response = response(
            200,
            &[
                "X-Lang=cs; Path=/; Max-Age=31536000",
                "X-Session=; Path=/; Max-Age=0",
                "X-Lang=en; Path=/",
            ],
            "",
        );
        assert_eq!(response.cookies().len(), 3);
        assert_eq!(response.cookie("X-Lang").unwrap().value, "en");
        assert!(response.cookie("X-Session").unwrap().removal);
        response.assert_cookie("X-Lang");
    }

    #[test]
    fn test_redirect() {
        let mut response = response(301, &[], "");
        response
            .headers
            .insert(LOCATION, HeaderValue::from_static("/blog"));
        assert!(response.is_redirect());
        response.assert_redirect("/blog");
    }

    #[test]
    fn test_text_and_json() {
        let response = response(200, &[], r#"{"page":3}"#);
        response.assert_success().assert_body_contains("page");
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["page"], 3);
    }

    #[test]
    #[should_panic(expected = "cookie 'X-Session' not set")]
    fn test_assert_cookie_missing() {
        response(200, &[], "").assert_cookie("X-Session");
    }
}
