//! Test request building.

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, COOKIE, HOST, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use serde::Serialize;

use crate::error::TestError;

/// A built test request.
#[derive(Debug)]
pub struct TestRequest {
    /// HTTP method
    pub method: Method,
    /// Request URI
    pub uri: Uri,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Bytes,
}

impl TestRequest {
    /// Creates a new GET request.
    pub fn get(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::GET, uri)
    }

    /// Creates a new POST request.
    pub fn post(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::POST, uri)
    }

    /// Creates a new PUT request.
    pub fn put(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PUT, uri)
    }

    /// Creates a new PATCH request.
    pub fn patch(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::PATCH, uri)
    }

    /// Creates a new DELETE request.
    pub fn delete(uri: impl AsRef<str>) -> TestRequestBuilder {
        TestRequestBuilder::new(Method::DELETE, uri)
    }

    /// Converts this request into the form [`App::handle`] takes.
    ///
    /// [`App::handle`]: daedalus_server::App::handle
    pub fn into_http_request(self) -> Request<Bytes> {
        let mut request = Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        request
    }
}

/// Builder for constructing test requests.
///
/// Invalid input is remembered and reported by [`build`](Self::build).
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    cookies: Vec<(String, String)>,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header on the request.
    ///
    /// # Example
    ///
    /// ```rust
    /// use daedalus_test::TestRequest;
    ///
    /// let request = TestRequest::get("/blog")
    ///     .header("X-Secret", "s3cret")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(request.headers["x-secret"], "s3cret");
    /// ```
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(TestError::InvalidHeader(e.to_string())),
            (_, Err(e)) => self.fail(TestError::InvalidHeader(e.to_string())),
        }
        self
    }

    /// Sets a typed header on the request.
    pub fn header_typed(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Sets the Accept header.
    pub fn accept(self, accept: impl AsRef<str>) -> Self {
        self.header(ACCEPT.as_str(), accept)
    }

    /// Sets the User-Agent header.
    pub fn user_agent(self, user_agent: impl AsRef<str>) -> Self {
        self.header(USER_AGENT.as_str(), user_agent)
    }

    /// Sets the Host header.
    pub fn host(self, host: impl AsRef<str>) -> Self {
        self.header(HOST.as_str(), host)
    }

    /// Adds a cookie. Cookies are joined into one `Cookie` header.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.cookies.retain(|(n, _)| *n != name);
        self.cookies.push((name, value.into()));
        self
    }

    /// Appends a query parameter, percent-encoded.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the request body as JSON.
    ///
    /// This also sets the `Content-Type` header to `application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.fail(e.into()),
        }
        self.content_type("application/json")
    }

    /// Sets the request body as form-urlencoded.
    ///
    /// This also sets the `Content-Type` header to
    /// `application/x-www-form-urlencoded`.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => self.body = Some(Bytes::from(encoded)),
            Err(e) => self.fail(e.into()),
        }
        self.content_type("application/x-www-form-urlencoded")
    }

    /// Builds the test request.
    pub fn build(mut self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let uri = self.full_uri();
        let uri: Uri = uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("invalid URI '{uri}': {e}")))?;

        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            let value = HeaderValue::try_from(header)
                .map_err(|e| TestError::InvalidHeader(e.to_string()))?;
            self.headers.insert(COOKIE, value);
        }

        Ok(TestRequest {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        })
    }

    /// Whether a header was set explicitly.
    pub(crate) fn has_header(&self, name: &HeaderName) -> bool {
        self.headers.contains_key(name)
    }

    /// Whether a cookie was set explicitly.
    pub(crate) fn has_cookie(&self, name: &str) -> bool {
        self.cookies.iter().any(|(n, _)| n == name)
    }

    fn full_uri(&self) -> String {
        if self.query.is_empty() {
            return self.uri.clone();
        }
        let encoded = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let divider = if self.uri.contains('?') { '&' } else { '?' };
        format!("{}{divider}{encoded}", self.uri)
    }

    fn fail(&mut self, error: TestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_is_encoded_and_appended() {
        let request = TestRequest::get("/blog?page=2")
            .query("q", "a b&c")
            .build()
            .unwrap();
        assert_eq!(request.uri, "/blog?page=2&q=a%20b%26c");

        let request = TestRequest::get("/blog").query("page", 3).build().unwrap();
        assert_eq!(request.uri, "/blog?page=3");
    }

    #[test]
    fn test_cookies_join_into_one_header() {
        let request = TestRequest::get("/")
            .cookie("X-Lang", "cs")
            .cookie("X-Session", "abc")
            .cookie("X-Lang", "en")
            .build()
            .unwrap();
        assert_eq!(request.headers[COOKIE], "X-Session=abc; X-Lang=en");
    }

    #[test]
    fn test_form_body() {
        let request = TestRequest::post("/login")
            .form(&[("email", "ada@example.com"), ("csrf-name", "login")])
            .build()
            .unwrap();
        assert_eq!(
            request.headers[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(request.body, "email=ada%40example.com&csrf-name=login");
    }

    #[test]
    fn test_json_body() {
        let request = TestRequest::post("/api")
            .json(&json!({"name": "Ada"}))
            .build()
            .unwrap();
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.body, r#"{"name":"Ada"}"#);
    }

    #[test]
    fn test_invalid_header_fails_build() {
        let result = TestRequest::get("/").header("bad header", "x").build();
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }

    #[test]
    fn test_invalid_uri_fails_build() {
        let result = TestRequest::get("not a uri").build();
        assert!(matches!(result, Err(TestError::RequestBuild(_))));
    }

    #[test]
    fn test_into_http_request() {
        let request = TestRequest::put("/items/1")
            .body("data")
            .build()
            .unwrap()
            .into_http_request();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri().path(), "/items/1");
        assert_eq!(request.body(), "data");
    }
}
