//! Test client for in-memory HTTP testing.

use daedalus_server::App;
use http::header::{HOST, USER_AGENT};
use http::Method;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_USER_AGENT: &str = "daedalus-test";

/// A client that sends requests straight into an [`App`].
///
/// Requests run the full lifecycle (routing, middlewares, firewall,
/// handler) without binding a port. Like a browser, the client keeps the
/// cookies responses set and sends them back, so sessions and component
/// state carry over between requests.
///
/// # Example
///
/// ```rust
/// use daedalus_router::RouteBuilder;
/// use daedalus_server::{handler, App, Context};
/// use daedalus_test::TestClient;
///
/// async fn hello(_ctx: Context) -> &'static str {
///     "hello"
/// }
///
/// # tokio_test::block_on(async {
/// let app = App::builder()
///     .route(RouteBuilder::new().name("hello").get("/hello").handler(handler(hello)))
///     .build()
///     .unwrap();
///
/// let client = TestClient::new(app);
/// let response = client.get("/hello").send().await;
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.text().unwrap(), "hello");
/// # });
/// ```
#[must_use]
pub struct TestClient {
    app: App,
    default_headers: Vec<(String, String)>,
    jar: Mutex<IndexMap<String, String>>,
}

impl TestClient {
    /// Creates a client for `app`.
    pub fn new(app: App) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
            jar: Mutex::new(IndexMap::new()),
        }
    }

    /// The application under test.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Adds a default header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Cookie currently held for `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.jar.lock().get(name).cloned()
    }

    /// Puts a cookie into the jar.
    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.jar.lock().insert(name.into(), value.into());
    }

    /// Forgets every cookie.
    pub fn clear_cookies(&self) {
        self.jar.lock().clear();
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    async fn send_internal(
        &self,
        mut builder: TestRequestBuilder,
    ) -> Result<TestResponse, TestError> {
        if !builder.has_header(&HOST) {
            builder = builder.host(DEFAULT_HOST);
        }
        if !builder.has_header(&USER_AGENT) {
            builder = builder.user_agent(DEFAULT_USER_AGENT);
        }
        let jar: Vec<(String, String)> = self
            .jar
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in jar {
            if !builder.has_cookie(&name) {
                builder = builder.cookie(name, value);
            }
        }

        let request = builder.build()?.into_http_request();
        let response = TestResponse::from_http(self.app.handle(request).await).await?;
        self.store_cookies(&response);
        Ok(response)
    }

    fn store_cookies(&self, response: &TestResponse) {
        let mut jar = self.jar.lock();
        for cookie in response.cookies() {
            if cookie.removal {
                jar.shift_remove(&cookie.name);
            } else {
                jar.insert(cookie.name, cookie.value);
            }
        }
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("default_headers", &self.default_headers)
            .field("cookies", &self.jar.lock().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a test client.
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl AsRef<str>) -> Self {
        self.builder = self.builder.user_agent(user_agent);
        self
    }

    /// Sends a cookie, overriding the jar for this request.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.cookie(name, value);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the request body as form-urlencoded.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        self.client.send_internal(self.builder).await
    }
}

impl std::fmt::Debug for TestClientRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClientRequest")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_core::{DaedalusResult, Outcome};
    use daedalus_router::RouteBuilder;
    use daedalus_server::{handler, Context};
    use daedalus_session::SessionUser;
    use http::StatusCode;

    async fn whoami(ctx: Context) -> DaedalusResult<String> {
        Ok(match ctx.session().await? {
            Some(session) => session.email,
            None => "anonymous".to_string(),
        })
    }

    async fn signin(ctx: Context) -> DaedalusResult<Outcome> {
        let email = ctx.form_value("email").unwrap_or_default().to_string();
        ctx.login(SessionUser {
            id: 7,
            email,
            roles: Vec::new(),
        })
        .await?;
        Ok(Outcome::redirect("/whoami"))
    }

    async fn signout(ctx: Context) -> DaedalusResult<Outcome> {
        ctx.logout().await?;
        Ok(Outcome::redirect("/whoami"))
    }

    async fn agent(ctx: Context) -> String {
        format!(
            "{} {}",
            ctx.header("user-agent").unwrap_or_default(),
            ctx.host()
        )
    }

    fn client() -> TestClient {
        let app = App::builder()
            .routes([
                RouteBuilder::new().name("whoami").get("/whoami").handler(handler(whoami)),
                RouteBuilder::new().name("signin").post("/signin").handler(handler(signin)),
                RouteBuilder::new().name("signout").get("/signout").handler(handler(signout)),
                RouteBuilder::new().name("agent").get("/agent").handler(handler(agent)),
            ])
            .build()
            .unwrap();
        TestClient::new(app)
    }

    #[tokio::test]
    async fn test_default_host_and_agent() {
        let response = client().get("/agent").send().await;
        assert_eq!(response.text().unwrap(), "daedalus-test localhost");
    }

    #[tokio::test]
    async fn test_default_header_override() {
        let client = client().with_default_header("User-Agent", "Opera");
        let response = client.get("/agent").send().await;
        assert_eq!(response.text().unwrap(), "Opera localhost");
    }

    #[tokio::test]
    async fn test_session_cookie_carries_over() {
        let client = client();
        client
            .get("/whoami")
            .send()
            .await
            .assert_body_contains("anonymous");

        client
            .post("/signin")
            .form(&[("email", "ada@example.com")])
            .send()
            .await
            .assert_status(StatusCode::FOUND)
            .assert_cookie("X-Session");
        assert!(client.cookie("X-Session").is_some());

        let response = client.get("/whoami").send().await;
        assert_eq!(response.text().unwrap(), "ada@example.com");

        client.get("/signout").send().await.assert_redirect("/whoami");
        assert!(client.cookie("X-Session").is_none());
        client
            .get("/whoami")
            .send()
            .await
            .assert_body_contains("anonymous");
    }

    #[tokio::test]
    async fn test_not_found() {
        let response = client().get("/missing").send().await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_request_is_error() {
        let result = client().get("/agent").header("bad header", "x").try_send().await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}
