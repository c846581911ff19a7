//! Middleware context types.
//!
//! The [`MiddlewareContext`] is a snapshot of the request taken after the
//! route was matched. Middlewares read it and queue the cookies the
//! response must carry.

use daedalus_core::{Cookies, Fingerprint, SetCookie};
use http::Method;

/// Request data visible to middlewares.
///
/// # Example
///
/// ```
/// use daedalus_middleware::MiddlewareContext;
/// use daedalus_core::SetCookie;
/// use http::Method;
///
/// let mut ctx = MiddlewareContext::new(Method::POST, "/contact?sent=1")
///     .with_route("contact")
///     .with_form(vec![("csrf-token".into(), "abc".into())]);
///
/// assert_eq!(ctx.path(), "/contact");
/// assert_eq!(ctx.form_value("csrf-token"), Some("abc"));
///
/// ctx.add_cookie(SetCookie::remove("X-Flash"));
/// assert_eq!(ctx.take_cookies().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MiddlewareContext {
    method: Method,
    uri: String,
    route: String,
    action: bool,
    cookies: Cookies,
    client: Fingerprint,
    form: Vec<(String, String)>,
    set_cookies: Vec<SetCookie>,
}

impl MiddlewareContext {
    /// Creates a context for `method` and `uri` (path plus query).
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            route: String::new(),
            action: false,
            cookies: Cookies::new(),
            client: Fingerprint::default(),
            form: Vec::new(),
            set_cookies: Vec::new(),
        }
    }

    /// Sets the matched route name.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Marks the request as a component action.
    #[must_use]
    pub fn with_action(mut self, action: bool) -> Self {
        self.action = action;
        self
    }

    /// Sets the request cookies.
    #[must_use]
    pub fn with_cookies(mut self, cookies: Cookies) -> Self {
        self.cookies = cookies;
        self
    }

    /// Sets the client fingerprint.
    #[must_use]
    pub fn with_client(mut self, client: Fingerprint) -> Self {
        self.client = client;
        self
    }

    /// Sets the parsed form fields.
    #[must_use]
    pub fn with_form(mut self, form: Vec<(String, String)>) -> Self {
        self.form = form;
        self
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path plus query, as requested.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Path without the query.
    pub fn path(&self) -> &str {
        self.uri.split_once('?').map_or(self.uri.as_str(), |(p, _)| p)
    }

    /// Matched route name.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// True for component action requests.
    pub fn is_action(&self) -> bool {
        self.action
    }

    /// Request cookies.
    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// Client fingerprint.
    pub fn client(&self) -> &Fingerprint {
        &self.client
    }

    /// First form value named `name`.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Queues a cookie for the response.
    pub fn add_cookie(&mut self, cookie: SetCookie) {
        self.set_cookies.push(cookie);
    }

    /// Takes the queued cookies.
    pub fn take_cookies(&mut self) -> Vec<SetCookie> {
        std::mem::take(&mut self.set_cookies)
    }
}
