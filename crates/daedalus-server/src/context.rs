//! The per-request handler context.
//!
//! A [`Context`] is created once the route has matched and every pre-dispatch
//! step has passed. It is cheap to clone: the request data is shared behind an
//! `Arc` and the response cell is shared with the lifecycle, so a status or
//! cookie set through any clone reaches the final response.

use std::sync::Arc;

use bytes::Bytes;
use daedalus_cache::SharedCache;
use daedalus_config::DaedalusConfig;
use daedalus_core::names::{ACTION_PARAM, LANG_COOKIE};
use daedalus_core::{
    Container, Cookies, DaedalusError, DaedalusResult, Fingerprint, Outcome, RequestId, SetCookie,
};
use daedalus_router::Route;
use daedalus_session::{Flash, FlashMessage, Session, SessionUser};
use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use indexmap::IndexMap;

use crate::app::AppState;
use crate::generator::{Generator, Link};
use crate::handler::BoxedHandler;
use crate::hx::HxResponse;
use crate::render::BoxedRenderer;
use crate::writer::SharedResponse;

const NO_ARGS: [(&str, &str); 0] = [];

/// The matched route, as seen by handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedRoute {
    name: String,
    path: String,
    module: String,
    controller: String,
    layout: String,
    language: Option<String>,
}

impl MatchedRoute {
    pub(crate) fn from_route<H>(route: &Route<H>) -> Self {
        Self {
            name: route.name().to_string(),
            path: route.path().to_string(),
            module: route.module().to_string(),
            controller: route.controller().to_string(),
            layout: route.layout().to_string(),
            language: route.language().map(str::to_string),
        }
    }

    /// Qualified route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Module scope, empty outside any module.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Controller scope, empty outside any controller.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Layout the page renders into.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Language of a localized route.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Everything the lifecycle learned about the request before dispatch.
#[derive(Debug)]
pub(crate) struct RequestData {
    pub(crate) request_id: RequestId,
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) form: Vec<(String, String)>,
    pub(crate) cookies: Cookies,
    pub(crate) client: Fingerprint,
    pub(crate) route: MatchedRoute,
    pub(crate) vars: IndexMap<String, String>,
    pub(crate) lang: String,
    pub(crate) hx: bool,
}

impl RequestData {
    pub(crate) fn new(method: Method, uri: Uri) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            query: Vec::new(),
            form: Vec::new(),
            cookies: Cookies::new(),
            client: Fingerprint::default(),
            route: MatchedRoute::default(),
            vars: IndexMap::new(),
            lang: String::new(),
            hx: false,
        }
    }
}

/// The request as handed to handlers and components.
///
/// # Example
///
/// ```rust
/// use daedalus_core::{DaedalusResult, Outcome};
/// use daedalus_server::Context;
///
/// async fn detail(ctx: Context) -> DaedalusResult<Outcome> {
///     let id = ctx.var("id").unwrap_or_default();
///     let back = ctx.link("blog");
///     ctx.render(format!("<a href=\"{back}\">back</a> post {id}"))
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    app: Arc<AppState>,
    request: Arc<RequestData>,
    response: SharedResponse,
}

impl Context {
    pub(crate) fn new(app: Arc<AppState>, request: RequestData, response: SharedResponse) -> Self {
        Self {
            app,
            request: Arc::new(request),
            response,
        }
    }

    // Request

    /// Identifier of this request, as logged.
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.request.uri
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.request.uri.path()
    }

    /// First query value named `name`.
    pub fn query(&self, name: &str) -> Option<&str> {
        find(&self.request.query, name)
    }

    /// All query pairs in request order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.request.query
    }

    /// A request header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.request.headers
    }

    /// The `Host` header, empty when absent.
    pub fn host(&self) -> &str {
        self.request
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Raw request body.
    pub fn body(&self) -> &Bytes {
        &self.request.body
    }

    /// First form value named `name`.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        find(&self.request.form, name)
    }

    /// Parsed `application/x-www-form-urlencoded` body.
    pub fn form(&self) -> &[(String, String)] {
        &self.request.form
    }

    /// Request cookies.
    pub fn cookies(&self) -> &Cookies {
        &self.request.cookies
    }

    /// A request cookie.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.request.cookies.get(name)
    }

    /// Language, address and user agent of the caller.
    pub fn client(&self) -> &Fingerprint {
        &self.request.client
    }

    /// True for partial-update requests sent by htmx.
    pub fn is_hx(&self) -> bool {
        self.request.hx
    }

    /// True when the request invokes a component action.
    pub fn is_action(&self) -> bool {
        self.query(ACTION_PARAM).is_some()
    }

    // Route

    /// The matched route.
    pub fn route(&self) -> &MatchedRoute {
        &self.request.route
    }

    /// A path variable.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.request.vars.get(name).map(String::as_str)
    }

    /// All path variables in template order.
    pub fn vars(&self) -> &IndexMap<String, String> {
        &self.request.vars
    }

    /// Active language, empty when no languages are configured.
    pub fn lang(&self) -> &str {
        &self.request.lang
    }

    // Application

    /// Application configuration.
    pub fn config(&self) -> &DaedalusConfig {
        &self.app.config
    }

    /// Dependency container.
    pub fn container(&self) -> &Container {
        &self.app.container
    }

    /// Resolves a registered dependency.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> DaedalusResult<Arc<T>> {
        Ok(self.app.container.resolve_required::<T>()?)
    }

    /// Shared cache.
    pub fn cache(&self) -> &SharedCache {
        &self.app.cache
    }

    // Response

    /// Status recorded so far.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.lock().status
    }

    /// Records the response status.
    ///
    /// Outcomes without an explicit status use it, and so does the error
    /// response after a handler panic.
    pub fn set_status(&self, status: StatusCode) {
        self.response.lock().status = Some(status);
    }

    /// Sets a response header.
    pub fn set_header(&self, name: &str, value: &str) -> DaedalusResult<()> {
        let name = HeaderName::try_from(name)
            .map_err(|e| DaedalusError::internal_with_source("invalid header name", e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DaedalusError::internal_with_source("invalid header value", e))?;
        self.response.lock().headers.insert(name, value);
        Ok(())
    }

    /// Adjusts the htmx response headers.
    pub fn hx(&self, update: impl FnOnce(&mut HxResponse)) {
        update(&mut self.response.lock().hx);
    }

    /// Queues a cookie for the response.
    pub fn add_cookie(&self, cookie: SetCookie) {
        self.response.lock().cookies.push(cookie);
    }

    #[cfg(test)]
    pub(crate) fn queued_cookies(&self) -> Vec<SetCookie> {
        self.response.lock().cookies.clone()
    }

    pub(crate) fn set_lang_cookie(&self, ttl: std::time::Duration) {
        self.add_cookie(SetCookie::site(LANG_COOKIE, self.lang(), ttl));
    }

    // Links

    pub(crate) fn generator(&self) -> Generator<'_, BoxedHandler> {
        let route = &self.request.route;
        Generator::new(&self.app.table)
            .scope(route.module(), route.controller())
            .lang(&self.request.lang)
            .request(self.path(), &self.request.query, &self.request.vars)
    }

    /// Path of the named route.
    ///
    /// Names without a `.` resolve within the current module and controller.
    /// Unknown routes yield `/<name>`.
    pub fn link(&self, name: &str) -> String {
        self.generator().link(name, NO_ARGS).url
    }

    /// Path of the named route with `args` substituted into its placeholders.
    pub fn link_with<I, K, V>(&self, name: &str, args: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.generator().link(name, args).url
    }

    /// Like [`link_with`](Self::link_with), also reporting whether the route
    /// exists.
    pub fn find_link<I, K, V>(&self, name: &str, args: I) -> Link
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.generator().link(name, args)
    }

    /// The current page in language `code`.
    pub fn switch_lang(&self, code: &str) -> String {
        self.generator().switch_lang(code)
    }

    // Session

    /// The session of the caller, if logged in.
    pub async fn session(&self) -> DaedalusResult<Option<Session>> {
        Ok(self.app.sessions.get(self.cookies()).await?)
    }

    /// Opens a session for `user`.
    pub async fn login(&self, user: SessionUser) -> DaedalusResult<Session> {
        let (session, cookie) = self.app.sessions.create(user, self.client()).await?;
        self.add_cookie(cookie);
        Ok(session)
    }

    /// Closes the session of the caller.
    pub async fn logout(&self) -> DaedalusResult<()> {
        let cookie = self.app.sessions.destroy(self.cookies()).await?;
        self.add_cookie(cookie);
        Ok(())
    }

    /// Issues a CSRF token for the form `name` on this route.
    ///
    /// The form must post it back as `csrf-token` together with
    /// `csrf-name`.
    pub async fn csrf_token(&self, name: &str) -> DaedalusResult<String> {
        let (token, cookie) = self
            .app
            .csrf
            .create(self.route().name(), name, self.client())
            .await?;
        self.add_cookie(cookie);
        Ok(token)
    }

    // Flash

    /// Stores messages for the next request.
    pub async fn store_flash(&self, flash: &Flash) -> DaedalusResult<()> {
        if let Some(cookie) = self.app.flash.store(flash).await? {
            self.add_cookie(cookie);
        }
        Ok(())
    }

    /// Takes the messages stored by the previous request.
    pub async fn take_flash(&self) -> DaedalusResult<Vec<FlashMessage>> {
        let (messages, cookie) = self.app.flash.take(self.cookies()).await?;
        if let Some(cookie) = cookie {
            self.add_cookie(cookie);
        }
        Ok(messages)
    }

    // Rendering

    /// Renders `content` into the route's layout.
    ///
    /// Without a registered [`Renderer`](crate::Renderer) the content is
    /// sent as is. So is a partial-update request, which only swaps the
    /// fragment on the client.
    pub fn render(&self, content: impl AsRef<str>) -> DaedalusResult<Outcome> {
        let content = content.as_ref();
        if self.is_hx() {
            return Ok(Outcome::render(content.to_string()));
        }
        match self.app.container.resolve::<BoxedRenderer>() {
            Some(renderer) => Ok(Outcome::render(
                renderer.render(self.route().layout(), content)?,
            )),
            None => Ok(Outcome::render(content.to_string())),
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request.request_id)
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .field("route", &self.request.route.name)
            .field("lang", &self.request.lang)
            .finish_non_exhaustive()
    }
}

fn find<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::app::App;
    use crate::handler::handler;
    use daedalus_component::query::parse_query;
    use daedalus_router::RouteBuilder;

    async fn noop(_ctx: Context) -> &'static str {
        ""
    }

    /// A context on the `blog-detail` route (`/blog/{id:[0-9]+}`).
    ///
    /// `edit` adjusts the request data before the context is frozen.
    pub(crate) fn context_from(
        config: DaedalusConfig,
        container: Container,
        uri: &'static str,
        edit: impl FnOnce(&mut RequestData),
    ) -> Context {
        let app = App::builder()
            .config(config)
            .container(container)
            .route(
                RouteBuilder::new()
                    .name("blog")
                    .get("/blog")
                    .handler(handler(noop))
                    .group([RouteBuilder::new()
                        .name("detail")
                        .get("/{id:[0-9]+}")
                        .handler(handler(noop))]),
            )
            .build()
            .unwrap();
        let state = app.state();
        let route = state.table.find("blog-detail", None).unwrap();

        let uri = Uri::from_static(uri);
        let mut request = RequestData::new(Method::GET, uri.clone());
        request.route = MatchedRoute::from_route(route);
        request.vars = route.extract_vars(uri.path());
        request.query = parse_query(uri.query().unwrap_or_default()).unwrap();
        request.headers.insert(HOST, HeaderValue::from_static("example.com"));
        edit(&mut request);

        Context::new(state, request, SharedResponse::default())
    }

    /// A context for `GET /blog/7?page=2` on the `blog-detail` route.
    pub(crate) fn context_with(container: Container) -> Context {
        context_from(
            DaedalusConfig::default(),
            container,
            "/blog/7?page=2",
            |request| request.cookies = Cookies::parse("theme=dark"),
        )
    }

    #[test]
    fn test_request_accessors() {
        let ctx = context_with(Container::new());
        assert_eq!(ctx.path(), "/blog/7");
        assert_eq!(ctx.var("id"), Some("7"));
        assert_eq!(ctx.query("page"), Some("2"));
        assert_eq!(ctx.cookie("theme"), Some("dark"));
        assert_eq!(ctx.host(), "example.com");
        assert_eq!(ctx.route().name(), "blog-detail");
        assert_eq!(ctx.route().layout(), "main");
        assert!(!ctx.is_action());
    }

    #[test]
    fn test_status_is_shared_between_clones() {
        let ctx = context_with(Container::new());
        let clone = ctx.clone();
        clone.set_status(StatusCode::CREATED);
        assert_eq!(ctx.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_set_header_rejects_invalid_name() {
        let ctx = context_with(Container::new());
        assert!(ctx.set_header("x-page", "2").is_ok());
        assert!(ctx.set_header("bad header", "2").is_err());
    }

    #[test]
    fn test_links_resolve_in_scope() {
        let ctx = context_with(Container::new());
        assert_eq!(ctx.link("blog"), "/blog");
        assert_eq!(ctx.link_with("blog-detail", [("id", 9)]), "/blog/9");
        assert!(!ctx.find_link("nowhere", NO_ARGS).found);
    }

    #[test]
    fn test_render_without_renderer_passes_content() {
        let ctx = context_with(Container::new());
        let outcome = ctx.render("<p>hi</p>").unwrap();
        assert_eq!(outcome, Outcome::render("<p>hi</p>"));
    }

    #[test]
    fn test_render_uses_registered_renderer() {
        struct Wrap;
        impl crate::Renderer for Wrap {
            fn render(&self, layout: &str, content: &str) -> DaedalusResult<Bytes> {
                Ok(Bytes::from(format!("[{layout}]{content}")))
            }
        }

        let mut container = Container::new();
        container.register(Arc::new(Box::new(Wrap) as BoxedRenderer));
        let ctx = context_with(container);
        assert_eq!(ctx.render("x").unwrap(), Outcome::render("[main]x"));
    }

    #[test]
    fn test_hx_request_renders_without_layout() {
        struct Wrap;
        impl crate::Renderer for Wrap {
            fn render(&self, layout: &str, content: &str) -> DaedalusResult<Bytes> {
                Ok(Bytes::from(format!("[{layout}]{content}")))
            }
        }

        let mut container = Container::new();
        container.register(Arc::new(Box::new(Wrap) as BoxedRenderer));
        let ctx = context_from(DaedalusConfig::default(), container, "/blog/7", |request| {
            request.hx = true;
        });
        assert!(ctx.is_hx());
        assert_eq!(ctx.render("x").unwrap(), Outcome::render("x"));
    }

    #[test]
    fn test_hx_headers_are_shared_between_clones() {
        let ctx = context_with(Container::new());
        assert!(!ctx.is_hx());
        ctx.clone().hx(|hx| {
            hx.update("comments").append();
        });
        assert!(ctx.response.lock().hx.targets("comments"));
    }

    #[tokio::test]
    async fn test_login_queues_session_cookie() {
        let ctx = context_with(Container::new());
        let session = ctx
            .login(SessionUser {
                id: 1,
                email: "a@b.c".into(),
                roles: vec!["editor".into()],
            })
            .await
            .unwrap();
        assert!(session.has_role("editor"));
        let cookies = &ctx.response.lock().cookies;
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "X-Session");
    }

    #[tokio::test]
    async fn test_csrf_token_is_scoped_to_route() {
        let ctx = context_with(Container::new());
        let token = ctx.csrf_token("comment").await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(ctx.response.lock().cookies[0].name(), "X-Csrf-blog-detail");
    }
}
