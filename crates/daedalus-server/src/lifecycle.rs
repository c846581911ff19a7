//! The request lifecycle.
//!
//! Every request runs the same ordered steps: match, extract variables,
//! canonicalize, middlewares, access control, dispatch. Each step returns
//! `Result<_, Halt>`; a [`Halt`] carries the terminal outcome and skips the
//! rest. Panics are caught once, around the whole sequence, and the
//! [`Writer`] materializes exactly one response at the end.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use daedalus_component::query::parse_query;
use daedalus_core::names::{ACTION_PARAM, LANG_COOKIE, LANG_PARAM, LANG_VAR, SECRET_HEADER};
use daedalus_core::{Cookies, DaedalusError, Fingerprint, Outcome, RequestId};
use daedalus_middleware::{Flow, MiddlewareContext};
use daedalus_router::access::{evaluate, AccessDecision, Caller};
use daedalus_router::{Resolution, Route};
use daedalus_telemetry::request_span;
use futures_util::FutureExt;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, Request, StatusCode};
use indexmap::IndexMap;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::app::AppState;
use crate::context::{Context, MatchedRoute, RequestData};
use crate::generator::Generator;
use crate::handler::BoxedHandler;
use crate::hx;
use crate::writer::{fallback, HttpResponse, SharedResponse, Writer};

/// How long the language cookie lives.
pub const LANG_COOKIE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("x-frame-options", "SAMEORIGIN"),
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("cross-origin-resource-policy", "same-site"),
    ("cross-origin-opener-policy", "same-origin"),
    ("vary", "origin"),
    ("cross-origin-embedder-policy", "require-corp"),
];

const NO_ARGS: [(&str, &str); 0] = [];

/// A terminal outcome reached before the handler produced one.
#[derive(Debug)]
pub(crate) struct Halt(pub(crate) Outcome);

impl From<DaedalusError> for Halt {
    fn from(error: DaedalusError) -> Self {
        Self(Outcome::from_error(&error))
    }
}

type Step<T> = Result<T, Halt>;

/// Runs one request and writes its response.
pub(crate) async fn handle(app: Arc<AppState>, request: Request<Bytes>) -> HttpResponse {
    let request_id = RequestId::new();
    let span = request_span(
        &request_id.to_string(),
        request.method().as_str(),
        request.uri().path(),
    );
    let response = SharedResponse::default();

    async move {
        let started = Instant::now();
        let result = AssertUnwindSafe(process(&app, request_id, request, &response))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome) | Err(Halt(outcome))) => outcome,
            Err(panic) => recover(&*panic, &response),
        };

        let mut writer = Writer::new(app.config.app.is_development());
        let written = writer
            .write(outcome, &response)
            .unwrap_or_else(|| fallback(StatusCode::INTERNAL_SERVER_ERROR));

        info!(
            http.status_code = written.status().as_u16(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
        written
    }
    .instrument(span)
    .await
}

async fn process(
    app: &Arc<AppState>,
    request_id: RequestId,
    request: Request<Bytes>,
    response: &SharedResponse,
) -> Step<Outcome> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let route = match app.table.resolve(&parts.method, &path) {
        Resolution::Matched(route) => route,
        Resolution::RedirectToDefault(target) => {
            debug!(%target, "redirecting to the default language");
            return Err(Halt(Outcome::redirect(target)));
        }
        Resolution::NotFound => {
            debug!("no route matched");
            return Err(DaedalusError::route_not_found(path).into());
        }
    };
    Span::current().record("route", route.name());

    let vars = route.extract_vars(&path);
    let raw_query = parts.uri.query().unwrap_or_default();
    canonicalize(route, &vars, &path, raw_query)?;

    let query = parse_query(raw_query)
        .map_err(|e| DaedalusError::validation(format!("malformed query string: {e}")))?;
    let form = parse_form(&parts.headers, &body)?;
    let cookies = Cookies::from_headers(&parts.headers);
    let lang = resolve_language(app, route, &vars, &cookies, &query);
    let client = Fingerprint::from_headers(&parts.headers, lang.clone());

    let uri = parts
        .uri
        .path_and_query()
        .map_or_else(|| path.clone(), |pq| pq.as_str().to_string());
    let mut middleware_ctx = MiddlewareContext::new(parts.method.clone(), uri)
        .with_route(route.name())
        .with_action(query.iter().any(|(k, _)| k == ACTION_PARAM))
        .with_cookies(cookies.clone())
        .with_client(client.clone())
        .with_form(form.clone());
    let flow = app.pipeline.run(&mut middleware_ctx).await;
    response.lock().cookies.extend(middleware_ctx.take_cookies());
    if let Flow::Halt(outcome) = flow {
        return Err(Halt(outcome));
    }

    if !route.access_rules().is_empty() {
        firewall(app, route, &lang, &cookies, &parts.headers).await?;
    }

    let handler = route.handler().cloned().ok_or_else(|| {
        DaedalusError::internal(format!("route [{}] has no handler", route.name()))
    })?;

    set_security_headers(response, &parts.headers);

    let mut data = RequestData::new(parts.method, parts.uri);
    data.request_id = request_id;
    data.hx = hx::is_hx_request(&parts.headers);
    data.headers = parts.headers;
    data.body = body;
    data.query = query;
    data.form = form;
    data.cookies = cookies;
    data.client = client;
    data.route = MatchedRoute::from_route(route);
    data.vars = vars;
    data.lang = lang;

    dispatch(app, handler, data, response).await
}

/// Redirects `301` to the canonical path when the request has no query.
fn canonicalize(
    route: &Route<BoxedHandler>,
    vars: &IndexMap<String, String>,
    path: &str,
    query: &str,
) -> Step<()> {
    if !query.is_empty() {
        return Ok(());
    }
    match route.canonical_path(vars) {
        Some(canonical) if canonical != path => {
            debug!(%canonical, "redirecting to the canonical path");
            Err(Halt(Outcome::redirect_permanent(canonical)))
        }
        _ => Ok(()),
    }
}

fn parse_form(headers: &HeaderMap, body: &Bytes) -> Step<Vec<(String, String)>> {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));
    if !is_form || body.is_empty() {
        return Ok(Vec::new());
    }
    serde_urlencoded::from_bytes(body).map_err(|e| {
        DaedalusError::validation(format!("malformed form body: {e}")).into()
    })
}

/// Localized routers take the language from the path. Otherwise the
/// `X-Lang` cookie applies and the `lang` query parameter overrides it.
fn resolve_language(
    app: &AppState,
    route: &Route<BoxedHandler>,
    vars: &IndexMap<String, String>,
    cookies: &Cookies,
    query: &[(String, String)],
) -> String {
    let default = app.config.languages.default_code().unwrap_or_default();

    if app.table.is_localized() {
        return vars
            .get(LANG_VAR)
            .map(String::as_str)
            .or_else(|| route.language())
            .unwrap_or(default)
            .to_string();
    }

    let remembered = cookies
        .get(LANG_COOKIE)
        .filter(|lang| !lang.is_empty())
        .unwrap_or(default);
    query
        .iter()
        .find(|(k, v)| k == LANG_PARAM && !v.is_empty())
        .map_or(remembered, |(_, v)| v.as_str())
        .to_string()
}

async fn firewall(
    app: &AppState,
    route: &Route<BoxedHandler>,
    lang: &str,
    cookies: &Cookies,
    headers: &HeaderMap,
) -> Step<()> {
    let session = app
        .sessions
        .get(cookies)
        .await
        .map_err(DaedalusError::from)?;

    let caller = Caller {
        authenticated: session.is_some(),
        is_super: session.as_ref().is_some_and(|s| s.is_super),
        roles: session.as_ref().map_or(&[][..], |s| s.roles.as_slice()),
        secret: headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()),
    };

    match evaluate(route.access_rules(), &caller) {
        AccessDecision::Allow => Ok(()),
        AccessDecision::Redirect { rule, route: target } => {
            let location = if target.is_empty() {
                "/".to_string()
            } else {
                Generator::new(&app.table).lang(lang).link(&target, NO_ARGS).url
            };
            info!(%rule, %location, "access redirected");
            Err(Halt(Outcome::redirect(location)))
        }
        AccessDecision::Deny { rule } => {
            warn!(%rule, "access denied");
            Err(DaedalusError::insufficient_rights(Some(rule)).into())
        }
    }
}

fn set_security_headers(response: &SharedResponse, request_headers: &HeaderMap) {
    let mut state = response.lock();
    for (name, value) in SECURITY_HEADERS {
        state.headers.insert(name, HeaderValue::from_static(value));
    }
    if let Some(host) = request_headers.get(HOST) {
        state
            .headers
            .insert("access-control-allow-origin", host.clone());
    }
}

async fn dispatch(
    app: &Arc<AppState>,
    handler: BoxedHandler,
    data: RequestData,
    response: &SharedResponse,
) -> Step<Outcome> {
    let ctx = Context::new(Arc::clone(app), data, Arc::clone(response));
    if !app.config.languages.is_empty() {
        ctx.set_lang_cookie(LANG_COOKIE_TTL);
    }

    match handler.call(ctx).await {
        Ok(outcome) => Ok(outcome),
        Err(error) => {
            if error.status_code().is_server_error() {
                error!(error = %error.chain(), "handler failed");
            } else {
                debug!(%error, "handler rejected the request");
            }
            Err(error.into())
        }
    }
}

fn recover(panic: &(dyn Any + Send), response: &SharedResponse) -> Outcome {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(panic = %message, "request panicked");

    let status = response
        .lock()
        .status
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Outcome::from_error(&DaedalusError::Panic { message }).with_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::handler::handler;
    use daedalus_config::{DaedalusConfig, Languages};
    use daedalus_router::RouteBuilder;

    async fn noop(_ctx: Context) -> &'static str {
        ""
    }

    fn app(languages: Languages) -> App {
        App::builder()
            .config(DaedalusConfig::builder().languages(languages).build())
            .route(RouteBuilder::new().name("page").get("/page").handler(handler(noop)))
            .build()
            .unwrap()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_language_from_cookie_then_query() {
        let app = app(Languages::new().with("cs", true, true).with("en", true, false));
        let state = app.state();
        let route = state.table.find("page", None).unwrap();
        let vars = IndexMap::new();

        let none = Cookies::new();
        assert_eq!(resolve_language(&state, route, &vars, &none, &[]), "cs");

        let cookie = Cookies::parse("X-Lang=en");
        assert_eq!(resolve_language(&state, route, &vars, &cookie, &[]), "en");

        let query = pairs(&[("lang", "cs")]);
        assert_eq!(resolve_language(&state, route, &vars, &cookie, &query), "cs");
    }

    #[test]
    fn test_parse_form_requires_form_content_type() {
        let body = Bytes::from_static(b"a=1&b=two");
        assert!(parse_form(&HeaderMap::new(), &body).unwrap().is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        assert_eq!(
            parse_form(&headers, &body).unwrap(),
            pairs(&[("a", "1"), ("b", "two")])
        );
    }

    #[test]
    fn test_recover_prefers_recorded_error_status() {
        let response = SharedResponse::default();
        let outcome = recover(&"boom", &response);
        assert_eq!(outcome.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        response.lock().status = Some(StatusCode::SERVICE_UNAVAILABLE);
        let outcome = recover(&String::from("boom"), &response);
        assert_eq!(outcome.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

        response.lock().status = Some(StatusCode::CREATED);
        let outcome = recover(&"boom", &response);
        assert_eq!(outcome.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
