//! Response materialization.
//!
//! The lifecycle ends with exactly one [`Outcome`]. The [`Writer`] turns it
//! into an HTTP response, merging the status, headers and cookies the
//! request collected on its way. A second write is ignored.

use std::sync::Arc;

use bytes::Bytes;
use daedalus_core::{content_type, Outcome, SetCookie};
use http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::hx::HxResponse;

/// Response body type.
pub type ResponseBody = Full<Bytes>;

/// HTTP response type.
pub type HttpResponse = Response<ResponseBody>;

/// Status, headers and cookies accumulated while handling a request.
#[derive(Debug, Default)]
pub struct ResponseState {
    /// Status recorded by handlers. `None` means not set.
    pub status: Option<StatusCode>,
    /// Headers to send.
    pub headers: HeaderMap,
    /// Cookies to send.
    pub cookies: Vec<SetCookie>,
    /// Headers for htmx clients.
    pub hx: HxResponse,
}

/// The response state shared between the lifecycle and the [`Context`].
///
/// [`Context`]: crate::Context
pub type SharedResponse = Arc<Mutex<ResponseState>>;

/// Writes the terminal outcome once.
#[derive(Debug)]
pub struct Writer {
    development: bool,
    written: bool,
}

impl Writer {
    /// Creates a writer. Development mode renders error details.
    pub fn new(development: bool) -> Self {
        Self {
            development,
            written: false,
        }
    }

    /// Whether a response was already produced.
    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Builds the response for `outcome`.
    ///
    /// Returns `None` when a response was already written.
    pub fn write(&mut self, outcome: Outcome, state: &SharedResponse) -> Option<HttpResponse> {
        if self.written {
            debug!("response already written, ignoring");
            return None;
        }
        self.written = true;

        let state = std::mem::take(&mut *state.lock());
        let response = match self.build(outcome, &state) {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "response could not be built");
                fallback(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };
        Some(response)
    }

    fn build(&self, outcome: Outcome, state: &ResponseState) -> Result<HttpResponse, http::Error> {
        let recorded = state.status.unwrap_or(StatusCode::OK);
        let mut builder = Response::builder();

        if let Some(headers) = builder.headers_mut() {
            headers.extend(state.headers.clone());
            state.hx.apply(headers);
            for cookie in &state.cookies {
                match HeaderValue::from_str(&cookie.to_header_value()) {
                    Ok(value) => {
                        headers.append(SET_COOKIE, value);
                    }
                    Err(e) => error!(cookie = cookie.name(), error = %e, "invalid cookie skipped"),
                }
            }
        }

        match outcome {
            Outcome::Render { status, body } => builder
                .status(status.unwrap_or(recorded))
                .header(CONTENT_TYPE, content_type::HTML)
                .body(Full::new(body)),
            Outcome::Json { status, body } => builder
                .status(status.unwrap_or(recorded))
                .header(CONTENT_TYPE, content_type::JSON)
                .body(Full::new(body)),
            Outcome::Text { status, body } => builder
                .status(status.unwrap_or(recorded))
                .header(CONTENT_TYPE, content_type::TEXT)
                .body(Full::new(Bytes::from(body))),
            Outcome::Error {
                status,
                message,
                detail,
            } => {
                let status = status
                    .or(state.status.filter(|s| s.is_client_error() || s.is_server_error()))
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let (mime, body) = self.error_body(status, &message, detail.as_deref());
                builder
                    .status(status)
                    .header(CONTENT_TYPE, mime)
                    .body(Full::new(Bytes::from(body)))
            }
            Outcome::Redirect { status, location } => builder
                .status(status)
                .header(LOCATION, location)
                .body(Full::new(Bytes::new())),
            Outcome::Stream { filename, data } => builder
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, content_type::OCTET_STREAM)
                .header(CONTENT_DISPOSITION, format!("attachment;filename={filename}"))
                .header(CONTENT_LENGTH, data.len())
                .body(Full::new(data)),
        }
    }

    /// Client errors show their message. Server errors show the status text
    /// outside development, and the full error chain as HTML inside it.
    fn error_body(
        &self,
        status: StatusCode,
        message: &str,
        detail: Option<&str>,
    ) -> (&'static str, String) {
        if self.development {
            let detail = detail.unwrap_or(message);
            let page = format!(
                "<!DOCTYPE html><html><head><title>{code}</title></head><body><h1>{code} {reason}</h1><pre>{detail}</pre></body></html>",
                code = status.as_u16(),
                reason = status.canonical_reason().unwrap_or_default(),
                detail = escape_html(detail),
            );
            return (content_type::HTML, page);
        }

        let body = if status.is_server_error() || message.is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            message.to_string()
        };
        (content_type::TEXT, body)
    }
}

/// A bare response that cannot fail to build.
pub fn fallback(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(
        status.canonical_reason().unwrap_or_default(),
    )));
    *response.status_mut() = status;
    response
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
