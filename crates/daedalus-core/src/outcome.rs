//! Terminal request results.
//!
//! Handlers, middlewares and the lifecycle itself all finish a request by
//! producing one [`Outcome`]. The server writes it exactly once.

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use crate::DaedalusError;

/// Content types written for each outcome kind.
pub mod content_type {
    /// Rendered HTML.
    pub const HTML: &str = "text/html; charset=utf-8";
    /// Plain text.
    pub const TEXT: &str = "text/plain; charset=utf-8";
    /// JSON documents.
    pub const JSON: &str = "application/json; charset=utf-8";
    /// File downloads.
    pub const OCTET_STREAM: &str = "application/octet-stream; charset=utf-8";
}

/// The single result of handling a request.
///
/// Content variants carry an optional explicit status. When it is `None`
/// the writer uses the status the request context recorded, which defaults
/// to `200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An HTML page.
    Render {
        /// Explicit status.
        status: Option<StatusCode>,
        /// Rendered markup.
        body: Bytes,
    },
    /// A JSON document.
    Json {
        /// Explicit status.
        status: Option<StatusCode>,
        /// Serialized document.
        body: Bytes,
    },
    /// Plain text.
    Text {
        /// Explicit status.
        status: Option<StatusCode>,
        /// Text body.
        body: String,
    },
    /// A failure.
    Error {
        /// Explicit status. Falls back to the recorded status, then 500.
        status: Option<StatusCode>,
        /// Message shown to the client.
        message: String,
        /// Full error chain, shown only in development mode.
        detail: Option<String>,
    },
    /// A redirect to `location`.
    Redirect {
        /// 301 or 302.
        status: StatusCode,
        /// Target URL.
        location: String,
    },
    /// A file download.
    Stream {
        /// File name announced in `Content-Disposition`.
        filename: String,
        /// File contents.
        data: Bytes,
    },
}

impl Outcome {
    /// An HTML page.
    pub fn render(body: impl Into<Bytes>) -> Self {
        Self::Render {
            status: None,
            body: body.into(),
        }
    }

    /// A JSON document serialized from `value`.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, DaedalusError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| DaedalusError::internal_with_source("failed to encode json", e))?;
        Ok(Self::Json {
            status: None,
            body: Bytes::from(body),
        })
    }

    /// Plain text.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text {
            status: None,
            body: body.into(),
        }
    }

    /// A failure with an explicit status.
    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Error {
            status: Some(status),
            message: message.into(),
            detail: None,
        }
    }

    /// A failure built from a [`DaedalusError`].
    #[must_use]
    pub fn from_error(error: &DaedalusError) -> Self {
        Self::Error {
            status: Some(error.status_code()),
            message: error.to_string(),
            detail: Some(error.chain()),
        }
    }

    /// A `302 Found` redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: StatusCode::FOUND,
            location: location.into(),
        }
    }

    /// A `301 Moved Permanently` redirect.
    pub fn redirect_permanent(location: impl Into<String>) -> Self {
        Self::Redirect {
            status: StatusCode::MOVED_PERMANENTLY,
            location: location.into(),
        }
    }

    /// A file download.
    pub fn stream(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::Stream {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Overrides the status of content and error outcomes.
    ///
    /// Redirects keep their own status and streams are always `200 OK`.
    #[must_use]
    pub fn with_status(mut self, code: StatusCode) -> Self {
        match &mut self {
            Self::Render { status, .. }
            | Self::Json { status, .. }
            | Self::Text { status, .. }
            | Self::Error { status, .. } => *status = Some(code),
            Self::Redirect { .. } | Self::Stream { .. } => {}
        }
        self
    }

    /// The explicit status carried by this outcome, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Render { status, .. }
            | Self::Json { status, .. }
            | Self::Text { status, .. }
            | Self::Error { status, .. } => *status,
            Self::Redirect { status, .. } => Some(*status),
            Self::Stream { .. } => Some(StatusCode::OK),
        }
    }

    /// Content type written for this outcome, if it has a body.
    #[must_use]
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Render { .. } => Some(content_type::HTML),
            Self::Json { .. } => Some(content_type::JSON),
            Self::Text { .. } | Self::Error { .. } => Some(content_type::TEXT),
            Self::Stream { .. } => Some(content_type::OCTET_STREAM),
            Self::Redirect { .. } => None,
        }
    }

    /// Returns `true` for redirects.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }
}

/// Conversion of handler return values into an [`Outcome`].
pub trait IntoOutcome {
    /// Converts `self` into an outcome.
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Outcome {
        self
    }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome {
        Outcome::text(self)
    }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome {
        Outcome::text(self)
    }
}

impl IntoOutcome for serde_json::Value {
    fn into_outcome(self) -> Outcome {
        Outcome::json(&self).unwrap_or_else(|e| Outcome::from_error(&e))
    }
}

impl IntoOutcome for DaedalusError {
    fn into_outcome(self) -> Outcome {
        Outcome::from_error(&self)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<DaedalusError>,
{
    fn into_outcome(self) -> Outcome {
        match self {
            Ok(value) => value.into_outcome(),
            Err(err) => Outcome::from_error(&err.into()),
        }
    }
}

impl<T: IntoOutcome> IntoOutcome for (StatusCode, T) {
    fn into_outcome(self) -> Outcome {
        self.1.into_outcome().with_status(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(Outcome::render("x").content_type(), Some(content_type::HTML));
        assert_eq!(Outcome::text("x").content_type(), Some(content_type::TEXT));
        assert_eq!(
            Outcome::stream("a.csv", "x").content_type(),
            Some(content_type::OCTET_STREAM)
        );
        assert_eq!(Outcome::redirect("/").content_type(), None);
    }

    #[test]
    fn test_json_outcome() {
        let outcome = Outcome::json(&serde_json::json!({"ok": true})).unwrap();
        match outcome {
            Outcome::Json { body, status } => {
                assert_eq!(&body[..], br#"{"ok":true}"#);
                assert!(status.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_redirect_statuses() {
        assert_eq!(Outcome::redirect("/a").status(), Some(StatusCode::FOUND));
        assert_eq!(
            Outcome::redirect_permanent("/a").status(),
            Some(StatusCode::MOVED_PERMANENTLY)
        );
    }

    #[test]
    fn test_with_status_ignores_redirect() {
        let outcome = Outcome::redirect("/a").with_status(StatusCode::CREATED);
        assert_eq!(outcome.status(), Some(StatusCode::FOUND));

        let outcome = Outcome::text("made").with_status(StatusCode::CREATED);
        assert_eq!(outcome.status(), Some(StatusCode::CREATED));
    }

    #[test]
    fn test_result_into_outcome() {
        let ok: Result<&'static str, DaedalusError> = Ok("fine");
        assert_eq!(ok.into_outcome(), Outcome::text("fine"));

        let err: Result<&'static str, DaedalusError> =
            Err(DaedalusError::route_not_found("/gone"));
        let outcome = err.into_outcome();
        assert_eq!(outcome.status(), Some(StatusCode::NOT_FOUND));
        match outcome {
            Outcome::Error { message, .. } => assert_eq!(message, "route [/gone] not found"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_status_tuple() {
        let outcome = (StatusCode::ACCEPTED, "queued").into_outcome();
        assert_eq!(outcome.status(), Some(StatusCode::ACCEPTED));
    }
}
