//! CSRF protection.
//!
//! GET requests clear the tokens left behind by earlier page views. Every
//! other method must submit a valid `csrf-token` / `csrf-name` pair, or the
//! client is sent back to the page it came from.

use daedalus_core::names::{CSRF_NAME_FIELD, CSRF_TOKEN_FIELD};
use daedalus_core::Outcome;
use daedalus_session::CsrfManager;
use http::Method;
use tracing::{debug, warn};

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};

/// CSRF middleware.
#[derive(Debug, Clone)]
pub struct CsrfMiddleware {
    csrf: CsrfManager,
    ignore_routes: Vec<String>,
}

impl CsrfMiddleware {
    /// Creates the middleware.
    ///
    /// GET requests to `ignore_routes` keep their tokens.
    pub fn new(csrf: CsrfManager, ignore_routes: Vec<String>) -> Self {
        Self {
            csrf,
            ignore_routes,
        }
    }

    async fn clean(&self, ctx: &mut MiddlewareContext) -> Flow {
        if ctx.is_action() || self.ignore_routes.iter().any(|r| r == ctx.route()) {
            return Flow::Continue;
        }
        match self.csrf.clean(ctx.cookies(), ctx.route()).await {
            Ok(removals) => {
                for cookie in removals {
                    ctx.add_cookie(cookie);
                }
                Flow::Continue
            }
            Err(error) => {
                warn!(%error, "csrf cleanup failed");
                Flow::Continue
            }
        }
    }

    async fn verify(&self, ctx: &MiddlewareContext) -> Flow {
        let token = ctx.form_value(CSRF_TOKEN_FIELD).unwrap_or_default();
        let name = ctx.form_value(CSRF_NAME_FIELD).unwrap_or_default();
        match self.csrf.verify(token, name, ctx.client()).await {
            Ok(true) => Flow::Continue,
            Ok(false) => {
                debug!(path = ctx.path(), form = name, "csrf check failed, refreshing");
                Flow::Halt(Outcome::redirect(ctx.uri()))
            }
            Err(error) => Flow::Halt(Outcome::from_error(&error.into())),
        }
    }
}

impl Middleware for CsrfMiddleware {
    fn name(&self) -> &'static str {
        "csrf"
    }

    fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow> {
        Box::pin(async move {
            if ctx.method() == Method::GET {
                self.clean(ctx).await
            } else {
                self.verify(ctx).await
            }
        })
    }
}
