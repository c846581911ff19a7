//! Session renewal.
//!
//! Extends a live session on every request made by the client that opened
//! it.

use daedalus_session::{SessionManager, SessionResult};
use tracing::warn;

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Flow, Middleware};

/// Session renewal middleware. Never halts.
#[derive(Debug, Clone)]
pub struct SessionRenewMiddleware {
    sessions: SessionManager,
}

impl SessionRenewMiddleware {
    /// Creates the middleware.
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    async fn renew(&self, ctx: &mut MiddlewareContext) -> SessionResult<()> {
        if !self.sessions.exists(ctx.cookies()).await? {
            return Ok(());
        }
        if let Some(cookie) = self.sessions.renew(ctx.cookies(), ctx.client()).await? {
            ctx.add_cookie(cookie);
        }
        Ok(())
    }
}

impl Middleware for SessionRenewMiddleware {
    fn name(&self) -> &'static str {
        "session"
    }

    fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow> {
        Box::pin(async move {
            if let Err(error) = self.renew(ctx).await {
                warn!(%error, "session renew failed");
            }
            Flow::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_cache::MemoryCache;
    use daedalus_config::SecurityConfig;
    use daedalus_core::{Cookies, Fingerprint};
    use daedalus_session::SessionUser;
    use http::Method;
    use std::sync::Arc;

    fn client() -> Fingerprint {
        Fingerprint {
            lang: "en".into(),
            ip: "10.0.0.3".into(),
            user_agent: "Opera".into(),
        }
    }

    #[tokio::test]
    async fn test_renews_existing_session() {
        let sessions = SessionManager::new(Arc::new(MemoryCache::new()), &SecurityConfig::default());
        let (_, cookie) = sessions
            .create(SessionUser::default(), &client())
            .await
            .unwrap();
        let mw = SessionRenewMiddleware::new(sessions);

        let mut ctx = MiddlewareContext::new(Method::GET, "/")
            .with_client(client())
            .with_cookies(Cookies::parse(&format!("X-Session={}", cookie.value())));
        assert_eq!(mw.process(&mut ctx).await, Flow::Continue);

        let cookies = ctx.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value(), cookie.value());
    }

    #[tokio::test]
    async fn test_anonymous_request_untouched() {
        let sessions = SessionManager::new(Arc::new(MemoryCache::new()), &SecurityConfig::default());
        let mw = SessionRenewMiddleware::new(sessions);
        let mut ctx = MiddlewareContext::new(Method::GET, "/");
        assert_eq!(mw.process(&mut ctx).await, Flow::Continue);
        assert!(ctx.take_cookies().is_empty());
    }
}
