//! Ordered middleware pipeline.
//!
//! The built-in stages always run in this order, each only when enabled in
//! the configuration:
//!
//! 1. **CSRF** - token cleanup on GET, token check on everything else
//! 2. **Rate limit** - per-client token bucket
//! 3. **Session** - renewal of a live session
//!
//! Application middlewares added through [`PipelineBuilder::with`] run after
//! the built-in stages.

use std::sync::Arc;

use daedalus_cache::SharedCache;
use daedalus_config::DaedalusConfig;
use daedalus_core::ShutdownSignal;
use daedalus_session::{CsrfManager, SessionManager};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::context::MiddlewareContext;
use crate::middleware::{Flow, Middleware};
use crate::stages::{CsrfMiddleware, RateLimitMiddleware, SessionRenewMiddleware};

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Built-in stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// CSRF protection.
    Csrf,
    /// Rate limiting.
    RateLimit,
    /// Session renewal.
    Session,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Csrf => "csrf",
            Self::RateLimit => "rate_limit",
            Self::Session => "session",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 3] {
        [Self::Csrf, Self::RateLimit, Self::Session]
    }

    /// True when the stage is switched on in `config`.
    #[must_use]
    pub fn is_enabled(self, config: &DaedalusConfig) -> bool {
        match self {
            Self::Csrf => config.security.csrf.enabled,
            Self::RateLimit => config.security.rate_limit.enabled,
            Self::Session => config.security.session.renew,
        }
    }
}

/// The middleware chain run before access control.
///
/// # Example
///
/// ```
/// use daedalus_middleware::{MiddlewareContext, Pipeline, Flow};
/// use http::Method;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder().build();
/// let mut ctx = MiddlewareContext::new(Method::GET, "/");
/// assert_eq!(pipeline.run(&mut ctx).await, Flow::Continue);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
    rate_limit: Option<RateLimitMiddleware>,
}

impl Pipeline {
    /// Starts an empty pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Builds the built-in stages enabled in `config`.
    #[must_use]
    pub fn from_config(config: &DaedalusConfig, cache: &SharedCache) -> PipelineBuilder {
        let security = &config.security;
        let mut builder = PipelineBuilder::default();

        for stage in Stage::all() {
            if !stage.is_enabled(config) {
                continue;
            }
            builder = match stage {
                Stage::Csrf => builder.with(CsrfMiddleware::new(
                    CsrfManager::new(cache.clone(), &security.csrf),
                    security.csrf.clean.ignore_routes.clone(),
                )),
                Stage::RateLimit => builder.rate_limit(RateLimitMiddleware::new(
                    security.rate_limit.attempts,
                    security.rate_limit.interval(),
                )),
                Stage::Session => builder.with(SessionRenewMiddleware::new(SessionManager::new(
                    cache.clone(),
                    security,
                ))),
            };
        }
        builder
    }

    /// Runs every stage until one halts.
    pub async fn run(&self, ctx: &mut MiddlewareContext) -> Flow {
        for stage in &self.stages {
            let flow = stage.process(ctx).await;
            if flow.is_halt() {
                debug!(middleware = stage.name(), path = ctx.path(), "request halted");
                return flow;
            }
        }
        Flow::Continue
    }

    /// Stage names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True for an empty pipeline.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Starts the background tasks of the stages.
    pub fn spawn_sweepers(&self, shutdown: &ShutdownSignal) -> Vec<JoinHandle<()>> {
        self.rate_limit
            .iter()
            .map(|limiter| limiter.spawn_sweeper(shutdown.clone()))
            .collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .finish()
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
    rate_limit: Option<RateLimitMiddleware>,
}

impl PipelineBuilder {
    /// Appends a middleware.
    #[must_use]
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_boxed(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Appends a rate limiter whose sweeper the pipeline owns.
    #[must_use]
    pub fn rate_limit(mut self, limiter: RateLimitMiddleware) -> Self {
        self.rate_limit = Some(limiter.clone());
        self.with(limiter)
    }

    /// Finishes the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let pipeline = Pipeline {
            stages: self.stages,
            rate_limit: self.rate_limit,
        };
        info!(stages = ?pipeline.names(), "middleware pipeline built");
        pipeline
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{BoxFuture, FnMiddleware};
    use daedalus_cache::MemoryCache;
    use daedalus_core::Outcome;
    use http::Method;

    fn halt(_ctx: &mut MiddlewareContext) -> BoxFuture<'_, Flow> {
        Box::pin(async { Flow::Halt(Outcome::text("stop")) })
    }

    fn mark(ctx: &mut MiddlewareContext) -> BoxFuture<'_, Flow> {
        Box::pin(async move {
            ctx.add_cookie(daedalus_core::SetCookie::new("seen", "1"));
            Flow::Continue
        })
    }

    fn cache() -> SharedCache {
        Arc::new(MemoryCache::new())
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["csrf", "rate_limit", "session"]);
    }

    #[test]
    fn test_from_config_default_is_empty() {
        let pipeline = Pipeline::from_config(&DaedalusConfig::default(), &cache()).build();
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_from_config_keeps_order() {
        let mut config = DaedalusConfig::default();
        config.security.session.renew = true;
        config.security.rate_limit.enabled = true;
        config.security.csrf.enabled = true;

        let pipeline = Pipeline::from_config(&config, &cache()).build();
        assert_eq!(pipeline.names(), ["csrf", "rate_limit", "session"]);
    }

    #[tokio::test]
    async fn test_halt_short_circuits() {
        let pipeline = Pipeline::builder()
            .with(FnMiddleware::new("halt", halt))
            .with(FnMiddleware::new("mark", mark))
            .build();

        let mut ctx = MiddlewareContext::new(Method::GET, "/");
        assert_eq!(pipeline.run(&mut ctx).await, Flow::Halt(Outcome::text("stop")));
        assert!(ctx.take_cookies().is_empty());
    }

    #[tokio::test]
    async fn test_all_stages_run_on_continue() {
        let pipeline = Pipeline::builder()
            .with(FnMiddleware::new("mark", mark))
            .with(FnMiddleware::new("mark-again", mark))
            .build();

        let mut ctx = MiddlewareContext::new(Method::GET, "/");
        assert_eq!(pipeline.run(&mut ctx).await, Flow::Continue);
        assert_eq!(ctx.take_cookies().len(), 2);
    }

    #[tokio::test]
    async fn test_sweepers_only_for_rate_limit() {
        let shutdown = ShutdownSignal::new();
        let empty = Pipeline::builder().build();
        assert!(empty.spawn_sweepers(&shutdown).is_empty());

        let mut config = DaedalusConfig::default();
        config.security.rate_limit.enabled = true;
        let pipeline = Pipeline::from_config(&config, &cache()).build();
        let handles = pipeline.spawn_sweepers(&shutdown);
        assert_eq!(handles.len(), 1);

        shutdown.trigger();
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
