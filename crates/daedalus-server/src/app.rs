//! Application assembly.
//!
//! [`App::builder`] accumulates configuration, routes, dependencies and
//! middlewares. [`AppBuilder::build`] validates the configuration, compiles
//! the route table once and freezes everything into an [`App`], which is
//! shared by every request.

use std::sync::Arc;

use bytes::Bytes;
use daedalus_cache::{MemoryCache, SharedCache};
use daedalus_config::DaedalusConfig;
use daedalus_core::{Container, ShutdownSignal};
use daedalus_middleware::{BoxedMiddleware, Middleware, Pipeline};
use daedalus_router::{Controller, Module, RouteBuilder, RouteTable};
use daedalus_session::{CsrfManager, FlashStore, SessionManager};
use http::Request;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::ServerResult;
use crate::handler::BoxedHandler;
use crate::lifecycle;
use crate::render::{BoxedRenderer, Renderer};
use crate::writer::HttpResponse;

/// Process-wide state shared by all requests.
pub(crate) struct AppState {
    pub(crate) config: Arc<DaedalusConfig>,
    pub(crate) table: RouteTable<BoxedHandler>,
    pub(crate) pipeline: Pipeline,
    pub(crate) container: Container,
    pub(crate) cache: SharedCache,
    pub(crate) memory_cache: Option<MemoryCache>,
    pub(crate) sessions: Arc<SessionManager>,
    pub(crate) csrf: Arc<CsrfManager>,
    pub(crate) flash: Arc<FlashStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("table", &self.table)
            .field("pipeline", &self.pipeline)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// A built application.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use daedalus_router::RouteBuilder;
/// use daedalus_server::{handler, App, Context};
///
/// async fn home(_ctx: Context) -> &'static str {
///     "welcome"
/// }
///
/// # tokio_test::block_on(async {
/// let app = App::builder()
///     .route(RouteBuilder::new().name("home").get("/").handler(handler(home)))
///     .build()
///     .unwrap();
///
/// let request = http::Request::get("/").body(Bytes::new()).unwrap();
/// let response = app.handle(request).await;
/// assert_eq!(response.status(), 200);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct App {
    state: Arc<AppState>,
}

impl App {
    /// Starts building an application.
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// The validated configuration.
    pub fn config(&self) -> &DaedalusConfig {
        &self.state.config
    }

    /// The compiled route table.
    pub fn routes(&self) -> &RouteTable<BoxedHandler> {
        &self.state.table
    }

    /// The dependency container.
    pub fn container(&self) -> &Container {
        &self.state.container
    }

    /// The shared cache.
    pub fn cache(&self) -> &SharedCache {
        &self.state.cache
    }

    pub(crate) fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Runs one request through the lifecycle.
    ///
    /// Never fails: every error becomes a response.
    pub async fn handle(&self, request: Request<Bytes>) -> HttpResponse {
        lifecycle::handle(self.state(), request).await
    }

    /// Starts the sweep tasks of the middlewares and of the built-in
    /// memory cache. They stop when `shutdown` fires.
    pub fn spawn_background(&self, shutdown: &ShutdownSignal) -> Vec<JoinHandle<()>> {
        let mut tasks = self.state.pipeline.spawn_sweepers(shutdown);
        if let Some(cache) = &self.state.memory_cache {
            tasks.push(cache.spawn_sweeper(self.state.config.cache.sweep_interval(), shutdown.clone()));
        }
        tasks
    }
}

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    config: DaedalusConfig,
    routes: Vec<RouteBuilder<BoxedHandler>>,
    container: Container,
    cache: Option<SharedCache>,
    middlewares: Vec<BoxedMiddleware>,
}

impl AppBuilder {
    /// Sets the configuration.
    pub fn config(mut self, config: DaedalusConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a top-level route.
    pub fn route(mut self, route: RouteBuilder<BoxedHandler>) -> Self {
        self.routes.push(route);
        self
    }

    /// Adds several top-level routes.
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteBuilder<BoxedHandler>>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Adds the routes of a module.
    pub fn module(self, module: Module<BoxedHandler>) -> Self {
        self.routes(module.into_routes())
    }

    /// Adds the routes of a controller outside any module.
    pub fn controller(self, controller: Controller<BoxedHandler>) -> Self {
        self.routes(controller.into_routes())
    }

    /// Replaces the dependency container.
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Registers a dependency for injection.
    pub fn register<T: Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.container.register(service);
        self
    }

    /// Uses `cache` instead of the built-in memory cache.
    pub fn cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Appends an application middleware. It runs after the built-in
    /// stages.
    pub fn middleware(mut self, middleware: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Registers the layout renderer.
    pub fn renderer(self, renderer: impl Renderer) -> Self {
        let renderer: BoxedRenderer = Box::new(renderer);
        self.register(Arc::new(renderer))
    }

    /// Validates the configuration and compiles the routes.
    pub fn build(self) -> ServerResult<App> {
        let Self {
            config,
            routes,
            mut container,
            cache,
            middlewares,
        } = self;

        config.validate()?;
        let config = Arc::new(config);

        let (cache, memory_cache) = match cache {
            Some(cache) => (cache, None),
            None => {
                let memory = MemoryCache::new();
                let shared: SharedCache = Arc::new(memory.clone());
                (shared, Some(memory))
            }
        };

        let table = RouteTable::compile(routes, &config)?;

        let pipeline = middlewares
            .into_iter()
            .fold(Pipeline::from_config(&config, &cache), |builder, middleware| {
                builder.with_boxed(middleware)
            })
            .build();

        let sessions = Arc::new(SessionManager::new(cache.clone(), &config.security));
        let csrf = Arc::new(CsrfManager::new(cache.clone(), &config.security.csrf));
        let flash = Arc::new(FlashStore::new(cache.clone()));

        container.register(Arc::clone(&config));
        container.register(Arc::new(cache.clone()));
        container.register(Arc::clone(&sessions));
        container.register(Arc::clone(&csrf));
        container.register(Arc::clone(&flash));

        info!(
            routes = table.len(),
            localized = table.is_localized(),
            middlewares = pipeline.len(),
            dependencies = container.len(),
            "application built"
        );

        Ok(App {
            state: Arc::new(AppState {
                config,
                table,
                pipeline,
                container,
                cache,
                memory_cache,
                sessions,
                csrf,
                flash,
            }),
        })
    }
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder")
            .field("routes", &self.routes.len())
            .field("middlewares", &self.middlewares.len())
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}
