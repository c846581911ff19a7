//! # Daedalus
//!
//! **Component-based web framework with localized routing**
//!
//! Daedalus serves pages built from nested routes and stateful components:
//!
//! - **Localized routing** – one route tree, compiled per language, with
//!   canonical redirects and a language switcher
//! - **Firewall** – role, secret and invert rules attached to routes at
//!   compile time
//! - **Stateful components** – state kept in the cache or the query
//!   string, changed through action links
//! - **Sessions, CSRF and flash messages** – cache-backed, cookie addressed
//! - **Dependency injection** – handlers take `Inject<T>` arguments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use daedalus::prelude::*;
//!
//! async fn detail(ctx: Context) -> DaedalusResult<Outcome> {
//!     let id = ctx.var("id").unwrap_or_default();
//!     ctx.render(format!("<h1>Post {id}</h1>"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_defaults()
//!         .with_optional_file("daedalus.toml")?
//!         .with_env_prefix("DAEDALUS")
//!         .load()?;
//!     init_logging(&config.log_config())?;
//!
//!     let app = App::builder()
//!         .config(config)
//!         .route(
//!             RouteBuilder::new()
//!                 .name("blog")
//!                 .get("/blog")
//!                 .group([RouteBuilder::new()
//!                     .name("detail")
//!                     .get("/{id:[0-9]+}")
//!                     .handler(handler(detail))]),
//!         )
//!         .build()?;
//!
//!     Server::new(app).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request lifecycle
//!
//! ```text
//! Request → Match → Canonicalize → Language → Middlewares → Firewall → Handler
//!                                                                        ↓
//! Response ←──────────────────────── Writer ←───────────────────── Outcome
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use daedalus_core as core;

// Re-export the cache
pub use daedalus_cache as cache;

// Re-export configuration
pub use daedalus_config as config;

// Re-export logging setup
pub use daedalus_telemetry as telemetry;

// Re-export router types
pub use daedalus_router as router;

// Re-export the component codec
pub use daedalus_component as component;

// Re-export sessions, CSRF and flash messages
pub use daedalus_session as session;

// Re-export middleware types
pub use daedalus_middleware as middleware;

// Re-export server types
pub use daedalus_server as server;

// Re-export the fields! descriptor macro
pub use daedalus_component::fields;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use daedalus::prelude::*;
///
/// async fn hello(_ctx: Context) -> &'static str {
///     "hello"
/// }
///
/// let app = App::builder()
///     .route(RouteBuilder::new().name("hello").get("/hello").handler(handler(hello)))
///     .build()
///     .unwrap();
/// assert_eq!(app.routes().len(), 1);
/// ```
pub mod prelude {
    pub use daedalus_core::{
        Container, Cookies, DaedalusError, DaedalusResult, Fingerprint, Inject, IntoOutcome,
        Outcome, RequestId, SetCookie, ShutdownSignal,
    };

    // Configuration
    pub use daedalus_config::{ConfigLoader, DaedalusConfig, StateMode};

    // Logging
    pub use daedalus_telemetry::{init_logging, LogConfig};

    // Routing
    pub use daedalus_router::{Controller, Module, RouteBuilder};

    // Components
    pub use daedalus_component::{fields, Fields};
    pub use daedalus_middleware::BoxFuture;

    // Sessions
    pub use daedalus_session::{Flash, FlashKind, FlashMessage, Session, SessionUser};

    // Middleware
    pub use daedalus_middleware::{Flow, FnMiddleware, Middleware, MiddlewareContext};

    // Server
    pub use daedalus_server::{
        handler, Actions, App, Component, Context, HxResponse, Mounted, Renderer, Server, Swap,
    };
}
