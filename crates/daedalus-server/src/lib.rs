//! # Daedalus Server
//!
//! Request lifecycle, handler dispatch and the HTTP server of the Daedalus
//! framework.
//!
//! This crate ties the other crates together:
//!
//! - [`App`] compiles the route table and the middleware pipeline once
//! - the lifecycle matches, canonicalizes, filters and dispatches requests
//! - [`Context`] gives handlers the request, links, session and components
//! - [`Server`] serves an [`App`] over HTTP/1 with graceful shutdown
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use daedalus_router::RouteBuilder;
//! use daedalus_server::{handler, App, Context};
//!
//! async fn detail(ctx: Context) -> String {
//!     format!("post {}", ctx.var("id").unwrap_or_default())
//! }
//!
//! # tokio_test::block_on(async {
//! let app = App::builder()
//!     .route(
//!         RouteBuilder::new()
//!             .name("blog")
//!             .get("/blog")
//!             .group([RouteBuilder::new()
//!                 .name("detail")
//!                 .get("/{id:[0-9]+}")
//!                 .handler(handler(detail))]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let request = http::Request::get("/blog/7").body(Bytes::new()).unwrap();
//! let response = app.handle(request).await;
//! assert_eq!(response.status(), 200);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod component;
mod context;
mod error;
pub mod generator;
mod handler;
pub mod hx;
mod lifecycle;
mod render;
mod server;
mod writer;

pub use app::{App, AppBuilder};
pub use component::{Action, Actions, Component, Mounted};
pub use context::{Context, MatchedRoute};
pub use error::{ServerError, ServerResult};
pub use generator::Link;
pub use handler::{handler, BoxedHandler, ErasedHandler, Handler, HandlerFuture};
pub use hx::{HxResponse, Swap};
pub use lifecycle::LANG_COOKIE_TTL;
pub use render::{BoxedRenderer, Renderer};
pub use server::Server;
pub use writer::{HttpResponse, ResponseBody};
