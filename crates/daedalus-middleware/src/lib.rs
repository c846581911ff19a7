//! # Daedalus Middleware
//!
//! The middleware chain every matched request passes before access control
//! and dispatch.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Match → Canonicalize → [ CSRF → Rate limit → Session ] → Firewall → Handler
//! ```
//!
//! | Stage | Middleware   | Enabled by                      |
//! |-------|--------------|---------------------------------|
//! | 1     | CSRF         | `security.csrf.enabled`         |
//! | 2     | Rate limit   | `security.rate_limit.enabled`   |
//! | 3     | Session      | `security.session.renew`        |
//!
//! A stage that returns [`Flow::Halt`] ends the request with its outcome.
//!
//! ## Example
//!
//! ```
//! use daedalus_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 3);
//! assert_eq!(stages[0].name(), "csrf");
//! assert_eq!(stages[2].name(), "session");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Flow, FnMiddleware, Middleware};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder, Stage};
