//! Core middleware trait and types.
//!
//! A middleware either lets the request continue or halts it with the
//! outcome that will be written. Middlewares never see the handler result.
//!
//! # Example
//!
//! ```
//! use daedalus_middleware::{BoxFuture, Flow, Middleware, MiddlewareContext};
//! use daedalus_core::Outcome;
//!
//! struct Maintenance;
//!
//! impl Middleware for Maintenance {
//!     fn name(&self) -> &'static str {
//!         "maintenance"
//!     }
//!
//!     fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow> {
//!         Box::pin(async move {
//!             if ctx.path().starts_with("/admin") {
//!                 Flow::Halt(Outcome::text("back soon"))
//!             } else {
//!                 Flow::Continue
//!             }
//!         })
//!     }
//! }
//! ```

use daedalus_core::Outcome;
use std::future::Future;
use std::pin::Pin;

use crate::context::MiddlewareContext;

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Whether the lifecycle goes on after a middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Run the next middleware, then the handler.
    Continue,
    /// Stop here and write this outcome.
    Halt(Outcome),
}

impl Flow {
    /// True for [`Flow::Halt`].
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }
}

/// The core middleware trait.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects the request.
    fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow>;
}

/// A middleware built from a function.
///
/// ```
/// use daedalus_middleware::{BoxFuture, FnMiddleware, Flow, Middleware, MiddlewareContext};
///
/// fn noop(_ctx: &mut MiddlewareContext) -> BoxFuture<'_, Flow> {
///     Box::pin(async { Flow::Continue })
/// }
///
/// let middleware = FnMiddleware::new("noop", noop);
/// assert_eq!(middleware.name(), "noop");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut MiddlewareContext) -> BoxFuture<'a, Flow> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, ctx: &'a mut MiddlewareContext) -> BoxFuture<'a, Flow> {
        (self.func)(ctx)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
