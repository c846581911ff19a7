//! Handler binding and dispatch.
//!
//! A handler is an async function taking the request [`Context`] followed by
//! up to eight injected dependencies. Each dependency implements
//! [`FromContainer`] and is resolved from the application's [`Container`]
//! right before the call. A missing registration fails the request with
//! `500 dependency [<type>] does not exist` and the handler never runs.
//!
//! # Example
//!
//! ```rust
//! use daedalus_core::{Inject, Outcome};
//! use daedalus_server::{handler, Context};
//!
//! struct Greeter {
//!     greeting: &'static str,
//! }
//!
//! async fn hello(ctx: Context, greeter: Inject<Greeter>) -> Outcome {
//!     let name = ctx.var("name").unwrap_or("world");
//!     Outcome::text(format!("{}, {name}!", greeter.greeting))
//! }
//!
//! let boxed = handler(hello);
//! # let _ = boxed;
//! ```
//!
//! [`Container`]: daedalus_core::Container

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use daedalus_core::{DaedalusError, DaedalusResult, FromContainer, IntoOutcome, Outcome};
use daedalus_middleware::BoxFuture;

use crate::context::Context;

/// Future returned by a type-erased handler.
pub type HandlerFuture = BoxFuture<'static, DaedalusResult<Outcome>>;

/// A handler with typed arguments.
///
/// Implemented for every `Fn(Context, A1, .., An) -> impl Future` with
/// `n <= 8` whose arguments implement [`FromContainer`] and whose output
/// implements [`IntoOutcome`].
pub trait Handler<Args>: Clone + Send + Sync + 'static {
    /// Resolves the dependencies and calls the handler.
    fn call(&self, ctx: Context) -> HandlerFuture;
}

/// A handler with its argument types erased.
pub trait ErasedHandler: Send + Sync + 'static {
    /// Resolves the dependencies and calls the handler.
    fn call(&self, ctx: Context) -> HandlerFuture;
}

/// The handler type stored on compiled routes.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

struct HandlerFn<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> ErasedHandler for HandlerFn<H, Args>
where
    H: Handler<Args>,
    Args: 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        self.handler.call(ctx)
    }
}

/// Erases the argument types of `handler` so it can be bound to a route.
pub fn handler<H, Args>(handler: H) -> BoxedHandler
where
    H: Handler<Args>,
    Args: 'static,
{
    Arc::new(HandlerFn {
        handler,
        _args: PhantomData,
    })
}

fn resolve<T: FromContainer>(ctx: &Context) -> Result<T, DaedalusError> {
    T::from_container(ctx.container()).map_err(|error| {
        tracing::error!(%error, route = ctx.route().name(), "dependency resolution failed");
        DaedalusError::from(error)
    })
}

macro_rules! impl_handler {
    ($($T:ident),*) => {
        impl<F, Fut, R, $($T,)*> Handler<($($T,)*)> for F
        where
            F: Fn(Context, $($T,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoOutcome,
            $($T: FromContainer + Send + 'static,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn call(&self, ctx: Context) -> HandlerFuture {
                $(
                    let $T = match resolve::<$T>(&ctx) {
                        Ok(value) => value,
                        Err(error) => return Box::pin(async move { Err(error) }),
                    };
                )*
                let future = (self)(ctx, $($T,)*);
                Box::pin(async move { Ok(future.await.into_outcome()) })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
