//! Built-in middleware stages.

mod csrf;
mod rate_limit;
mod session;

pub use csrf::CsrfMiddleware;
pub use rate_limit::{RateLimitMiddleware, IDLE_TIMEOUT, SWEEP_INTERVAL};
pub use session::SessionRenewMiddleware;
