//! # Daedalus Session
//!
//! Cache-backed client state that is not tied to a component:
//!
//! - [`SessionManager`] - authenticated sessions behind the `X-Session` cookie
//! - [`CsrfManager`] - single-use form tokens behind `X-Csrf-<key>` cookies
//! - [`FlashStore`] - messages shown on the next page view, behind `X-Flash`
//!
//! Every store returns the [`SetCookie`](daedalus_core::SetCookie) values the
//! response must carry instead of writing them itself.

#![doc(html_root_url = "https://docs.rs/daedalus-session/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csrf;
mod error;
mod flash;
mod session;

pub use csrf::{CsrfManager, CsrfToken, DEFAULT_CSRF_TTL};
pub use error::{SessionError, SessionResult};
pub use flash::{Flash, FlashKind, FlashMessage, FlashStore, FLASH_TTL};
pub use session::{Session, SessionManager, SessionUser, DEFAULT_SESSION_TTL};
