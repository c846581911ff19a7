//! # Daedalus Core
//!
//! Core types and traits for the Daedalus web framework.
//!
//! This crate provides the foundational types used throughout Daedalus:
//!
//! - [`DaedalusError`] - Standard error type with HTTP status mapping
//! - [`Outcome`] - The single terminal result a request produces
//! - [`Container`] / [`Inject`] - Typed dependency registry for handlers
//! - [`Cookies`] / [`SetCookie`] - Cookie parsing and `Set-Cookie` building
//! - [`Fingerprint`] - Client language/IP/user-agent triple bound to stored state
//! - [`ShutdownSignal`] - Cooperative shutdown shared by the server and background tasks
//! - [`names`] - Reserved cookie, header and query parameter names
//!
//! # Example
//!
//! ```
//! use daedalus_core::{Outcome, DaedalusError};
//! use http::StatusCode;
//!
//! let outcome = Outcome::from_error(&DaedalusError::route_not_found("/missing"));
//! assert_eq!(outcome.status(), Some(StatusCode::NOT_FOUND));
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cookie;
pub mod di;
mod error;
pub mod names;
mod outcome;
mod request;
pub mod shutdown;

pub use cookie::{Cookies, SameSite, SetCookie};
pub use di::{Container, FromContainer, Inject, InjectionError};
pub use error::{DaedalusError, DaedalusResult, ErrorCategory};
pub use outcome::{content_type, IntoOutcome, Outcome};
pub use request::{client_ip, new_token, Fingerprint, RequestId};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
