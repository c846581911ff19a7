//! Route compilation and resolution for Daedalus.
//!
//! Routes are declared as a tree of [`RouteBuilder`]s, optionally grouped by
//! [`Controller`] and [`Module`], then compiled once into a [`RouteTable`].
//! The table is immutable and cheap to share behind an `Arc`.
//!
//! # Features
//!
//! - **Regex matchers**: `{name}`, `{name:pattern}` and `*` segments
//! - **Localization**: per-language paths or one path expanded to every
//!   enabled language, prefixed with a `{lang:code}` segment
//! - **Nesting**: subroutes inherit the parent's path and name
//! - **Firewall**: `security.firewall` rules attached per route at compile time
//!
//! # Example
//!
//! ```rust
//! use daedalus_config::{DaedalusConfig, Languages, RouterConfig};
//! use daedalus_router::{Resolution, RouteBuilder, RouteTable};
//! use http::Method;
//!
//! let config = DaedalusConfig::builder()
//!     .languages(Languages::new().with("cs", true, true).with("en", true, false))
//!     .router(RouterConfig { localized: true, ..RouterConfig::default() })
//!     .build();
//!
//! let table = RouteTable::compile(
//!     vec![RouteBuilder::new()
//!         .name("article")
//!         .localized_path([("cs", "clanek"), ("en", "article")])
//!         .methods([Method::GET])
//!         .handler(())],
//!     &config,
//! )
//! .unwrap();
//!
//! assert!(matches!(table.resolve(&Method::GET, "/en/article"), Resolution::Matched(_)));
//! assert!(matches!(
//!     table.resolve(&Method::GET, "/"),
//!     Resolution::RedirectToDefault(path) if path == "/cs"
//! ));
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod access;
mod builder;
mod error;
pub mod matcher;
pub mod processor;
mod route;
mod table;

pub use access::{AccessDecision, AccessRule, Caller};
pub use builder::{Controller, Module, RouteBuilder, RoutePath};
pub use error::{RouterError, RouterResult};
pub use processor::{Processor, StagedRoute};
pub use route::{Route, DEFAULT_LAYOUT};
pub use table::{Resolution, RouteTable};
