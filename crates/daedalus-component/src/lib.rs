//! # Daedalus Component
//!
//! Addressing and persistence for server-rendered components.
//!
//! A component is a fragment of a page that keeps its own data between
//! requests. This crate provides the pieces the server uses to run one:
//!
//! - [`ComponentIdentity`] / [`ActionCall`] - `module_controller_component`
//!   names and the `action` parameter addressing one of their methods
//! - [`QueryCodec`] / [`Fields`] - state carried in the query string
//! - [`StateStore`] - state kept in the cache behind an `X-State` cookie
//!
//! # Example
//!
//! ```rust
//! use daedalus_component::{fields, ActionCall, ComponentIdentity, QueryCodec};
//!
//! #[derive(Default)]
//! struct Pager {
//!     page: u32,
//! }
//!
//! let identity = ComponentIdentity::new("", "blog", "pager");
//! let action = identity.action("next");
//! let call = ActionCall::parse(&action).unwrap();
//! assert!(call.targets(&identity));
//!
//! let codec = QueryCodec::new().with_prefix("pager");
//! let pager = Pager { page: 3 };
//! let query = codec.encode(&pager, &fields!(Pager { page })).unwrap();
//! assert_eq!(query, "pager_page=3");
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-component/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod identity;
pub mod query;
mod state;

pub use error::{CodecError, CodecResult};
pub use identity::{ActionCall, ComponentIdentity, ACTION_DIVIDER};
pub use query::{Field, Fields, QueryCodec, QueryScalar, QueryValue};
pub use state::{StateStore, STATE_TTL};
