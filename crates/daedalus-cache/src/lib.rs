//! Cache abstraction for Daedalus.
//!
//! Sessions, CSRF tokens, flash messages and component state are kept in a
//! [`Cache`]. Values are JSON strings with a time-to-live. [`CacheExt`] adds
//! typed helpers on top of any backend.
//!
//! [`MemoryCache`] is the in-process backend. Its expired entries are evicted
//! by a sweeper task that stops with the application's
//! [`ShutdownSignal`](daedalus_core::ShutdownSignal).
//!
//! # Example
//!
//! ```rust
//! use daedalus_cache::{CacheExt, MemoryCache};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let cache = MemoryCache::new();
//! cache.set_json("flash:abc", &vec!["saved"], Duration::from_secs(60)).await.unwrap();
//!
//! let messages: Option<Vec<String>> = cache.get_json("flash:abc").await.unwrap();
//! assert_eq!(messages, Some(vec!["saved".to_string()]));
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-cache/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod error;
mod memory;

pub use cache::{Cache, CacheExt, SharedCache};
pub use error::CacheError;
pub use memory::MemoryCache;
