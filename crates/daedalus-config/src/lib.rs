//! Typed configuration for Daedalus applications.
//!
//! Configuration is layered (defaults, then a TOML or JSON file, then
//! environment variables) and every section rejects unknown keys.
//!
//! # Example
//!
//! ```no_run
//! use daedalus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), daedalus_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("config/app.toml")?
//!     .with_env_prefix("DAEDALUS")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [app]
//! name = "blog"
//! environment = "development"
//!
//! [languages]
//! cs = { enabled = true, default = true }
//! en = { enabled = true }
//!
//! [router]
//! localized = true
//! path_prefix = ""
//! prefer_prefix = false
//!
//! [security.csrf]
//! enabled = true
//! duration_secs = 86400
//!
//! [security.firewall.admin]
//! enabled = true
//! modules = ["admin"]
//! roles = ["editor"]
//! redirect_route = "auth.login"
//!
//! [security.role.owner]
//! super = true
//!
//! [security.role.editor]
//!
//! [security.rate_limit]
//! enabled = true
//! attempts = 60
//! interval_secs = 60
//!
//! [component]
//! state = "cache"
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::{DaedalusConfig, DaedalusConfigBuilder};
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
