//! # Daedalus Test
//!
//! In-memory HTTP testing for Daedalus applications.
//!
//! [`TestClient`] sends requests straight into an [`App`](daedalus_server::App),
//! so they run the whole lifecycle without binding a port. The client keeps
//! response cookies like a browser, which lets a test log in, follow a
//! component action, and check the state on the next page.
//!
//! ## Example
//!
//! ```rust
//! use daedalus_core::{DaedalusResult, Outcome};
//! use daedalus_router::RouteBuilder;
//! use daedalus_server::{handler, App, Context};
//! use daedalus_test::TestClient;
//!
//! async fn greet(ctx: Context) -> DaedalusResult<Outcome> {
//!     let name = ctx.query("name").unwrap_or("stranger");
//!     Outcome::json(&serde_json::json!({ "greeting": format!("hello {name}") }))
//! }
//!
//! # tokio_test::block_on(async {
//! let app = App::builder()
//!     .route(RouteBuilder::new().name("greet").get("/greet").handler(handler(greet)))
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(app);
//!
//! let response = client.get("/greet").query("name", "Ada").send().await;
//! response.assert_success();
//! let body: serde_json::Value = response.json().unwrap();
//! assert_eq!(body["greeting"], "hello Ada");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/daedalus-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::{ResponseCookie, TestResponse};
