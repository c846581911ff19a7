//! The rendering collaborator.
//!
//! Daedalus has no template language. An application that wants its pages
//! wrapped in layouts registers a [`Renderer`]; [`Context::render`] then
//! hands it the route's layout name and the page content.
//!
//! [`Context::render`]: crate::Context::render

use bytes::Bytes;
use daedalus_core::DaedalusResult;

/// Wraps page content into a named layout.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use daedalus_core::DaedalusResult;
/// use daedalus_server::Renderer;
///
/// struct Plain;
///
/// impl Renderer for Plain {
///     fn render(&self, layout: &str, content: &str) -> DaedalusResult<Bytes> {
///         Ok(Bytes::from(format!("<main data-layout=\"{layout}\">{content}</main>")))
///     }
/// }
///
/// let page = Plain.render("main", "hi").unwrap();
/// assert_eq!(page, "<main data-layout=\"main\">hi</main>");
/// ```
pub trait Renderer: Send + Sync + 'static {
    /// Renders `content` inside `layout`.
    fn render(&self, layout: &str, content: &str) -> DaedalusResult<Bytes>;
}

/// The form a renderer is registered under in the container.
pub type BoxedRenderer = Box<dyn Renderer>;
