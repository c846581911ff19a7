//! Component naming and action addressing.
//!
//! A component is addressed as `module_controller_component`. Invoking one
//! of its actions appends the method: `module_controller_component_method`.
//! The string travels in the `action` query parameter.

use std::fmt;

/// Separator between identity segments and the method.
pub const ACTION_DIVIDER: char = '_';

const MIN_ACTION_SEGMENTS: usize = 3;

/// The fully qualified name of a component on a route.
///
/// # Example
///
/// ```rust
/// use daedalus_component::ComponentIdentity;
///
/// let identity = ComponentIdentity::new("admin", "user", "table");
/// assert_eq!(identity.as_str(), "admin_user_table");
/// assert_eq!(identity.action("sort"), "admin_user_table_sort");
///
/// let plain = ComponentIdentity::new("", "blog", "comments");
/// assert_eq!(plain.as_str(), "blog_comments");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentIdentity(String);

impl ComponentIdentity {
    /// Builds `[module_]controller_component`.
    ///
    /// Empty scopes are skipped.
    pub fn new(module: &str, controller: &str, component: &str) -> Self {
        let identity = [module, controller, component]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(&ACTION_DIVIDER.to_string());
        Self(identity)
    }

    /// Builds the identity of a component rendered on a route.
    ///
    /// Routes outside any controller use their own name as the controller
    /// scope, so every identity has at least two segments.
    pub fn for_route(module: &str, controller: &str, route_name: &str, component: &str) -> Self {
        let scope = if controller.is_empty() {
            route_name
        } else {
            controller
        };
        Self::new(module, scope, component)
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `action` parameter value invoking `method`.
    pub fn action(&self, method: &str) -> String {
        format!("{}{ACTION_DIVIDER}{method}", self.0)
    }
}

impl fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed `action` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCall<'a> {
    /// Everything before the last divider.
    pub identity: &'a str,
    /// Method name after the last divider.
    pub method: &'a str,
}

impl<'a> ActionCall<'a> {
    /// Splits on the last `_`.
    ///
    /// Returns `None` for values with fewer than three segments or an empty
    /// method.
    ///
    /// ```rust
    /// use daedalus_component::ActionCall;
    ///
    /// let call = ActionCall::parse("blog_comments_add").unwrap();
    /// assert_eq!(call.identity, "blog_comments");
    /// assert_eq!(call.method, "add");
    ///
    /// assert!(ActionCall::parse("comments_add").is_none());
    /// ```
    pub fn parse(action: &'a str) -> Option<Self> {
        if action.split(ACTION_DIVIDER).count() < MIN_ACTION_SEGMENTS {
            return None;
        }
        let (identity, method) = action.rsplit_once(ACTION_DIVIDER)?;
        if method.is_empty() {
            return None;
        }
        Some(Self { identity, method })
    }

    /// True when the call addresses `identity`.
    pub fn targets(&self, identity: &ComponentIdentity) -> bool {
        self.identity == identity.as_str()
    }
}
