//! Compiled routes.

use std::fmt;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use regex::Regex;

use crate::access::AccessRule;
use crate::matcher::{Placeholder, WILDCARD};

/// Layout used when a route declares none.
pub const DEFAULT_LAYOUT: &str = "main";

/// An immutable, compiled route.
pub struct Route<H> {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) matcher: Regex,
    pub(crate) methods: Vec<Method>,
    pub(crate) module: String,
    pub(crate) controller: String,
    pub(crate) layout: String,
    pub(crate) language: Option<String>,
    pub(crate) vars_placeholders: IndexMap<String, String>,
    pub(crate) access_rules: Vec<Arc<AccessRule>>,
    pub(crate) handler: Option<H>,
}

impl<H> Route<H> {
    /// Qualified name, `module.controller.name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Compiled matcher.
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Accepted methods.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Module scope, empty if none.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Controller scope, empty if none.
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Render layout.
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// Language code for localized routes.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Placeholder name to literal placeholder text.
    pub fn vars_placeholders(&self) -> &IndexMap<String, String> {
        &self.vars_placeholders
    }

    /// Firewall rules covering this route.
    pub fn access_rules(&self) -> &[Arc<AccessRule>] {
        &self.access_rules
    }

    /// Bound handler.
    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    /// True when both the path and the method match.
    pub fn accepts(&self, method: &Method, path: &str) -> bool {
        self.methods.contains(method) && self.matcher.is_match(path)
    }

    /// Binds placeholders to request segments by position.
    ///
    /// ```rust
    /// # use daedalus_router::{RouteBuilder, RouteTable};
    /// # use daedalus_config::DaedalusConfig;
    /// let table = RouteTable::compile(
    ///     vec![RouteBuilder::<()>::new().name("post").get("/blog/{id:[0-9]+}/{slug}")],
    ///     &DaedalusConfig::default(),
    /// ).unwrap();
    /// let route = table.find("post", None).unwrap();
    /// let vars = route.extract_vars("/blog/7/hello");
    /// assert_eq!(vars["id"], "7");
    /// assert_eq!(vars["slug"], "hello");
    /// ```
    pub fn extract_vars(&self, path: &str) -> IndexMap<String, String> {
        let template: Vec<&str> = self.path.split('/').collect();
        path.split('/')
            .enumerate()
            .filter(|(_, segment)| !segment.is_empty())
            .filter_map(|(i, segment)| {
                let placeholder = Placeholder::parse(template.get(i)?)?;
                Some((placeholder.name.to_string(), segment.to_string()))
            })
            .collect()
    }

    /// Substitutes `vars` into the template.
    ///
    /// Placeholders without a value stay as written.
    pub fn expand(&self, vars: &IndexMap<String, String>) -> String {
        self.vars_placeholders
            .iter()
            .fold(self.path.clone(), |path, (name, placeholder)| {
                match vars.get(name) {
                    Some(value) => path.replacen(placeholder.as_str(), value, 1),
                    None => path,
                }
            })
    }

    /// The canonical form of a request path, if the template has one.
    ///
    /// Wildcard templates have no single canonical form.
    pub fn canonical_path(&self, vars: &IndexMap<String, String>) -> Option<String> {
        if self.path.split('/').any(|segment| segment == WILDCARD) {
            return None;
        }
        Some(self.expand(vars))
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("matcher", &self.matcher.as_str())
            .field("methods", &self.methods)
            .field("module", &self.module)
            .field("controller", &self.controller)
            .field("layout", &self.layout)
            .field("language", &self.language)
            .field(
                "access_rules",
                &self.access_rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{compile_matcher, vars_placeholders};

    fn route(path: &str) -> Route<()> {
        Route {
            name: "test".into(),
            path: path.into(),
            matcher: compile_matcher(path).unwrap(),
            methods: vec![Method::GET],
            module: String::new(),
            controller: String::new(),
            layout: DEFAULT_LAYOUT.into(),
            language: None,
            vars_placeholders: vars_placeholders(path),
            access_rules: Vec::new(),
            handler: None,
        }
    }

    #[test]
    fn test_accepts_checks_method() {
        let r = route("/blog");
        assert!(r.accepts(&Method::GET, "/blog"));
        assert!(!r.accepts(&Method::POST, "/blog"));
        assert!(!r.accepts(&Method::GET, "/news"));
    }

    #[test]
    fn test_extract_vars_positional() {
        let r = route("/{lang:cs}/blog/{id:[0-9]+}");
        let vars = r.extract_vars("/cs/blog/42/");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["lang"], "cs");
        assert_eq!(vars["id"], "42");
    }

    #[test]
    fn test_extract_vars_wildcard_tail_ignored() {
        let r = route("/files/*");
        assert!(r.extract_vars("/files/a/b/c").is_empty());
    }

    #[test]
    fn test_canonical_path() {
        let r = route("/blog/{id:[0-9]+}");
        let vars = r.extract_vars("/blog/5/");
        assert_eq!(r.canonical_path(&vars).as_deref(), Some("/blog/5"));
        assert_eq!(route("/files/*").canonical_path(&vars), None);
    }

    #[test]
    fn test_expand_keeps_missing_placeholders() {
        let r = route("/user/{name}/post/{id}");
        let mut vars = IndexMap::new();
        vars.insert("name".to_string(), "ada".to_string());
        assert_eq!(r.expand(&vars), "/user/ada/post/{id}");
    }
}
