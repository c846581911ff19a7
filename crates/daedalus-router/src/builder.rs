//! Declarative route tree.
//!
//! Builders are mutable staging nodes. They only exist until
//! [`RouteTable::compile`](crate::RouteTable::compile) consumes them.

use std::fmt;

use http::Method;
use indexmap::IndexMap;

/// Path of a route: one template, or one per language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePath {
    /// Same template for every language.
    Single(String),
    /// Template per language code.
    Localized(IndexMap<String, String>),
}

/// A route declaration with optional subroutes.
///
/// # Example
///
/// ```rust
/// use daedalus_router::RouteBuilder;
///
/// let blog: RouteBuilder<&str> = RouteBuilder::new()
///     .name("blog")
///     .get("/blog")
///     .handler("list")
///     .group([RouteBuilder::new()
///         .name("detail")
///         .get("/{id:[0-9]+}")
///         .handler("detail")]);
/// assert_eq!(blog.children().len(), 1);
/// ```
#[derive(Clone)]
pub struct RouteBuilder<H> {
    pub(crate) name: String,
    pub(crate) path: Option<RoutePath>,
    pub(crate) methods: Vec<Method>,
    pub(crate) handler: Option<H>,
    pub(crate) localize: bool,
    pub(crate) layout: Option<String>,
    pub(crate) module: String,
    pub(crate) controller: String,
    pub(crate) children: Vec<RouteBuilder<H>>,
}

impl<H> Default for RouteBuilder<H> {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: None,
            methods: Vec::new(),
            handler: None,
            localize: false,
            layout: None,
            module: String::new(),
            controller: String::new(),
            children: Vec::new(),
        }
    }
}

impl<H> RouteBuilder<H> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the route name, relative to its parent.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a single path template.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(RoutePath::Single(path.into()));
        self
    }

    /// Sets one path template per language code.
    ///
    /// Codes that are not enabled languages produce no route.
    #[must_use]
    pub fn localized_path<I, L, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = (L, P)>,
        L: Into<String>,
        P: Into<String>,
    {
        self.path = Some(RoutePath::Localized(
            paths
                .into_iter()
                .map(|(lang, path)| (lang.into(), path.into()))
                .collect(),
        ));
        self
    }

    /// Adds accepted methods without touching the path.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Adds `method` and sets the path.
    #[must_use]
    pub fn route(self, method: Method, path: impl Into<String>) -> Self {
        self.methods([method]).path(path)
    }

    /// `GET` at `path`.
    #[must_use]
    pub fn get(self, path: impl Into<String>) -> Self {
        self.route(Method::GET, path)
    }

    /// `POST` at `path`.
    #[must_use]
    pub fn post(self, path: impl Into<String>) -> Self {
        self.route(Method::POST, path)
    }

    /// `PUT` at `path`.
    #[must_use]
    pub fn put(self, path: impl Into<String>) -> Self {
        self.route(Method::PUT, path)
    }

    /// `PATCH` at `path`.
    #[must_use]
    pub fn patch(self, path: impl Into<String>) -> Self {
        self.route(Method::PATCH, path)
    }

    /// `DELETE` at `path`.
    #[must_use]
    pub fn delete(self, path: impl Into<String>) -> Self {
        self.route(Method::DELETE, path)
    }

    /// `HEAD` at `path`.
    #[must_use]
    pub fn head(self, path: impl Into<String>) -> Self {
        self.route(Method::HEAD, path)
    }

    /// `OPTIONS` at `path`.
    #[must_use]
    pub fn options(self, path: impl Into<String>) -> Self {
        self.route(Method::OPTIONS, path)
    }

    /// Binds the handler.
    #[must_use]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Expands a single path into one route per enabled language.
    #[must_use]
    pub fn localize(mut self) -> Self {
        self.localize = true;
        self
    }

    /// Sets the render layout. Subroutes inherit it.
    #[must_use]
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Appends subroutes.
    #[must_use]
    pub fn group(mut self, children: impl IntoIterator<Item = RouteBuilder<H>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Subroutes declared so far.
    pub fn children(&self) -> &[RouteBuilder<H>] {
        &self.children
    }

    fn scope(&mut self, module: Option<&str>, controller: Option<&str>) {
        if let Some(module) = module {
            self.module = module.to_string();
        }
        if let Some(controller) = controller {
            self.controller = controller.to_string();
        }
        for child in &mut self.children {
            child.scope(module, controller);
        }
    }
}

impl<H> fmt::Debug for RouteBuilder<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("has_handler", &self.handler.is_some())
            .field("localize", &self.localize)
            .field("layout", &self.layout)
            .field("module", &self.module)
            .field("controller", &self.controller)
            .field("children", &self.children)
            .finish()
    }
}

/// Groups routes under a controller name.
///
/// Route names become `controller.name`.
#[derive(Debug, Clone)]
pub struct Controller<H> {
    name: String,
    routes: Vec<RouteBuilder<H>>,
}

impl<H> Controller<H> {
    /// Creates an empty controller.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
        }
    }

    /// Adds routes.
    #[must_use]
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteBuilder<H>>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Controller name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stamps the controller on every route, subroutes included.
    pub fn into_routes(self) -> Vec<RouteBuilder<H>> {
        let Self { name, mut routes } = self;
        for route in &mut routes {
            route.scope(None, Some(&name));
        }
        routes
    }
}

/// Groups controllers under a module name.
///
/// Route names become `module.controller.name`.
#[derive(Debug, Clone)]
pub struct Module<H> {
    name: String,
    controllers: Vec<Controller<H>>,
}

impl<H> Module<H> {
    /// Creates an empty module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controllers: Vec::new(),
        }
    }

    /// Adds a controller.
    #[must_use]
    pub fn controller(mut self, controller: Controller<H>) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flattens controllers into routes stamped with module and controller.
    pub fn into_routes(self) -> Vec<RouteBuilder<H>> {
        let Self { name, controllers } = self;
        controllers
            .into_iter()
            .flat_map(Controller::into_routes)
            .map(|mut route| {
                route.scope(Some(&name), None);
                route
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods_accumulate() {
        let route: RouteBuilder<()> = RouteBuilder::new().get("/a").post("/b");
        assert_eq!(route.methods, vec![Method::GET, Method::POST]);
        assert_eq!(route.path, Some(RoutePath::Single("/b".into())));
    }

    #[test]
    fn test_localized_path_keeps_order() {
        let route: RouteBuilder<()> =
            RouteBuilder::new().localized_path([("cs", "clanek"), ("en", "article")]);
        let Some(RoutePath::Localized(paths)) = route.path else {
            panic!("expected localized path");
        };
        let langs: Vec<&str> = paths.keys().map(String::as_str).collect();
        assert_eq!(langs, ["cs", "en"]);
    }

    #[test]
    fn test_module_stamps_tree() {
        let module = Module::new("admin").controller(
            Controller::new("user").routes([RouteBuilder::<()>::new()
                .name("list")
                .get("/users")
                .group([RouteBuilder::new().name("detail").get("/{id}")])]),
        );
        let routes = module.into_routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].module, "admin");
        assert_eq!(routes[0].controller, "user");
        assert_eq!(routes[0].children[0].module, "admin");
        assert_eq!(routes[0].children[0].controller, "user");
    }

    #[test]
    fn test_debug_hides_handler() {
        let route = RouteBuilder::new().name("home").handler(42_u8);
        let debug = format!("{route:?}");
        assert!(debug.contains("has_handler: true"));
    }
}
