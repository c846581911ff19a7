//! Link, action and language-switch URLs.
//!
//! The [`Generator`] turns route names into paths using the compiled
//! [`RouteTable`]. It is scoped to the current request: unqualified names
//! inherit the current module and controller, the `lang` placeholder takes
//! the active language, and action URLs carry the current query over.
//!
//! # Example
//!
//! ```rust
//! use daedalus_config::DaedalusConfig;
//! use daedalus_router::{RouteBuilder, RouteTable};
//! use daedalus_server::generator::Generator;
//!
//! let table = RouteTable::compile(
//!     vec![RouteBuilder::<()>::new()
//!         .name("blog")
//!         .get("/blog")
//!         .group([RouteBuilder::new().name("detail").get("/{id:[0-9]+}")])],
//!     &DaedalusConfig::default(),
//! )
//! .unwrap();
//!
//! let link = Generator::new(&table).link("blog-detail", [("id", 1)]);
//! assert!(link.found);
//! assert_eq!(link.url, "/blog/1");
//! ```

use daedalus_component::ComponentIdentity;
use daedalus_core::names::{ACTION_PARAM, LANG_PARAM, LANG_VAR, NAME_DIVIDER};
use daedalus_router::RouteTable;
use indexmap::IndexMap;
use tracing::warn;

/// A generated link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The path, or `/<name>` when the route does not exist.
    pub url: String,
    /// Whether a route was found.
    pub found: bool,
}

/// URL builder bound to one request.
pub struct Generator<'a, H> {
    table: &'a RouteTable<H>,
    module: &'a str,
    controller: &'a str,
    lang: &'a str,
    path: &'a str,
    query: &'a [(String, String)],
    vars: Option<&'a IndexMap<String, String>>,
}

impl<'a, H> Generator<'a, H> {
    /// A generator outside any request.
    pub fn new(table: &'a RouteTable<H>) -> Self {
        Self {
            table,
            module: "",
            controller: "",
            lang: "",
            path: "/",
            query: &[],
            vars: None,
        }
    }

    /// Scope used to qualify names without a `.`.
    #[must_use]
    pub fn scope(mut self, module: &'a str, controller: &'a str) -> Self {
        self.module = module;
        self.controller = controller;
        self
    }

    /// Active language.
    #[must_use]
    pub fn lang(mut self, lang: &'a str) -> Self {
        self.lang = lang;
        self
    }

    /// Current path, query and path variables.
    #[must_use]
    pub fn request(
        mut self,
        path: &'a str,
        query: &'a [(String, String)],
        vars: &'a IndexMap<String, String>,
    ) -> Self {
        self.path = path;
        self.query = query;
        self.vars = Some(vars);
        self
    }

    /// Path of the named route with `args` substituted.
    ///
    /// Falls back to `/<name>` with `found == false` when no route has the
    /// name.
    pub fn link<I, K, V>(&self, name: &str, args: I) -> Link
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let args: IndexMap<String, String> = args
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();

        let language = self.table.is_localized().then_some(self.lang);
        let qualified = self.qualify(name);
        let route = self
            .table
            .find(&qualified, language)
            .or_else(|| self.table.find(name, language));

        let Some(route) = route else {
            warn!(route = name, "link to unknown route");
            return Link {
                url: format!("/{name}"),
                found: false,
            };
        };

        let vars: IndexMap<String, String> = route
            .vars_placeholders()
            .keys()
            .filter_map(|var| {
                let value = if var == LANG_VAR && !self.lang.is_empty() {
                    Some(self.lang.to_string())
                } else {
                    args.get(var).cloned()
                };
                value.map(|value| (var.clone(), value))
            })
            .collect();

        Link {
            url: route.expand(&vars),
            found: true,
        }
    }

    /// URL invoking `method` on the component `identity`.
    ///
    /// The current query is carried over and `args` override it. Keys listed
    /// in `owned` belong to the component's encoded state: their stale
    /// values are dropped and `fields` appended instead.
    pub fn action<I, K, V>(
        &self,
        identity: &ComponentIdentity,
        method: &str,
        args: I,
        owned: &[String],
        fields: Vec<(String, String)>,
    ) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let mut pairs: Vec<(String, String)> = vec![(ACTION_PARAM.to_string(), identity.action(method))];
        pairs.extend(
            self.query
                .iter()
                .filter(|(key, _)| key != ACTION_PARAM)
                .cloned(),
        );

        for (key, value) in args {
            let key = key.into();
            pairs.retain(|(k, _)| *k != key);
            pairs.push((key, value.to_string()));
        }

        pairs.retain(|(k, _)| !owned.contains(k));
        pairs.extend(fields);

        match serde_urlencoded::to_string(&pairs) {
            Ok(query) => format!("{}?{query}", self.path),
            Err(error) => {
                warn!(%error, "action query could not be encoded");
                self.path.to_string()
            }
        }
    }

    /// The current page in another language.
    ///
    /// On a localized router this is the route at the same position in the
    /// target language's table, or `/<code>` when there is none. Otherwise
    /// the current path with the `lang` parameter set.
    pub fn switch_lang(&self, code: &str) -> String {
        if !self.table.is_localized() {
            return format!("{}?{LANG_PARAM}={code}", self.path);
        }

        let target = self
            .table
            .localized_index(self.lang, self.path)
            .and_then(|index| self.table.localized_at(code, index));

        match target {
            Some(route) => {
                let mut vars = self.vars.cloned().unwrap_or_default();
                vars.insert(LANG_VAR.to_string(), code.to_string());
                route.expand(&vars)
            }
            None => format!("/{code}"),
        }
    }

    fn qualify(&self, name: &str) -> String {
        if name.contains(NAME_DIVIDER) {
            return name.to_string();
        }
        [self.module, self.controller, name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(&NAME_DIVIDER.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daedalus_config::{DaedalusConfig, Languages, RouterConfig};
    use daedalus_router::{Controller, Module, RouteBuilder};

    const NO_ARGS: [(&str, &str); 0] = [];

    fn flat() -> RouteTable<()> {
        RouteTable::compile(
            vec![
                RouteBuilder::new().name("home").get("/"),
                RouteBuilder::new()
                    .name("blog")
                    .get("/blog")
                    .group([RouteBuilder::new().name("detail").get("/{id:[0-9]+}")]),
            ]
            .into_iter()
            .chain(
                Module::new("admin")
                    .controller(
                        Controller::new("user")
                            .routes([RouteBuilder::new().name("edit").get("/admin/user/{id}")]),
                    )
                    .into_routes(),
            )
            .collect(),
            &DaedalusConfig::default(),
        )
        .unwrap()
    }

    fn localized() -> RouteTable<()> {
        let config = DaedalusConfig::builder()
            .languages(Languages::new().with("cs", true, true).with("en", true, false))
            .router(RouterConfig {
                localized: true,
                ..RouterConfig::default()
            })
            .build();
        RouteTable::compile(
            vec![
                RouteBuilder::new()
                    .name("article")
                    .localized_path([("cs", "/clanek/{slug}"), ("en", "/article/{slug}")])
                    .methods([http::Method::GET]),
                RouteBuilder::new().name("contact").get("/contact").localize(),
            ],
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_link_nested_route() {
        let table = flat();
        let link = Generator::new(&table).link("blog-detail", [("id", 1)]);
        assert_eq!(
            link,
            Link {
                url: "/blog/1".into(),
                found: true
            }
        );
    }

    #[test]
    fn test_link_unknown_route() {
        let table = flat();
        let link = Generator::new(&table).link("missing", NO_ARGS);
        assert_eq!(link.url, "/missing");
        assert!(!link.found);
    }

    #[test]
    fn test_link_inherits_scope() {
        let table = flat();
        let generator = Generator::new(&table).scope("admin", "user");
        assert_eq!(generator.link("edit", [("id", 5)]).url, "/admin/user/5");
        assert_eq!(generator.link("home", NO_ARGS).url, "/");
    }

    #[test]
    fn test_link_keeps_missing_placeholders() {
        let table = flat();
        let link = Generator::new(&table).link("blog-detail", NO_ARGS);
        assert_eq!(link.url, "/blog/{id:[0-9]+}");
    }

    #[test]
    fn test_link_localized_uses_current_language() {
        let table = localized();
        let cs = Generator::new(&table).lang("cs");
        assert_eq!(cs.link("article", [("slug", "ahoj")]).url, "/cs/clanek/ahoj");
        let en = Generator::new(&table).lang("en");
        assert_eq!(en.link("contact", NO_ARGS).url, "/en/contact");
    }

    #[test]
    fn test_action_carries_query() {
        let table = flat();
        let query = vec![
            ("page".to_string(), "2".to_string()),
            ("action".to_string(), "old_call_x".to_string()),
        ];
        let vars = IndexMap::new();
        let generator = Generator::new(&table).request("/blog", &query, &vars);
        let identity = ComponentIdentity::new("", "blog", "list");

        let url = generator.action(&identity, "next", [("sort", "desc")], &[], Vec::new());
        assert_eq!(url, "/blog?action=blog_list_next&page=2&sort=desc");
    }

    #[test]
    fn test_action_fields_replace_stale_values() {
        let table = flat();
        let query = vec![
            ("list_page".to_string(), "1".to_string()),
            ("list_sort".to_string(), "name".to_string()),
        ];
        let vars = IndexMap::new();
        let generator = Generator::new(&table).request("/blog", &query, &vars);
        let identity = ComponentIdentity::new("", "blog", "list");
        let owned = vec!["list_page".to_string(), "list_sort".to_string()];

        let url = generator.action(
            &identity,
            "next",
            NO_ARGS,
            &owned,
            vec![("list_page".into(), "4".into())],
        );
        assert_eq!(url, "/blog?action=blog_list_next&list_page=4");
    }

    #[test]
    fn test_switch_lang_localized() {
        let table = localized();
        let mut vars = IndexMap::new();
        vars.insert("lang".to_string(), "cs".to_string());
        vars.insert("slug".to_string(), "ahoj".to_string());
        let generator = Generator::new(&table)
            .lang("cs")
            .request("/cs/clanek/ahoj", &[], &vars);

        assert_eq!(generator.switch_lang("en"), "/en/article/ahoj");
        assert_eq!(generator.switch_lang("de"), "/de");
    }

    #[test]
    fn test_switch_lang_unknown_page() {
        let table = localized();
        let vars = IndexMap::new();
        let generator = Generator::new(&table).lang("cs").request("/nowhere", &[], &vars);
        assert_eq!(generator.switch_lang("en"), "/en");
    }

    #[test]
    fn test_switch_lang_not_localized() {
        let table = flat();
        let vars = IndexMap::new();
        let generator = Generator::new(&table).request("/blog", &[], &vars);
        assert_eq!(generator.switch_lang("en"), "/blog?lang=en");
    }
}
