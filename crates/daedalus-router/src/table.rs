//! The frozen route table.

use std::fmt;

use http::Method;
use indexmap::IndexMap;
use regex::Regex;

use daedalus_config::{DaedalusConfig, RouterConfig};

use crate::access::AccessRule;
use crate::builder::RouteBuilder;
use crate::error::{RouterError, RouterResult};
use crate::processor::{Processor, LANG_VAR};
use crate::route::Route;

/// Result of resolving a request against the table.
pub enum Resolution<'a, H> {
    /// A route accepts the method and path.
    Matched(&'a Route<H>),
    /// Nothing matched on a localized router; go to the default-language root.
    RedirectToDefault(String),
    /// Nothing matched.
    NotFound,
}

impl<H> fmt::Debug for Resolution<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched(route) => f.debug_tuple("Matched").field(&route.name()).finish(),
            Self::RedirectToDefault(path) => f.debug_tuple("RedirectToDefault").field(path).finish(),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Compiled routes, shared read-only for the life of the process.
///
/// # Example
///
/// ```rust
/// use daedalus_config::DaedalusConfig;
/// use daedalus_router::{Resolution, RouteBuilder, RouteTable};
/// use http::Method;
///
/// let table = RouteTable::compile(
///     vec![RouteBuilder::new()
///         .name("blog")
///         .get("/blog")
///         .handler("blog")
///         .group([RouteBuilder::new().name("detail").get("/{id:[0-9]+}").handler("detail")])],
///     &DaedalusConfig::default(),
/// )
/// .unwrap();
///
/// match table.resolve(&Method::GET, "/blog/7") {
///     Resolution::Matched(route) => assert_eq!(route.name(), "blog-detail"),
///     other => panic!("unexpected {other:?}"),
/// }
/// assert!(matches!(table.resolve(&Method::GET, "/blog/x"), Resolution::NotFound));
/// ```
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
    localized_routes: IndexMap<String, Vec<Route<H>>>,
    detector: Option<Regex>,
    default_language: Option<String>,
    options: RouterConfig,
}

impl<H: Clone> RouteTable<H> {
    /// Compiles builders into a table.
    ///
    /// Stages the tree, compiles the firewall, attaches rules to the routes
    /// they cover and partitions routes by language.
    pub fn compile(builders: Vec<RouteBuilder<H>>, config: &DaedalusConfig) -> RouterResult<Self> {
        let staged = Processor::new(&config.languages, &config.router).process(builders)?;
        let rules = AccessRule::compile_all(&config.security.firewall)?;

        let mut routes = Vec::new();
        let mut localized_routes: IndexMap<String, Vec<Route<H>>> = IndexMap::new();
        let mut skipped = 0_usize;

        for staged_route in staged {
            let Some(mut route) = staged_route.into_route() else {
                skipped += 1;
                continue;
            };

            let rule_path = match route.language() {
                Some(lang) => route.path.replacen(&format!("{{{LANG_VAR}:{lang}}}"), lang, 1),
                None => route.path.clone(),
            };
            route.access_rules = rules
                .iter()
                .filter(|rule| {
                    rule.applies_to(&route.module, &route.controller, &route.name, &rule_path)
                })
                .cloned()
                .collect();

            if !route.access_rules.is_empty() {
                tracing::debug!(
                    route = %route.name,
                    rules = ?route.access_rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
                    "firewall attached"
                );
            }

            match route.language.clone() {
                Some(lang) => localized_routes.entry(lang).or_default().push(route),
                None => routes.push(route),
            }
        }

        let (detector, default_language) = if config.router.localized {
            (
                build_detector(&config.languages.enabled_codes(), &config.router)?,
                config.languages.default_code().map(str::to_string),
            )
        } else {
            (None, None)
        };

        tracing::info!(
            routes = routes.len(),
            localized = localized_routes.values().map(Vec::len).sum::<usize>(),
            languages = localized_routes.len(),
            skipped,
            "route table compiled"
        );

        Ok(Self {
            routes,
            localized_routes,
            detector,
            default_language,
            options: config.router.clone(),
        })
    }
}

impl<H> RouteTable<H> {
    /// Whether the router is localized.
    pub fn is_localized(&self) -> bool {
        self.options.localized
    }

    /// Router options the table was compiled with.
    pub fn options(&self) -> &RouterConfig {
        &self.options
    }

    /// First enabled default language, on localized routers.
    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    /// Non-localized routes, in declaration order.
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    /// Localized routes for one language, in declaration order.
    pub fn localized_routes(&self, language: &str) -> &[Route<H>] {
        self.localized_routes
            .get(language)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of routes across all languages.
    pub fn len(&self) -> usize {
        self.routes.len() + self.localized_routes.values().map(Vec::len).sum::<usize>()
    }

    /// True when no route compiled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Language code a path starts with, if it looks localized.
    pub fn language_of<'p>(&self, path: &'p str) -> Option<&'p str> {
        let captures = self.detector.as_ref()?.captures(path)?;
        captures.get(1).map(|m| m.as_str())
    }

    /// Resolves a request.
    ///
    /// Localized-looking paths are tried against that language first, then
    /// every path against the flat routes. On a localized router, a miss on a
    /// path without a language redirects to [`default_path`](Self::default_path).
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_, H> {
        let language = self.language_of(path);

        let localized = language
            .into_iter()
            .flat_map(|lang| self.localized_routes(lang))
            .find(|route| route.accepts(method, path));
        if let Some(route) = localized.or_else(|| self.routes.iter().find(|r| r.accepts(method, path)))
        {
            return Resolution::Matched(route);
        }

        if self.is_localized() && language.is_none() {
            if let Some(default_path) = self.default_path() {
                if path != default_path {
                    return Resolution::RedirectToDefault(default_path);
                }
            }
        }

        Resolution::NotFound
    }

    /// Finds a route by qualified name.
    ///
    /// With a language, that language's routes are searched first.
    pub fn find(&self, name: &str, language: Option<&str>) -> Option<&Route<H>> {
        language
            .into_iter()
            .flat_map(|lang| self.localized_routes(lang))
            .find(|route| route.name() == name)
            .or_else(|| self.routes.iter().find(|route| route.name() == name))
    }

    /// Position of the route matching `path` among `language`'s routes.
    pub fn localized_index(&self, language: &str, path: &str) -> Option<usize> {
        self.localized_routes(language)
            .iter()
            .position(|route| route.matcher().is_match(path))
    }

    /// Route at `index` among `language`'s routes.
    pub fn localized_at(&self, language: &str, index: usize) -> Option<&Route<H>> {
        self.localized_routes(language).get(index)
    }

    /// Root of the default language, honouring the path prefix.
    pub fn default_path(&self) -> Option<String> {
        let lang = self.default_language.as_deref()?;
        let prefix = self.options.prefix();
        Some(if prefix.is_empty() {
            format!("/{lang}")
        } else if self.options.prefer_prefix {
            format!("/{prefix}/{lang}")
        } else {
            format!("/{lang}/{prefix}")
        })
    }
}

impl<H> fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .field("localized_routes", &self.localized_routes)
            .field("detector", &self.detector.as_ref().map(Regex::as_str))
            .field("default_language", &self.default_language)
            .finish_non_exhaustive()
    }
}

fn build_detector(languages: &[&str], router: &RouterConfig) -> RouterResult<Option<Regex>> {
    if languages.is_empty() {
        return Ok(None);
    }
    let alternatives = languages
        .iter()
        .map(|code| regex::escape(code))
        .collect::<Vec<_>>()
        .join("|");
    let prefix = router.prefix();
    let pattern = if !prefix.is_empty() && router.prefer_prefix {
        format!(r"^/{}/({alternatives})\b", regex::escape(prefix))
    } else {
        format!(r"^/({alternatives})\b")
    };
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| RouterError::invalid_pattern(pattern, e))
}
