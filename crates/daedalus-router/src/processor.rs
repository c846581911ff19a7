//! Builder tree staging.
//!
//! The processor walks the builder tree once and emits one staged route per
//! builder and language. In order, it:
//!
//! 1. applies the global path prefix to top-level builders
//! 2. expands localized builders into per-language paths
//! 3. concatenates parent paths and names into subroutes
//! 4. qualifies names with module and controller scopes
//!
//! Firewall rules are attached later by the table.

use http::Method;
use indexmap::IndexMap;
use regex::Regex;

use daedalus_config::{Languages, RouterConfig};

use crate::builder::{RouteBuilder, RoutePath};
use crate::error::RouterResult;
use crate::matcher::{compile_matcher, vars_placeholders};
use crate::route::{Route, DEFAULT_LAYOUT};

/// Separator between parent and child route names.
pub const SUBROUTE_DIVIDER: char = '-';

/// Separator between module, controller and route name.
pub const NAME_DIVIDER: char = '.';

/// Path variable holding the language code.
pub const LANG_VAR: &str = "lang";

/// A route produced by the processor, not yet in a table.
#[derive(Debug)]
pub struct StagedRoute<H> {
    /// Qualified name.
    pub name: String,
    /// Full path template, if the builder declared one.
    pub path: Option<String>,
    /// Accepted methods, de-duplicated.
    pub methods: Vec<Method>,
    /// Module scope.
    pub module: String,
    /// Controller scope.
    pub controller: String,
    /// Render layout.
    pub layout: String,
    /// Language code for localized routes.
    pub language: Option<String>,
    /// Bound handler.
    pub handler: Option<H>,
    matcher: Option<Regex>,
}

impl<H> StagedRoute<H> {
    /// True when the route has a path and a compiled matcher.
    pub fn ok(&self) -> bool {
        self.matcher.is_some()
    }

    /// The compiled matcher, for routes that have one.
    pub fn matcher(&self) -> Option<&Regex> {
        self.matcher.as_ref()
    }

    /// Converts into a table route. Routes that are not ok are dropped.
    pub(crate) fn into_route(self) -> Option<Route<H>> {
        let path = self.path?;
        let matcher = self.matcher?;
        Some(Route {
            vars_placeholders: vars_placeholders(&path),
            name: self.name,
            path,
            matcher,
            methods: self.methods,
            module: self.module,
            controller: self.controller,
            layout: self.layout,
            language: self.language,
            access_rules: Vec::new(),
            handler: self.handler,
        })
    }
}

/// Paths a builder hands down to its subroutes.
#[derive(Debug, Clone)]
enum Paths {
    Single(Option<String>),
    Localized(IndexMap<String, Option<String>>),
}

#[derive(Debug)]
struct Frame {
    name: String,
    layout: Option<String>,
    paths: Paths,
}

/// Stages builder trees under one router configuration.
#[derive(Debug, Clone)]
pub struct Processor {
    languages: Vec<String>,
    localized: bool,
    prefix: String,
    prefer_prefix: bool,
}

impl Processor {
    /// Creates a processor for the given languages and router settings.
    ///
    /// Localization is only honoured when `router.localized` is set.
    pub fn new(languages: &Languages, router: &RouterConfig) -> Self {
        Self {
            languages: languages
                .enabled_codes()
                .into_iter()
                .map(str::to_string)
                .collect(),
            localized: router.localized,
            prefix: router.prefix().to_string(),
            prefer_prefix: router.prefer_prefix,
        }
    }

    /// Stages every builder, depth first, in declaration order.
    pub fn process<H: Clone>(
        &self,
        builders: Vec<RouteBuilder<H>>,
    ) -> RouterResult<Vec<StagedRoute<H>>> {
        let mut staged = Vec::new();
        for builder in builders {
            self.stage(builder, None, &mut staged)?;
        }
        Ok(staged)
    }

    fn stage<H: Clone>(
        &self,
        builder: RouteBuilder<H>,
        parent: Option<&Frame>,
        out: &mut Vec<StagedRoute<H>>,
    ) -> RouterResult<()> {
        let RouteBuilder {
            name,
            path,
            methods,
            handler,
            localize,
            layout,
            module,
            controller,
            children,
        } = builder;

        let name = match parent {
            Some(parent) => join_non_empty(&parent.name, &name, SUBROUTE_DIVIDER),
            None => name,
        };
        let layout = layout.or_else(|| parent.and_then(|p| p.layout.clone()));
        let has_path = path.is_some();
        let paths = self.resolve_paths(path, localize, parent);
        let qualified = qualify(&module, &controller, &name);
        let methods = dedup(methods);

        let mut emit = |path: Option<&String>, language: Option<&str>| -> RouterResult<()> {
            let path = path.filter(|_| has_path).cloned();
            let matcher = path.as_deref().map(compile_matcher).transpose()?;
            out.push(StagedRoute {
                name: qualified.clone(),
                path,
                methods: methods.clone(),
                module: module.clone(),
                controller: controller.clone(),
                layout: layout.clone().unwrap_or_else(|| DEFAULT_LAYOUT.to_string()),
                language: language.map(str::to_string),
                handler: handler.clone(),
                matcher,
            });
            Ok(())
        };

        match &paths {
            Paths::Single(path) => emit(path.as_ref(), None)?,
            Paths::Localized(paths) => {
                for (lang, path) in paths {
                    emit(path.as_ref(), Some(lang.as_str()))?;
                }
            }
        }

        let frame = Frame {
            name,
            layout,
            paths,
        };
        for child in children {
            self.stage(child, Some(&frame), out)?;
        }
        Ok(())
    }

    fn resolve_paths(&self, own: Option<RoutePath>, localize: bool, parent: Option<&Frame>) -> Paths {
        let top_level = parent.is_none();
        let parent_paths = parent.map(|p| &p.paths);

        match own {
            Some(RoutePath::Localized(map)) => {
                if !self.localized {
                    tracing::warn!(
                        languages = ?map.keys().collect::<Vec<_>>(),
                        "localized path declared on a non-localized router, skipping"
                    );
                    return Paths::Localized(IndexMap::new());
                }
                let paths = map
                    .into_iter()
                    .filter(|(lang, _)| self.languages.contains(lang))
                    .filter_map(|(lang, own)| {
                        let path = match parent_paths {
                            None => {
                                self.full_path(Some(own.as_str()), None, Some(lang.as_str()), true)
                            }
                            Some(Paths::Single(base)) => {
                                self.localize_nested(Some(own.as_str()), base.as_deref(), &lang)
                            }
                            Some(Paths::Localized(bases)) => {
                                let base = bases.get(&lang)?;
                                self.full_path(
                                    Some(own.as_str()),
                                    base.as_deref(),
                                    Some(lang.as_str()),
                                    false,
                                )
                            }
                        };
                        Some((lang, path))
                    })
                    .collect();
                Paths::Localized(paths)
            }
            own => {
                let own = match own {
                    Some(RoutePath::Single(path)) => Some(path),
                    _ => None,
                };
                match parent_paths {
                    Some(Paths::Localized(bases)) => Paths::Localized(
                        bases
                            .iter()
                            .map(|(lang, base)| {
                                let path = self.full_path(
                                    own.as_deref(),
                                    base.as_deref(),
                                    Some(lang.as_str()),
                                    false,
                                );
                                (lang.clone(), path)
                            })
                            .collect(),
                    ),
                    parent_paths => {
                        let base = match parent_paths {
                            Some(Paths::Single(base)) => base.as_deref(),
                            _ => None,
                        };
                        if localize && self.localized {
                            Paths::Localized(
                                self.languages
                                    .iter()
                                    .map(|lang| {
                                        let path = if top_level {
                                            self.full_path(
                                                own.as_deref(),
                                                None,
                                                Some(lang.as_str()),
                                                true,
                                            )
                                        } else {
                                            self.localize_nested(own.as_deref(), base, lang)
                                        };
                                        (lang.clone(), path)
                                    })
                                    .collect(),
                            )
                        } else {
                            Paths::Single(self.full_path(own.as_deref(), base, None, top_level))
                        }
                    }
                }
            }
        }
    }

    /// Composes the full template for one builder and language.
    ///
    /// Builders without a path of their own pass the parent path through so
    /// their subroutes still nest under it.
    fn full_path(
        &self,
        own: Option<&str>,
        base: Option<&str>,
        lang: Option<&str>,
        top_level: bool,
    ) -> Option<String> {
        let Some(own) = own else {
            return base.map(str::to_string);
        };
        let own = prepare_path(own);
        if !top_level {
            return Some(join_paths(base, &own));
        }

        let lang_segment = lang.map(|code| format!("/{{{LANG_VAR}:{code}}}"));
        let path = if self.prefer_prefix {
            let localized = join_paths(lang_segment.as_deref(), &own);
            self.with_prefix(&localized)
        } else {
            let prefixed = self.with_prefix(&own);
            join_paths(lang_segment.as_deref(), &prefixed)
        };
        Some(path)
    }

    /// Localizes a route nested under a parent that is not localized.
    ///
    /// The parent path already carries the router prefix, so the combined
    /// path is rebuilt as a top-level one to put the language segment where
    /// top-level routes have it.
    fn localize_nested(
        &self,
        own: Option<&str>,
        base: Option<&str>,
        lang: &str,
    ) -> Option<String> {
        let joined = self.full_path(own, base, None, false)?;
        tracing::debug!(path = %joined, lang, "localizing route nested under a plain parent");
        let unprefixed = self.without_prefix(&joined);
        self.full_path(Some(&unprefixed), None, Some(lang), true)
    }

    fn without_prefix(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            return path.to_string();
        }
        let prefix = prepare_path(&self.prefix);
        match path.strip_prefix(&prefix) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }

    fn with_prefix(&self, path: &str) -> String {
        if self.prefix.is_empty() {
            return path.to_string();
        }
        prepare_path(&format!("/{}/{}", self.prefix, path.trim_start_matches('/')))
    }
}

/// Leading `/`, no trailing `/` except for the root.
pub fn prepare_path(path: &str) -> String {
    let mut path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

fn join_paths(base: Option<&str>, own: &str) -> String {
    match base {
        None | Some("/" | "") => own.to_string(),
        Some(base) if own == "/" => base.to_string(),
        Some(base) => format!("{base}{own}"),
    }
}

fn join_non_empty(first: &str, second: &str, divider: char) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first}{divider}{second}"),
    }
}

fn qualify(module: &str, controller: &str, name: &str) -> String {
    let scoped = join_non_empty(controller, name, NAME_DIVIDER);
    join_non_empty(module, &scoped, NAME_DIVIDER)
}

fn dedup(methods: Vec<Method>) -> Vec<Method> {
    let mut unique = Vec::with_capacity(methods.len());
    for method in methods {
        if !unique.contains(&method) {
            unique.push(method);
        }
    }
    unique
}
