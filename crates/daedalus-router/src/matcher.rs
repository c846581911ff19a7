//! Path template compilation.
//!
//! A template is a `/`-separated list of segments. Each segment is one of:
//!
//! - a literal (`blog`)
//! - `{name}`, one non-slash segment
//! - `{name:pattern}`, a segment matching `pattern`
//! - `*`, the rest of the path
//!
//! The compiled regex is anchored and tolerates one trailing slash.
//!
//! # Example
//!
//! ```rust
//! use daedalus_router::matcher::{compile_matcher, matcher_pattern};
//!
//! assert_eq!(matcher_pattern("/blog/{id:[0-9]+}"), "^/blog/[0-9]+/?$");
//!
//! let matcher = compile_matcher("/blog/{id:[0-9]+}").unwrap();
//! assert!(matcher.is_match("/blog/12/"));
//! assert!(!matcher.is_match("/blog/abc"));
//! ```

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// Segment matching the remainder of a path.
pub const WILDCARD: &str = "*";

const WILDCARD_PATTERN: &str = ".*";
const VAR_PATTERN: &str = "[^/]+";

/// A placeholder segment split into its name and optional pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'a> {
    /// Variable name.
    pub name: &'a str,
    /// Custom pattern, if one was given.
    pub pattern: Option<&'a str>,
}

impl<'a> Placeholder<'a> {
    /// Parses `{name}` or `{name:pattern}`. Anything else is a literal.
    #[must_use]
    pub fn parse(segment: &'a str) -> Option<Self> {
        let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
        Some(match inner.split_once(':') {
            Some((name, pattern)) => Self {
                name,
                pattern: Some(pattern),
            },
            None => Self {
                name: inner,
                pattern: None,
            },
        })
    }

    fn regex(&self) -> &'a str {
        self.pattern.unwrap_or(VAR_PATTERN)
    }
}

/// Builds the regex source for a template.
#[must_use]
pub fn matcher_pattern(path: &str) -> String {
    let expanded: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment == WILDCARD {
                WILDCARD_PATTERN
            } else if let Some(placeholder) = Placeholder::parse(segment) {
                placeholder.regex()
            } else {
                segment
            }
        })
        .collect();

    format!("^/{}/?$", expanded.join("/"))
}

/// Compiles a template into its anchored matcher.
pub fn compile_matcher(path: &str) -> RouterResult<Regex> {
    let pattern = matcher_pattern(path);
    Regex::new(&pattern).map_err(|e| RouterError::invalid_pattern(pattern, e))
}

/// Maps each placeholder name to the literal placeholder text, in path order.
///
/// ```rust
/// use daedalus_router::matcher::vars_placeholders;
///
/// let vars = vars_placeholders("/{lang:cs}/blog/{id:[0-9]+}");
/// assert_eq!(vars.get("lang").map(String::as_str), Some("{lang:cs}"));
/// assert_eq!(vars.get("id").map(String::as_str), Some("{id:[0-9]+}"));
/// ```
#[must_use]
pub fn vars_placeholders(path: &str) -> IndexMap<String, String> {
    path.split('/')
        .filter_map(|segment| {
            Placeholder::parse(segment).map(|p| (p.name.to_string(), segment.to_string()))
        })
        .collect()
}
