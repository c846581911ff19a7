//! Configuration schema types.
//!
//! This module defines the structure of every configuration section.

use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Deployment environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local development: detailed error pages, pretty logs.
    Development,
    /// Production: generic error pages, JSON logs, secure cookies.
    #[default]
    Production,
}

/// Application section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application name, used as the logging service name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: Environment::default(),
        }
    }
}

impl AppConfig {
    /// Returns `true` in the development environment.
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn default_app_name() -> String {
    "daedalus".to_string()
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON lines.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Log span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_line_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            span_events: false,
            file_line_info: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One entry of the `languages` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    /// Whether routes are generated for this language.
    #[serde(default)]
    pub enabled: bool,

    /// Whether this is the fallback language.
    #[serde(default)]
    pub default: bool,
}

/// Language table keyed by language code, in declaration order.
///
/// # Example
///
/// ```
/// use daedalus_config::Languages;
///
/// let languages = Languages::new()
///     .with("cs", true, true)
///     .with("en", true, false)
///     .with("de", false, false);
///
/// assert_eq!(languages.enabled_codes(), vec!["cs", "en"]);
/// assert_eq!(languages.default_code(), Some("cs"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Languages(IndexMap<String, LanguageConfig>);

impl Languages {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a language.
    #[must_use]
    pub fn with(mut self, code: impl Into<String>, enabled: bool, default: bool) -> Self {
        self.0
            .insert(code.into(), LanguageConfig { enabled, default });
        self
    }

    /// Codes of enabled languages, in declaration order.
    #[must_use]
    pub fn enabled_codes(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, l)| l.enabled)
            .map(|(code, _)| code.as_str())
            .collect()
    }

    /// Returns `true` if `code` is configured and enabled.
    #[must_use]
    pub fn is_enabled(&self, code: &str) -> bool {
        self.0.get(code).is_some_and(|l| l.enabled)
    }

    /// The first language that is both enabled and marked default.
    #[must_use]
    pub fn default_code(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, l)| l.enabled && l.default)
            .map(|(code, _)| code.as_str())
    }

    /// Iterates over all configured languages.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LanguageConfig)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns `true` if no language is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Router section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Serve language-prefixed routes and redirect to the default language.
    #[serde(default)]
    pub localized: bool,

    /// Path segment prepended to every route, without slashes.
    #[serde(default)]
    pub path_prefix: String,

    /// Place the prefix before the language segment instead of after it.
    #[serde(default)]
    pub prefer_prefix: bool,
}

impl RouterConfig {
    /// The prefix with surrounding slashes removed.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.path_prefix.trim_matches('/')
    }
}

/// `security.csrf.clean` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct CsrfCleanConfig {
    /// Route names whose GET requests keep existing CSRF tokens.
    #[serde(default)]
    pub ignore_routes: Vec<String>,
}

/// `security.csrf` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CsrfConfig {
    /// Enable the CSRF middleware.
    #[serde(default)]
    pub enabled: bool,

    /// Token lifetime in seconds.
    #[serde(default = "default_day_secs")]
    pub duration_secs: u64,

    /// Token cleanup behaviour.
    #[serde(default)]
    pub clean: CsrfCleanConfig,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration_secs: default_day_secs(),
            clean: CsrfCleanConfig::default(),
        }
    }
}

impl CsrfConfig {
    /// Token lifetime.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// One `security.firewall.<name>` rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct FirewallRuleConfig {
    /// Whether the rule is evaluated.
    #[serde(default)]
    pub enabled: bool,

    /// Redirect authenticated callers away instead of keeping anonymous ones out.
    #[serde(default)]
    pub invert: bool,

    /// Module names the rule covers.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Controller names the rule covers.
    #[serde(default)]
    pub controllers: Vec<String>,

    /// Full route names the rule covers.
    #[serde(default)]
    pub routes: Vec<String>,

    /// Regular expressions tested against route paths.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Route to redirect to when the rule fails.
    #[serde(default)]
    pub redirect_route: String,

    /// Roles that satisfy the rule.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Value of `X-Secret` that bypasses the rule.
    #[serde(default)]
    pub secret: String,
}

/// `security.rate_limit` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Enable the rate-limit middleware.
    #[serde(default)]
    pub enabled: bool,

    /// Requests allowed per interval (also the burst size).
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Interval length in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            attempts: default_attempts(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Interval length.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_attempts() -> u32 {
    60
}

fn default_interval_secs() -> u64 {
    60
}

/// One `security.role.<name>` entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Holders of this role pass every firewall rule.
    #[serde(default, rename = "super")]
    pub is_super: bool,
}

/// `security.session` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    #[serde(default = "default_day_secs")]
    pub duration_secs: u64,

    /// Extend the session on every request.
    #[serde(default)]
    pub renew: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_day_secs(),
            renew: false,
        }
    }
}

impl SessionConfig {
    /// Session lifetime.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// Security section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// CSRF protection.
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Named access rules.
    #[serde(default)]
    pub firewall: IndexMap<String, FirewallRuleConfig>,

    /// Per-client rate limiting.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Named roles.
    #[serde(default)]
    pub role: IndexMap<String, RoleConfig>,

    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
}

impl SecurityConfig {
    /// Names of roles configured as super roles.
    pub fn super_roles(&self) -> impl Iterator<Item = &str> {
        self.role
            .iter()
            .filter(|(_, r)| r.is_super)
            .map(|(name, _)| name.as_str())
    }
}

fn default_day_secs() -> u64 {
    24 * 60 * 60
}

/// Cache backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheAdapter {
    /// In-process map.
    #[default]
    Memory,
}

/// Cache section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Backend.
    #[serde(default)]
    pub adapter: CacheAdapter,

    /// How often the in-memory cache evicts expired entries, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            adapter: CacheAdapter::default(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    /// Sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_sweep_interval() -> u64 {
    1
}

/// Where component state lives between requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
    /// Server-side cache entry addressed by a cookie token.
    #[default]
    Cache,
    /// Encoded into the action URL query string.
    Query,
}

/// Component section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    /// State persistence strategy.
    #[serde(default)]
    pub state: StateMode,
}

fn default_true() -> bool {
    true
}
