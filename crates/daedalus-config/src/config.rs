//! Top-level configuration.

use serde::{Deserialize, Serialize};

use daedalus_telemetry::LogConfig;

use crate::{
    AppConfig, CacheConfig, ComponentConfig, ConfigError, Environment, Languages, LogFormat,
    LoggingConfig, RouterConfig, SecurityConfig, ServerConfig,
};

/// Complete Daedalus application configuration.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(!config.router.localized);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Application settings.
    #[serde(default)]
    pub app: AppConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Languages keyed by code.
    #[serde(default)]
    pub languages: Languages,

    /// Route compilation settings.
    #[serde(default)]
    pub router: RouterConfig,

    /// CSRF, firewall, rate limiting, roles and sessions.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Cache backend.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Component state handling.
    #[serde(default)]
    pub component: ComponentConfig,
}

impl DaedalusConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> DaedalusConfigBuilder {
        DaedalusConfigBuilder::new()
    }

    /// Development preset: pretty debug logs and detailed error pages.
    #[must_use]
    pub fn development() -> Self {
        Self {
            app: AppConfig {
                environment: Environment::Development,
                ..AppConfig::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                span_events: true,
                file_line_info: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON logs and generic error pages.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .server
            .http_addr
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        let defaults = self
            .languages
            .iter()
            .filter(|(_, l)| l.enabled && l.default)
            .count();
        if defaults > 1 {
            return Err(ConfigError::invalid_value(
                "languages",
                "only one enabled language may be the default",
            ));
        }

        if self.router.localized && self.languages.default_code().is_none() {
            return Err(ConfigError::validation_error(
                "router.localized requires an enabled default language",
            ));
        }

        let rate_limit = &self.security.rate_limit;
        if rate_limit.enabled && (rate_limit.attempts == 0 || rate_limit.interval_secs == 0) {
            return Err(ConfigError::invalid_value(
                "security.rate_limit",
                "attempts and interval_secs must be positive",
            ));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid_value(
                "cache.sweep_interval_secs",
                "must be positive",
            ));
        }

        for (name, rule) in &self.security.firewall {
            for role in &rule.roles {
                if !self.security.role.is_empty() && !self.security.role.contains_key(role) {
                    return Err(ConfigError::invalid_value(
                        format!("security.firewall.{name}.roles"),
                        format!("unknown role: {role}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Logging settings for [`daedalus_telemetry::init_logging`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            span_events: self.logging.span_events,
            file_line_info: self.logging.file_line_info,
            thread_ids: false,
            include_target: true,
            service_name: self.app.name.clone(),
        }
    }
}

/// Builder for [`DaedalusConfig`].
#[derive(Debug, Default)]
pub struct DaedalusConfigBuilder {
    config: DaedalusConfig,
}

impl DaedalusConfigBuilder {
    /// Starts from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application section.
    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.config.app = app;
        self
    }

    /// Set the server section.
    #[must_use]
    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    /// Set the languages table.
    #[must_use]
    pub fn languages(mut self, languages: Languages) -> Self {
        self.config.languages = languages;
        self
    }

    /// Set the router section.
    #[must_use]
    pub fn router(mut self, router: RouterConfig) -> Self {
        self.config.router = router;
        self
    }

    /// Set the security section.
    #[must_use]
    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// Set the cache section.
    #[must_use]
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set the component section.
    #[must_use]
    pub fn component(mut self, component: ComponentConfig) -> Self {
        self.config.component = component;
        self
    }

    /// Build without validation.
    #[must_use]
    pub fn build(self) -> DaedalusConfig {
        self.config
    }

    /// Build and validate.
    pub fn build_validated(self) -> Result<DaedalusConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FirewallRuleConfig, RateLimitConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(DaedalusConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let config = DaedalusConfig::builder()
            .server(ServerConfig {
                http_addr: "nowhere".to_string(),
                ..ServerConfig::default()
            })
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_localized_needs_default_language() {
        let result = DaedalusConfig::builder()
            .languages(Languages::new().with("cs", true, false))
            .router(RouterConfig {
                localized: true,
                ..RouterConfig::default()
            })
            .build_validated();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = DaedalusConfig::builder()
            .languages(Languages::new().with("cs", true, true))
            .router(RouterConfig {
                localized: true,
                ..RouterConfig::default()
            })
            .build_validated();
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_two_default_languages() {
        let result = DaedalusConfig::builder()
            .languages(Languages::new().with("cs", true, true).with("en", true, true))
            .build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rate_limit_zero_attempts() {
        let mut security = SecurityConfig::default();
        security.rate_limit = RateLimitConfig {
            enabled: true,
            attempts: 0,
            interval_secs: 60,
        };
        let result = DaedalusConfig::builder().security(security).build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_firewall_unknown_role() {
        let mut security = SecurityConfig::default();
        security.role.insert("owner".into(), crate::RoleConfig { is_super: true });
        security.firewall.insert(
            "admin".into(),
            FirewallRuleConfig {
                enabled: true,
                roles: vec!["ghost".into()],
                ..FirewallRuleConfig::default()
            },
        );
        let result = DaedalusConfig::builder().security(security).build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn test_development_preset() {
        let config = DaedalusConfig::development();
        assert!(config.app.is_development());
        let log = config.log_config();
        assert!(!log.json_format);
        assert_eq!(log.level, "debug");
    }

    #[test]
    fn test_production_log_config() {
        let config = DaedalusConfig::production();
        let log = config.log_config();
        assert!(log.json_format);
        assert_eq!(log.service_name, "daedalus");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = DaedalusConfig::development();
        let text = toml::to_string(&config).unwrap();
        let parsed: DaedalusConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
