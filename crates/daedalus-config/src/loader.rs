//! Layered configuration loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, DaedalusConfig, Environment, LogFormat, StateMode};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables named `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("config/app.toml")?
///     .with_dotenv()?
///     .with_env_prefix("DAEDALUS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = DaedalusConfig::default();
        self
    }

    /// Start from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DaedalusConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DaedalusConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or `json`).
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// With prefix `DAEDALUS`, `DAEDALUS__ROUTER__LOCALIZED=true` enables
    /// localized routing.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file in the working directory.
    ///
    /// A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply environment overrides, validate and return the configuration.
    pub fn load(mut self) -> Result<DaedalusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without applying overrides or validating.
    #[must_use]
    pub fn load_unvalidated(self) -> DaedalusConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<DaedalusConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let env_vars: HashMap<String, String> =
            env::vars().filter(|(k, _)| k.starts_with(prefix)).collect();

        for (key, value) in env_vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["APP", "NAME"] => config.app.name = value.to_string(),
            ["APP", "ENVIRONMENT"] => {
                config.app.environment = match value.to_lowercase().as_str() {
                    "development" => Environment::Development,
                    "production" => Environment::Production,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'development' or 'production'",
                        ))
                    }
                };
            }

            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_int(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_int(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_int(key, value)?;
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_bool_var(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            ["ROUTER", "LOCALIZED"] => config.router.localized = parse_bool_var(key, value)?,
            ["ROUTER", "PATH_PREFIX"] => config.router.path_prefix = value.to_string(),
            ["ROUTER", "PREFER_PREFIX"] => {
                config.router.prefer_prefix = parse_bool_var(key, value)?;
            }

            ["SECURITY", "CSRF", "ENABLED"] => {
                config.security.csrf.enabled = parse_bool_var(key, value)?;
            }
            ["SECURITY", "CSRF", "DURATION_SECS"] => {
                config.security.csrf.duration_secs = parse_int(key, value)?;
            }
            ["SECURITY", "RATE_LIMIT", "ENABLED"] => {
                config.security.rate_limit.enabled = parse_bool_var(key, value)?;
            }
            ["SECURITY", "RATE_LIMIT", "ATTEMPTS"] => {
                config.security.rate_limit.attempts = parse_int(key, value)?;
            }
            ["SECURITY", "RATE_LIMIT", "INTERVAL_SECS"] => {
                config.security.rate_limit.interval_secs = parse_int(key, value)?;
            }
            ["SECURITY", "SESSION", "DURATION_SECS"] => {
                config.security.session.duration_secs = parse_int(key, value)?;
            }
            ["SECURITY", "SESSION", "RENEW"] => {
                config.security.session.renew = parse_bool_var(key, value)?;
            }

            ["CACHE", "SWEEP_INTERVAL_SECS"] => {
                config.cache.sweep_interval_secs = parse_int(key, value)?;
            }

            ["COMPONENT", "STATE"] => {
                config.component.state = match value.to_lowercase().as_str() {
                    "cache" => StateMode::Cache,
                    "query" => StateMode::Query,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'cache' or 'query'",
                        ))
                    }
                };
            }

            _ => {}
        }

        Ok(())
    }
}

fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.component.state, StateMode::Cache);
    }

    #[test]
    fn test_loader_with_development() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            [languages]
            cs = { enabled = true, default = true }
            en = { enabled = true }

            [router]
            localized = true
            path_prefix = "app"

            [security.csrf]
            enabled = true

            [security.csrf.clean]
            ignore_routes = ["home"]

            [component]
            state = "query"
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.router.localized);
        assert_eq!(config.router.prefix(), "app");
        assert_eq!(config.languages.default_code(), Some("cs"));
        assert_eq!(config.security.csrf.clean.ignore_routes, vec!["home"]);
        assert_eq!(config.component.state, StateMode::Query);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"router": {"localized": false, "path_prefix": "x"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.router.path_prefix, "x");
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let result = ConfigLoader::new().with_string("[database]\nurl = \"x\"", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[app]\nname = \"blog\"\nenvironment = \"development\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.app.name, "blog");
        assert!(config.app.is_development());
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/config.toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_apply_env_var_router() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__ROUTER__LOCALIZED", "yes", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__ROUTER__PATH_PREFIX", "admin", "TEST")
            .unwrap();
        assert!(loader.config.router.localized);
        assert_eq!(loader.config.router.path_prefix, "admin");
    }

    #[test]
    fn test_apply_env_var_security() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SECURITY__RATE_LIMIT__ATTEMPTS", "5", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__SECURITY__CSRF__ENABLED", "true", "TEST")
            .unwrap();
        assert_eq!(loader.config.security.rate_limit.attempts, 5);
        assert!(loader.config.security.csrf.enabled);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__SERVER__SHUTDOWN_TIMEOUT_SECS", "soon", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__COMPONENT__STATE", "cookie", "TEST")
            .is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("TEST__NOPE__X", "1", "TEST").is_ok());
    }
}
