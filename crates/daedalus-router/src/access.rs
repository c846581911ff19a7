//! Firewall rules and their evaluation.
//!
//! Rules are compiled from `security.firewall` once, attached to every route
//! they cover, and evaluated per request against the [`Caller`].

use std::sync::Arc;

use daedalus_config::FirewallRuleConfig;
use indexmap::IndexMap;
use regex::Regex;

use crate::error::{RouterError, RouterResult};

/// A compiled firewall rule.
#[derive(Debug, Clone)]
pub struct AccessRule {
    name: String,
    enabled: bool,
    invert: bool,
    modules: Vec<String>,
    controllers: Vec<String>,
    routes: Vec<String>,
    patterns: Vec<Regex>,
    redirect_route: Option<String>,
    roles: Vec<String>,
    secret: Option<String>,
}

impl AccessRule {
    /// Compiles one configured rule.
    pub fn from_config(name: impl Into<String>, config: &FirewallRuleConfig) -> RouterResult<Self> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| RouterError::invalid_pattern(p.as_str(), e)))
            .collect::<RouterResult<Vec<_>>>()?;

        Ok(Self {
            name: name.into(),
            enabled: config.enabled,
            invert: config.invert,
            modules: config.modules.clone(),
            controllers: config.controllers.clone(),
            routes: config.routes.clone(),
            patterns,
            redirect_route: non_empty(&config.redirect_route),
            roles: config.roles.clone(),
            secret: non_empty(&config.secret),
        })
    }

    /// Compiles every enabled rule, keeping configuration order.
    pub fn compile_all(
        rules: &IndexMap<String, FirewallRuleConfig>,
    ) -> RouterResult<Vec<Arc<AccessRule>>> {
        rules
            .iter()
            .filter(|(_, rule)| rule.enabled)
            .map(|(name, rule)| Self::from_config(name.as_str(), rule).map(Arc::new))
            .collect()
    }

    /// Rule name as configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the rule is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the rule only admits anonymous callers.
    pub fn is_invert(&self) -> bool {
        self.invert
    }

    /// Route name to redirect to when the rule rejects.
    pub fn redirect_route(&self) -> Option<&str> {
        self.redirect_route.as_deref()
    }

    /// Roles the rule admits.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Checks whether the rule covers a route.
    ///
    /// Criteria are tried by module, controller, qualified name, then path
    /// pattern. `path` is the template with the language placeholder already
    /// replaced by its code.
    pub fn applies_to(&self, module: &str, controller: &str, name: &str, path: &str) -> bool {
        (!module.is_empty() && self.modules.iter().any(|m| m == module))
            || (!controller.is_empty() && self.controllers.iter().any(|c| c == controller))
            || self.routes.iter().any(|r| r == name)
            || self.patterns.iter().any(|p| p.is_match(path))
    }

    fn admits(&self, caller: &Caller<'_>) -> bool {
        let secret_ok = matches!(
            (self.secret.as_deref(), caller.secret),
            (Some(expected), Some(given)) if expected == given
        );
        secret_ok
            || self.invert
            || (caller.authenticated && self.roles.is_empty())
            || self.roles.iter().any(|role| caller.roles.contains(role))
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Who is asking, as far as the firewall cares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caller<'a> {
    /// A session exists.
    pub authenticated: bool,
    /// The session holds a super role.
    pub is_super: bool,
    /// Roles held by the session.
    pub roles: &'a [String],
    /// Value of the `X-Secret` header.
    pub secret: Option<&'a str>,
}

/// Outcome of evaluating a route's rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Continue to the handler.
    Allow,
    /// Redirect to the named route. Empty means the site root.
    Redirect {
        /// Name of the rule that decided.
        rule: String,
        /// Target route name.
        route: String,
    },
    /// Respond `403 insufficient rights`.
    Deny {
        /// Name of the rule that decided.
        rule: String,
    },
}

/// Evaluates the rules attached to a route.
///
/// Invert rules bounce authenticated callers first. Super callers then pass
/// outright. Every remaining enabled rule must admit the caller.
///
/// # Example
///
/// ```rust
/// use daedalus_config::FirewallRuleConfig;
/// use daedalus_router::access::{evaluate, AccessDecision, AccessRule, Caller};
///
/// let rule = AccessRule::from_config("admin", &FirewallRuleConfig {
///     enabled: true,
///     roles: vec!["owner".into()],
///     ..FirewallRuleConfig::default()
/// }).unwrap();
///
/// let roles = vec!["owner".to_string()];
/// let caller = Caller { authenticated: true, roles: &roles, ..Caller::default() };
/// assert_eq!(evaluate(&[rule.into()], &caller), AccessDecision::Allow);
/// ```
pub fn evaluate(rules: &[Arc<AccessRule>], caller: &Caller<'_>) -> AccessDecision {
    let enabled = || rules.iter().filter(|rule| rule.enabled);

    if caller.authenticated {
        if let Some(rule) = enabled().find(|rule| rule.invert) {
            return AccessDecision::Redirect {
                rule: rule.name.clone(),
                route: rule.redirect_route.clone().unwrap_or_default(),
            };
        }
    }

    if caller.is_super {
        return AccessDecision::Allow;
    }

    for rule in enabled() {
        if rule.admits(caller) {
            continue;
        }
        return match &rule.redirect_route {
            Some(route) => AccessDecision::Redirect {
                rule: rule.name.clone(),
                route: route.clone(),
            },
            None => AccessDecision::Deny {
                rule: rule.name.clone(),
            },
        };
    }

    AccessDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(config: FirewallRuleConfig) -> Arc<AccessRule> {
        Arc::new(AccessRule::from_config("test", &config).unwrap())
    }

    fn roles_rule() -> Arc<AccessRule> {
        rule(FirewallRuleConfig {
            enabled: true,
            roles: vec!["editor".into()],
            ..FirewallRuleConfig::default()
        })
    }

    #[test]
    fn test_applies_by_each_criterion() {
        let r = rule(FirewallRuleConfig {
            enabled: true,
            modules: vec!["admin".into()],
            controllers: vec!["user".into()],
            routes: vec!["home".into()],
            patterns: vec!["^/cs/secret".into()],
            ..FirewallRuleConfig::default()
        });
        assert!(r.applies_to("admin", "", "x", "/x"));
        assert!(r.applies_to("", "user", "x", "/x"));
        assert!(r.applies_to("", "", "home", "/"));
        assert!(r.applies_to("", "", "x", "/cs/secret/area"));
        assert!(!r.applies_to("", "", "x", "/en/public"));
    }

    #[test]
    fn test_empty_scope_never_matches_empty_criteria() {
        let r = rule(FirewallRuleConfig {
            enabled: true,
            modules: vec![String::new()],
            ..FirewallRuleConfig::default()
        });
        assert!(!r.applies_to("", "", "home", "/"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let result = AccessRule::from_config(
            "bad",
            &FirewallRuleConfig {
                patterns: vec!["(".into()],
                ..FirewallRuleConfig::default()
            },
        );
        assert!(matches!(result, Err(RouterError::InvalidPattern { .. })));
    }

    #[test]
    fn test_compile_all_skips_disabled() {
        let mut rules = IndexMap::new();
        rules.insert("on".to_string(), FirewallRuleConfig {
            enabled: true,
            ..FirewallRuleConfig::default()
        });
        rules.insert("off".to_string(), FirewallRuleConfig::default());
        let compiled = AccessRule::compile_all(&rules).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].name(), "on");
    }

    #[test]
    fn test_invert_redirects_authenticated() {
        let rules = [rule(FirewallRuleConfig {
            enabled: true,
            invert: true,
            redirect_route: "dashboard".into(),
            ..FirewallRuleConfig::default()
        })];
        let caller = Caller {
            authenticated: true,
            ..Caller::default()
        };
        assert_eq!(
            evaluate(&rules, &caller),
            AccessDecision::Redirect {
                rule: "test".into(),
                route: "dashboard".into()
            }
        );
        assert_eq!(evaluate(&rules, &Caller::default()), AccessDecision::Allow);
    }

    #[test]
    fn test_anonymous_denied_without_redirect() {
        let decision = evaluate(&[roles_rule()], &Caller::default());
        assert_eq!(decision, AccessDecision::Deny { rule: "test".into() });
    }

    #[test]
    fn test_redirect_on_failure() {
        let rules = [rule(FirewallRuleConfig {
            enabled: true,
            redirect_route: "login".into(),
            ..FirewallRuleConfig::default()
        })];
        assert!(matches!(
            evaluate(&rules, &Caller::default()),
            AccessDecision::Redirect { route, .. } if route == "login"
        ));
    }

    #[test]
    fn test_authenticated_without_roles_passes_roleless_rule() {
        let rules = [rule(FirewallRuleConfig {
            enabled: true,
            ..FirewallRuleConfig::default()
        })];
        let caller = Caller {
            authenticated: true,
            ..Caller::default()
        };
        assert_eq!(evaluate(&rules, &caller), AccessDecision::Allow);
    }

    #[test]
    fn test_role_mismatch_denied_and_super_passes() {
        let roles = vec!["viewer".to_string()];
        let caller = Caller {
            authenticated: true,
            roles: &roles,
            ..Caller::default()
        };
        assert!(matches!(
            evaluate(&[roles_rule()], &caller),
            AccessDecision::Deny { .. }
        ));

        let boss = Caller {
            is_super: true,
            ..caller
        };
        assert_eq!(evaluate(&[roles_rule()], &boss), AccessDecision::Allow);
    }

    #[test]
    fn test_secret_header_bypass() {
        let rules = [rule(FirewallRuleConfig {
            enabled: true,
            roles: vec!["editor".into()],
            secret: "s3cr3t".into(),
            ..FirewallRuleConfig::default()
        })];
        let caller = Caller {
            secret: Some("s3cr3t"),
            ..Caller::default()
        };
        assert_eq!(evaluate(&rules, &caller), AccessDecision::Allow);

        let wrong = Caller {
            secret: Some("nope"),
            ..Caller::default()
        };
        assert!(matches!(evaluate(&rules, &wrong), AccessDecision::Deny { .. }));
    }

    #[test]
    fn test_disabled_rules_ignored() {
        let rules = [rule(FirewallRuleConfig {
            enabled: false,
            roles: vec!["editor".into()],
            ..FirewallRuleConfig::default()
        })];
        assert_eq!(evaluate(&rules, &Caller::default()), AccessDecision::Allow);
    }
}
