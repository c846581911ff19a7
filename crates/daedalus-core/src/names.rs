//! Reserved cookie, header and query parameter names.

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "X-Session";
/// Prefix of cookies carrying CSRF tokens (`X-Csrf-<name>`).
pub const CSRF_COOKIE: &str = "X-Csrf";
/// Cookie carrying the active language.
pub const LANG_COOKIE: &str = "X-Lang";
/// Cookie carrying the flash message token.
pub const FLASH_COOKIE: &str = "X-Flash";
/// Prefix of cookies carrying component state tokens (`X-State[-<name>]`).
pub const STATE_COOKIE: &str = "X-State";
/// Cookie marking a pending two-factor verification.
pub const TFA_COOKIE: &str = "X-Tfa";

/// Header carrying the firewall bypass secret.
pub const SECRET_HEADER: &str = "X-Secret";
/// Header carrying the client address behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";
/// Header carrying the client address set by some proxies.
pub const REAL_IP_HEADER: &str = "X-Real-Ip";
/// Header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Query parameter naming the component action to invoke.
pub const ACTION_PARAM: &str = "action";
/// Query parameter overriding the language.
pub const LANG_PARAM: &str = "lang";
/// Path variable carrying the language on localized routes.
pub const LANG_VAR: &str = "lang";

/// Form field carrying the CSRF token.
pub const CSRF_TOKEN_FIELD: &str = "csrf-token";
/// Form field carrying the CSRF form name.
pub const CSRF_NAME_FIELD: &str = "csrf-name";

/// Separator between module, controller and route names.
pub const NAME_DIVIDER: char = '.';
/// Separator inside component identities and action strings.
pub const ACTION_DIVIDER: char = '_';
/// Separator between a parent route name and its subroute name.
pub const SUBROUTE_DIVIDER: char = '-';

/// Cookie name for a scoped value: `base` or `base-scope`.
///
/// ```
/// use daedalus_core::names::{scoped, STATE_COOKIE};
///
/// assert_eq!(scoped(STATE_COOKIE, ""), "X-State");
/// assert_eq!(scoped(STATE_COOKIE, "cart"), "X-State-cart");
/// ```
#[must_use]
pub fn scoped(base: &str, scope: &str) -> String {
    if scope.is_empty() {
        base.to_string()
    } else {
        format!("{base}{SUBROUTE_DIVIDER}{scope}")
    }
}
