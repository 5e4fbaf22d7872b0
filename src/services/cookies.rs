//! Cookie names and builders shared by the account handlers.

use actix_web::cookie::{Cookie, SameSite};

use crate::config::Config;

pub const ACCESS_TOKEN_COOKIE: &str = "snaily-cad-session";
pub const REFRESH_TOKEN_COOKIE: &str = "snaily-cad-refresh-token";
pub const DARK_THEME_COOKIE: &str = "sn_isDarkTheme";
pub const LOCALE_COOKIE: &str = "sn_locale";

/// An immediately-expiring cookie that makes the browser drop `name`.
pub fn expired(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}

/// A client-readable preference cookie.
pub fn preference(name: &'static str, value: String, config: &Config) -> Cookie<'static> {
    Cookie::build(name, value)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .max_age(config.cookie_max_age)
        .finish()
}
