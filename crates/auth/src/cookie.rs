//! Session cookie helpers.

use std::net::IpAddr;

use agora_core::auth::SessionId;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::SessionConfig;

/// Reads the session id from the request's `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let jar = CookieJar::from_headers(headers);
    jar.get(cookie_name)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(|value| SessionId::new(value.to_string()))
}

/// Cookie `Domain` for a request `Host` header value.
///
/// The port is dropped. IP literals and single-label hosts such as
/// `localhost` get a host-only cookie instead, since browsers reject a
/// `Domain` attribute for them.
pub fn cookie_domain(host: &str) -> Option<String> {
    let host = host.trim();
    let without_port = match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit())
                && (name.ends_with(']') || !name.contains(':')) =>
        {
            name
        }
        _ => host,
    };
    let name = without_port.trim_start_matches('[').trim_end_matches(']');
    if name.is_empty() || name.parse::<IpAddr>().is_ok() || !name.contains('.') {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

/// Builds the `Set-Cookie` value carrying the session id.
///
/// Cookie properties:
/// - Path: / (accessible from any page)
/// - HttpOnly (not readable from JavaScript)
/// - SameSite: Lax (sent on navigation, not cross-site requests)
/// - Max-Age: the configured session lifetime
/// - Domain: the request host, when it is a domain name
pub fn build_session_cookie(config: &SessionConfig, id: &SessionId, host: Option<&str>) -> String {
    let mut cookie = Cookie::build((config.cookie_name.clone(), id.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::seconds(config.max_age_secs))
        .build();
    if let Some(domain) = host.and_then(cookie_domain) {
        cookie.set_domain(domain);
    }
    cookie.to_string()
}
