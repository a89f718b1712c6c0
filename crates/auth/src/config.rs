use std::env;

use chrono::Duration;

/// Session cookie and CSRF settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,
    /// Session lifetime and cookie `Max-Age`, in seconds.
    pub max_age_secs: i64,
    /// Whether to set the `Secure` flag on the cookie.
    pub cookie_secure: bool,
    /// How long a minted CSRF token stays valid, in seconds.
    pub csrf_ttl_secs: i64,
}

impl SessionConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SESSION_NAME`: Session cookie name (default: `agora`)
    /// - `SESSION_MAX_AGE_SECS`: Session lifetime in seconds (default: 86400)
    /// - `COOKIE_SECURE`: Whether to set the secure flag on cookies (default: false)
    /// - `CSRF_TTL_SECS`: CSRF token lifetime in seconds (default: 3600)
    pub fn from_env() -> Self {
        Self {
            cookie_name: env::var("SESSION_NAME").unwrap_or_else(|_| "agora".to_string()),
            max_age_secs: env::var("SESSION_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            csrf_ttl_secs: env::var("CSRF_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3_600),
        }
    }

    /// Session lifetime as a Duration.
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.max_age_secs)
    }

    /// CSRF token lifetime as a Duration.
    pub fn csrf_ttl(&self) -> Duration {
        Duration::seconds(self.csrf_ttl_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "agora".to_string(),
            max_age_secs: 86_400,
            cookie_secure: false,
            csrf_ttl_secs: 3_600,
        }
    }
}
