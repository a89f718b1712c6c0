use std::{env, time::Duration};

/// Application configuration loaded from environment variables.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Show error details and a request dump in rendered pages (default: false)
    pub debug: bool,
    /// Key mixed into CSRF token digests (default: random per process)
    pub secret: String,
    /// Site title (default: "agora")
    pub title: String,
    /// Site slogan shown under the title
    pub slogan: String,
    /// Site description for the meta tag
    pub description: String,
    /// Threads per listing page (default: 100)
    pub threads_per_page: usize,
    /// Comments per listing page (default: 100)
    pub comments_per_page: usize,
    /// Deepest comment that still accepts replies (default: 5)
    pub comment_max_depth: usize,
    /// Directory served under `/public` (default: "public")
    pub public_dir: String,
    /// Path to SQLite database file (default: "agora.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    pub sqlite_path: String,
    /// Request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `AGORA_DEBUG` - Debug mode, `true` or `1` (default: false)
    /// - `AGORA_SECRET` - CSRF secret (default: random, tokens die with the process)
    /// - `AGORA_TITLE` - Site title (default: "agora")
    /// - `AGORA_SLOGAN` - Site slogan
    /// - `AGORA_DESCRIPTION` - Site description
    /// - `THREADS_PER_PAGE` - Threads per page (default: 100)
    /// - `COMMENTS_PER_PAGE` - Comments per page (default: 100)
    /// - `COMMENT_MAX_DEPTH` - Maximum reply depth (default: 5)
    /// - `PUBLIC_DIR` - Static files directory (default: "public")
    /// - `SQLITE_PATH` - SQLite database path (default: "agora.db")
    /// - `REQUEST_TIMEOUT_SECS` - Request timeout (default: 10)
    pub fn from_env() -> Self {
        Self {
            debug: env::var("AGORA_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            secret: env::var("AGORA_SECRET")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(agora_core::auth::generate_token),
            title: env::var("AGORA_TITLE").unwrap_or_else(|_| "agora".to_string()),
            slogan: env::var("AGORA_SLOGAN")
                .unwrap_or_else(|_| "news, links and long threads".to_string()),
            description: env::var("AGORA_DESCRIPTION")
                .unwrap_or_else(|_| "A small discussion forum".to_string()),
            threads_per_page: parse_var("THREADS_PER_PAGE", 100),
            comments_per_page: parse_var("COMMENTS_PER_PAGE", 100),
            comment_max_depth: parse_var("COMMENT_MAX_DEPTH", 5),
            public_dir: env::var("PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "agora.db".to_string()),
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", 10),
        }
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether a secret was provided, rather than generated for this process.
    pub fn has_configured_secret() -> bool {
        env::var("AGORA_SECRET").is_ok_and(|v| !v.is_empty())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_conversion() {
        let config = Config {
            request_timeout_secs: 30,
            ..Config::from_env()
        };

        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        for name in [
            "AGORA_DEBUG",
            "AGORA_SECRET",
            "AGORA_TITLE",
            "THREADS_PER_PAGE",
            "COMMENTS_PER_PAGE",
            "COMMENT_MAX_DEPTH",
            "PUBLIC_DIR",
            "SQLITE_PATH",
            "REQUEST_TIMEOUT_SECS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();

        assert!(!config.debug);
        assert_eq!(config.secret.len(), 32);
        assert_eq!(config.title, "agora");
        assert_eq!(config.threads_per_page, 100);
        assert_eq!(config.comments_per_page, 100);
        assert_eq!(config.comment_max_depth, 5);
        assert_eq!(config.public_dir, "public");
        assert_eq!(config.sqlite_path, "agora.db");
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_generated_secrets_differ_per_load() {
        env::remove_var("AGORA_SECRET");
        assert_ne!(Config::from_env().secret, Config::from_env().secret);
    }
}
