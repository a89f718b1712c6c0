//! Session and credential capabilities for agora.
//!
//! This crate provides:
//! - Session storage (in-memory, or SQLite via the `sqlite` feature)
//! - Session cookie building and lookup
//! - One-time CSRF tokens kept in the session
//! - Argon2 password hashing

mod config;
mod cookie;
mod csrf;
mod error;
mod password;
mod sessions;

pub use config::SessionConfig;
pub use cookie::{build_session_cookie, cookie_domain, session_id_from_headers};
pub use csrf::{CsrfGuard, SessionCsrf};
pub use error::AuthError;
pub use password::Argon2Hasher;
pub use sessions::InMemorySessionStore;
#[cfg(feature = "sqlite")]
pub use sessions::SqliteSessionStore;
