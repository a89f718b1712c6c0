use chrono::Duration;

use super::{AuthError, SessionData, SessionId};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Server-side session storage keyed by the session cookie value.
pub trait SessionStore: Send + Sync {
    /// Loads the session data, `None` when missing or expired.
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>>;

    /// Stores the session data, replacing any previous value, for `ttl`.
    fn save(&self, id: &SessionId, data: &SessionData, ttl: Duration) -> Result<()>;

    /// Deletes a session. Deleting a missing session is not an error.
    fn delete(&self, id: &SessionId) -> Result<()>;
}

/// Mints and checks CSRF tokens bound to a subject and an action.
pub trait CsrfGenerator {
    /// Mints a token for `(subject, action)`.
    fn generate(&mut self, subject: &str, action: &str) -> String;

    /// Checks a token minted for `(subject, action)`.
    fn valid(&mut self, token: &str, subject: &str, action: &str) -> bool;
}

/// Opaque password hash and verify capability.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plain text password into a self-describing string.
    fn hash(&self, password: &str) -> Result<String>;

    /// Verifies a plain text password against a stored hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}
