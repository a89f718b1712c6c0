//! One-time CSRF tokens stored in the session.
//!
//! Minting a token for an action replaces any pending token for that action.
//! Checking a token consumes the pending one, whether the check passes or not,
//! so each token validates at most once.

use agora_core::auth::{
    calculate_expiry, generate_token, is_expired, CsrfEntry, CsrfGenerator, SessionData,
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

/// Keyed digests and expiry policy for session CSRF tokens.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    secret: String,
    ttl: Duration,
}

impl CsrfGuard {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Binds the guard to one request's session data.
    pub fn bind<'a>(&'a self, session: &'a mut SessionData) -> SessionCsrf<'a> {
        SessionCsrf {
            guard: self,
            session,
        }
    }

    fn digest(&self, subject: &str, action: &str, token: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [self.secret.as_str(), subject, action, token] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// A [`CsrfGuard`] bound to the session of the current request.
pub struct SessionCsrf<'a> {
    guard: &'a CsrfGuard,
    session: &'a mut SessionData,
}

impl CsrfGenerator for SessionCsrf<'_> {
    fn generate(&mut self, subject: &str, action: &str) -> String {
        let token = generate_token();
        let entry = CsrfEntry {
            subject: subject.to_string(),
            digest: self.guard.digest(subject, action, &token),
            issued_at: Utc::now(),
        };
        self.session.put_csrf(action, &entry);
        token
    }

    fn valid(&mut self, token: &str, subject: &str, action: &str) -> bool {
        let Some(entry) = self.session.take_csrf(action) else {
            tracing::debug!(action, "no pending csrf token");
            return false;
        };
        if entry.subject != subject {
            tracing::debug!(action, "csrf token minted for another subject");
            return false;
        }
        if is_expired(calculate_expiry(entry.issued_at, self.guard.ttl), Utc::now()) {
            tracing::debug!(action, "csrf token expired");
            return false;
        }
        constant_time_eq(
            entry.digest.as_bytes(),
            self.guard.digest(subject, action, token).as_bytes(),
        )
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
