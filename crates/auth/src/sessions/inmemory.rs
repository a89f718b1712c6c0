//! In-memory session storage for development and testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use agora_core::auth::{
    calculate_expiry, is_expired, AuthError, Result, SessionData, SessionId, SessionStore,
};
use chrono::{DateTime, Duration, Utc};

type Entries = HashMap<String, (SessionData, DateTime<Utc>)>;

/// In-memory session store.
///
/// Stores session data with its expiry in a HashMap wrapped in `Arc<RwLock<_>>`.
/// Data is not persisted and will be lost when the store is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<Entries>>,
}

impl InMemorySessionStore {
    /// Creates a new empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> AuthError {
    AuthError::Storage("session store lock poisoned".to_string())
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().map_err(poisoned)?;
            match sessions.get(id.as_str()) {
                None => return Ok(None),
                Some((data, expires_at)) if !is_expired(*expires_at, now) => {
                    return Ok(Some(data.clone()))
                }
                Some(_) => {}
            }
        }
        // expired: drop it so the map does not grow without bound
        self.sessions.write().map_err(poisoned)?.remove(id.as_str());
        Ok(None)
    }

    fn save(&self, id: &SessionId, data: &SessionData, ttl: Duration) -> Result<()> {
        let expires_at = calculate_expiry(Utc::now(), ttl);
        self.sessions
            .write()
            .map_err(poisoned)?
            .insert(id.as_str().to_string(), (data.clone(), expires_at));
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().map_err(poisoned)?.remove(id.as_str());
        Ok(())
    }
}
