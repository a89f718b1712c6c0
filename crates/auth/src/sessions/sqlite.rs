//! SQLite session storage implementation.

use std::path::Path;
use std::sync::Mutex;

use agora_core::auth::{
    calculate_expiry, AuthError, Result, SessionData, SessionId, SessionStore,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed session storage.
///
/// Session data is stored as JSON next to an RFC 3339 expiry. Expired rows
/// are ignored on load and purged on save.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

fn storage_error(e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(e.to_string())
}

impl SqliteSessionStore {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        Self::from_connection(conn)
    }

    /// Creates a store backed by a private in-memory database.
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Runs database migrations to create required tables.
    fn migrate(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    data TEXT NOT NULL,
                    expires_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
                "#,
            )
            .map_err(storage_error)
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AuthError::Storage("session database lock poisoned".to_string()))
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionData>> {
        let row = self
            .conn()?
            .query_row(
                "SELECT data, expires_at FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(storage_error)?;

        let Some((data, expires_at)) = row else {
            return Ok(None);
        };
        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(storage_error)?
            .with_timezone(&Utc);
        if expires_at <= Utc::now() {
            return Ok(None);
        }
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|e| AuthError::Serialization(e.to_string()))
    }

    fn save(&self, id: &SessionId, data: &SessionData, ttl: Duration) -> Result<()> {
        let now = Utc::now();
        let json = serde_json::to_string(data).map_err(|e| AuthError::Serialization(e.to_string()))?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, data, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, expires_at = excluded.expires_at",
            params![id.as_str(), json, calculate_expiry(now, ttl).to_rfc3339()],
        )
        .map_err(storage_error)?;
        conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now.to_rfc3339()],
        )
        .map_err(storage_error)?;
        Ok(())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM sessions WHERE id = ?1", params![id.as_str()])
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::auth::FlashKind;

    fn session_id(id: &str) -> SessionId {
        SessionId::new(id.to_string())
    }

    #[test]
    fn test_save_and_load() {
        let store = SqliteSessionStore::new_in_memory().unwrap();
        let id = session_id("session-1");
        let mut data = SessionData::new();
        data.set_user_id(42);
        data.add_flash(FlashKind::Success, "welcome");

        store.save(&id, &data, Duration::hours(1)).unwrap();

        let mut loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded.user_id(), Some(42));
        assert_eq!(loaded.take_flashes().len(), 1);
    }

    #[test]
    fn test_save_upserts() {
        let store = SqliteSessionStore::new_in_memory().unwrap();
        let id = session_id("session-1");
        let mut data = SessionData::new();
        data.set_user_id(1);
        store.save(&id, &data, Duration::hours(1)).unwrap();

        data.set_user_id(2);
        store.save(&id, &data, Duration::hours(1)).unwrap();

        assert_eq!(store.load(&id).unwrap().unwrap().user_id(), Some(2));
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let store = SqliteSessionStore::new_in_memory().unwrap();
        let id = session_id("session-1");

        store.save(&id, &SessionData::new(), Duration::zero()).unwrap();

        assert!(store.load(&id).unwrap().is_none());
    }

    #[test]
    fn test_delete_session() {
        let store = SqliteSessionStore::new_in_memory().unwrap();
        let id = session_id("session-1");

        store.save(&id, &SessionData::new(), Duration::hours(1)).unwrap();
        store.delete(&id).unwrap();

        assert!(store.load(&id).unwrap().is_none());
        store.delete(&id).unwrap();
    }
}
