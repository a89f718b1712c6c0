use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user.id";

const FLASHES_KEY: &str = "flashes";
const CSRF_KEY_PREFIX: &str = "csrf.";

/// Cryptographically random session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of a flash message, rendered as a CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Info,
    Notice,
    Error,
    Danger,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Error => "error",
            Self::Danger => "danger",
        }
    }
}

impl std::fmt::Display for FlashKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-time notification shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

/// A pending CSRF token as stored in the session.
///
/// Only a keyed digest of the token is kept, never the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrfEntry {
    pub subject: String,
    pub digest: String,
    pub issued_at: DateTime<Utc>,
}

/// Key/value bag persisted per browser session.
///
/// Values are JSON so any store can persist them as text. Well-known keys have
/// typed accessors; the generic ones are for everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(BTreeMap<String, Value>);

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and decodes a value. Values of another shape read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Removes a key, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    // ==================== Current user ====================

    pub fn user_id(&self) -> Option<i64> {
        self.0.get(USER_ID_KEY).and_then(Value::as_i64)
    }

    pub fn set_user_id(&mut self, id: i64) {
        self.0.insert(USER_ID_KEY.to_string(), Value::from(id));
    }

    pub fn clear_user_id(&mut self) -> bool {
        self.remove(USER_ID_KEY)
    }

    // ==================== Flashes ====================

    pub fn add_flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        let flash = json!({ "kind": kind.as_str(), "message": message.into() });
        match self.0.get_mut(FLASHES_KEY) {
            Some(Value::Array(flashes)) => flashes.push(flash),
            _ => {
                self.0.insert(FLASHES_KEY.to_string(), Value::Array(vec![flash]));
            }
        }
    }

    /// Removes and returns all pending flashes, oldest first.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        match self.0.remove(FLASHES_KEY) {
            Some(Value::Array(flashes)) => flashes
                .into_iter()
                .filter_map(|value| serde_json::from_value(value).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    // ==================== CSRF ====================

    pub fn put_csrf(&mut self, action: &str, entry: &CsrfEntry) {
        let value = json!({
            "subject": entry.subject,
            "digest": entry.digest,
            "issued_at": entry.issued_at,
        });
        self.0.insert(format!("{CSRF_KEY_PREFIX}{action}"), value);
    }

    /// Removes and returns the pending token for `action`.
    pub fn take_csrf(&mut self, action: &str) -> Option<CsrfEntry> {
        self.0
            .remove(&format!("{CSRF_KEY_PREFIX}{action}"))
            .and_then(|value| serde_json::from_value(value).ok())
    }
}
