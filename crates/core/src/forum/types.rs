use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered forum member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Encoded password hash, never the plain text password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Sum of the scores of the user's threads and comments.
    pub karma: i64,
}

/// Data required to register a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A submitted story: a link, a text post, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub author_id: i64,
    pub author_name: String,
    pub score: i64,
    pub comment_count: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Flat comment list, only filled by "with comments" lookups.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Thread {
    /// Host part of the story URL, used for the "from" listing.
    pub fn host(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
    }
}

/// Data required to create a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub author_id: i64,
}

/// A comment on a thread. `parent_id == 0` marks a top-level comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub parent_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub thread_id: i64,
    /// Title of the owning thread, filled by listings that span threads.
    #[serde(default)]
    pub thread_title: String,
    pub content: String,
    pub score: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }
}

/// Data required to create a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub parent_id: i64,
    pub thread_id: i64,
    pub author_id: i64,
    pub content: String,
}
