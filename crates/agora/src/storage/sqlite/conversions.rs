//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.

use agora_core::forum::{Comment, Thread, User};
use chrono::{DateTime, Utc};
use rusqlite::Row;

/// Convert a SQLite row to a User.
///
/// Expected columns: id, username, password_hash, email, created, updated, karma
pub fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        created: parse_datetime(row, 4)?,
        updated: parse_datetime(row, 5)?,
        karma: row.get(6)?,
    })
}

/// Convert a SQLite row to a Thread without comments.
///
/// Expected columns: id, title, url, content, author_id, author_name, score,
/// comment_count, created, updated
pub fn row_to_thread(row: &Row) -> rusqlite::Result<Thread> {
    Ok(Thread {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        content: row.get(3)?,
        author_id: row.get(4)?,
        author_name: row.get(5)?,
        score: row.get(6)?,
        comment_count: row.get(7)?,
        created: parse_datetime(row, 8)?,
        updated: parse_datetime(row, 9)?,
        comments: Vec::new(),
    })
}

/// Convert a SQLite row to a Comment.
///
/// Expected columns: id, parent_id, author_id, author_name, thread_id,
/// thread_title, content, score, created, updated
pub fn row_to_comment(row: &Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        thread_id: row.get(4)?,
        thread_title: row.get(5)?,
        content: row.get(6)?,
        score: row.get(7)?,
        created: parse_datetime(row, 8)?,
        updated: parse_datetime(row, 9)?,
    })
}

/// Format a timestamp for storage.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn parse_datetime(row: &Row, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
        })
}
