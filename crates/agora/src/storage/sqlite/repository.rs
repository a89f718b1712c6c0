//! SQLite repository implementation.
//!
//! Implements the repository traits from `agora_core::storage` using SQLite.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use agora_core::forum::{Comment, NewComment, NewThread, NewUser, Thread, User};
use agora_core::storage::{
    CommentRepository, RepositoryError, RepositoryProvider, Result, ThreadRepository,
    UserRepository,
};

use super::conversions::{format_datetime, row_to_comment, row_to_thread, row_to_user};
use super::error::map_rusqlite_error;
use super::schema;

/// SQLite-based repository implementation.
///
/// Clones share one connection; the provider hands a clone to each request.
#[derive(Clone)]
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn =
            Connection::open(path).map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::init_schema(conn)
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the last clone is dropped.
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::init_schema(conn)
    }

    fn init_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::ConnectionFailed("connection lock poisoned".to_string()))
    }

    fn query_one<T>(
        &self,
        sql: &str,
        param: impl rusqlite::ToSql,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
        entity_type: &'static str,
        id: impl Into<String>,
    ) -> Result<Option<T>> {
        self.conn()?
            .query_row(sql, [param], map)
            .optional()
            .map_err(|e| map_rusqlite_error(e, entity_type, id))
    }

    fn query_all<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: fn(&rusqlite::Row) -> rusqlite::Result<T>,
        entity_type: &'static str,
    ) -> Result<Vec<T>> {
        let conn = self.conn()?;
        let run = || -> rusqlite::Result<Vec<T>> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params, map)?;
            rows.collect()
        };
        run().map_err(|e| map_rusqlite_error(e, entity_type, "list"))
    }
}

impl RepositoryProvider for SqliteRepository {
    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(self.clone())
    }

    fn threads(&self) -> Arc<dyn ThreadRepository> {
        Arc::new(self.clone())
    }

    fn comments(&self) -> Arc<dyn CommentRepository> {
        Arc::new(self.clone())
    }
}

/// Inserts a row and the author's vote for it in one transaction.
fn insert_with_vote(
    conn: &mut Connection,
    insert_sql: &str,
    values: impl rusqlite::Params,
    vote_sql: &str,
    author_id: i64,
) -> rusqlite::Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(insert_sql, values)?;
    let id = tx.last_insert_rowid();
    tx.execute(vote_sql, params![author_id, id])?;
    tx.commit()?;
    Ok(id)
}

fn limit_offset(limit: usize, offset: usize) -> (i64, i64) {
    (
        i64::try_from(limit).unwrap_or(i64::MAX),
        i64::try_from(offset).unwrap_or(i64::MAX),
    )
}

// ============================================================================
// UserRepository implementation
// ============================================================================

impl UserRepository for SqliteRepository {
    fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        self.query_one(&schema::select_user_by("id"), id, row_to_user, "User", id.to_string())
    }

    fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_one(
            &schema::select_user_by("username"),
            username,
            row_to_user,
            "User",
            username,
        )
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_one(&schema::select_user_by("email"), email, row_to_user, "User", email)
    }

    fn create(&self, user: NewUser) -> Result<User> {
        let now = format_datetime(&Utc::now());
        let id = {
            let conn = self.conn()?;
            conn.execute(
                schema::INSERT_USER,
                params![user.username, user.password_hash, user.email, now, now],
            )
            .map_err(|e| map_rusqlite_error(e, "User", user.username.clone()))?;
            conn.last_insert_rowid()
        };
        UserRepository::get_by_id(self, id)?.ok_or(RepositoryError::NotFound {
            entity_type: "User",
            id: id.to_string(),
        })
    }
}

// ============================================================================
// ThreadRepository implementation
// ============================================================================

impl ThreadRepository for SqliteRepository {
    fn create(&self, thread: NewThread) -> Result<Thread> {
        let now = format_datetime(&Utc::now());
        let id = insert_with_vote(
            &mut *self.conn()?,
            schema::INSERT_THREAD,
            params![thread.title, thread.url, thread.content, thread.author_id, now, now],
            schema::INSERT_THREAD_VOTE,
            thread.author_id,
        )
        .map_err(|e| map_rusqlite_error(e, "Thread", thread.title.clone()))?;
        ThreadRepository::get_by_id(self, id)?.ok_or(RepositoryError::NotFound {
            entity_type: "Thread",
            id: id.to_string(),
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Thread>> {
        self.query_one(
            &schema::select_thread_by_id(),
            id,
            row_to_thread,
            "Thread",
            id.to_string(),
        )
    }

    fn get_with_comments(&self, id: i64) -> Result<Option<Thread>> {
        let Some(mut thread) = ThreadRepository::get_by_id(self, id)? else {
            return Ok(None);
        };
        thread.comments = self.query_all(
            &schema::select_comments_by_thread(),
            [id],
            row_to_comment,
            "Comment",
        )?;
        Ok(Some(thread))
    }

    fn list_by_score(&self, limit: usize, offset: usize) -> Result<Vec<Thread>> {
        let (limit, offset) = limit_offset(limit, offset);
        self.query_all(
            &schema::select_threads_by_score(),
            [limit, offset],
            row_to_thread,
            "Thread",
        )
    }

    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Thread>> {
        let (limit, offset) = limit_offset(limit, offset);
        self.query_all(
            &schema::select_threads_newest(),
            [limit, offset],
            row_to_thread,
            "Thread",
        )
    }

    fn list_by_author(&self, author_id: i64) -> Result<Vec<Thread>> {
        self.query_all(
            &schema::select_threads_by_author(),
            [author_id],
            row_to_thread,
            "Thread",
        )
    }

    fn list_by_url_like(&self, pattern: &str) -> Result<Vec<Thread>> {
        self.query_all(
            &schema::select_threads_by_url_like(),
            [schema::escape_like(pattern)],
            row_to_thread,
            "Thread",
        )
    }
}

// ============================================================================
// CommentRepository implementation
// ============================================================================

impl CommentRepository for SqliteRepository {
    fn create(&self, comment: NewComment) -> Result<Comment> {
        if comment.parent_id != 0 {
            let parent_thread: Option<i64> = self
                .conn()?
                .query_row(
                    schema::SELECT_COMMENT_THREAD,
                    [comment.parent_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| map_rusqlite_error(e, "Comment", comment.parent_id.to_string()))?;
            if parent_thread != Some(comment.thread_id) {
                return Err(RepositoryError::InvalidData(format!(
                    "parent comment {} is not part of thread {}",
                    comment.parent_id, comment.thread_id
                )));
            }
        }
        if ThreadRepository::get_by_id(self, comment.thread_id)?.is_none() {
            return Err(RepositoryError::NotFound {
                entity_type: "Thread",
                id: comment.thread_id.to_string(),
            });
        }

        let now = format_datetime(&Utc::now());
        let id = insert_with_vote(
            &mut *self.conn()?,
            schema::INSERT_COMMENT,
            params![
                comment.parent_id,
                comment.thread_id,
                comment.author_id,
                comment.content,
                now,
                now
            ],
            schema::INSERT_COMMENT_VOTE,
            comment.author_id,
        )
        .map_err(|e| map_rusqlite_error(e, "Comment", "new"))?;
        CommentRepository::get_by_id(self, id)?.ok_or(RepositoryError::NotFound {
            entity_type: "Comment",
            id: id.to_string(),
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        self.query_one(
            &schema::select_comment_by_id(),
            id,
            row_to_comment,
            "Comment",
            id.to_string(),
        )
    }

    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Comment>> {
        let (limit, offset) = limit_offset(limit, offset);
        self.query_all(
            &schema::select_comments_newest(),
            [limit, offset],
            row_to_comment,
            "Comment",
        )
    }

    fn list_by_author(&self, author_id: i64) -> Result<Vec<Comment>> {
        self.query_all(
            &schema::select_comments_by_author(),
            [author_id],
            row_to_comment,
            "Comment",
        )
    }
}
