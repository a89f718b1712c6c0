use std::sync::Arc;

use crate::forum::{Comment, NewComment, NewThread, NewUser, Thread, User};

use super::Result;

/// Repository for user accounts.
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Gets a user by their username.
    fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Gets a user by their email address.
    fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Saves a new user and returns it with its assigned ID.
    fn create(&self, user: NewUser) -> Result<User>;
}

/// Repository for threads (stories).
pub trait ThreadRepository: Send + Sync {
    /// Creates a thread and records the author's vote for it.
    fn create(&self, thread: NewThread) -> Result<Thread>;

    /// Gets a thread by its ID, without comments.
    fn get_by_id(&self, id: i64) -> Result<Option<Thread>>;

    /// Gets a thread with its comments, sorted by score then recency.
    fn get_with_comments(&self, id: i64) -> Result<Option<Thread>>;

    /// Lists threads by score, highest first.
    fn list_by_score(&self, limit: usize, offset: usize) -> Result<Vec<Thread>>;

    /// Lists threads newest first.
    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Thread>>;

    /// Lists the threads submitted by an author, newest first.
    fn list_by_author(&self, author_id: i64) -> Result<Vec<Thread>>;

    /// Lists threads whose URL contains `pattern`, newest first.
    fn list_by_url_like(&self, pattern: &str) -> Result<Vec<Thread>>;
}

/// Repository for comments.
pub trait CommentRepository: Send + Sync {
    /// Creates a comment and records the author's vote for it.
    fn create(&self, comment: NewComment) -> Result<Comment>;

    /// Gets a comment by its ID.
    fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Lists comments across all threads, newest first.
    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Comment>>;

    /// Lists the comments written by an author, newest first.
    fn list_by_author(&self, author_id: i64) -> Result<Vec<Comment>>;
}

/// Hands out repository handles over a shared backend.
///
/// Each call returns a new handle; callers that need one instance per
/// request memoize the handle themselves.
pub trait RepositoryProvider: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn threads(&self) -> Arc<dyn ThreadRepository>;

    fn comments(&self) -> Arc<dyn CommentRepository>;
}
