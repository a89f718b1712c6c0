//! In-memory repository implementation.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use agora_core::forum::{
    sort_comments_by_score, sort_comments_newest, sort_threads_by_score, sort_threads_newest,
    Comment, NewComment, NewThread, NewUser, Thread, User,
};
use agora_core::storage::{
    CommentRepository, RepositoryError, RepositoryProvider, Result, ThreadRepository,
    UserRepository,
};

/// Rows as stored. Derived columns (author names, scores, counts, karma) are
/// filled in on the way out.
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    threads: BTreeMap<i64, Thread>,
    comments: BTreeMap<i64, Comment>,
    /// (user_id, thread_id)
    thread_votes: HashSet<(i64, i64)>,
    /// (user_id, comment_id)
    comment_votes: HashSet<(i64, i64)>,
    last_user_id: i64,
    last_thread_id: i64,
    last_comment_id: i64,
}

impl Tables {
    fn username(&self, id: i64) -> String {
        self.users
            .get(&id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn thread_score(&self, thread_id: i64) -> i64 {
        self.thread_votes
            .iter()
            .filter(|(_, t)| *t == thread_id)
            .count() as i64
    }

    fn comment_score(&self, comment_id: i64) -> i64 {
        self.comment_votes
            .iter()
            .filter(|(_, c)| *c == comment_id)
            .count() as i64
    }

    fn user_row(&self, user: &User) -> User {
        let thread_karma: i64 = self
            .threads
            .values()
            .filter(|t| t.author_id == user.id)
            .map(|t| self.thread_score(t.id))
            .sum();
        let comment_karma: i64 = self
            .comments
            .values()
            .filter(|c| c.author_id == user.id)
            .map(|c| self.comment_score(c.id))
            .sum();
        User {
            karma: thread_karma + comment_karma,
            ..user.clone()
        }
    }

    fn thread_row(&self, thread: &Thread) -> Thread {
        Thread {
            author_name: self.username(thread.author_id),
            score: self.thread_score(thread.id),
            comment_count: self
                .comments
                .values()
                .filter(|c| c.thread_id == thread.id)
                .count() as i64,
            comments: Vec::new(),
            ..thread.clone()
        }
    }

    fn comment_row(&self, comment: &Comment) -> Comment {
        Comment {
            author_name: self.username(comment.author_id),
            thread_title: self
                .threads
                .get(&comment.thread_id)
                .map(|t| t.title.clone())
                .unwrap_or_default(),
            score: self.comment_score(comment.id),
            ..comment.clone()
        }
    }

    fn threads_where(&self, keep: impl Fn(&Thread) -> bool) -> Vec<Thread> {
        self.threads
            .values()
            .filter(|t| keep(t))
            .map(|t| self.thread_row(t))
            .collect()
    }

    fn comments_where(&self, keep: impl Fn(&Comment) -> bool) -> Vec<Comment> {
        self.comments
            .values()
            .filter(|c| keep(c))
            .map(|c| self.comment_row(c))
            .collect()
    }
}

fn page<T>(rows: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    rows.into_iter().skip(offset).take(limit).collect()
}

/// In-memory storage backend.
///
/// Clones share the same tables, so a clone is a cheap per-request handle.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::ConnectionFailed("storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::ConnectionFailed("storage lock poisoned".to_string()))
    }
}

impl RepositoryProvider for InMemoryRepository {
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

// ============================================================================
// UserRepository implementation
// ============================================================================

impl UserRepository for InMemoryRepository {
    fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let tables = self.read()?;
        Ok(tables.users.get(&id).map(|u| tables.user_row(u)))
    }

    fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| tables.user_row(u)))
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| tables.user_row(u)))
    }

    fn create(&self, user: NewUser) -> Result<User> {
        let mut tables = self.write()?;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                id: user.username,
            });
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let row = User {
            id: tables.last_user_id,
            username: user.username,
            password_hash: user.password_hash,
            email: user.email,
            created: now,
            updated: now,
            karma: 0,
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }
}

// ============================================================================
// ThreadRepository implementation
// ============================================================================

impl ThreadRepository for InMemoryRepository {
    fn create(&self, thread: NewThread) -> Result<Thread> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&thread.author_id) {
            return Err(RepositoryError::InvalidData(format!(
                "unknown author {}",
                thread.author_id
            )));
        }

        tables.last_thread_id += 1;
        let now = Utc::now();
        let row = Thread {
            id: tables.last_thread_id,
            title: thread.title,
            url: thread.url,
            content: thread.content,
            author_id: thread.author_id,
            author_name: String::new(),
            score: 0,
            comment_count: 0,
            created: now,
            updated: now,
            comments: Vec::new(),
        };
        tables.threads.insert(row.id, row.clone());
        tables.thread_votes.insert((row.author_id, row.id));
        Ok(tables.thread_row(&row))
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Thread>> {
        let tables = self.read()?;
        Ok(tables.threads.get(&id).map(|t| tables.thread_row(t)))
    }

    fn get_with_comments(&self, id: i64) -> Result<Option<Thread>> {
        let tables = self.read()?;
        let Some(thread) = tables.threads.get(&id) else {
            return Ok(None);
        };
        let mut thread = tables.thread_row(thread);
        thread.comments = tables.comments_where(|c| c.thread_id == id);
        sort_comments_by_score(&mut thread.comments);
        Ok(Some(thread))
    }

    fn list_by_score(&self, limit: usize, offset: usize) -> Result<Vec<Thread>> {
        let mut threads = self.read()?.threads_where(|_| true);
        sort_threads_by_score(&mut threads);
        Ok(page(threads, limit, offset))
    }

    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Thread>> {
        let mut threads = self.read()?.threads_where(|_| true);
        sort_threads_newest(&mut threads);
        Ok(page(threads, limit, offset))
    }

    fn list_by_author(&self, author_id: i64) -> Result<Vec<Thread>> {
        let mut threads = self.read()?.threads_where(|t| t.author_id == author_id);
        sort_threads_newest(&mut threads);
        Ok(threads)
    }

    fn list_by_url_like(&self, pattern: &str) -> Result<Vec<Thread>> {
        let pattern = pattern.to_lowercase();
        let mut threads = self.read()?.threads_where(|t| {
            t.url
                .as_deref()
                .is_some_and(|url| url.to_lowercase().contains(&pattern))
        });
        sort_threads_newest(&mut threads);
        Ok(threads)
    }
}

// ============================================================================
// CommentRepository implementation
// ============================================================================

impl CommentRepository for InMemoryRepository {
    fn create(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.write()?;
        if !tables.threads.contains_key(&comment.thread_id) {
            return Err(RepositoryError::NotFound {
                entity_type: "Thread",
                id: comment.thread_id.to_string(),
            });
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(RepositoryError::InvalidData(format!(
                "unknown author {}",
                comment.author_id
            )));
        }
        if comment.parent_id != 0
            && !tables
                .comments
                .get(&comment.parent_id)
                .is_some_and(|parent| parent.thread_id == comment.thread_id)
        {
            return Err(RepositoryError::InvalidData(format!(
                "parent comment {} is not part of thread {}",
                comment.parent_id, comment.thread_id
            )));
        }

        tables.last_comment_id += 1;
        let now = Utc::now();
        let row = Comment {
            id: tables.last_comment_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            author_name: String::new(),
            thread_id: comment.thread_id,
            thread_title: String::new(),
            content: comment.content,
            score: 0,
            created: now,
            updated: now,
        };
        tables.comments.insert(row.id, row.clone());
        tables.comment_votes.insert((row.author_id, row.id));
        Ok(tables.comment_row(&row))
    }

    fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let tables = self.read()?;
        Ok(tables.comments.get(&id).map(|c| tables.comment_row(c)))
    }

    fn list_newest(&self, limit: usize, offset: usize) -> Result<Vec<Comment>> {
        let mut comments = self.read()?.comments_where(|_| true);
        sort_comments_newest(&mut comments);
        Ok(page(comments, limit, offset))
    }

    fn list_by_author(&self, author_id: i64) -> Result<Vec<Comment>> {
        let mut comments = self.read()?.comments_where(|c| c.author_id == author_id);
        sort_comments_newest(&mut comments);
        Ok(comments)
    }
}
