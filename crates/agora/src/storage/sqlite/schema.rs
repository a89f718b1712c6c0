//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Scores are vote counts and karma is the sum of the
//! scores of a user's threads and comments, both computed in the queries.

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created TEXT NOT NULL,
    updated TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT,
    content TEXT,
    author_id INTEGER NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL DEFAULT 0,
    thread_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS thread_votes (
    user_id INTEGER NOT NULL,
    thread_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, thread_id),
    FOREIGN KEY (thread_id) REFERENCES threads(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS comment_votes (
    user_id INTEGER NOT NULL,
    comment_id INTEGER NOT NULL,
    PRIMARY KEY (user_id, comment_id),
    FOREIGN KEY (comment_id) REFERENCES comments(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_threads_author_id ON threads(author_id);
CREATE INDEX IF NOT EXISTS idx_comments_thread_id ON comments(thread_id);
CREATE INDEX IF NOT EXISTS idx_comments_author_id ON comments(author_id);
CREATE INDEX IF NOT EXISTS idx_thread_votes_thread_id ON thread_votes(thread_id);
CREATE INDEX IF NOT EXISTS idx_comment_votes_comment_id ON comment_votes(comment_id);
"#;

// User queries

pub const INSERT_USER: &str = r#"
INSERT INTO users (username, password_hash, email, created, updated)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

const SELECT_USER: &str = r#"
SELECT u.id, u.username, u.password_hash, u.email, u.created, u.updated,
    (SELECT COUNT(*) FROM thread_votes v JOIN threads t ON t.id = v.thread_id
        WHERE t.author_id = u.id)
    + (SELECT COUNT(*) FROM comment_votes v JOIN comments c ON c.id = v.comment_id
        WHERE c.author_id = u.id) AS karma
FROM users u
"#;

pub fn select_user_by(column: &str) -> String {
    format!("{SELECT_USER} WHERE u.{column} = ?1")
}

// Thread queries

pub const INSERT_THREAD: &str = r#"
INSERT INTO threads (title, url, content, author_id, created, updated)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const INSERT_THREAD_VOTE: &str =
    "INSERT OR IGNORE INTO thread_votes (user_id, thread_id) VALUES (?1, ?2)";

const SELECT_THREAD: &str = r#"
SELECT t.id, t.title, t.url, t.content, t.author_id, u.username,
    (SELECT COUNT(*) FROM thread_votes v WHERE v.thread_id = t.id) AS score,
    (SELECT COUNT(*) FROM comments c WHERE c.thread_id = t.id) AS comment_count,
    t.created, t.updated
FROM threads t
JOIN users u ON u.id = t.author_id
"#;

pub fn select_thread_by_id() -> String {
    format!("{SELECT_THREAD} WHERE t.id = ?1")
}

pub fn select_threads_by_score() -> String {
    format!("{SELECT_THREAD} ORDER BY score DESC, t.created DESC, t.id DESC LIMIT ?1 OFFSET ?2")
}

pub fn select_threads_newest() -> String {
    format!("{SELECT_THREAD} ORDER BY t.created DESC, t.id DESC LIMIT ?1 OFFSET ?2")
}

pub fn select_threads_by_author() -> String {
    format!("{SELECT_THREAD} WHERE t.author_id = ?1 ORDER BY t.created DESC, t.id DESC")
}

pub fn select_threads_by_url_like() -> String {
    format!(
        "{SELECT_THREAD} WHERE t.url LIKE '%' || ?1 || '%' ESCAPE '\\' \
         ORDER BY t.created DESC, t.id DESC"
    )
}

// Comment queries

pub const INSERT_COMMENT: &str = r#"
INSERT INTO comments (parent_id, thread_id, author_id, content, created, updated)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const INSERT_COMMENT_VOTE: &str =
    "INSERT OR IGNORE INTO comment_votes (user_id, comment_id) VALUES (?1, ?2)";

pub const SELECT_COMMENT_THREAD: &str = "SELECT thread_id FROM comments WHERE id = ?1";

const SELECT_COMMENT: &str = r#"
SELECT c.id, c.parent_id, c.author_id, u.username, c.thread_id, t.title, c.content,
    (SELECT COUNT(*) FROM comment_votes v WHERE v.comment_id = c.id) AS score,
    c.created, c.updated
FROM comments c
JOIN users u ON u.id = c.author_id
JOIN threads t ON t.id = c.thread_id
"#;

pub fn select_comment_by_id() -> String {
    format!("{SELECT_COMMENT} WHERE c.id = ?1")
}

pub fn select_comments_by_thread() -> String {
    format!("{SELECT_COMMENT} WHERE c.thread_id = ?1 ORDER BY score DESC, c.created DESC, c.id DESC")
}

pub fn select_comments_newest() -> String {
    format!("{SELECT_COMMENT} ORDER BY c.created DESC, c.id DESC LIMIT ?1 OFFSET ?2")
}

pub fn select_comments_by_author() -> String {
    format!("{SELECT_COMMENT} WHERE c.author_id = ?1 ORDER BY c.created DESC, c.id DESC")
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
