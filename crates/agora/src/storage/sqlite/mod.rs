//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the repository traits
//! using synchronous `rusqlite` calls behind a shared connection.

mod conversions;
mod error;
mod repository;
mod schema;

pub use repository::SqliteRepository;
