//! In-memory storage backend.
//!
//! Stores all rows in maps wrapped in `Arc<RwLock<_>>`. Useful for tests and
//! development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::storage::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! let users = repo.users();
//! ```

mod repository;

pub use repository::InMemoryRepository;
