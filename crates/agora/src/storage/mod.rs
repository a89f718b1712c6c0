//! Storage backend implementations.
//!
//! This module provides concrete implementations of the repository traits
//! defined in `agora_core::storage`. The backend is selected at compile time
//! via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): HashMaps behind a lock, nothing persisted
//! - `sqlite`: SQLite storage backend using `rusqlite`
//!
//! Both backends hand out a fresh repository handle per call over shared
//! storage, so every request gets its own handle.

#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!(
    "Features 'sqlite' and 'inmemory' are mutually exclusive. \
    Build with --no-default-features --features sqlite for SQLite."
);

#[cfg(not(any(feature = "sqlite", feature = "inmemory")))]
compile_error!("No storage backend selected. Enable 'inmemory' or 'sqlite' feature.");

#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "inmemory", test))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
