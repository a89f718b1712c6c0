//! Functional core for agora.
//!
//! Pure domain types, traits and functions. Nothing in this crate performs I/O;
//! storage backends, session stores and the HTTP host live in the other crates.

pub mod auth;
pub mod forum;
pub mod storage;
pub mod validation;
