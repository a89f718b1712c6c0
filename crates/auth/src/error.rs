use thiserror::Error;

/// Auth errors for the agora_auth crate.
///
/// Wraps the core `AuthError` and adds variants for failures that only
/// happen while talking to real backends.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Error from the core auth module
    #[error(transparent)]
    Core(#[from] agora_core::auth::AuthError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
