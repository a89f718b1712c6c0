use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("session storage error: {0}")]
    Storage(String),

    #[error("session data could not be decoded: {0}")]
    Serialization(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let error = AuthError::Storage("database is locked".to_string());
        assert_eq!(error.to_string(), "session storage error: database is locked");
    }

    #[test]
    fn test_serialization_error_display() {
        let error = AuthError::Serialization("expected map".to_string());
        assert_eq!(
            error.to_string(),
            "session data could not be decoded: expected map"
        );
    }

    #[test]
    fn test_hash_error_display() {
        let error = AuthError::Hash("invalid salt".to_string());
        assert_eq!(error.to_string(), "password hashing failed: invalid salt");
    }
}
