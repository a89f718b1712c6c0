//! SQLite error mapping.
//!
//! Maps `rusqlite::Error` to `RepositoryError` from `agora_core::storage`.
//! Specific errors are mapped to semantic variants (e.g., UNIQUE constraint to AlreadyExists).

use agora_core::storage::RepositoryError;

/// Maps a rusqlite error to a RepositoryError.
///
/// # Error Mapping
///
/// - `SQLITE_CONSTRAINT_UNIQUE` → `RepositoryError::AlreadyExists`
/// - `SQLITE_CONSTRAINT_FOREIGNKEY` → `RepositoryError::InvalidData`
/// - Cannot open → `RepositoryError::ConnectionFailed`
/// - All other errors → `RepositoryError::QueryFailed`
pub fn map_rusqlite_error(
    err: rusqlite::Error,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match &err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            RepositoryError::AlreadyExists {
                entity_type,
                id: id.into(),
            }
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            RepositoryError::InvalidData(format!(
                "Foreign key constraint violation for {entity_type}"
            ))
        }

        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen =>
        {
            RepositoryError::ConnectionFailed(format!("Cannot open database: {err}"))
        }

        rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
            entity_type,
            id: id.into(),
        },

        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn constraint(extended_code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                extended_code,
            },
            None,
        )
    }

    #[test]
    fn test_unique_constraint_maps_to_already_exists() {
        let result = map_rusqlite_error(constraint(ffi::SQLITE_CONSTRAINT_UNIQUE), "User", "alice");

        match result {
            RepositoryError::AlreadyExists { entity_type, id } => {
                assert_eq!(entity_type, "User");
                assert_eq!(id, "alice");
            }
            other => panic!("Expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_key_maps_to_invalid_data() {
        let result =
            map_rusqlite_error(constraint(ffi::SQLITE_CONSTRAINT_FOREIGNKEY), "Comment", "0");
        assert!(matches!(result, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let result = map_rusqlite_error(rusqlite::Error::QueryReturnedNoRows, "Thread", "12");
        assert!(matches!(
            result,
            RepositoryError::NotFound {
                entity_type: "Thread",
                ..
            }
        ));
    }

    #[test]
    fn test_other_errors_map_to_query_failed() {
        let result = map_rusqlite_error(rusqlite::Error::InvalidQuery, "User", "1");
        assert!(matches!(result, RepositoryError::QueryFailed(_)));
    }
}
