//! Error types for the cache backends
//!
//! Provides unified error handling using thiserror. These errors never leave
//! a backend: every public backend method maps them to its neutral outcome.

use thiserror::Error;

// == Cache Error Enum ==
/// Internal error type shared by all cache backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage medium missing, unreadable or unwritable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] std::io::Error),

    /// Relational cache table does not exist (yet)
    #[error("Schema missing: {0}")]
    SchemaMissing(String),

    /// Stored record failed to parse or belongs to another key
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// Entry exists but its TTL has elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Value could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other datasource failure
    #[error("Database error: {0}")]
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table") => {
                CacheError::SchemaMissing(msg.clone())
            }
            _ => CacheError::Database(err),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache internals.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_table_maps_to_schema_missing() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn
            .execute("DELETE FROM does_not_exist", [])
            .unwrap_err();

        assert!(matches!(CacheError::from(err), CacheError::SchemaMissing(_)));
    }

    #[test]
    fn test_io_error_maps_to_storage_unavailable() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = err.into();

        assert!(matches!(err, CacheError::StorageUnavailable(_)));
        assert!(err.to_string().starts_with("Storage unavailable"));
    }
}
