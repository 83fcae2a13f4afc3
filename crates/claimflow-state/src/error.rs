//! Error types for claimflow-state

use thiserror::Error;

/// Errors raised while connecting to or preparing a backend
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors returned by [`crate::StateStore`] operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend rejected or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored row could not be encoded or decoded
    #[error("storage serialization error: {0}")]
    Serialization(String),

    /// A digest string was not 64 hex characters
    #[error("invalid digest: {digest}")]
    InvalidDigest { digest: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_error_display() {
        let err = StateError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "Database connection failed: refused");
    }

    #[test]
    fn test_storage_error_from_state_error() {
        let err: StorageError = StateError::Query("syntax".to_string()).into();
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(err.to_string().contains("syntax"));
    }
}
