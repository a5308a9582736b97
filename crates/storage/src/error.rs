//! Error types for the storage layer.

use edr_protocol::EdrError;
use thiserror::Error;

/// Result type alias using StorageError.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Existence checks ===
    #[error("no such instance: {0}")]
    InstanceNotFound(String),

    #[error("no such location: {0}")]
    LocationNotFound(String),

    #[error("no such item: {0}")]
    ItemNotFound(String),

    #[error("Failed to decode row: {0}")]
    Decode(String),

    #[error("Unsupported query: {0}")]
    Unsupported(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

impl From<StorageError> for EdrError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InstanceNotFound(id) => EdrError::InstanceNotFound(id),
            StorageError::LocationNotFound(id) => EdrError::LocationNotFound(id),
            StorageError::ItemNotFound(id) => EdrError::ItemNotFound(id),
            other => EdrError::Internal(other.to_string()),
        }
    }
}
