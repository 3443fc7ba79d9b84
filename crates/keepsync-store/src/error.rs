//! Error types for the store module.

use keepsync_core::{SecretId, ValidationError};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Draft failed validation before anything was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Absent, soft-deleted, or owned by another account.
    #[error("secret not found: {0}")]
    NotFound(SecretId),

    /// Caller's expected version no longer matches the stored one.
    #[error("version conflict on secret {id}: expected version {expected}")]
    VersionConflict { id: SecretId, expected: u64 },

    /// A secret with this id already exists.
    #[error("secret already exists: {0}")]
    AlreadyExists(SecretId),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Metadata (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Blocking task failed or the connection lock was poisoned.
    #[error("task error: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
