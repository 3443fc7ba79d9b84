//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while answering a sync request.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The `since` watermark could not be parsed.
    #[error("invalid watermark: {0}")]
    InvalidWatermark(#[from] keepsync_core::CoreError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] keepsync_store::StoreError),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
