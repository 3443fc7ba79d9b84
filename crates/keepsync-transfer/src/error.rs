//! Error types for the transfer module.

use keepsync_core::UploadId;
use thiserror::Error;

/// Errors that can occur while assembling an upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Unknown, expired, or already cleaned up.
    #[error("upload session not found: {0}")]
    SessionNotFound(UploadId),

    /// Piece index outside `[0, total)`.
    #[error("piece index {index} out of range (total pieces: {total})")]
    InvalidIndex { index: usize, total: usize },

    /// At least one declared piece has never been uploaded.
    #[error("upload incomplete: {received} of {total} pieces received")]
    IncompleteUpload { received: usize, total: usize },

    /// Stored pieces would exceed the declared total size.
    #[error("upload would hold {attempted} bytes, declared {declared}")]
    SizeExceeded { declared: u64, attempted: u64 },

    /// The declared piece count or size is out of bounds.
    #[error("invalid upload declaration: {0}")]
    InvalidDeclaration(String),
}

/// Result type for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;
