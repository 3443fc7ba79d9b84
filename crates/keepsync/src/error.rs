//! Error types for the Keeper.

use keepsync_core::{AccountId, SecretId, UploadId, ValidationError};
use keepsync_store::StoreError;
use keepsync_sync::SyncError;
use keepsync_transfer::TransferError;
use thiserror::Error;

/// Client-facing errors of Keeper operations.
///
/// `Internal` deliberately carries no detail; the cause is logged where the
/// error is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperError {
    /// Missing login or password.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Well-formed but unacceptable request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Absent, deleted, or owned by someone else.
    #[error("secret not found: {0}")]
    NotFound(SecretId),

    /// Stale write.
    #[error("version conflict on secret {0}")]
    VersionConflict(SecretId),

    /// Unknown, expired, or foreign upload.
    #[error("upload session not found: {0}")]
    SessionNotFound(UploadId),

    #[error("piece index {index} out of range (total pieces: {total})")]
    InvalidIndex { index: usize, total: usize },

    #[error("upload incomplete: {received} of {total} pieces received")]
    IncompleteUpload { received: usize, total: usize },

    /// Piece data is not valid base64.
    #[error("invalid piece data")]
    InvalidData,

    /// `since` is not an RFC3339 timestamp.
    #[error("invalid watermark format")]
    InvalidWatermark,

    #[error("internal error")]
    Internal,
}

impl KeeperError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            KeeperError::Validation(e) => e.code(),
            KeeperError::InvalidRequest(_) => "common.invalid_request",
            KeeperError::NotFound(_) => "secret.not_found",
            KeeperError::VersionConflict(_) => "secret.version_conflict",
            KeeperError::SessionNotFound(_) => "upload.session_not_found",
            KeeperError::InvalidIndex { .. } => "upload.invalid_index",
            KeeperError::IncompleteUpload { .. } => "upload.incomplete",
            KeeperError::InvalidData => "upload.invalid_data",
            KeeperError::InvalidWatermark => "common.invalid_since_format",
            KeeperError::Internal => "common.internal_error",
        }
    }

    /// Whether the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, KeeperError::Internal)
    }

    /// Map a store failure, logging anything that is not the caller's fault.
    pub(crate) fn from_store(err: StoreError, operation: &'static str, account: &AccountId) -> Self {
        match err {
            StoreError::Validation(e) => KeeperError::Validation(e),
            StoreError::NotFound(id) => KeeperError::NotFound(id),
            StoreError::VersionConflict { id, .. } => KeeperError::VersionConflict(id),
            // A create that lost to another writer of the same id.
            StoreError::AlreadyExists(id) => KeeperError::VersionConflict(id),
            other => internal(operation, account, &other),
        }
    }

    pub(crate) fn from_sync(err: SyncError, account: &AccountId) -> Self {
        match err {
            SyncError::InvalidWatermark(_) => KeeperError::InvalidWatermark,
            SyncError::Store(e) => Self::from_store(e, "sync", account),
        }
    }
}

fn internal(operation: &'static str, account: &AccountId, err: &dyn std::error::Error) -> KeeperError {
    tracing::error!(account = %account, operation, error = %err, "internal error");
    KeeperError::Internal
}

impl From<TransferError> for KeeperError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::SessionNotFound(id) => KeeperError::SessionNotFound(id),
            TransferError::InvalidIndex { index, total } => KeeperError::InvalidIndex { index, total },
            TransferError::IncompleteUpload { received, total } => {
                KeeperError::IncompleteUpload { received, total }
            }
            TransferError::InvalidDeclaration(reason) => KeeperError::InvalidRequest(reason),
            err @ TransferError::SizeExceeded { .. } => KeeperError::InvalidRequest(err.to_string()),
        }
    }
}

/// Result type for Keeper operations.
pub type Result<T> = std::result::Result<T, KeeperError>;
