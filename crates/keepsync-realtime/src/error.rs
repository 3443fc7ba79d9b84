//! Error types for the realtime module.

use thiserror::Error;

/// Errors that can occur on a live connection or during fan-out.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Event could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The other side has gone away.
    #[error("connection closed")]
    Closed,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;
