//! Error types for keepsync Core.

use thiserror::Error;

/// Errors from the pure helpers in this crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid base64 data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Validation errors for caller-supplied secret payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("login is required")]
    LoginRequired,

    #[error("password is required")]
    PasswordRequired,
}

impl ValidationError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::LoginRequired => "secret.login_required",
            ValidationError::PasswordRequired => "secret.password_required",
        }
    }
}
