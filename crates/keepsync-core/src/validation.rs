//! Validation of caller-supplied drafts.
//!
//! Only presence is checked. The login and password are ciphertext, so
//! there is nothing else about them the server could meaningfully verify.

use crate::error::ValidationError;
use crate::secret::SecretDraft;

/// Validate a draft before it is written.
pub fn validate_draft(draft: &SecretDraft) -> Result<(), ValidationError> {
    if draft.login.is_empty() {
        return Err(ValidationError::LoginRequired);
    }
    if draft.password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        assert!(validate_draft(&SecretDraft::new("L", "P")).is_ok());
    }

    #[test]
    fn test_missing_login() {
        let err = validate_draft(&SecretDraft::new("", "P")).unwrap_err();
        assert_eq!(err, ValidationError::LoginRequired);
        assert_eq!(err.code(), "secret.login_required");
    }

    #[test]
    fn test_missing_password() {
        let err = validate_draft(&SecretDraft::new("L", "")).unwrap_err();
        assert_eq!(err, ValidationError::PasswordRequired);
    }

    #[test]
    fn test_login_checked_first() {
        let err = validate_draft(&SecretDraft::new("", "")).unwrap_err();
        assert_eq!(err, ValidationError::LoginRequired);
    }
}
