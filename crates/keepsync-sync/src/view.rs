//! Client-facing projection of a secret.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsync_core::{Metadata, Secret, SecretId};

/// A secret as sent to clients.
///
/// The owner is implied by the request and never echoed. The attachment is
/// either inline (`binary_data`, base64) or announced by size only
/// (`binary_data_size`), never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretView {
    pub id: SecretId,
    pub login: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(
        default,
        with = "keepsync_core::codec::base64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub binary_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_data_size: Option<u64>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SecretView {
    /// Everything, attachment inline regardless of size.
    pub fn full(secret: &Secret) -> Self {
        Self::project(secret, secret.binary_data.clone(), None)
    }

    /// Attachments larger than `inline_limit` are replaced by their length.
    pub fn for_sync(secret: &Secret, inline_limit: usize) -> Self {
        match &secret.binary_data {
            Some(data) if data.len() > inline_limit => {
                Self::project(secret, None, Some(data.len() as u64))
            }
            data => Self::project(secret, data.clone(), None),
        }
    }

    fn project(secret: &Secret, binary_data: Option<Bytes>, binary_data_size: Option<u64>) -> Self {
        Self {
            id: secret.id,
            login: secret.login.clone(),
            password: secret.password.clone(),
            metadata: secret.metadata.clone(),
            binary_data,
            binary_data_size,
            version: secret.version,
            created_at: secret.created_at,
            updated_at: secret.updated_at,
            deleted_at: secret.deleted_at,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl From<&Secret> for SecretView {
    fn from(secret: &Secret) -> Self {
        Self::full(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsync_core::{now, AccountId};

    fn secret_with(binary: Option<Vec<u8>>) -> Secret {
        let ts = now();
        Secret {
            id: SecretId::new(),
            owner: AccountId::from("alice"),
            login: "L".into(),
            password: "P".into(),
            metadata: Metadata::new(),
            binary_data: binary.map(Bytes::from),
            version: 3,
            created_at: ts,
            updated_at: ts,
            deleted_at: None,
        }
    }

    #[test]
    fn test_inline_at_threshold() {
        let secret = secret_with(Some(vec![7; 16]));
        let view = SecretView::for_sync(&secret, 16);
        assert_eq!(view.binary_data.as_deref(), Some(&[7u8; 16][..]));
        assert_eq!(view.binary_data_size, None);
    }

    #[test]
    fn test_reference_above_threshold() {
        let secret = secret_with(Some(vec![7; 17]));
        let view = SecretView::for_sync(&secret, 16);
        assert_eq!(view.binary_data, None);
        assert_eq!(view.binary_data_size, Some(17));

        let full = SecretView::full(&secret);
        assert_eq!(full.binary_data.map(|b| b.len()), Some(17));
    }

    #[test]
    fn test_json_omits_absent_fields() {
        let view = SecretView::for_sync(&secret_with(None), 16);
        let json = serde_json::to_value(&view).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("metadata"));
        assert!(!obj.contains_key("binary_data"));
        assert!(!obj.contains_key("binary_data_size"));
        assert!(!obj.contains_key("deleted_at"));
        assert!(!obj.contains_key("owner"));
        assert_eq!(obj["version"], 3);
    }

    #[test]
    fn test_json_inline_binary_is_base64() {
        let view = SecretView::full(&secret_with(Some(b"hello".to_vec())));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["binary_data"], "aGVsbG8=");

        let back: SecretView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }
}
