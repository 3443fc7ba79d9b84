//! The secret record and its caller-supplied draft.
//!
//! A secret's login, password, and binary attachment are ciphertext from
//! the server's point of view. Nothing in keepsync interprets them.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, SecretId};

/// Open key-value metadata carried with a secret. Values are opaque.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, String>);

impl Metadata {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One stored secret.
///
/// `(id, owner)` is the address of a secret. `version` starts at 1 and is
/// bumped by exactly one on every successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub id: SecretId,
    pub owner: AccountId,
    pub login: String,
    pub password: String,
    pub metadata: Metadata,
    pub binary_data: Option<Bytes>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, on soft delete.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Secret {
    /// Whether this secret has been soft-deleted (is a tombstone).
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Length of the binary attachment in bytes, 0 when absent.
    pub fn binary_len(&self) -> usize {
        self.binary_data.as_ref().map_or(0, Bytes::len)
    }

    /// Latest lifecycle timestamp of this record.
    pub fn last_modified(&self) -> DateTime<Utc> {
        let mut latest = self.created_at.max(self.updated_at);
        if let Some(deleted_at) = self.deleted_at {
            latest = latest.max(deleted_at);
        }
        latest
    }
}

/// The writable part of a secret, as sent by a client on create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretDraft {
    pub login: String,
    pub password: String,
    pub metadata: Metadata,
    pub binary_data: Option<Bytes>,
}

impl SecretDraft {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            metadata: Metadata::new(),
            binary_data: None,
        }
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn binary(mut self, data: impl Into<Bytes>) -> Self {
        self.binary_data = Some(data.into());
        self
    }
}
