//! Mutation events pushed to live sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsync_core::{AccountId, SecretId};

/// What happened to the secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "secret_created")]
    Created,
    #[serde(rename = "secret_updated")]
    Updated,
    #[serde(rename = "secret_deleted")]
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "secret_created",
            EventKind::Updated => "secret_updated",
            EventKind::Deleted => "secret_deleted",
        }
    }
}

/// A mutation notification.
///
/// Clients treat it as an invalidation hint and refetch through sync; it
/// carries no secret payload.
///
/// `user_id` is the opaque account id and serializes as a JSON string.
/// Older clients that decode it as an integer need a numeric account id
/// on their side; the hub never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub secret_id: SecretId,
    pub user_id: AccountId,
    #[serde(with = "keepsync_core::time::rfc3339_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl SecretEvent {
    /// Build an event stamped with the current time.
    pub fn new(kind: EventKind, secret_id: SecretId, account: AccountId) -> Self {
        Self::at(kind, secret_id, account, keepsync_core::now())
    }

    /// Build an event with an explicit timestamp.
    pub fn at(
        kind: EventKind,
        secret_id: SecretId,
        account: AccountId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            secret_id,
            user_id: account,
            timestamp,
        }
    }

    pub fn created(secret_id: SecretId, account: AccountId) -> Self {
        Self::new(EventKind::Created, secret_id, account)
    }

    pub fn updated(secret_id: SecretId, account: AccountId) -> Self {
        Self::new(EventKind::Updated, secret_id, account)
    }

    pub fn deleted(secret_id: SecretId, account: AccountId) -> Self {
        Self::new(EventKind::Deleted, secret_id, account)
    }
}
