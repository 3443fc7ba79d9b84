//! Delta sync responder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsync_core::{parse_rfc3339, AccountId, INLINE_BINARY_LIMIT};
use keepsync_store::Store;

use crate::error::Result;
use crate::view::SecretView;

/// Configuration for sync responses.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Attachments strictly larger than this are sent by size only.
    pub inline_binary_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inline_binary_limit: INLINE_BINARY_LIMIT,
        }
    }
}

/// Answer to a sync request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub secrets: Vec<SecretView>,
    /// The client's next watermark.
    #[serde(with = "keepsync_core::time::rfc3339_seconds")]
    pub server_time: DateTime<Utc>,
}

/// Computes what a device missed since its last watermark.
pub struct SyncResponder<S: Store> {
    store: S,
    config: SyncConfig,
}

impl<S: Store> SyncResponder<S> {
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Everything changed at or after `since`, tombstones included, or every
    /// live secret when `since` is `None`.
    pub async fn sync(&self, owner: &AccountId, since: Option<DateTime<Utc>>) -> Result<SyncResponse> {
        let secrets = self.store.modified_since(owner, since).await?;

        // Read after the query so a concurrent write is never skipped.
        let server_time = keepsync_core::now();

        let limit = self.config.inline_binary_limit;
        let secrets: Vec<SecretView> = secrets
            .iter()
            .map(|s| SecretView::for_sync(s, limit))
            .collect();

        tracing::info!(
            account = %owner,
            since = ?since,
            count = secrets.len(),
            "sync answered"
        );

        Ok(SyncResponse {
            secrets,
            server_time,
        })
    }

    /// Like [`sync`](Self::sync), taking the watermark as sent on the wire.
    /// An empty string means no watermark.
    pub async fn sync_from(&self, owner: &AccountId, since: Option<&str>) -> Result<SyncResponse> {
        let since = match since {
            Some(text) if !text.is_empty() => Some(parse_rfc3339(text)?),
            _ => None,
        };
        self.sync(owner, since).await
    }
}
