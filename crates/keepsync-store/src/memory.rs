//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keepsync_core::{now, validate_draft, AccountId, Secret, SecretDraft, SecretId};

use crate::error::{Result, StoreError};
use crate::traits::Store;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<HashMap<SecretId, Secret>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_live_for(secret: &Secret, owner: &AccountId) -> bool {
    &secret.owner == owner && secret.deleted_at.is_none()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_secret(
        &self,
        owner: &AccountId,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<Secret> {
        validate_draft(&draft)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        let ts = now();
        let secret = Secret {
            id,
            owner: owner.clone(),
            login: draft.login,
            password: draft.password,
            metadata: draft.metadata,
            binary_data: draft.binary_data,
            version: 1,
            created_at: ts,
            updated_at: ts,
            deleted_at: None,
        };
        inner.insert(id, secret.clone());
        Ok(secret)
    }

    async fn get_secret(&self, owner: &AccountId, id: &SecretId) -> Result<Secret> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .get(id)
            .filter(|s| is_live_for(s, owner))
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    async fn list_secrets(&self, owner: &AccountId) -> Result<Vec<Secret>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut secrets: Vec<Secret> = inner
            .values()
            .filter(|s| is_live_for(s, owner))
            .cloned()
            .collect();
        secrets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(secrets)
    }

    async fn update_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
        expected_version: u64,
        draft: SecretDraft,
    ) -> Result<Secret> {
        validate_draft(&draft)?;
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let secret = inner
            .get_mut(id)
            .filter(|s| is_live_for(s, owner))
            .ok_or(StoreError::NotFound(*id))?;

        if secret.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: *id,
                expected: expected_version,
            });
        }

        secret.login = draft.login;
        secret.password = draft.password;
        secret.metadata = draft.metadata;
        secret.binary_data = draft.binary_data;
        secret.version += 1;
        secret.updated_at = now();

        Ok(secret.clone())
    }

    async fn soft_delete_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
    ) -> Result<DateTime<Utc>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let secret = inner
            .get_mut(id)
            .filter(|s| is_live_for(s, owner))
            .ok_or(StoreError::NotFound(*id))?;

        let ts = now();
        secret.deleted_at = Some(ts);
        secret.updated_at = ts;
        Ok(ts)
    }

    async fn modified_since(
        &self,
        owner: &AccountId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Secret>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        let mut secrets: Vec<Secret> = inner
            .values()
            .filter(|s| &s.owner == owner)
            .filter(|s| match since {
                None => s.deleted_at.is_none(),
                Some(t) => {
                    s.created_at >= t
                        || s.updated_at >= t
                        || s.deleted_at.map_or(false, |d| d >= t)
                }
            })
            .cloned()
            .collect();
        secrets.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(secrets)
    }
}
