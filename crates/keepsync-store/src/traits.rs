//! Store trait: the abstract interface for secret persistence.
//!
//! This trait keeps the rest of keepsync storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keepsync_core::{AccountId, Secret, SecretDraft, SecretId};

use crate::error::Result;

/// The Store trait: async interface for secret persistence.
///
/// Every method is scoped to an owner. A secret that exists under another
/// account yields exactly the same `NotFound` as one that does not exist.
///
/// # Design Notes
///
/// - **Atomic version check**: `update_secret` matches id, owner, live
///   state, and version in one conditional write. Two concurrent updates
///   carrying the same version cannot both succeed.
/// - **Tombstones**: `soft_delete_secret` only stamps `deleted_at`; the row
///   stays visible to `modified_since` but not to `get_secret` or
///   `list_secrets`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new secret with version 1 under the given id.
    ///
    /// # Errors
    /// - `Validation` if login or password is empty.
    /// - `AlreadyExists` if the id is taken.
    async fn create_secret(
        &self,
        owner: &AccountId,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<Secret>;

    /// Get a live secret.
    async fn get_secret(&self, owner: &AccountId, id: &SecretId) -> Result<Secret>;

    /// All live secrets of the owner, newest first. Empty when none exist.
    async fn list_secrets(&self, owner: &AccountId) -> Result<Vec<Secret>>;

    /// Replace the writable fields of a live secret if, and only if, its
    /// stored version equals `expected_version`. On success the version is
    /// bumped by one and `updated_at` refreshed.
    ///
    /// # Errors
    /// - `Validation` if login or password is empty.
    /// - `NotFound` if no live secret `(id, owner)` exists.
    /// - `VersionConflict` if it exists with another version.
    async fn update_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
        expected_version: u64,
        draft: SecretDraft,
    ) -> Result<Secret>;

    /// Stamp `deleted_at` (and `updated_at`) on a live secret.
    ///
    /// Not idempotent: a second delete is `NotFound`. Returns the deletion
    /// timestamp.
    async fn soft_delete_secret(&self, owner: &AccountId, id: &SecretId)
        -> Result<DateTime<Utc>>;

    /// Delta query for sync.
    ///
    /// - `None`: every live secret (first sync).
    /// - `Some(t)`: every secret, tombstones included, whose created, updated,
    ///   or deleted timestamp is `>= t`.
    ///
    /// Ordered by `updated_at` ascending.
    async fn modified_since(
        &self,
        owner: &AccountId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Secret>>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn create_secret(
        &self,
        owner: &AccountId,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<Secret> {
        (**self).create_secret(owner, id, draft).await
    }

    async fn get_secret(&self, owner: &AccountId, id: &SecretId) -> Result<Secret> {
        (**self).get_secret(owner, id).await
    }

    async fn list_secrets(&self, owner: &AccountId) -> Result<Vec<Secret>> {
        (**self).list_secrets(owner).await
    }

    async fn update_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
        expected_version: u64,
        draft: SecretDraft,
    ) -> Result<Secret> {
        (**self).update_secret(owner, id, expected_version, draft).await
    }

    async fn soft_delete_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
    ) -> Result<DateTime<Utc>> {
        (**self).soft_delete_secret(owner, id).await
    }

    async fn modified_since(
        &self,
        owner: &AccountId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Secret>> {
        (**self).modified_since(owner, since).await
    }
}
