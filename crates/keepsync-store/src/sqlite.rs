//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for keepsync. It uses rusqlite with
//! bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use keepsync_core::{
    from_millis, now, to_millis, validate_draft, AccountId, Metadata, Secret, SecretDraft,
    SecretId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::Store;

const SECRET_COLUMNS: &str = "id, owner_id, login, password, metadata, binary_data, version,
                              created_at, updated_at, deleted_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
#[derive(Clone)]
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
    }
}

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn timestamp_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    from_millis(millis).map_err(|e| conversion_error(idx, Type::Integer, e))
}

// Helper to convert a row to Secret
fn row_to_secret(row: &rusqlite::Row<'_>) -> rusqlite::Result<Secret> {
    let id: String = row.get(0)?;
    let metadata_json: Option<String> = row.get(4)?;
    let binary_data: Option<Vec<u8>> = row.get(5)?;
    let version: i64 = row.get(6)?;
    let deleted_at: Option<i64> = row.get(9)?;

    let metadata = match metadata_json {
        Some(json) => serde_json::from_str::<Metadata>(&json)
            .map_err(|e| conversion_error(4, Type::Text, e))?,
        None => Metadata::new(),
    };

    Ok(Secret {
        id: id.parse().map_err(|e| conversion_error(0, Type::Text, e))?,
        owner: AccountId::new(row.get::<_, String>(1)?),
        login: row.get(2)?,
        password: row.get(3)?,
        metadata,
        binary_data: binary_data.map(Bytes::from),
        version: version as u64,
        created_at: timestamp_column(row, 7)?,
        updated_at: timestamp_column(row, 8)?,
        deleted_at: deleted_at
            .map(|ms| from_millis(ms).map_err(|e| conversion_error(9, Type::Integer, e)))
            .transpose()?,
    })
}

// Empty metadata is stored as NULL
fn encode_metadata(metadata: &Metadata) -> Result<Option<String>> {
    if metadata.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(metadata)?))
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_secret(
        &self,
        owner: &AccountId,
        id: SecretId,
        draft: SecretDraft,
    ) -> Result<Secret> {
        validate_draft(&draft)?;
        let metadata_json = encode_metadata(&draft.metadata)?;
        let owner = owner.clone();

        self.run(move |conn| {
            let ts = now();
            let inserted = conn.execute(
                "INSERT INTO secrets (
                    id, owner_id, login, password, metadata, binary_data, version,
                    created_at, updated_at, deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7, NULL)",
                params![
                    id.to_string(),
                    owner.as_str(),
                    &draft.login,
                    &draft.password,
                    metadata_json,
                    draft.binary_data.as_deref(),
                    to_millis(&ts),
                ],
            );

            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => return Err(StoreError::AlreadyExists(id)),
                Err(e) => return Err(e.into()),
            }

            Ok(Secret {
                id,
                owner,
                login: draft.login,
                password: draft.password,
                metadata: draft.metadata,
                binary_data: draft.binary_data,
                version: 1,
                created_at: ts,
                updated_at: ts,
                deleted_at: None,
            })
        })
        .await
    }

    async fn get_secret(&self, owner: &AccountId, id: &SecretId) -> Result<Secret> {
        let owner = owner.clone();
        let id = *id;

        self.run(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SECRET_COLUMNS} FROM secrets
                     WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL"
                ),
                params![id.to_string(), owner.as_str()],
                row_to_secret,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    async fn list_secrets(&self, owner: &AccountId) -> Result<Vec<Secret>> {
        let owner = owner.clone();

        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SECRET_COLUMNS} FROM secrets
                 WHERE owner_id = ?1 AND deleted_at IS NULL
                 ORDER BY created_at DESC"
            ))?;

            let secrets = stmt
                .query_map(params![owner.as_str()], row_to_secret)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(secrets)
        })
        .await
    }

    async fn update_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
        expected_version: u64,
        draft: SecretDraft,
    ) -> Result<Secret> {
        validate_draft(&draft)?;
        let metadata_json = encode_metadata(&draft.metadata)?;
        let owner = owner.clone();
        let id = *id;

        self.run(move |conn| {
            let tx = conn.transaction()?;

            // The version match is part of the write itself.
            let updated = tx
                .query_row(
                    &format!(
                        "UPDATE secrets
                         SET login = ?1, password = ?2, metadata = ?3, binary_data = ?4,
                             version = version + 1, updated_at = ?5
                         WHERE id = ?6 AND owner_id = ?7 AND version = ?8 AND deleted_at IS NULL
                         RETURNING {SECRET_COLUMNS}"
                    ),
                    params![
                        &draft.login,
                        &draft.password,
                        metadata_json,
                        draft.binary_data.as_deref(),
                        to_millis(&now()),
                        id.to_string(),
                        owner.as_str(),
                        expected_version as i64,
                    ],
                    row_to_secret,
                )
                .optional()?;

            let result = match updated {
                Some(secret) => Ok(secret),
                None => {
                    let live: bool = tx.query_row(
                        "SELECT EXISTS(SELECT 1 FROM secrets
                         WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL)",
                        params![id.to_string(), owner.as_str()],
                        |row| row.get(0),
                    )?;
                    if live {
                        Err(StoreError::VersionConflict {
                            id,
                            expected: expected_version,
                        })
                    } else {
                        Err(StoreError::NotFound(id))
                    }
                }
            };

            tx.commit()?;
            result
        })
        .await
    }

    async fn soft_delete_secret(
        &self,
        owner: &AccountId,
        id: &SecretId,
    ) -> Result<DateTime<Utc>> {
        let owner = owner.clone();
        let id = *id;

        self.run(move |conn| {
            let ts = now();
            let changed = conn.execute(
                "UPDATE secrets SET deleted_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND owner_id = ?2 AND deleted_at IS NULL",
                params![id.to_string(), owner.as_str(), to_millis(&ts)],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(ts)
        })
        .await
    }

    async fn modified_since(
        &self,
        owner: &AccountId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Secret>> {
        let owner = owner.clone();

        self.run(move |conn| {
            let secrets = match since {
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SECRET_COLUMNS} FROM secrets
                         WHERE owner_id = ?1 AND deleted_at IS NULL
                         ORDER BY updated_at ASC"
                    ))?;
                    let rows = stmt
                        .query_map(params![owner.as_str()], row_to_secret)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                Some(since) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {SECRET_COLUMNS} FROM secrets
                         WHERE owner_id = ?1
                           AND (created_at >= ?2
                                OR updated_at >= ?2
                                OR (deleted_at IS NOT NULL AND deleted_at >= ?2))
                         ORDER BY updated_at ASC"
                    ))?;
                    let rows = stmt
                        .query_map(params![owner.as_str(), to_millis(&since)], row_to_secret)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };

            Ok(secrets)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn owner() -> AccountId {
        AccountId::from("alice")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        let meta: Metadata = [("site", "example.org")].into_iter().collect();
        let draft = SecretDraft::new("L", "P")
            .metadata(meta.clone())
            .binary(vec![1u8, 2, 3]);

        let created = store.create_secret(&owner(), SecretId::new(), draft).await.unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get_secret(&owner(), &created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.metadata, meta);
        assert_eq!(fetched.binary_data, Some(Bytes::from_static(&[1, 2, 3])));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_fields() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("", "P"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.list_secrets(&owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id() {
        let store = SqliteStore::open_memory().unwrap();
        let id = SecretId::new();
        store.create_secret(&owner(), id, SecretDraft::new("L", "P")).await.unwrap();
        let err = store
            .create_secret(&owner(), id, SecretDraft::new("L", "P"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(dup) if dup == id));
    }

    #[tokio::test]
    async fn test_update_compare_and_swap() {
        let store = SqliteStore::open_memory().unwrap();
        let created = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
            .await
            .unwrap();

        let err = store
            .update_secret(&owner(), &created.id, 5, SecretDraft::new("X", "Y"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 5, .. }));
        assert_eq!(store.get_secret(&owner(), &created.id).await.unwrap(), created);

        let updated = store
            .update_secret(&owner(), &created.id, 1, SecretDraft::new("L2", "P"))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.login, "L2");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        // The old version is now stale.
        let err = store
            .update_secret(&owner(), &created.id, 1, SecretDraft::new("L3", "P"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn test_cross_account_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        let created = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
            .await
            .unwrap();
        let mallory = AccountId::from("mallory");

        assert!(matches!(
            store.get_secret(&mallory, &created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update_secret(&mallory, &created.id, 1, SecretDraft::new("L", "P")).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.soft_delete_secret(&mallory, &created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_secrets(&mallory).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_tombstone() {
        let store = SqliteStore::open_memory().unwrap();
        let watermark = now();
        let created = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
            .await
            .unwrap();

        let deleted_at = store.soft_delete_secret(&owner(), &created.id).await.unwrap();

        assert!(matches!(
            store.get_secret(&owner(), &created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.list_secrets(&owner()).await.unwrap().is_empty());
        assert!(store.modified_since(&owner(), None).await.unwrap().is_empty());

        let delta = store.modified_since(&owner(), Some(watermark)).await.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].deleted_at, Some(deleted_at));
        assert_eq!(delta[0].updated_at, deleted_at);

        // Not idempotent.
        assert!(matches!(
            store.soft_delete_secret(&owner(), &created.id).await,
            Err(StoreError::NotFound(_))
        ));
        // Updating a tombstone is not found either.
        assert!(matches!(
            store.update_secret(&owner(), &created.id, 1, SecretDraft::new("L", "P")).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_modified_since_inclusive_and_future() {
        let store = SqliteStore::open_memory().unwrap();
        let created = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
            .await
            .unwrap();

        let exact = store
            .modified_since(&owner(), Some(created.updated_at))
            .await
            .unwrap();
        assert_eq!(exact.len(), 1);

        let future = store
            .modified_since(&owner(), Some(now() + Duration::hours(1)))
            .await
            .unwrap();
        assert!(future.is_empty());
    }

    #[tokio::test]
    async fn test_on_disk_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.db");

        let id = {
            let store = SqliteStore::open(&path).unwrap();
            store
                .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
                .await
                .unwrap()
                .id
        };

        let reopened = SqliteStore::open(&path).unwrap();
        let secret = reopened.get_secret(&owner(), &id).await.unwrap();
        assert_eq!(secret.login, "L");
    }

    #[tokio::test]
    async fn test_concurrent_updates_single_winner() {
        let store = SqliteStore::open_memory().unwrap();
        let created = store
            .create_secret(&owner(), SecretId::new(), SecretDraft::new("L", "P"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let id = created.id;
            handles.push(tokio::spawn(async move {
                store
                    .update_secret(&owner(), &id, 1, SecretDraft::new(format!("L{i}"), "P"))
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(secret) => {
                    winners += 1;
                    assert_eq!(secret.version, 2);
                }
                Err(StoreError::VersionConflict { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners, 1);
    }
}
