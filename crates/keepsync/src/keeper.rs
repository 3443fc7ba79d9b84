//! The main Keeper implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use keepsync_core::{
    decode_base64, encode_base64, split_into_pieces, Caller, Secret, SecretDraft,
    SecretId, UploadId, DOWNLOAD_PIECE_SIZE,
};
use keepsync_realtime::{EventKind, Hub, SecretEvent};
use keepsync_store::Store;
use keepsync_sync::{SyncResponder, SyncResponse};
use keepsync_transfer::{spawn_sweeper, ChunkAssembler, SessionInfo, SweeperHandle};

use crate::config::KeeperConfig;
use crate::error::{KeeperError, Result};
use crate::wire::{
    DownloadPieceResponse, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
    UploadPieceRequest, UploadPieceResponse,
};

/// The main Keeper struct.
///
/// Wires the three moving parts together: uploads are assembled, committed
/// to the store, and announced to the account's other live sessions.
/// Every operation takes the authenticated [`Caller`].
pub struct Keeper<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Pending chunked uploads.
    assembler: Arc<ChunkAssembler>,
    /// Live connections.
    hub: Hub,
    /// Delta sync.
    responder: SyncResponder<Arc<S>>,
    /// Configuration.
    config: KeeperConfig,
    /// Keeps the expiry sweep alive for as long as the Keeper.
    _sweeper: Option<SweeperHandle>,
}

impl<S: Store> Keeper<S> {
    /// Create a new keeper.
    ///
    /// Starts the upload expiry sweep when called inside a tokio runtime.
    /// Outside one, expired uploads are still refused but only removed on
    /// cleanup.
    pub fn new(store: S, mut config: KeeperConfig) -> Self {
        if config.download_piece_size == 0 {
            tracing::warn!(
                fallback = DOWNLOAD_PIECE_SIZE,
                "download piece size of zero replaced with default"
            );
            config.download_piece_size = DOWNLOAD_PIECE_SIZE;
        }

        let store = Arc::new(store);
        let assembler = Arc::new(ChunkAssembler::new(config.assembler.clone()));

        let sweeper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(spawn_sweeper(&assembler)),
            Err(_) => {
                tracing::warn!("no tokio runtime, upload expiry sweep not started");
                None
            }
        };

        Self {
            responder: SyncResponder::new(Arc::clone(&store), config.sync.clone()),
            store,
            assembler,
            hub: Hub::new(),
            config,
            _sweeper: sweeper,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The connection registry, for the transport layer to attach to.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn assembler(&self) -> &ChunkAssembler {
        &self.assembler
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Secret Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a secret with a fresh id.
    pub async fn create_secret(&self, caller: &Caller, draft: SecretDraft) -> Result<Secret> {
        let secret = self
            .store
            .create_secret(&caller.account, SecretId::new(), draft)
            .await
            .map_err(|e| KeeperError::from_store(e, "create_secret", &caller.account))?;

        tracing::info!(account = %caller.account, secret_id = %secret.id, "secret created");
        self.notify(caller, EventKind::Created, secret.id).await;
        Ok(secret)
    }

    pub async fn get_secret(&self, caller: &Caller, id: &SecretId) -> Result<Secret> {
        self.store
            .get_secret(&caller.account, id)
            .await
            .map_err(|e| KeeperError::from_store(e, "get_secret", &caller.account))
    }

    pub async fn list_secrets(&self, caller: &Caller) -> Result<Vec<Secret>> {
        self.store
            .list_secrets(&caller.account)
            .await
            .map_err(|e| KeeperError::from_store(e, "list_secrets", &caller.account))
    }

    /// Replace a secret's payload if `expected_version` is still current.
    pub async fn update_secret(
        &self,
        caller: &Caller,
        id: &SecretId,
        expected_version: u64,
        draft: SecretDraft,
    ) -> Result<Secret> {
        let secret = self
            .store
            .update_secret(&caller.account, id, expected_version, draft)
            .await
            .map_err(|e| KeeperError::from_store(e, "update_secret", &caller.account))?;

        tracing::info!(
            account = %caller.account,
            secret_id = %secret.id,
            version = secret.version,
            "secret updated"
        );
        self.notify(caller, EventKind::Updated, secret.id).await;
        Ok(secret)
    }

    /// Soft-delete a secret.
    pub async fn delete_secret(&self, caller: &Caller, id: &SecretId) -> Result<()> {
        self.store
            .soft_delete_secret(&caller.account, id)
            .await
            .map_err(|e| KeeperError::from_store(e, "delete_secret", &caller.account))?;

        tracing::info!(account = %caller.account, secret_id = %id, "secret deleted");
        self.notify(caller, EventKind::Deleted, *id).await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chunked Transfer
    // ─────────────────────────────────────────────────────────────────────────

    /// Declare a chunked upload.
    pub async fn init_upload(
        &self,
        caller: &Caller,
        request: InitUploadRequest,
    ) -> Result<InitUploadResponse> {
        let ticket = match request.secret_id {
            Some(secret_id) => {
                // Only an existing secret of this account can be targeted.
                self.get_secret(caller, &secret_id).await?;
                self.assembler.init_upload_for(
                    &caller.account,
                    secret_id,
                    request.total_chunks,
                    request.total_size,
                )?
            }
            None => self.assembler.init_upload(
                &caller.account,
                request.total_chunks,
                request.total_size,
            )?,
        };

        Ok(InitUploadResponse {
            upload_id: ticket.upload_id,
            secret_id: ticket.secret_id,
        })
    }

    /// Store one base64 piece of an upload addressed as `secret_id`.
    pub async fn upload_piece(
        &self,
        caller: &Caller,
        secret_id: &SecretId,
        request: UploadPieceRequest,
    ) -> Result<UploadPieceResponse> {
        let info = self.owned_session(caller, &request.upload_id, secret_id)?;
        if request.total_chunks != info.total_pieces {
            return Err(KeeperError::InvalidRequest(format!(
                "upload declared {} pieces, request says {}",
                info.total_pieces, request.total_chunks
            )));
        }

        let data = decode_base64(&request.data).map_err(|e| {
            tracing::debug!(upload_id = %request.upload_id, error = %e, "piece is not base64");
            KeeperError::InvalidData
        })?;
        self.assembler
            .upload_piece(&request.upload_id, request.chunk_index, data)?;

        Ok(UploadPieceResponse {
            chunk_index: request.chunk_index,
            received: true,
        })
    }

    /// Reassemble an upload and commit it, creating the secret when no
    /// version is given and updating it otherwise. An upload declared for
    /// an existing secret must carry the version it replaces.
    ///
    /// The session survives a failed commit, so the client can retry
    /// without uploading again.
    pub async fn finalize_upload(
        &self,
        caller: &Caller,
        secret_id: &SecretId,
        request: FinalizeUploadRequest,
    ) -> Result<Secret> {
        let info = self.owned_session(caller, &request.upload_id, secret_id)?;
        if info.targets_existing && request.version.is_none() {
            return Err(KeeperError::InvalidRequest(format!(
                "upload {} replaces secret {} and needs a version",
                request.upload_id, secret_id
            )));
        }
        let payload = self.assembler.reassemble(&request.upload_id)?;

        let draft = SecretDraft {
            login: request.login,
            password: request.password,
            metadata: request.metadata,
            binary_data: Some(payload),
        };

        let (secret, kind) = match request.version {
            Some(version) => {
                let secret = self
                    .store
                    .update_secret(&caller.account, secret_id, version, draft)
                    .await
                    .map_err(|e| KeeperError::from_store(e, "finalize_upload", &caller.account))?;
                (secret, EventKind::Updated)
            }
            None => {
                let secret = self
                    .store
                    .create_secret(&caller.account, *secret_id, draft)
                    .await
                    .map_err(|e| KeeperError::from_store(e, "finalize_upload", &caller.account))?;
                (secret, EventKind::Created)
            }
        };

        self.assembler.cleanup(&request.upload_id);

        tracing::info!(
            account = %caller.account,
            upload_id = %request.upload_id,
            secret_id = %secret.id,
            version = secret.version,
            size = secret.binary_len(),
            "upload finalized"
        );
        self.notify(caller, kind, secret.id).await;
        Ok(secret)
    }

    /// Drop an upload. Unknown and foreign ids are ignored.
    pub fn abandon_upload(&self, caller: &Caller, upload_id: &UploadId) {
        match self.assembler.session_info(upload_id) {
            Ok(info) if info.owner == caller.account => {
                self.assembler.cleanup(upload_id);
                tracing::info!(account = %caller.account, upload_id = %upload_id, "upload abandoned");
            }
            _ => {}
        }
    }

    /// One base64 piece of a stored attachment.
    pub async fn download_piece(
        &self,
        caller: &Caller,
        secret_id: &SecretId,
        index: usize,
    ) -> Result<DownloadPieceResponse> {
        let secret = self.get_secret(caller, secret_id).await?;
        let data = secret.binary_data.unwrap_or_default();
        let pieces = split_into_pieces(&data, self.config.download_piece_size);

        let total = pieces.len();
        let piece = pieces
            .get(index)
            .ok_or(KeeperError::InvalidIndex { index, total })?;

        Ok(DownloadPieceResponse {
            chunk_index: index,
            data: encode_base64(piece),
            total_chunks: total,
        })
    }

    fn owned_session(
        &self,
        caller: &Caller,
        upload_id: &UploadId,
        secret_id: &SecretId,
    ) -> Result<SessionInfo> {
        let info = self.assembler.session_info(upload_id)?;
        if info.owner != caller.account {
            return Err(KeeperError::SessionNotFound(*upload_id));
        }
        if info.secret_id != *secret_id {
            return Err(KeeperError::InvalidRequest(format!(
                "upload {} does not belong to secret {}",
                upload_id, secret_id
            )));
        }
        Ok(info)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Everything the caller's device missed since `since`.
    pub async fn sync(&self, caller: &Caller, since: Option<DateTime<Utc>>) -> Result<SyncResponse> {
        self.responder
            .sync(&caller.account, since)
            .await
            .map_err(|e| KeeperError::from_sync(e, &caller.account))
    }

    /// [`sync`](Self::sync) with the watermark as sent on the wire.
    pub async fn sync_from(&self, caller: &Caller, since: Option<&str>) -> Result<SyncResponse> {
        self.responder
            .sync_from(&caller.account, since)
            .await
            .map_err(|e| KeeperError::from_sync(e, &caller.account))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Tell the account's other sessions. Never fails the mutation.
    async fn notify(&self, caller: &Caller, kind: EventKind, secret_id: SecretId) {
        let event = SecretEvent::new(kind, secret_id, caller.account.clone());
        if let Err(e) = self
            .hub
            .broadcast(&caller.account, &event, caller.session.as_ref())
            .await
        {
            tracing::warn!(
                account = %caller.account,
                secret_id = %secret_id,
                kind = kind.as_str(),
                error = %e,
                "realtime notification failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsync_core::Metadata;
    use keepsync_realtime::memory;
    use keepsync_store::MemoryStore;

    fn keeper() -> Keeper<MemoryStore> {
        Keeper::new(MemoryStore::new(), KeeperConfig::default())
    }

    fn alice() -> Caller {
        Caller::new("alice").with_session("laptop")
    }

    #[tokio::test]
    async fn test_create_notifies_other_sessions_only() {
        let keeper = keeper();
        let (laptop, laptop_peer) = memory::pair();
        let (phone, phone_peer) = memory::pair();
        let _laptop = keeper.hub().connect(&alice(), Arc::new(laptop)).register();
        let _phone = keeper
            .hub()
            .connect(&Caller::new("alice").with_session("phone"), Arc::new(phone))
            .register();

        let secret = keeper
            .create_secret(&alice(), SecretDraft::new("L", "P"))
            .await
            .unwrap();

        assert!(laptop_peer.try_recv().await.is_none());
        let frame = phone_peer.try_recv().await.unwrap();
        let event: SecretEvent = serde_json::from_slice(&frame).unwrap();
        assert_eq!(event.kind, EventKind::Created);
        assert_eq!(event.secret_id, secret.id);
    }

    #[tokio::test]
    async fn test_mutation_succeeds_without_connections() {
        let keeper = keeper();
        let secret = keeper
            .create_secret(&alice(), SecretDraft::new("L", "P"))
            .await
            .unwrap();
        keeper.delete_secret(&alice(), &secret.id).await.unwrap();
        assert!(keeper.list_secrets(&alice()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chunked_create_and_download() {
        let keeper = keeper();
        let payload: Vec<u8> = (0..250u32).map(|i| i as u8).collect();

        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 3,
                    total_size: payload.len() as u64,
                    secret_id: None,
                },
            )
            .await
            .unwrap();

        for (index, piece) in payload.chunks(100).enumerate().rev() {
            let resp = keeper
                .upload_piece(
                    &alice(),
                    &init.secret_id,
                    UploadPieceRequest {
                        upload_id: init.upload_id,
                        chunk_index: index,
                        total_chunks: 3,
                        data: encode_base64(piece),
                    },
                )
                .await
                .unwrap();
            assert!(resp.received);
        }

        let secret = keeper
            .finalize_upload(
                &alice(),
                &init.secret_id,
                FinalizeUploadRequest {
                    upload_id: init.upload_id,
                    login: "L".into(),
                    password: "P".into(),
                    metadata: Metadata::new(),
                    version: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(secret.id, init.secret_id);
        assert_eq!(secret.version, 1);
        assert_eq!(secret.binary_data.as_deref(), Some(payload.as_slice()));
        assert!(keeper.assembler().is_empty());

        let piece = keeper.download_piece(&alice(), &secret.id, 0).await.unwrap();
        assert_eq!(piece.total_chunks, 1);
        assert_eq!(piece.data, encode_base64(&payload));
        assert_eq!(
            keeper.download_piece(&alice(), &secret.id, 1).await,
            Err(KeeperError::InvalidIndex { index: 1, total: 1 })
        );
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_session() {
        let keeper = keeper();
        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 1,
                    total_size: 3,
                    secret_id: None,
                },
            )
            .await
            .unwrap();
        keeper
            .upload_piece(
                &alice(),
                &init.secret_id,
                UploadPieceRequest {
                    upload_id: init.upload_id,
                    chunk_index: 0,
                    total_chunks: 1,
                    data: encode_base64(b"abc"),
                },
            )
            .await
            .unwrap();

        let finalize = |login: &str| FinalizeUploadRequest {
            upload_id: init.upload_id,
            login: login.into(),
            password: "P".into(),
            metadata: Metadata::new(),
            version: None,
        };

        assert!(matches!(
            keeper.finalize_upload(&alice(), &init.secret_id, finalize("")).await,
            Err(KeeperError::Validation(_))
        ));
        assert_eq!(keeper.assembler().len(), 1);

        let secret = keeper
            .finalize_upload(&alice(), &init.secret_id, finalize("L"))
            .await
            .unwrap();
        assert_eq!(secret.binary_data.as_deref(), Some(&b"abc"[..]));
    }

    #[tokio::test]
    async fn test_foreign_upload_is_session_not_found() {
        let keeper = keeper();
        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 1,
                    total_size: 1,
                    secret_id: None,
                },
            )
            .await
            .unwrap();

        let mallory = Caller::new("mallory");
        let result = keeper
            .upload_piece(
                &mallory,
                &init.secret_id,
                UploadPieceRequest {
                    upload_id: init.upload_id,
                    chunk_index: 0,
                    total_chunks: 1,
                    data: encode_base64(b"x"),
                },
            )
            .await;
        assert_eq!(result, Err(KeeperError::SessionNotFound(init.upload_id)));

        keeper.abandon_upload(&mallory, &init.upload_id);
        assert_eq!(keeper.assembler().len(), 1);
        keeper.abandon_upload(&alice(), &init.upload_id);
        assert!(keeper.assembler().is_empty());
    }

    #[tokio::test]
    async fn test_piece_checks() {
        let keeper = keeper();
        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 2,
                    total_size: 2,
                    secret_id: None,
                },
            )
            .await
            .unwrap();
        let piece = |index: usize, total: usize, data: &str| UploadPieceRequest {
            upload_id: init.upload_id,
            chunk_index: index,
            total_chunks: total,
            data: data.into(),
        };

        assert!(matches!(
            keeper.upload_piece(&alice(), &SecretId::new(), piece(0, 2, "AA==")).await,
            Err(KeeperError::InvalidRequest(_))
        ));
        assert!(matches!(
            keeper.upload_piece(&alice(), &init.secret_id, piece(0, 5, "AA==")).await,
            Err(KeeperError::InvalidRequest(_))
        ));
        assert_eq!(
            keeper.upload_piece(&alice(), &init.secret_id, piece(0, 2, "***")).await,
            Err(KeeperError::InvalidData)
        );
        assert_eq!(
            keeper.upload_piece(&alice(), &init.secret_id, piece(2, 2, "AA==")).await,
            Err(KeeperError::InvalidIndex { index: 2, total: 2 })
        );
    }

    #[tokio::test]
    async fn test_replacing_upload_needs_version() {
        let keeper = keeper();
        let secret = keeper
            .create_secret(&alice(), SecretDraft::new("L", "P"))
            .await
            .unwrap();
        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 1,
                    total_size: 1,
                    secret_id: Some(secret.id),
                },
            )
            .await
            .unwrap();
        keeper
            .upload_piece(
                &alice(),
                &secret.id,
                UploadPieceRequest {
                    upload_id: init.upload_id,
                    chunk_index: 0,
                    total_chunks: 1,
                    data: encode_base64(b"z"),
                },
            )
            .await
            .unwrap();

        let finalize = |version: Option<u64>| FinalizeUploadRequest {
            upload_id: init.upload_id,
            login: "L2".into(),
            password: "P2".into(),
            metadata: Metadata::new(),
            version,
        };

        let err = keeper
            .finalize_upload(&alice(), &secret.id, finalize(None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "common.invalid_request");
        assert_eq!(keeper.assembler().len(), 1);

        let updated = keeper
            .finalize_upload(&alice(), &secret.id, finalize(Some(1)))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.binary_data.as_deref(), Some(&b"z"[..]));
    }

    #[tokio::test]
    async fn test_oversized_piece_is_rejected() {
        let keeper = keeper();
        let init = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 1,
                    total_size: 1,
                    secret_id: None,
                },
            )
            .await
            .unwrap();

        let err = keeper
            .upload_piece(
                &alice(),
                &init.secret_id,
                UploadPieceRequest {
                    upload_id: init.upload_id,
                    chunk_index: 0,
                    total_chunks: 1,
                    data: encode_base64(&vec![0u8; 64 * 1024]),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "common.invalid_request");
        assert_eq!(keeper.assembler().session_info(&init.upload_id).unwrap().received, 0);
    }

    #[tokio::test]
    async fn test_init_for_unknown_secret() {
        let keeper = keeper();
        let result = keeper
            .init_upload(
                &alice(),
                InitUploadRequest {
                    total_chunks: 1,
                    total_size: 1,
                    secret_id: Some(SecretId::new()),
                },
            )
            .await;
        assert!(matches!(result, Err(KeeperError::NotFound(_))));
        assert!(keeper.assembler().is_empty());
    }

    #[test]
    fn test_new_outside_runtime() {
        let keeper = keeper();
        assert!(keeper.assembler().is_empty());
    }
}
