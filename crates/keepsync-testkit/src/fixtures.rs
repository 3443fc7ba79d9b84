//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use bytes::Bytes;

use keepsync::wire::{FinalizeUploadRequest, InitUploadRequest, InitUploadResponse, UploadPieceRequest};
use keepsync::{Keeper, KeeperConfig, KeeperError};
use keepsync_core::{encode_base64, split_into_pieces, Caller, Metadata, Secret, SecretDraft};
use keepsync_realtime::memory::{self, MemoryPeer};
use keepsync_realtime::Registration;
use keepsync_store::{MemoryStore, Store};

/// A keeper over a memory store, plus helpers to drive it.
pub struct TestFixture<S: Store = MemoryStore> {
    pub keeper: Keeper<S>,
}

impl TestFixture<MemoryStore> {
    /// Create a new fixture with default configuration.
    pub fn new() -> Self {
        Self::with_config(KeeperConfig::default())
    }

    pub fn with_config(config: KeeperConfig) -> Self {
        Self {
            keeper: Keeper::new(MemoryStore::new(), config),
        }
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store> TestFixture<S> {
    /// Wrap a keeper over any store.
    pub fn with_store(store: S, config: KeeperConfig) -> Self {
        Self {
            keeper: Keeper::new(store, config),
        }
    }

    /// Open a registered in-memory connection for `caller`.
    pub fn connect(&self, caller: &Caller) -> (Registration, MemoryPeer) {
        let (conn, peer) = memory::pair();
        let registration = self.keeper.hub().connect(caller, Arc::new(conn)).register();
        (registration, peer)
    }

    /// Create a secret with just login and password.
    pub async fn create(
        &self,
        caller: &Caller,
        login: &str,
        password: &str,
    ) -> Result<Secret, KeeperError> {
        self.keeper
            .create_secret(caller, SecretDraft::new(login, password))
            .await
    }

    /// Declare an upload of `payload` and send every piece, last first.
    pub async fn upload(
        &self,
        caller: &Caller,
        payload: &Bytes,
        piece_size: usize,
    ) -> Result<InitUploadResponse, KeeperError> {
        let pieces = split_into_pieces(payload, piece_size);
        let init = self
            .keeper
            .init_upload(
                caller,
                InitUploadRequest {
                    total_chunks: pieces.len(),
                    total_size: payload.len() as u64,
                    secret_id: None,
                },
            )
            .await?;

        for (index, piece) in pieces.iter().enumerate().rev() {
            self.keeper
                .upload_piece(
                    caller,
                    &init.secret_id,
                    UploadPieceRequest {
                        upload_id: init.upload_id,
                        chunk_index: index,
                        total_chunks: pieces.len(),
                        data: encode_base64(piece),
                    },
                )
                .await?;
        }

        Ok(init)
    }

    /// Upload `payload` and commit it as a new secret.
    pub async fn create_chunked(
        &self,
        caller: &Caller,
        payload: &Bytes,
        piece_size: usize,
    ) -> Result<Secret, KeeperError> {
        let init = self.upload(caller, payload, piece_size).await?;
        self.keeper
            .finalize_upload(
                caller,
                &init.secret_id,
                FinalizeUploadRequest {
                    upload_id: init.upload_id,
                    login: "chunked-login".into(),
                    password: "chunked-password".into(),
                    metadata: Metadata::new(),
                    version: None,
                },
            )
            .await
    }
}

/// Callers for `n` distinct accounts, each with one named session.
pub fn multi_account_callers(n: usize) -> Vec<Caller> {
    (0..n)
        .map(|i| Caller::new(format!("account-{i}")).with_session(format!("session-{i}").as_str()))
        .collect()
}

/// Callers for one account on `n` devices.
pub fn device_callers(account: &str, n: usize) -> Vec<Caller> {
    (0..n)
        .map(|i| Caller::new(account).with_session(format!("device-{i}").as_str()))
        .collect()
}
