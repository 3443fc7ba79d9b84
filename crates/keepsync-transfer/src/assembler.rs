//! Upload session table and piece reassembly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use keepsync_core::{AccountId, SecretId, UploadId};

use crate::error::{Result, TransferError};

/// Configuration for upload sessions.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// How long a session lives after it was declared.
    pub upload_ttl: Duration,
    /// How often the background sweep runs.
    pub sweep_interval: Duration,
    /// Largest accepted piece count.
    pub max_pieces: usize,
    /// Largest accepted declared size in bytes.
    pub max_total_size: u64,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            upload_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            max_pieces: 10_000,
            max_total_size: 512 * 1024 * 1024,
        }
    }
}

/// Identifiers handed back when an upload is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    pub upload_id: UploadId,
    pub secret_id: SecretId,
}

/// Read-only snapshot of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub owner: AccountId,
    pub secret_id: SecretId,
    pub total_pieces: usize,
    pub total_size: u64,
    /// Number of distinct slots filled so far.
    pub received: usize,
    /// Declared with [`ChunkAssembler::init_upload_for`], so the payload
    /// replaces an existing secret rather than creating one.
    pub targets_existing: bool,
}

/// One pending upload.
struct UploadSession {
    owner: AccountId,
    secret_id: SecretId,
    targets_existing: bool,
    total_size: u64,
    /// Sum of the lengths of the filled slots.
    stored_bytes: u64,
    pieces: Vec<Option<Bytes>>,
}

impl UploadSession {
    fn received(&self) -> usize {
        self.pieces.iter().filter(|p| p.is_some()).count()
    }
}

struct SessionSlot {
    created_at: Instant,
    session: Mutex<UploadSession>,
}

impl SessionSlot {
    fn lock(&self) -> MutexGuard<'_, UploadSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory table of pending uploads.
///
/// The table lock is only held to look up, insert, or remove a session.
/// Each session has its own lock, so pieces for different uploads never
/// contend beyond the lookup.
pub struct ChunkAssembler {
    config: AssemblerConfig,
    sessions: Mutex<HashMap<UploadId, Arc<SessionSlot>>>,
}

impl ChunkAssembler {
    /// Create an empty assembler.
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The configuration this assembler was built with.
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    fn table(&self) -> MutexGuard<'_, HashMap<UploadId, Arc<SessionSlot>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, upload_id: &UploadId) -> Result<Arc<SessionSlot>> {
        let slot = self
            .table()
            .get(upload_id)
            .cloned()
            .ok_or(TransferError::SessionNotFound(*upload_id))?;

        // Expired but not yet swept.
        if slot.created_at.elapsed() >= self.config.upload_ttl {
            return Err(TransferError::SessionNotFound(*upload_id));
        }
        Ok(slot)
    }

    /// Declare an upload for a secret that does not exist yet.
    ///
    /// A fresh secret id is allocated here; it only becomes a real secret
    /// once the payload is committed to the store.
    pub fn init_upload(
        &self,
        owner: &AccountId,
        total_pieces: usize,
        total_size: u64,
    ) -> Result<UploadTicket> {
        self.declare(owner, SecretId::new(), false, total_pieces, total_size)
    }

    /// Declare an upload that targets a given secret id.
    pub fn init_upload_for(
        &self,
        owner: &AccountId,
        secret_id: SecretId,
        total_pieces: usize,
        total_size: u64,
    ) -> Result<UploadTicket> {
        self.declare(owner, secret_id, true, total_pieces, total_size)
    }

    fn declare(
        &self,
        owner: &AccountId,
        secret_id: SecretId,
        targets_existing: bool,
        total_pieces: usize,
        total_size: u64,
    ) -> Result<UploadTicket> {
        if total_pieces == 0 || total_pieces > self.config.max_pieces {
            return Err(TransferError::InvalidDeclaration(format!(
                "piece count {} not in 1..={}",
                total_pieces, self.config.max_pieces
            )));
        }
        if total_size > self.config.max_total_size {
            return Err(TransferError::InvalidDeclaration(format!(
                "size {} exceeds {}",
                total_size, self.config.max_total_size
            )));
        }

        let upload_id = UploadId::new();
        let slot = SessionSlot {
            created_at: Instant::now(),
            session: Mutex::new(UploadSession {
                owner: owner.clone(),
                secret_id,
                targets_existing,
                total_size,
                stored_bytes: 0,
                pieces: vec![None; total_pieces],
            }),
        };
        self.table().insert(upload_id, Arc::new(slot));

        tracing::info!(
            account = %owner,
            upload_id = %upload_id,
            secret_id = %secret_id,
            total_pieces,
            total_size,
            "upload session started"
        );

        Ok(UploadTicket {
            upload_id,
            secret_id,
        })
    }

    /// Store one piece. Re-sending an index overwrites that slot only.
    ///
    /// A piece that would push the stored bytes past the declared size is
    /// refused and leaves the slot untouched.
    pub fn upload_piece(&self, upload_id: &UploadId, index: usize, data: Bytes) -> Result<()> {
        let slot = self.slot(upload_id)?;
        let mut session = slot.lock();
        let session = &mut *session;

        let total = session.pieces.len();
        let target = session
            .pieces
            .get_mut(index)
            .ok_or(TransferError::InvalidIndex { index, total })?;

        let len = data.len();
        let replaced = target.as_ref().map_or(0, |old| old.len() as u64);
        let stored = session.stored_bytes - replaced + len as u64;
        if stored > session.total_size {
            return Err(TransferError::SizeExceeded {
                declared: session.total_size,
                attempted: stored,
            });
        }

        *target = Some(data);
        session.stored_bytes = stored;

        tracing::debug!(upload_id = %upload_id, index, len, "piece stored");
        Ok(())
    }

    /// Concatenate all pieces in index order.
    ///
    /// The session is kept; call [`cleanup`](Self::cleanup) once the payload
    /// has been committed.
    pub fn reassemble(&self, upload_id: &UploadId) -> Result<Bytes> {
        let slot = self.slot(upload_id)?;
        let session = slot.lock();

        let total = session.pieces.len();
        let received = session.received();
        if received < total {
            return Err(TransferError::IncompleteUpload { received, total });
        }

        let mut out = BytesMut::with_capacity(session.stored_bytes as usize);
        for piece in session.pieces.iter().flatten() {
            out.extend_from_slice(piece);
        }

        if session.stored_bytes != session.total_size {
            tracing::warn!(
                upload_id = %upload_id,
                declared = session.total_size,
                actual = session.stored_bytes,
                "reassembled size differs from declaration"
            );
        }

        Ok(out.freeze())
    }

    /// Remove a session. Unknown ids are ignored.
    pub fn cleanup(&self, upload_id: &UploadId) {
        if self.table().remove(upload_id).is_some() {
            tracing::debug!(upload_id = %upload_id, "upload session removed");
        }
    }

    /// Snapshot a session's declaration and progress.
    pub fn session_info(&self, upload_id: &UploadId) -> Result<SessionInfo> {
        let slot = self.slot(upload_id)?;
        let session = slot.lock();
        Ok(SessionInfo {
            owner: session.owner.clone(),
            secret_id: session.secret_id,
            total_pieces: session.pieces.len(),
            total_size: session.total_size,
            received: session.received(),
            targets_existing: session.targets_existing,
        })
    }

    /// Drop every session older than the configured TTL. Returns how many
    /// were removed.
    pub fn sweep_expired(&self) -> usize {
        let ttl = self.config.upload_ttl;
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, slot| slot.created_at.elapsed() < ttl);
        before - table.len()
    }

    /// Number of sessions currently held, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}
