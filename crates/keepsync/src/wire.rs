//! Request and response bodies exchanged with clients.
//!
//! Field names follow the deployed client protocol: camelCase for the
//! chunked transfer endpoints, snake_case everywhere else.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use keepsync_core::{Metadata, SecretDraft, SecretId, UploadId};

pub use keepsync_realtime::{EventKind, SecretEvent};
pub use keepsync_sync::{SecretView, SyncResponse};

/// Body of a plain create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSecretRequest {
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
}

impl CreateSecretRequest {
    pub fn into_draft(self) -> SecretDraft {
        SecretDraft {
            login: self.login,
            password: self.password,
            metadata: self.metadata,
            binary_data: self.binary_data,
        }
    }
}

/// Body of a plain update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSecretRequest {
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
    pub version: u64,
}

impl UpdateSecretRequest {
    /// Split into the expected version and the new payload.
    pub fn into_parts(self) -> (u64, SecretDraft) {
        (
            self.version,
            SecretDraft {
                login: self.login,
                password: self.password,
                metadata: self.metadata,
                binary_data: self.binary_data,
            },
        )
    }
}

/// Declare a chunked upload. With `secretId` the upload targets an existing
/// secret; without it a fresh id is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    pub total_chunks: usize,
    pub total_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<SecretId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub upload_id: UploadId,
    pub secret_id: SecretId,
}

/// One piece of a chunked upload; `data` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPieceRequest {
    pub upload_id: UploadId,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub data: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPieceResponse {
    pub chunk_index: usize,
    pub received: bool,
}

/// Commit a fully received upload. Without `version` the secret is created,
/// with it the existing secret is updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeUploadRequest {
    pub upload_id: UploadId,
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// One piece of a stored attachment; `data` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPieceResponse {
    pub chunk_index: usize,
    pub data: String,
    pub total_chunks: usize,
}
