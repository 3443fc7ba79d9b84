//! Golden wire vectors.
//!
//! Deployed clients parse these documents field by field, so their JSON
//! must not drift. Each vector pairs a value built from fixed inputs with
//! the exact JSON it has to produce.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use keepsync::wire::{DownloadPieceResponse, InitUploadResponse, SyncResponse};
use keepsync_core::{AccountId, Metadata, Secret, SecretId, UploadId};
use keepsync_realtime::{EventKind, SecretEvent};
use keepsync_sync::SecretView;

/// A golden wire vector.
#[derive(Debug, Clone)]
pub struct WireVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// JSON produced by the implementation.
    pub actual: Value,
    /// JSON clients expect.
    pub expected: Value,
}

impl WireVector {
    pub fn matches(&self) -> bool {
        self.actual == self.expected
    }
}

pub const SECRET_ID: &str = "3b241101-e2bb-4255-8caf-4136c566a962";
pub const UPLOAD_ID: &str = "6f9619ff-8b86-4011-b42d-00c04fc964ff";

fn secret_id() -> SecretId {
    SECRET_ID.parse().unwrap_or_default()
}

fn upload_id() -> UploadId {
    UPLOAD_ID.parse().unwrap_or_default()
}

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

fn sample_secret(binary: Option<&'static [u8]>) -> Secret {
    Secret {
        id: secret_id(),
        owner: AccountId::from("42"),
        login: "bG9naW4=".into(),
        password: "cGFzcw==".into(),
        metadata: [("kind", "card")].into_iter().collect::<Metadata>(),
        binary_data: binary.map(Bytes::from_static),
        version: 2,
        created_at: at(1_714_566_600_000),
        updated_at: at(1_714_566_660_250),
        deleted_at: None,
    }
}

/// Get all golden wire vectors.
pub fn all_vectors() -> Vec<WireVector> {
    let mut tombstone = sample_secret(None);
    tombstone.deleted_at = Some(at(1_714_566_660_250));

    vec![
        WireVector {
            name: "secret_created event",
            actual: to_value(&SecretEvent::at(
                EventKind::Created,
                secret_id(),
                AccountId::from("42"),
                at(1_714_566_600_000),
            )),
            expected: json!({
                "type": "secret_created",
                "secret_id": SECRET_ID,
                "user_id": "42",
                "timestamp": "2024-05-01T12:30:00Z",
            }),
        },
        WireVector {
            name: "sync view with inline attachment",
            actual: to_value(&SecretView::for_sync(&sample_secret(Some(b"hi")), 2)),
            expected: json!({
                "id": SECRET_ID,
                "login": "bG9naW4=",
                "password": "cGFzcw==",
                "metadata": {"kind": "card"},
                "binary_data": "aGk=",
                "version": 2,
                "created_at": "2024-05-01T12:30:00Z",
                "updated_at": "2024-05-01T12:31:00.250Z",
            }),
        },
        WireVector {
            name: "sync view with attachment by size",
            actual: to_value(&SecretView::for_sync(&sample_secret(Some(b"abc")), 2)),
            expected: json!({
                "id": SECRET_ID,
                "login": "bG9naW4=",
                "password": "cGFzcw==",
                "metadata": {"kind": "card"},
                "binary_data_size": 3,
                "version": 2,
                "created_at": "2024-05-01T12:30:00Z",
                "updated_at": "2024-05-01T12:31:00.250Z",
            }),
        },
        WireVector {
            name: "sync response with tombstone",
            actual: to_value(&SyncResponse {
                secrets: vec![SecretView::for_sync(&tombstone, 2)],
                server_time: at(1_714_566_661_999),
            }),
            expected: json!({
                "secrets": [{
                    "id": SECRET_ID,
                    "login": "bG9naW4=",
                    "password": "cGFzcw==",
                    "metadata": {"kind": "card"},
                    "version": 2,
                    "created_at": "2024-05-01T12:30:00Z",
                    "updated_at": "2024-05-01T12:31:00.250Z",
                    "deleted_at": "2024-05-01T12:31:00.250Z",
                }],
                "server_time": "2024-05-01T12:31:01Z",
            }),
        },
        WireVector {
            name: "init upload response",
            actual: to_value(&InitUploadResponse {
                upload_id: upload_id(),
                secret_id: secret_id(),
            }),
            expected: json!({
                "uploadId": UPLOAD_ID,
                "secretId": SECRET_ID,
            }),
        },
        WireVector {
            name: "download piece response",
            actual: to_value(&DownloadPieceResponse {
                chunk_index: 1,
                data: "aGVsbG8=".into(),
                total_chunks: 3,
            }),
            expected: json!({
                "chunkIndex": 1,
                "data": "aGVsbG8=",
                "totalChunks": 3,
            }),
        },
    ]
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| json!({ "serialization_error": e.to_string() }))
}

/// Names of vectors whose JSON differs from the expected document.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|v| !v.matches())
        .map(|v| v.name)
        .collect()
}
