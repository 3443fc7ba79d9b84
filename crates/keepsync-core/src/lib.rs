//! # keepsync Core
//!
//! Pure primitives for keepsync: secret records, identifiers, piece
//! splitting, and the base64 wire codec.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! plain data and pure functions over it.
//!
//! ## Key Types
//!
//! - [`Secret`] - One encrypted credential record, as stored
//! - [`SecretDraft`] - The caller-supplied payload of a create or update
//! - [`Metadata`] - Open string-to-string map carried alongside a secret
//! - [`SecretId`], [`UploadId`], [`AccountId`], [`SessionId`] - Identifiers
//! - [`Caller`] - The authenticated `(account, session?)` pair
//!
//! ## Pieces
//!
//! Large binaries travel in pieces. [`split_into_pieces`] is the download
//! direction; reassembly lives in `keepsync-transfer`.

pub mod codec;
pub mod error;
pub mod pieces;
pub mod secret;
pub mod time;
pub mod types;
pub mod validation;

pub use codec::{decode_base64, encode_base64};
pub use error::{CoreError, ValidationError};
pub use pieces::{piece_count, split_into_pieces, DOWNLOAD_PIECE_SIZE, INLINE_BINARY_LIMIT};
pub use secret::{Metadata, Secret, SecretDraft};
pub use time::{format_rfc3339, from_millis, now, parse_rfc3339, to_millis};
pub use types::{AccountId, Caller, SecretId, SessionId, UploadId};
pub use validation::validate_draft;
