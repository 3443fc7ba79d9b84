//! # keepsync Transfer
//!
//! Chunked binary upload for large secret attachments.
//!
//! ## Overview
//!
//! A client declares an upload (piece count and total size), sends pieces in
//! any order and as often as it likes, then asks for the reassembled
//! payload. Sessions live in memory only; a background sweep drops any
//! session older than the upload TTL.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use keepsync_core::AccountId;
//! use keepsync_transfer::{spawn_sweeper, ChunkAssembler};
//!
//! async fn example() {
//!     let assembler = Arc::new(ChunkAssembler::default());
//!     let _sweeper = spawn_sweeper(&assembler);
//!
//!     let ticket = assembler.init_upload(&AccountId::from("42"), 2, 6).unwrap();
//!     assembler.upload_piece(&ticket.upload_id, 1, Bytes::from_static(b"def")).unwrap();
//!     assembler.upload_piece(&ticket.upload_id, 0, Bytes::from_static(b"abc")).unwrap();
//!
//!     let payload = assembler.reassemble(&ticket.upload_id).unwrap();
//!     assert_eq!(&payload[..], b"abcdef");
//!     assembler.cleanup(&ticket.upload_id);
//! }
//! ```
//!
//! Downloads need no session: see [`keepsync_core::split_into_pieces`].

pub mod assembler;
pub mod error;
pub mod sweeper;

pub use assembler::{AssemblerConfig, ChunkAssembler, SessionInfo, UploadTicket};
pub use error::{Result, TransferError};
pub use sweeper::{spawn_sweeper, SweeperHandle};
