//! # keepsync Sync
//!
//! Catch-up for devices that were offline or missed a realtime event.
//!
//! ## Overview
//!
//! A device sends the `server_time` of its previous sync as a watermark and
//! receives every secret created, updated, or deleted at or after it. The
//! comparison is inclusive, so an edit landing exactly on the watermark is
//! seen twice rather than never. Tombstones are included so the device can
//! drop its local copy.
//!
//! Attachments above the inline limit are announced by size only; the
//! device fetches them piece by piece.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keepsync_core::AccountId;
//! use keepsync_store::SqliteStore;
//! use keepsync_sync::{SyncConfig, SyncResponder};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("keepsync.db").unwrap());
//!     let responder = SyncResponder::new(store, SyncConfig::default());
//!
//!     let first = responder.sync(&AccountId::from("42"), None).await.unwrap();
//!     let next = responder
//!         .sync(&AccountId::from("42"), Some(first.server_time))
//!         .await
//!         .unwrap();
//!     println!("{} changes", next.secrets.len());
//! }
//! ```

pub mod error;
pub mod responder;
pub mod view;

pub use error::{Result, SyncError};
pub use responder::{SyncConfig, SyncResponder, SyncResponse};
pub use view::SecretView;
