//! # keepsync
//!
//! Server-side core of a multi-device secret manager: encrypted records
//! that several devices of one account edit concurrently and keep in step.
//!
//! ## Overview
//!
//! - **Store**: versioned records with compare-and-swap updates and
//!   tombstones
//! - **Transfer**: large attachments uploaded in pieces, in any order, and
//!   downloaded the same way
//! - **Realtime**: every mutation is pushed to the account's other live
//!   sessions, never echoed to the one that made it
//! - **Sync**: devices catch up on anything they missed from a watermark
//!
//! ## Key Concepts
//!
//! - **Version**: starts at 1, bumped by every update. An update carrying a
//!   stale version is rejected, never merged.
//! - **Tombstone**: a deleted secret stays visible to delta sync so other
//!   devices learn about the deletion.
//! - **Caller**: the authenticated account plus, optionally, the session
//!   the request came from.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keepsync::{Caller, Keeper, KeeperConfig, SecretDraft};
//! use keepsync::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("keepsync.db").unwrap();
//!     let keeper = Keeper::new(store, KeeperConfig::from_env().unwrap());
//!
//!     let caller = Caller::new("42").with_session("laptop");
//!     let secret = keeper
//!         .create_secret(&caller, SecretDraft::new("login-ct", "password-ct"))
//!         .await
//!         .unwrap();
//!
//!     let secret = keeper
//!         .update_secret(&caller, &secret.id, secret.version, SecretDraft::new("l2", "p2"))
//!         .await
//!         .unwrap();
//!     assert_eq!(secret.version, 2);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `keepsync::core` - Identifiers, records, piece splitting
//! - `keepsync::store` - Storage abstraction and SQLite
//! - `keepsync::transfer` - Chunked upload sessions
//! - `keepsync::realtime` - Connection hub and events
//! - `keepsync::sync` - Delta sync

pub mod config;
pub mod error;
pub mod keeper;
pub mod wire;

// Re-export component crates
pub use keepsync_core as core;
pub use keepsync_realtime as realtime;
pub use keepsync_store as store;
pub use keepsync_sync as sync;
pub use keepsync_transfer as transfer;

// Re-export main types for convenience
pub use config::{ConfigError, KeeperConfig};
pub use error::{KeeperError, Result};
pub use keeper::Keeper;

// Re-export commonly used core types
pub use keepsync_core::{AccountId, Caller, Metadata, Secret, SecretDraft, SecretId, SessionId, UploadId};
