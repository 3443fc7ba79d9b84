//! # keepsync Store
//!
//! Storage abstraction for keepsync secrets. Provides a trait-based
//! interface with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The [`Store`] trait is the durable, versioned home of every secret. The
//! primary implementation is [`SqliteStore`], with [`MemoryStore`] for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keepsync_core::{AccountId, SecretDraft, SecretId};
//! use keepsync_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("keepsync.db").unwrap();
//!     let owner = AccountId::from("42");
//!
//!     let secret = store
//!         .create_secret(&owner, SecretId::new(), SecretDraft::new("login", "password"))
//!         .await
//!         .unwrap();
//!     assert_eq!(secret.version, 1);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Owner scoping**: every query filters by owner; another account's id
//!   looks exactly like a missing id
//! - **Compare-and-swap updates**: the version check is part of the UPDATE
//!   statement itself
//! - **Tombstones**: soft-deleted rows stay for delta sync

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::Store;
