//! # keepsync Realtime
//!
//! Live notification of secret mutations to the other devices of an
//! account.
//!
//! ## Overview
//!
//! Every open client connection is indexed by `(account, session)`. After a
//! mutation commits, the caller broadcasts a [`SecretEvent`] to the account,
//! excluding the session that made the change. Delivery is best effort: a
//! missed event is recovered by the next delta sync.
//!
//! ## Connection lifecycle
//!
//! ```text
//! connect() ──> Connecting ──register()──> Registered ──drop/close──> Closed
//!                   │                                                   ▲
//!                   └──────────────────── drop ─────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keepsync_core::{AccountId, Caller, SecretId, SessionId};
//! use keepsync_realtime::{memory, Hub, SecretEvent};
//!
//! async fn example() {
//!     let hub = Hub::new();
//!     let (conn, _peer) = memory::pair();
//!     let caller = Caller::new("42").with_session("laptop");
//!
//!     let hub2 = hub.clone();
//!     tokio::spawn(async move { hub2.serve(&caller, Arc::new(conn)).await });
//!
//!     let event = SecretEvent::created(SecretId::new(), AccountId::from("42"));
//!     let report = hub
//!         .broadcast(&AccountId::from("42"), &event, Some(&SessionId::from("phone")))
//!         .await
//!         .unwrap();
//!     println!("delivered to {} sessions", report.delivered);
//! }
//! ```

pub mod error;
pub mod event;
pub mod hub;
pub mod transport;

pub use error::{RealtimeError, Result};
pub use event::{EventKind, SecretEvent};
pub use hub::{BroadcastReport, ConnectionState, Hub, PendingConnection, Registration};
pub use transport::{memory, Connection};
