//! # keepsync Testkit
//!
//! Testing utilities for keepsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Wire vectors**: Fixed inputs with the exact JSON clients expect
//! - **Generators**: Proptest strategies for drafts, payloads, and upload plans
//! - **Fixtures**: A ready keeper plus helpers for connections and uploads
//!
//! ## Wire Vectors
//!
//! ```rust
//! use keepsync_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keepsync_testkit::generators::UploadPlan;
//!
//! proptest! {
//!     #[test]
//!     fn order_covers_every_piece(plan: UploadPlan) {
//!         prop_assert_eq!(plan.order.len(), plan.pieces());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use keepsync_testkit::fixtures::{device_callers, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let devices = device_callers("alice", 2);
//! let (_registration, peer) = fixture.connect(&devices[1]);
//! let secret = fixture.create(&devices[0], "login", "password").await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{device_callers, multi_account_callers, TestFixture};
pub use generators::UploadPlan;
pub use vectors::{all_vectors, verify_all_vectors, WireVector};
