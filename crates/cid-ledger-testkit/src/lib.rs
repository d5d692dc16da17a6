//! # CID Ledger Testkit
//!
//! Testing utilities for the CID ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Call vectors**: fixed calls whose encoding and ids must not drift
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: a ledger, a creator and signed-call helpers
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cid_ledger_testkit::generators::{upload_from_params, UploadParams};
//!
//! proptest! {
//!     #[test]
//!     fn tx_id_is_deterministic(params: UploadParams) {
//!         let c1 = upload_from_params(&params);
//!         let c2 = upload_from_params(&params);
//!         prop_assert_eq!(c1.compute_id(), c2.compute_id());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use cid_ledger_testkit::fixtures::{accounts, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let alice = accounts(1).remove(0);
//!     let app = fixture.deploy_with(&[alice.clone()]).await.unwrap();
//!     app.upload_file(&alice, "QmA").await.unwrap();
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{accounts, make_create, make_opt_in, make_upload, TestFixture};
pub use generators::{upload_from_params, UploadParams};
pub use vectors::{all_vectors, generate_call_from_vector, verify_all_vectors, CallVector};
