//! # CID Ledger
//!
//! A local application ledger running a single contract: a record of the
//! most recently uploaded content identifier (CID), kept globally and per
//! account.
//!
//! ## Overview
//!
//! - **Ledger**: queues signed application calls and evaluates them in
//!   rounds, committing each result atomically
//! - **Client**: the node surface a deployment script talks to, with
//!   confirmation waiting
//! - **Harness**: deploy the application, opt accounts in, upload CIDs and
//!   read the stored values back
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use cid_ledger::{AppClient, Ledger, LedgerConfig};
//! use cid_ledger::core::Keypair;
//! use cid_ledger::store::SqliteStore;
//!
//! async fn example() -> cid_ledger::Result<()> {
//!     let store = SqliteStore::open("ledger.db")?;
//!     let ledger = Arc::new(Ledger::new(store, LedgerConfig::default()));
//!
//!     let creator = Keypair::from_phrase("tree river prefer carry");
//!     let app = AppClient::deploy(ledger, &creator, 4).await?;
//!
//!     app.opt_in(&creator).await?;
//!     app.upload_file(&creator, "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").await?;
//!
//!     let stored = app.file_cid().await?;
//!     println!("file_cid = {:?}", stored);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cid_ledger::core` - Calls, state, the approval and clear-state programs
//! - `cid_ledger::store` - Storage abstraction and SQLite

pub mod client;
pub mod config;
pub mod error;
pub mod harness;
pub mod ledger;

// Re-export component crates
pub use cid_ledger_core as core;
pub use cid_ledger_store as store;

pub use client::{
    send_and_wait, wait_for_confirmation, Confirmation, LedgerClient, SuggestedParams, TxStatus,
};
pub use config::{write_programs, AppIdFile, DeployConfig, LedgerLocation, DEFAULT_WAIT_ROUNDS};
pub use error::{LedgerError, Result};
pub use harness::AppClient;
pub use ledger::{Ledger, LedgerConfig, RoundReport};

// Re-export commonly used core types
pub use cid_ledger_core::{
    Address, AppCallBuilder, AppId, Keypair, OnCompletion, RejectKind, SignedAppCall, StateMap,
    StateValue, TxId,
};
