//! # CID Ledger Store
//!
//! Persistence for the ledger: deployed applications with their global
//! state, opt-ins with per-account local state, the record of every
//! evaluated call, and produced rounds.
//!
//! Everything one evaluation changes travels as a single [`WriteBatch`]
//! (the transaction record plus an optional creation, opt-in, clear and
//! state delta). [`Store::commit`] checks the batch against what is stored
//! and applies all of it or none of it, so a half-applied call is never
//! visible.
//!
//! Two backends:
//!
//! - [`SqliteStore`]: one database file, schema in [`migration`]
//! - [`MemoryStore`]: maps behind a lock, for tests and `:memory:` runs
//!
//! ```rust,no_run
//! use cid_ledger_core::{AppId, Keypair};
//! use cid_ledger_store::{SqliteStore, Store};
//!
//! async fn show(path: &str) -> cid_ledger_store::Result<()> {
//!     let store = SqliteStore::open(path)?;
//!     if let Some(app) = store.get_application(AppId(1)).await? {
//!         println!("{} global keys", app.global.len());
//!     }
//!     let me = Keypair::from_phrase("example phrase").address();
//!     println!("opted in to {:?}", store.opted_in_apps(&me).await?);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, WriteBatch};
