//! Store errors.
//!
//! Batch checks report which id they tripped on, so the ledger can log a
//! refused commit without parsing a message.

use cid_ledger_core::{Address, AppId, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transaction {0} already recorded")]
    DuplicateTransaction(TxId),

    #[error("application {0} already exists")]
    ApplicationExists(AppId),

    /// The batch touches an application that was never created.
    #[error("application {0} does not exist")]
    UnknownApplication(AppId),

    #[error("account {account} already opted in to application {app_id}")]
    AlreadyOptedIn { app_id: AppId, account: Address },

    /// The batch writes or clears local state the account does not hold.
    #[error("account {account} has no local state in application {app_id}")]
    NotOptedIn { app_id: AppId, account: Address },

    #[error("round {0} already recorded")]
    RoundRecorded(u64),

    /// A row decoded to something the ledger never writes.
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("migration error: {0}")]
    Migration(String),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
