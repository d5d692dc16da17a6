//! Error types for the ledger.

use cid_ledger_core::{AppId, CoreError, RejectKind, TxId, ValidationError};
use cid_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger and client operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The call was refused at submission.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Encoding or key error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The same call is already pending or committed.
    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(TxId),

    /// The validity window spans more rounds than the ledger allows.
    #[error("validity window {first}..={last} is longer than {max} rounds")]
    ValidityWindowTooLong { first: u64, last: u64, max: u64 },

    /// Application not found.
    #[error("application not found: {0}")]
    ApplicationNotFound(AppId),

    /// The ledger has never seen this transaction.
    #[error("transaction not found: {0}")]
    TransactionNotFound(TxId),

    /// The call was evaluated and rejected.
    #[error("transaction {tx_id} rejected ({kind}): {reason}")]
    Rejected {
        tx_id: TxId,
        kind: RejectKind,
        reason: String,
    },

    /// The call was still pending after the allowed number of rounds.
    #[error("transaction {tx_id} not confirmed after {rounds} rounds")]
    Timeout { tx_id: TxId, rounds: u64 },

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
