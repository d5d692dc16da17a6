//! Store trait: the abstract interface for ledger persistence.
//!
//! This trait allows the ledger to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use cid_ledger_core::{
    Address, AppId, Application, StateDelta, StateMap, TransactionRecord, TxId,
};

use crate::error::Result;

/// Everything one evaluated transaction changes.
///
/// A rejected transaction carries only its record. An accepted one may also
/// create an application, open or remove an account's local record, and
/// write state. The store applies the parts in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    /// The transaction record to persist.
    pub transaction: TransactionRecord,

    /// A newly created application, with empty global state.
    pub create_app: Option<Application>,

    /// Open an empty local record for this account.
    pub opt_in: Option<(AppId, Address)>,

    /// Remove this account's local record.
    pub clear: Option<(AppId, Address)>,

    /// State writes for one application.
    pub delta: Option<(AppId, StateDelta)>,
}

impl WriteBatch {
    /// A batch that only records the transaction.
    pub fn new(transaction: TransactionRecord) -> Self {
        Self {
            transaction,
            create_app: None,
            opt_in: None,
            clear: None,
            delta: None,
        }
    }

    pub fn create_app(mut self, app: Application) -> Self {
        self.create_app = Some(app);
        self
    }

    pub fn opt_in(mut self, app_id: AppId, account: Address) -> Self {
        self.opt_in = Some((app_id, account));
        self
    }

    pub fn clear(mut self, app_id: AppId, account: Address) -> Self {
        self.clear = Some((app_id, account));
        self
    }

    /// Attach state writes. Empty deltas are dropped.
    pub fn delta(mut self, app_id: AppId, delta: StateDelta) -> Self {
        if !delta.is_empty() {
            self.delta = Some((app_id, delta));
        }
        self
    }
}

/// The Store trait: async interface for ledger persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Atomic commits**: [`Store::commit`] applies a whole [`WriteBatch`] or
///   nothing. Readers never observe a partially applied batch.
/// - **Integrity**: a batch that contradicts stored state is refused with an
///   error. The ledger checks the same conditions before building a batch,
///   so an error here indicates a bug or a concurrent writer.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Application Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an application and its global state.
    async fn get_application(&self, app_id: AppId) -> Result<Option<Application>>;

    /// List application ids, optionally filtered by creator.
    async fn list_applications(&self, creator: Option<&Address>) -> Result<Vec<AppId>>;

    /// The highest assigned application id, or zero if none exist.
    async fn last_app_id(&self) -> Result<AppId>;

    // ─────────────────────────────────────────────────────────────────────────
    // Local State Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an account's local state, or `None` if it has not opted in.
    async fn get_local_state(&self, app_id: AppId, account: &Address) -> Result<Option<StateMap>>;

    /// Applications the account is currently opted in to.
    async fn opted_in_apps(&self, account: &Address) -> Result<Vec<AppId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Transaction Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Check if a transaction has been recorded.
    async fn has_transaction(&self, tx_id: &TxId) -> Result<bool>;

    /// Get a transaction record.
    async fn get_transaction(&self, tx_id: &TxId) -> Result<Option<TransactionRecord>>;

    /// Ids of the transactions evaluated in a round, in evaluation order.
    async fn round_transactions(&self, round: u64) -> Result<Vec<TxId>>;

    /// Apply a batch atomically.
    ///
    /// # Errors
    /// - `DuplicateTransaction`, `ApplicationExists` or `AlreadyOptedIn` if
    ///   the batch would overwrite a record.
    /// - `UnknownApplication` or `NotOptedIn` if a record it touches is
    ///   missing.
    async fn commit(&self, batch: &WriteBatch) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Round Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The last produced round, or zero before the first.
    async fn latest_round(&self) -> Result<u64>;

    /// Record that a round was produced.
    async fn record_round(&self, round: u64, tx_count: usize) -> Result<()>;
}
