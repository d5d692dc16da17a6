//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use cid_ledger_core::{Address, AppId, Application, StateMap, TransactionRecord, TxId};

use crate::error::{Result, StoreError};
use crate::traits::{Store, WriteBatch};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; a
/// commit holds the write lock for the whole batch.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Applications indexed by id, global state included.
    applications: BTreeMap<AppId, Application>,

    /// Local state per (application, account).
    locals: BTreeMap<(AppId, Address), StateMap>,

    /// Transaction records indexed by id.
    transactions: HashMap<TxId, TransactionRecord>,

    /// Produced rounds and their transaction counts.
    rounds: BTreeMap<u64, usize>,

    /// Transaction ids per round, in commit order.
    round_transactions: BTreeMap<u64, Vec<TxId>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    // A panic while holding the lock cannot leave a batch half applied,
    // because batches are checked before any mutation.
    fn read(&self) -> RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn app_exists(&self, app_id: AppId, batch: &WriteBatch) -> bool {
        self.applications.contains_key(&app_id)
            || batch.create_app.as_ref().is_some_and(|app| app.id == app_id)
    }

    /// Whether the account will have a local record once the batch's
    /// opt-in and clear steps are applied.
    fn local_exists_after(&self, app_id: AppId, account: &Address, batch: &WriteBatch) -> bool {
        let key = (app_id, *account);
        if batch.opt_in == Some(key) {
            return true;
        }
        self.locals.contains_key(&key) && batch.clear != Some(key)
    }

    /// Check a batch against current state without changing anything.
    fn check(&self, batch: &WriteBatch) -> Result<()> {
        let tx_id = batch.transaction.tx_id;
        if self.transactions.contains_key(&tx_id) {
            return Err(StoreError::DuplicateTransaction(tx_id));
        }

        if let Some(app) = &batch.create_app {
            if self.applications.contains_key(&app.id) {
                return Err(StoreError::ApplicationExists(app.id));
            }
        }

        if let Some((app_id, account)) = &batch.opt_in {
            if !self.app_exists(*app_id, batch) {
                return Err(StoreError::UnknownApplication(*app_id));
            }
            if self.locals.contains_key(&(*app_id, *account)) {
                return Err(StoreError::AlreadyOptedIn {
                    app_id: *app_id,
                    account: *account,
                });
            }
        }

        if let Some((app_id, account)) = &batch.clear {
            if !self.locals.contains_key(&(*app_id, *account)) {
                return Err(StoreError::NotOptedIn {
                    app_id: *app_id,
                    account: *account,
                });
            }
        }

        if let Some((app_id, delta)) = &batch.delta {
            if !self.app_exists(*app_id, batch) {
                return Err(StoreError::UnknownApplication(*app_id));
            }
            for account in delta.local.keys() {
                if !self.local_exists_after(*app_id, account, batch) {
                    return Err(StoreError::NotOptedIn {
                        app_id: *app_id,
                        account: *account,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply a checked batch.
    fn apply(&mut self, batch: &WriteBatch) {
        if let Some(app) = &batch.create_app {
            self.applications.insert(app.id, app.clone());
        }

        if let Some(key) = batch.opt_in {
            self.locals.insert(key, StateMap::new());
        }

        if let Some(key) = batch.clear {
            self.locals.remove(&key);
        }

        if let Some((app_id, delta)) = &batch.delta {
            if let Some(app) = self.applications.get_mut(app_id) {
                delta.apply_global(&mut app.global);
            }
            for account in delta.local.keys() {
                if let Some(local) = self.locals.get_mut(&(*app_id, *account)) {
                    delta.apply_local(account, local);
                }
            }
        }

        let record = &batch.transaction;
        self.round_transactions
            .entry(record.round)
            .or_default()
            .push(record.tx_id);
        self.transactions.insert(record.tx_id, record.clone());
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_application(&self, app_id: AppId) -> Result<Option<Application>> {
        let inner = self.read();
        Ok(inner.applications.get(&app_id).cloned())
    }

    async fn list_applications(&self, creator: Option<&Address>) -> Result<Vec<AppId>> {
        let inner = self.read();
        Ok(inner
            .applications
            .values()
            .filter(|app| creator.map_or(true, |c| app.creator == *c))
            .map(|app| app.id)
            .collect())
    }

    async fn last_app_id(&self) -> Result<AppId> {
        let inner = self.read();
        Ok(inner
            .applications
            .keys()
            .next_back()
            .copied()
            .unwrap_or_default())
    }

    async fn get_local_state(&self, app_id: AppId, account: &Address) -> Result<Option<StateMap>> {
        let inner = self.read();
        Ok(inner.locals.get(&(app_id, *account)).cloned())
    }

    async fn opted_in_apps(&self, account: &Address) -> Result<Vec<AppId>> {
        let inner = self.read();
        Ok(inner
            .locals
            .keys()
            .filter(|(_, a)| a == account)
            .map(|(app_id, _)| *app_id)
            .collect())
    }

    async fn has_transaction(&self, tx_id: &TxId) -> Result<bool> {
        let inner = self.read();
        Ok(inner.transactions.contains_key(tx_id))
    }

    async fn get_transaction(&self, tx_id: &TxId) -> Result<Option<TransactionRecord>> {
        let inner = self.read();
        Ok(inner.transactions.get(tx_id).cloned())
    }

    async fn round_transactions(&self, round: u64) -> Result<Vec<TxId>> {
        let inner = self.read();
        Ok(inner
            .round_transactions
            .get(&round)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit(&self, batch: &WriteBatch) -> Result<()> {
        let mut inner = self.write();
        inner.check(batch)?;
        inner.apply(batch);
        Ok(())
    }

    async fn latest_round(&self) -> Result<u64> {
        let inner = self.read();
        Ok(inner.rounds.keys().next_back().copied().unwrap_or(0))
    }

    async fn record_round(&self, round: u64, tx_count: usize) -> Result<()> {
        let mut inner = self.write();
        if inner.rounds.contains_key(&round) {
            return Err(StoreError::RoundRecorded(round));
        }
        inner.rounds.insert(round, tx_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cid_ledger_core::{
        AppCallBuilder, Blake3Hash, Keypair, RejectKind, StateDelta, StateSchema, StateValue,
        TxOutcome,
    };

    fn record(keypair: &Keypair, note: &str, outcome: TxOutcome) -> TransactionRecord {
        let signed = AppCallBuilder::no_op(keypair.address(), AppId(1))
            .note(note.as_bytes().to_vec())
            .sign(keypair);
        TransactionRecord {
            tx_id: signed.compute_id(),
            signed,
            round: 1,
            outcome,
        }
    }

    fn application(id: u64, creator: Address) -> Application {
        Application {
            id: AppId(id),
            creator,
            global_schema: StateSchema::new(2, 4),
            local_schema: StateSchema::new(1, 2),
            approval_hash: Blake3Hash::hash(b"approval"),
            clear_hash: Blake3Hash::hash(b"clear"),
            created_round: 1,
            global: StateMap::new(),
        }
    }

    fn confirmed(app_id: u64) -> TxOutcome {
        TxOutcome::Confirmed {
            app_id: AppId(app_id),
            delta: StateDelta::default(),
        }
    }

    #[tokio::test]
    async fn test_create_and_opt_in() {
        let store = MemoryStore::new();
        let keypair = Keypair::generate();
        let addr = keypair.address();

        let mut delta = StateDelta::default();
        delta
            .global
            .insert(Bytes::from_static(b"file_cid"), StateValue::empty_bytes());
        let batch = WriteBatch::new(record(&keypair, "create", confirmed(1)))
            .create_app(application(1, addr))
            .delta(AppId(1), delta);
        store.commit(&batch).await.unwrap();

        let batch = WriteBatch::new(record(&keypair, "opt-in", confirmed(1))).opt_in(AppId(1), addr);
        store.commit(&batch).await.unwrap();

        let app = store.get_application(AppId(1)).await.unwrap().unwrap();
        assert_eq!(app.global.get_bytes(b"file_cid").map(|b| b.len()), Some(0));
        assert_eq!(store.last_app_id().await.unwrap(), AppId(1));
        assert_eq!(store.opted_in_apps(&addr).await.unwrap(), vec![AppId(1)]);
        assert!(store.get_local_state(AppId(1), &addr).await.unwrap().is_some());
        assert_eq!(store.round_transactions(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_transaction_conflicts() {
        let store = MemoryStore::new();
        let keypair = Keypair::generate();
        let rejected = TxOutcome::Rejected {
            kind: RejectKind::Ledger,
            reason: "application 9 does not exist".into(),
        };
        let batch = WriteBatch::new(record(&keypair, "x", rejected));

        store.commit(&batch).await.unwrap();
        assert!(matches!(
            store.commit(&batch).await,
            Err(StoreError::DuplicateTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_batch_changes_nothing() {
        let store = MemoryStore::new();
        let keypair = Keypair::generate();
        let addr = keypair.address();

        // Local write for an account that never opted in.
        let mut delta = StateDelta::default();
        delta
            .local
            .entry(addr)
            .or_default()
            .insert(Bytes::from_static(b"user_file_cid"), StateValue::empty_bytes());
        let batch = WriteBatch::new(record(&keypair, "bad", confirmed(1)))
            .create_app(application(1, addr))
            .delta(AppId(1), delta);

        assert!(matches!(
            store.commit(&batch).await,
            Err(StoreError::NotOptedIn { .. })
        ));
        assert!(store.get_application(AppId(1)).await.unwrap().is_none());
        assert!(!store
            .has_transaction(&batch.transaction.tx_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_clear_removes_local_state() {
        let store = MemoryStore::new();
        let keypair = Keypair::generate();
        let addr = keypair.address();

        store
            .commit(
                &WriteBatch::new(record(&keypair, "a", confirmed(1)))
                    .create_app(application(1, addr))
                    .opt_in(AppId(1), addr),
            )
            .await
            .unwrap();
        store
            .commit(&WriteBatch::new(record(&keypair, "b", confirmed(1))).clear(AppId(1), addr))
            .await
            .unwrap();

        assert!(store.get_local_state(AppId(1), &addr).await.unwrap().is_none());
        assert!(store.opted_in_apps(&addr).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rounds() {
        let store = MemoryStore::new();
        assert_eq!(store.latest_round().await.unwrap(), 0);

        store.record_round(1, 0).await.unwrap();
        store.record_round(2, 3).await.unwrap();
        assert_eq!(store.latest_round().await.unwrap(), 2);
        assert!(store.record_round(2, 0).await.is_err());
    }
}
