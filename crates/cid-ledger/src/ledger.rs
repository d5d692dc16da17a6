//! The Ledger: accepts signed calls and evaluates them in rounds.
//!
//! Submission checks what can be checked without state (structure,
//! signature, window length, duplicates) and queues the call. Round
//! production drains the queue and evaluates each call against committed
//! state, in submission order. Every evaluated call is committed as one
//! [`WriteBatch`]: the transaction record plus, when the program accepts,
//! its effects.

use std::collections::VecDeque;
use std::sync::Arc;

use cid_ledger_core::{
    approval_program, clear_state_program, teal, validate_call, validate_call_structure, Address,
    AppId, Application, Blake3Hash, OnCompletion, Overlay, RejectKind, SignedAppCall, StateDelta,
    StateMap, TransactionRecord, TxId, TxOutcome,
};
use cid_ledger_store::{Store, WriteBatch};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Whether to verify signatures on submit.
    pub verify_signatures: bool,
    /// Longest validity window accepted, in rounds.
    pub max_validity_window: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_signatures: true,
            max_validity_window: 1000,
        }
    }
}

/// What happened in one produced round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u64,
    /// Accepted calls, in evaluation order.
    pub confirmed: Vec<TxId>,
    /// Rejected calls and why, in evaluation order.
    pub rejected: Vec<(TxId, RejectKind)>,
}

impl RoundReport {
    fn new(round: u64) -> Self {
        Self {
            round,
            ..Self::default()
        }
    }

    /// Number of calls evaluated in the round.
    pub fn tx_count(&self) -> usize {
        self.confirmed.len() + self.rejected.len()
    }

    fn push(&mut self, record: &TransactionRecord) {
        match &record.outcome {
            TxOutcome::Confirmed { .. } => self.confirmed.push(record.tx_id),
            TxOutcome::Rejected { kind, .. } => self.rejected.push((record.tx_id, *kind)),
        }
    }
}

/// A local ledger running the CID storage application.
pub struct Ledger<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: LedgerConfig,
    /// Calls waiting for the next round, in submission order.
    pending: Mutex<VecDeque<(TxId, SignedAppCall)>>,
    /// Held for the whole of round production.
    writer: Mutex<()>,
}

impl<S: Store> Ledger<S> {
    /// Create a new ledger over a store.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
            pending: Mutex::new(VecDeque::new()),
            writer: Mutex::new(()),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a signed call for the next round.
    ///
    /// # Errors
    /// - `Validation` if the call is malformed or the signature is invalid.
    /// - `ValidityWindowTooLong` if the window exceeds the configured maximum.
    /// - `DuplicateTransaction` if the same call is pending or committed.
    pub async fn submit(&self, signed: SignedAppCall) -> Result<TxId> {
        // 1. Structure, and the signature unless disabled
        if self.config.verify_signatures {
            validate_call(&signed)?;
        } else {
            validate_call_structure(&signed.call)?;
        }

        // 2. Window length
        let call = &signed.call;
        if call.last_valid.saturating_sub(call.first_valid) > self.config.max_validity_window {
            return Err(LedgerError::ValidityWindowTooLong {
                first: call.first_valid,
                last: call.last_valid,
                max: self.config.max_validity_window,
            });
        }

        // 3. Duplicates
        let tx_id = signed.compute_id();
        if self.store.has_transaction(&tx_id).await? {
            return Err(LedgerError::DuplicateTransaction(tx_id));
        }

        let mut pending = self.pending.lock().await;
        if pending.iter().any(|(id, _)| *id == tx_id) {
            return Err(LedgerError::DuplicateTransaction(tx_id));
        }

        // 4. Queue
        debug!(
            tx_id = %tx_id,
            app_id = %call.app_id,
            on_completion = %call.on_completion,
            "call submitted"
        );
        pending.push_back((tx_id, signed));

        Ok(tx_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Round Production
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate every pending call in a new round.
    ///
    /// Each call sees the effects of those before it. If storage fails
    /// midway, the failed call and everything after it go back to the front
    /// of the queue.
    pub async fn produce_round(&self) -> Result<RoundReport> {
        let _writer = self.writer.lock().await;

        let round = self.store.latest_round().await? + 1;
        let calls: Vec<_> = self.pending.lock().await.drain(..).collect();
        let mut report = RoundReport::new(round);

        let mut queue = calls.into_iter();
        while let Some((tx_id, signed)) = queue.next() {
            match self.process(tx_id, &signed, round).await {
                Ok(Some(record)) => report.push(&record),
                Ok(None) => {}
                Err(e) => {
                    let mut pending = self.pending.lock().await;
                    let rest: Vec<_> = std::iter::once((tx_id, signed)).chain(queue).collect();
                    for item in rest.into_iter().rev() {
                        pending.push_front(item);
                    }
                    drop(pending);

                    if report.tx_count() > 0 {
                        if let Err(record_err) =
                            self.store.record_round(round, report.tx_count()).await
                        {
                            warn!(round, error = %record_err, "failed to record partial round");
                        }
                    }
                    return Err(e);
                }
            }
        }

        self.store.record_round(round, report.tx_count()).await?;

        info!(
            round,
            confirmed = report.confirmed.len(),
            rejected = report.rejected.len(),
            "round produced"
        );

        Ok(report)
    }

    /// Evaluate and commit one call. Returns `None` if it was already committed.
    async fn process(
        &self,
        tx_id: TxId,
        signed: &SignedAppCall,
        round: u64,
    ) -> Result<Option<TransactionRecord>> {
        if self.store.has_transaction(&tx_id).await? {
            warn!(tx_id = %tx_id, "skipping call that is already committed");
            return Ok(None);
        }

        let batch = self.evaluate(tx_id, signed, round).await?;
        self.store.commit(&batch).await?;

        let record = batch.transaction;
        match &record.outcome {
            TxOutcome::Confirmed { app_id, .. } => {
                debug!(tx_id = %tx_id, app_id = %app_id, round, "call confirmed");
            }
            TxOutcome::Rejected { kind, reason } => {
                warn!(tx_id = %tx_id, round, kind = %kind, reason = %reason, "call rejected");
            }
        }

        Ok(Some(record))
    }

    /// Evaluate one call against committed state.
    async fn evaluate(&self, tx_id: TxId, signed: &SignedAppCall, round: u64) -> Result<WriteBatch> {
        let call = &signed.call;
        let outcome = Outcome {
            tx_id,
            signed,
            round,
        };

        if !call.is_valid_at(round) {
            return Ok(outcome.rejected(
                RejectKind::Ledger,
                format!(
                    "round {} is outside the validity window {}..={}",
                    round, call.first_valid, call.last_valid
                ),
            ));
        }

        if call.is_create() {
            return self.evaluate_create(outcome).await;
        }

        let app = match self.store.get_application(call.app_id).await? {
            Some(app) => app,
            None => {
                return Ok(outcome.rejected(
                    RejectKind::Ledger,
                    format!("application {} does not exist", call.app_id),
                ))
            }
        };
        let local = self.store.get_local_state(app.id, &call.sender).await?;

        match call.on_completion {
            OnCompletion::OptIn => {
                if local.is_some() {
                    return Ok(outcome.rejected(
                        RejectKind::Ledger,
                        format!("{:?} is already opted in to application {}", call.sender, app.id),
                    ));
                }

                let mut overlay = Overlay::new(&app.global, app.global_schema, app.local_schema)
                    .with_new_local(call.sender);

                Ok(match approval_program(call, &mut overlay) {
                    Ok(()) => {
                        info!(app_id = %app.id, account = ?call.sender, "account opted in");
                        outcome
                            .confirmed(app.id, overlay.into_delta())
                            .opt_in(app.id, call.sender)
                    }
                    Err(e) => outcome.rejected(e.kind(), e.to_string()),
                })
            }
            OnCompletion::ClearState => {
                let Some(local) = local else {
                    return Ok(outcome.rejected(
                        RejectKind::Ledger,
                        format!("{:?} is not opted in to application {}", call.sender, app.id),
                    ));
                };

                let mut overlay = Overlay::new(&app.global, app.global_schema, app.local_schema)
                    .with_local(call.sender, &local);

                // The local record goes whether or not the program accepts.
                let delta = match clear_state_program(call, &mut overlay) {
                    Ok(()) => {
                        let mut delta = overlay.into_delta();
                        delta.local.remove(&call.sender);
                        delta
                    }
                    Err(e) => {
                        warn!(tx_id = %tx_id, error = %e, "clear-state program failed");
                        StateDelta::default()
                    }
                };

                info!(app_id = %app.id, account = ?call.sender, "local state cleared");
                Ok(outcome
                    .confirmed(app.id, delta)
                    .clear(app.id, call.sender))
            }
            _ => {
                let mut overlay = Overlay::new(&app.global, app.global_schema, app.local_schema);
                if let Some(local) = local.as_ref() {
                    overlay = overlay.with_local(call.sender, local);
                }

                Ok(match approval_program(call, &mut overlay) {
                    Ok(()) => outcome.confirmed(app.id, overlay.into_delta()),
                    Err(e) => outcome.rejected(e.kind(), e.to_string()),
                })
            }
        }
    }

    async fn evaluate_create(&self, outcome: Outcome<'_>) -> Result<WriteBatch> {
        let call = &outcome.signed.call;

        if !teal::is_cid_program(&call.approval_program, &call.clear_program) {
            return Ok(outcome.rejected(
                RejectKind::Validation,
                "creation programs are not the CID storage programs".to_string(),
            ));
        }

        let app_id = self.store.last_app_id().await?.next();
        let empty = StateMap::new();
        let mut overlay = Overlay::new(&empty, call.global_schema, call.local_schema);

        if let Err(e) = approval_program(call, &mut overlay) {
            return Ok(outcome.rejected(e.kind(), e.to_string()));
        }

        let app = Application {
            id: app_id,
            creator: call.sender,
            global_schema: call.global_schema,
            local_schema: call.local_schema,
            approval_hash: Blake3Hash::hash(&call.approval_program),
            clear_hash: Blake3Hash::hash(&call.clear_program),
            created_round: outcome.round,
            global: StateMap::new(),
        };

        info!(app_id = %app_id, creator = ?call.sender, "application created");
        Ok(outcome
            .confirmed(app_id, overlay.into_delta())
            .create_app(app))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an application and its global state.
    pub async fn application(&self, app_id: AppId) -> Result<Option<Application>> {
        Ok(self.store.get_application(app_id).await?)
    }

    /// Get an account's local state in an application.
    pub async fn local_state(&self, app_id: AppId, account: &Address) -> Result<Option<StateMap>> {
        Ok(self.store.get_local_state(app_id, account).await?)
    }

    /// Applications the account is opted in to.
    pub async fn opted_in_apps(&self, account: &Address) -> Result<Vec<AppId>> {
        Ok(self.store.opted_in_apps(account).await?)
    }

    /// Get a committed transaction record.
    pub async fn transaction(&self, tx_id: &TxId) -> Result<Option<TransactionRecord>> {
        Ok(self.store.get_transaction(tx_id).await?)
    }

    /// The last produced round.
    pub async fn latest_round(&self) -> Result<u64> {
        Ok(self.store.latest_round().await?)
    }

    /// Number of calls waiting for the next round.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether a call is waiting for the next round.
    pub async fn is_pending(&self, tx_id: &TxId) -> bool {
        self.pending.lock().await.iter().any(|(id, _)| id == tx_id)
    }
}

/// The identity of a call being evaluated; builds its write batch.
struct Outcome<'a> {
    tx_id: TxId,
    signed: &'a SignedAppCall,
    round: u64,
}

impl Outcome<'_> {
    fn record(&self, outcome: TxOutcome) -> TransactionRecord {
        TransactionRecord {
            tx_id: self.tx_id,
            signed: self.signed.clone(),
            round: self.round,
            outcome,
        }
    }

    fn rejected(&self, kind: RejectKind, reason: String) -> WriteBatch {
        WriteBatch::new(self.record(TxOutcome::Rejected { kind, reason }))
    }

    fn confirmed(&self, app_id: AppId, delta: StateDelta) -> WriteBatch {
        let record = self.record(TxOutcome::Confirmed {
            app_id,
            delta: delta.clone(),
        });
        WriteBatch::new(record).delta(app_id, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid_ledger_core::{
        AppCallBuilder, Keypair, StateValue, FILE_CID_KEY, GLOBAL_SCHEMA, LOCAL_SCHEMA,
        USER_FILE_CID_KEY,
    };
    use cid_ledger_store::MemoryStore;

    fn ledger() -> Ledger<MemoryStore> {
        Ledger::new(MemoryStore::new(), LedgerConfig::default())
    }

    fn create_call(keypair: &Keypair) -> SignedAppCall {
        AppCallBuilder::create(keypair.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(teal::approval_source(), teal::clear_state_source())
            .sign(keypair)
    }

    async fn deploy(ledger: &Ledger<MemoryStore>, keypair: &Keypair) -> AppId {
        ledger.submit(create_call(keypair)).await.unwrap();
        ledger.produce_round().await.unwrap();
        ledger.store().last_app_id().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_ids_in_order() {
        let ledger = ledger();
        let alice = Keypair::generate();

        let first = create_call(&alice);
        let second = AppCallBuilder::create(alice.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(teal::approval_source(), teal::clear_state_source())
            .note(&b"second"[..])
            .sign(&alice);

        let id1 = ledger.submit(first).await.unwrap();
        let id2 = ledger.submit(second).await.unwrap();
        let report = ledger.produce_round().await.unwrap();

        assert_eq!(report.round, 1);
        assert_eq!(report.confirmed, vec![id1, id2]);

        let app1 = ledger.transaction(&id1).await.unwrap().unwrap();
        let app2 = ledger.transaction(&id2).await.unwrap().unwrap();
        assert_eq!(app1.app_id(), Some(AppId(1)));
        assert_eq!(app2.app_id(), Some(AppId(2)));

        let app = ledger.application(AppId(1)).await.unwrap().unwrap();
        assert_eq!(app.creator, alice.address());
        assert_eq!(app.created_round, 1);
        assert_eq!(app.global.get(FILE_CID_KEY), Some(&StateValue::empty_bytes()));
    }

    #[tokio::test]
    async fn test_foreign_program_rejected() {
        let ledger = ledger();
        let alice = Keypair::generate();

        let call = AppCallBuilder::create(alice.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(&b"#pragma version 6\nint 1\n"[..], teal::clear_state_source())
            .sign(&alice);
        let tx_id = ledger.submit(call).await.unwrap();
        let report = ledger.produce_round().await.unwrap();

        assert_eq!(report.rejected, vec![(tx_id, RejectKind::Validation)]);
        assert_eq!(ledger.store().last_app_id().await.unwrap(), AppId::CREATE);
    }

    #[tokio::test]
    async fn test_duplicate_refused_pending_and_committed() {
        let ledger = ledger();
        let alice = Keypair::generate();
        let call = create_call(&alice);

        ledger.submit(call.clone()).await.unwrap();
        assert!(matches!(
            ledger.submit(call.clone()).await,
            Err(LedgerError::DuplicateTransaction(_))
        ));

        ledger.produce_round().await.unwrap();
        assert!(matches!(
            ledger.submit(call).await,
            Err(LedgerError::DuplicateTransaction(_))
        ));
    }

    #[tokio::test]
    async fn test_window_checks() {
        let ledger = ledger();
        let alice = Keypair::generate();

        let too_long = AppCallBuilder::create(alice.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(teal::approval_source(), teal::clear_state_source())
            .validity(1, 2002)
            .sign(&alice);
        assert!(matches!(
            ledger.submit(too_long).await,
            Err(LedgerError::ValidityWindowTooLong { .. })
        ));

        let app_id = deploy(&ledger, &alice).await;

        // Valid only in round 5; the next round is 2.
        let late = AppCallBuilder::opt_in(alice.address(), app_id)
            .validity(5, 5)
            .sign(&alice);
        let tx_id = ledger.submit(late).await.unwrap();
        let report = ledger.produce_round().await.unwrap();
        assert_eq!(report.rejected, vec![(tx_id, RejectKind::Ledger)]);
        assert!(ledger.local_state(app_id, &alice.address()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsigned_refused_unless_disabled() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();

        // Alice's call signed by someone else.
        let forged = AppCallBuilder::create(alice.address())
            .schemas(GLOBAL_SCHEMA, LOCAL_SCHEMA)
            .programs(teal::approval_source(), teal::clear_state_source())
            .sign(&mallory);

        assert!(matches!(
            ledger().submit(forged.clone()).await,
            Err(LedgerError::Validation(_))
        ));

        let lenient = Ledger::new(
            MemoryStore::new(),
            LedgerConfig {
                verify_signatures: false,
                ..LedgerConfig::default()
            },
        );
        lenient.submit(forged).await.unwrap();
        assert_eq!(lenient.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_opt_in_twice_rejected() {
        let ledger = ledger();
        let alice = Keypair::generate();
        let app_id = deploy(&ledger, &alice).await;

        ledger
            .submit(AppCallBuilder::opt_in(alice.address(), app_id).sign(&alice))
            .await
            .unwrap();
        let again = ledger
            .submit(
                AppCallBuilder::opt_in(alice.address(), app_id)
                    .note(&b"again"[..])
                    .sign(&alice),
            )
            .await
            .unwrap();
        let report = ledger.produce_round().await.unwrap();

        assert_eq!(report.confirmed.len(), 1);
        assert_eq!(report.rejected, vec![(again, RejectKind::Ledger)]);

        let local = ledger.local_state(app_id, &alice.address()).await.unwrap().unwrap();
        assert_eq!(local.get(USER_FILE_CID_KEY), Some(&StateValue::empty_bytes()));
        assert_eq!(ledger.opted_in_apps(&alice.address()).await.unwrap(), vec![app_id]);
    }

    #[tokio::test]
    async fn test_missing_application_rejected() {
        let ledger = ledger();
        let alice = Keypair::generate();

        let tx_id = ledger
            .submit(AppCallBuilder::opt_in(alice.address(), AppId(9)).sign(&alice))
            .await
            .unwrap();
        let report = ledger.produce_round().await.unwrap();
        assert_eq!(report.rejected, vec![(tx_id, RejectKind::Ledger)]);
    }

    #[tokio::test]
    async fn test_empty_round_recorded() {
        let ledger = ledger();
        let report = ledger.produce_round().await.unwrap();
        assert_eq!(report.tx_count(), 0);
        assert_eq!(ledger.latest_round().await.unwrap(), 1);
    }
}
