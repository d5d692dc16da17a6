//! The ledger client surface used by the harness.
//!
//! [`LedgerClient`] is the narrow set of node calls a deployment script
//! needs. [`Ledger`] implements it in dev mode: waiting for a round
//! produces one.

use async_trait::async_trait;
use cid_ledger_core::{
    Address, AppId, Application, RejectKind, SignedAppCall, StateMap, TxId, TxOutcome,
};
use cid_ledger_store::Store;
use tracing::debug;

use crate::error::{LedgerError, Result};
use crate::ledger::Ledger;

/// Validity window for a call sent now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestedParams {
    pub first_valid: u64,
    pub last_valid: u64,
}

/// Where a submitted call stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Waiting for a round.
    Pending,
    Confirmed {
        round: u64,
        app_id: AppId,
    },
    Rejected {
        round: u64,
        kind: RejectKind,
        reason: String,
    },
}

/// A confirmed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_id: TxId,
    pub round: u64,
    /// The application the call affected; for a creation, the new id.
    pub app_id: AppId,
}

/// Node operations needed to deploy and drive an application.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The last produced round.
    async fn status(&self) -> Result<u64>;

    /// Validity window for a call sent now.
    async fn suggested_params(&self) -> Result<SuggestedParams>;

    /// Submit a signed call.
    async fn send_transaction(&self, signed: SignedAppCall) -> Result<TxId>;

    /// # Errors
    /// `TransactionNotFound` if the call was never submitted.
    async fn pending_transaction_info(&self, tx_id: &TxId) -> Result<TxStatus>;

    /// Wait until a round after `round` exists; returns the latest round.
    async fn status_after_round(&self, round: u64) -> Result<u64>;

    /// # Errors
    /// `ApplicationNotFound` if no such application exists.
    async fn application_info(&self, app_id: AppId) -> Result<Application>;

    /// An account's local state, or `None` if it is not opted in.
    async fn account_application_info(
        &self,
        account: &Address,
        app_id: AppId,
    ) -> Result<Option<StateMap>>;
}

#[async_trait]
impl<S: Store> LedgerClient for Ledger<S> {
    async fn status(&self) -> Result<u64> {
        self.latest_round().await
    }

    async fn suggested_params(&self) -> Result<SuggestedParams> {
        let first_valid = self.latest_round().await? + 1;
        Ok(SuggestedParams {
            first_valid,
            last_valid: first_valid + self.config().max_validity_window,
        })
    }

    async fn send_transaction(&self, signed: SignedAppCall) -> Result<TxId> {
        self.submit(signed).await
    }

    async fn pending_transaction_info(&self, tx_id: &TxId) -> Result<TxStatus> {
        if let Some(record) = self.transaction(tx_id).await? {
            return Ok(match record.outcome {
                TxOutcome::Confirmed { app_id, .. } => TxStatus::Confirmed {
                    round: record.round,
                    app_id,
                },
                TxOutcome::Rejected { kind, reason } => TxStatus::Rejected {
                    round: record.round,
                    kind,
                    reason,
                },
            });
        }

        if self.is_pending(tx_id).await {
            Ok(TxStatus::Pending)
        } else {
            Err(LedgerError::TransactionNotFound(*tx_id))
        }
    }

    async fn status_after_round(&self, round: u64) -> Result<u64> {
        let mut latest = self.latest_round().await?;
        while latest <= round {
            latest = self.produce_round().await?.round;
        }
        Ok(latest)
    }

    async fn application_info(&self, app_id: AppId) -> Result<Application> {
        self.application(app_id)
            .await?
            .ok_or(LedgerError::ApplicationNotFound(app_id))
    }

    async fn account_application_info(
        &self,
        account: &Address,
        app_id: AppId,
    ) -> Result<Option<StateMap>> {
        self.local_state(app_id, account).await
    }
}

/// Wait for a submitted call to be evaluated.
///
/// Checks once per round, for at most `wait_rounds` rounds after the
/// current one.
///
/// # Errors
/// - `Rejected` if the call was evaluated and rejected.
/// - `Timeout` if it is still pending after `wait_rounds` rounds.
pub async fn wait_for_confirmation<C>(client: &C, tx_id: &TxId, wait_rounds: u64) -> Result<Confirmation>
where
    C: LedgerClient + ?Sized,
{
    let start = client.status().await?;
    let mut current = start;

    loop {
        match client.pending_transaction_info(tx_id).await? {
            TxStatus::Confirmed { round, app_id } => {
                debug!(tx_id = %tx_id, round, "confirmed");
                return Ok(Confirmation {
                    tx_id: *tx_id,
                    round,
                    app_id,
                });
            }
            TxStatus::Rejected { kind, reason, .. } => {
                return Err(LedgerError::Rejected {
                    tx_id: *tx_id,
                    kind,
                    reason,
                });
            }
            TxStatus::Pending => {}
        }

        if current >= start + wait_rounds {
            return Err(LedgerError::Timeout {
                tx_id: *tx_id,
                rounds: wait_rounds,
            });
        }
        current = client.status_after_round(current).await?;
    }
}

/// Submit a call and wait for it.
pub async fn send_and_wait<C>(client: &C, signed: SignedAppCall, wait_rounds: u64) -> Result<Confirmation>
where
    C: LedgerClient + ?Sized,
{
    let tx_id = client.send_transaction(signed).await?;
    wait_for_confirmation(client, &tx_id, wait_rounds).await
}
