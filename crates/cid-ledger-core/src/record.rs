//! Transaction records: what became of an evaluated call.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::call::SignedAppCall;
use crate::error::CoreError;
use crate::overlay::StateDelta;
use crate::types::{AppId, TxId};

/// Why a call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectKind {
    /// Malformed arguments, window or creation fields.
    Validation,
    /// The sender may not perform the write.
    Authorization,
    /// No handler for the operation or completion.
    Unrouted,
    /// A schema slot or size limit would be exceeded.
    Capacity,
    /// The ledger refused the call before the program ran.
    Ledger,
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RejectKind::Validation => "validation",
            RejectKind::Authorization => "authorization",
            RejectKind::Unrouted => "unrouted",
            RejectKind::Capacity => "capacity",
            RejectKind::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

/// The result of evaluating one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    /// The program accepted and `delta` was committed.
    Confirmed { app_id: AppId, delta: StateDelta },

    /// The call was rejected; no state changed.
    Rejected { kind: RejectKind, reason: String },
}

impl TxOutcome {
    /// Encode for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

/// A call together with the round it was evaluated in and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub tx_id: TxId,
    pub signed: SignedAppCall,
    pub round: u64,
    pub outcome: TxOutcome,
}

impl TransactionRecord {
    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, TxOutcome::Confirmed { .. })
    }

    /// The application the call affected, if it was confirmed.
    pub fn app_id(&self) -> Option<AppId> {
        match &self.outcome {
            TxOutcome::Confirmed { app_id, .. } => Some(*app_id),
            TxOutcome::Rejected { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateValue;
    use crate::types::Address;
    use bytes::Bytes;

    #[test]
    fn test_outcome_storage_encoding() {
        let mut delta = StateDelta::default();
        delta
            .global
            .insert(Bytes::from_static(b"file_cid"), StateValue::bytes(&b"QmA"[..]));
        delta.local.entry(Address::from_bytes([1; 32])).or_default().insert(
            Bytes::from_static(b"user_file_cid"),
            StateValue::bytes(&b"QmA"[..]),
        );

        let confirmed = TxOutcome::Confirmed {
            app_id: AppId(3),
            delta,
        };
        assert_eq!(
            TxOutcome::from_bytes(&confirmed.to_bytes().unwrap()).unwrap(),
            confirmed
        );

        let rejected = TxOutcome::Rejected {
            kind: RejectKind::Capacity,
            reason: "global schema allows only 4 byte-slice slots".into(),
        };
        assert_eq!(
            TxOutcome::from_bytes(&rejected.to_bytes().unwrap()).unwrap(),
            rejected
        );
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            TxOutcome::from_bytes(&[0xff, 0x00]),
            Err(CoreError::DecodingError(_))
        ));
    }
}
