//! Error types for the CID ledger core.

use thiserror::Error;

use crate::call::OnCompletion;
use crate::record::RejectKind;
use crate::state::{Scope, ValueKind};
use crate::types::Address;

/// Errors from encoding, decoding and signature checks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed call: {0}")]
    MalformedCall(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Structural problems with a call, detected before it reaches the program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("{count} application args exceed the maximum of {max}")]
    TooManyArgs { count: usize, max: usize },

    #[error("application args total {len} bytes, maximum is {max}")]
    ArgsTooLong { len: usize, max: usize },

    #[error("invalid validity window: first {first}, last {last}")]
    InvalidValidityWindow { first: u64, last: u64 },

    #[error("an application cannot be created with ClearState")]
    ClearStateOnCreate,

    #[error("schema and programs may only be supplied when creating an application")]
    CreationFieldsOnExistingApp,

    #[error("{scope} schema declares {total} entries, maximum is {max}")]
    SchemaTooLarge { scope: Scope, total: u64, max: u64 },
}

/// Failures raised by the state store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("key is {len} bytes, maximum is {max}")]
    KeyTooLong { len: usize, max: usize },

    #[error("key and value total {len} bytes, maximum is {max}")]
    EntryTooLong { len: usize, max: usize },

    #[error("{scope} schema allows only {limit} {kind} slots")]
    SchemaExceeded {
        scope: Scope,
        kind: ValueKind,
        limit: u64,
    },

    #[error("account {0} has no local state for this application")]
    NotOptedIn(Address),
}

/// Reasons the approval program rejects a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("{operation} expects {expected} arguments, got {got}")]
    ArgumentCount {
        operation: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cid is {len} bytes, maximum is {max}")]
    CidTooLong { len: usize, max: usize },

    #[error("no operation name in application args")]
    MissingOperation,

    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("on-completion {0} is not handled by this program")]
    UnhandledCompletion(OnCompletion),

    #[error(transparent)]
    State(#[from] StateError),
}

impl ContractError {
    /// Classify the rejection.
    pub fn kind(&self) -> RejectKind {
        match self {
            ContractError::ArgumentCount { .. } | ContractError::CidTooLong { .. } => {
                RejectKind::Validation
            }
            ContractError::MissingOperation
            | ContractError::UnknownOperation(_)
            | ContractError::UnhandledCompletion(_) => RejectKind::Unrouted,
            ContractError::State(StateError::NotOptedIn(_)) => RejectKind::Authorization,
            ContractError::State(_) => RejectKind::Capacity,
        }
    }
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            // Only signature checks convert; anything else is a signature
            // over bytes we could not interpret.
            CoreError::MalformedCall(_)
            | CoreError::EncodingError(_)
            | CoreError::DecodingError(_) => ValidationError::SignatureFailed,
        }
    }
}
