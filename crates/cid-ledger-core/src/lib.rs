//! # CID Ledger Core
//!
//! Pure primitives for the CID ledger: application calls, key-value state,
//! and the approval program that stores a content identifier.
//!
//! This crate contains no I/O, no storage, no networking. Every function is
//! deterministic computation over in-memory values.
//!
//! ## Key Types
//!
//! - [`AppCall`] / [`SignedAppCall`] - One invocation of the application
//! - [`StateValue`] / [`StateMap`] / [`StateSchema`] - Key-value state and its slot budget
//! - [`Overlay`] - Write buffer over committed state, producing a [`StateDelta`]
//! - [`approval_program`] / [`clear_state_program`] - The transition functions
//! - [`TransactionRecord`] - The evaluated outcome of a call
//!
//! ## Canonicalization
//!
//! Calls are signed over deterministic CBOR. See the [`canonical`] module.

pub mod app;
pub mod call;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod overlay;
pub mod program;
pub mod record;
pub mod state;
pub mod teal;
pub mod types;
pub mod validation;

pub use app::Application;
pub use call::{AppCall, AppCallBuilder, OnCompletion, SignedAppCall};
pub use canonical::{canonical_call_bytes, canonical_signed_bytes, decode_signed_call};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{ContractError, CoreError, StateError, ValidationError};
pub use overlay::{Overlay, StateAccess, StateDelta};
pub use program::{
    approval_program, clear_state_program, Operation, FILE_CID_KEY, GLOBAL_SCHEMA, LOCAL_SCHEMA,
    MAX_CID_LEN, UPLOAD_FILE, USER_FILE_CID_KEY,
};
pub use record::{RejectKind, TransactionRecord, TxOutcome};
pub use state::{Scope, StateMap, StateSchema, StateValue, ValueKind};
pub use types::{Address, AppId, TxId};
pub use validation::{validate_call, validate_call_structure};
