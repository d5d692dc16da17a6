//! Application calls: the one transaction type the ledger evaluates.
//!
//! A call names the application (zero to create one), how it completes
//! (`OnCompletion`), and an ordered list of byte-string arguments. The
//! sender signs the canonical encoding; see [`crate::canonical`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::signed_message;
use crate::crypto::{Blake3Hash, Ed25519Signature, Keypair};
use crate::error::CoreError;
use crate::state::StateSchema;
use crate::types::{Address, AppId, TxId};

/// Maximum number of application args in one call.
pub const MAX_APP_ARGS: usize = 16;

/// Maximum total bytes across all application args.
pub const MAX_APP_ARGS_LEN: usize = 2048;

/// Default number of rounds a built call stays valid for.
pub const DEFAULT_VALIDITY: u64 = 1000;

/// What happens to the sender's relationship with the application after the
/// approval program runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OnCompletion {
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl OnCompletion {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::NoOp),
            1 => Some(Self::OptIn),
            2 => Some(Self::CloseOut),
            3 => Some(Self::ClearState),
            4 => Some(Self::UpdateApplication),
            5 => Some(Self::DeleteApplication),
            _ => None,
        }
    }
}

impl fmt::Display for OnCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnCompletion::NoOp => "NoOp",
            OnCompletion::OptIn => "OptIn",
            OnCompletion::CloseOut => "CloseOut",
            OnCompletion::ClearState => "ClearState",
            OnCompletion::UpdateApplication => "UpdateApplication",
            OnCompletion::DeleteApplication => "DeleteApplication",
        };
        f.write_str(name)
    }
}

/// An unsigned application call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCall {
    /// The calling account.
    pub sender: Address,

    /// Target application; [`AppId::CREATE`] creates a new one.
    pub app_id: AppId,

    pub on_completion: OnCompletion,

    /// Ordered application arguments.
    pub args: Vec<Bytes>,

    /// First round in which the call may be confirmed.
    pub first_valid: u64,

    /// Last round in which the call may be confirmed.
    pub last_valid: u64,

    /// Creation only: global slot budget.
    pub global_schema: StateSchema,

    /// Creation only: per-account slot budget.
    pub local_schema: StateSchema,

    /// Creation only: approval program source.
    pub approval_program: Bytes,

    /// Creation only: clear-state program source.
    pub clear_program: Bytes,

    /// Free-form bytes; distinguishes otherwise identical calls.
    pub note: Bytes,
}

impl AppCall {
    /// Whether this call creates an application.
    pub fn is_create(&self) -> bool {
        self.app_id.is_create()
    }

    /// Get an argument by position.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Whether `round` falls inside the validity window.
    pub fn is_valid_at(&self, round: u64) -> bool {
        self.first_valid <= round && round <= self.last_valid
    }

    /// Compute the transaction id.
    pub fn compute_id(&self) -> TxId {
        TxId(Blake3Hash::hash(&signed_message(self)).0)
    }

    /// Sign with the given keypair.
    pub fn sign(self, keypair: &Keypair) -> SignedAppCall {
        let signature = keypair.sign(&signed_message(&self));
        SignedAppCall {
            call: self,
            signature,
        }
    }
}

/// A call with the sender's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAppCall {
    pub call: AppCall,

    /// Ed25519 signature over `"TX" || canonical_call_bytes`.
    pub signature: Ed25519Signature,
}

impl SignedAppCall {
    /// Compute the transaction id.
    pub fn compute_id(&self) -> TxId {
        self.call.compute_id()
    }

    /// The calling account.
    pub fn sender(&self) -> &Address {
        &self.call.sender
    }

    /// Verify the signature against the sender's key.
    pub fn verify(&self) -> Result<(), CoreError> {
        self.call
            .sender
            .public_key()
            .verify(&signed_message(&self.call), &self.signature)
    }
}

/// Builder for application calls.
#[derive(Debug, Clone)]
pub struct AppCallBuilder {
    call: AppCall,
}

impl AppCallBuilder {
    /// Start a call with the given target and completion.
    pub fn new(sender: Address, app_id: AppId, on_completion: OnCompletion) -> Self {
        Self {
            call: AppCall {
                sender,
                app_id,
                on_completion,
                args: Vec::new(),
                first_valid: 1,
                last_valid: DEFAULT_VALIDITY,
                global_schema: StateSchema::default(),
                local_schema: StateSchema::default(),
                approval_program: Bytes::new(),
                clear_program: Bytes::new(),
                note: Bytes::new(),
            },
        }
    }

    /// A creation call.
    pub fn create(sender: Address) -> Self {
        Self::new(sender, AppId::CREATE, OnCompletion::NoOp)
    }

    pub fn opt_in(sender: Address, app_id: AppId) -> Self {
        Self::new(sender, app_id, OnCompletion::OptIn)
    }

    pub fn no_op(sender: Address, app_id: AppId) -> Self {
        Self::new(sender, app_id, OnCompletion::NoOp)
    }

    pub fn clear_state(sender: Address, app_id: AppId) -> Self {
        Self::new(sender, app_id, OnCompletion::ClearState)
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.call.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        self.call.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the validity window.
    pub fn validity(mut self, first_valid: u64, last_valid: u64) -> Self {
        self.call.first_valid = first_valid;
        self.call.last_valid = last_valid;
        self
    }

    /// Set the creation schemas.
    pub fn schemas(mut self, global: StateSchema, local: StateSchema) -> Self {
        self.call.global_schema = global;
        self.call.local_schema = local;
        self
    }

    /// Set the creation programs.
    pub fn programs(mut self, approval: impl Into<Bytes>, clear: impl Into<Bytes>) -> Self {
        self.call.approval_program = approval.into();
        self.call.clear_program = clear.into();
        self
    }

    pub fn note(mut self, note: impl Into<Bytes>) -> Self {
        self.call.note = note.into();
        self
    }

    /// Finish without signing.
    pub fn build(self) -> AppCall {
        self.call
    }

    /// Finish and sign.
    pub fn sign(self, keypair: &Keypair) -> SignedAppCall {
        self.call.sign(keypair)
    }
}
