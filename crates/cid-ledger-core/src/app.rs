//! The deployed application record.

use serde::{Deserialize, Serialize};

use crate::crypto::Blake3Hash;
use crate::state::{StateMap, StateSchema};
use crate::types::{Address, AppId};

/// A deployed application and its global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Assigned at creation, never zero.
    pub id: AppId,

    /// The account that sent the creation call.
    pub creator: Address,

    /// Global slot budget declared at creation.
    pub global_schema: StateSchema,

    /// Per-account slot budget declared at creation.
    pub local_schema: StateSchema,

    /// Blake3 hash of the approval program source.
    pub approval_hash: Blake3Hash,

    /// Blake3 hash of the clear-state program source.
    pub clear_hash: Blake3Hash,

    /// Round in which the creation call was confirmed.
    pub created_round: u64,

    /// Global key-value state.
    pub global: StateMap,
}
