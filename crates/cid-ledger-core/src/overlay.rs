//! Buffered access to application state during one evaluation.
//!
//! Programs never touch committed state directly. They read and write
//! through [`StateAccess`]; the [`Overlay`] implementation layers pending
//! writes over borrowed committed maps and enforces the key, entry and
//! schema limits on every write. When the program accepts, the buffered
//! writes come out as a [`StateDelta`] for the store to commit in one unit.
//! When it rejects, the overlay is dropped and nothing was changed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::error::StateError;
use crate::state::{check_entry, Scope, StateMap, StateSchema, StateValue};
use crate::types::Address;

/// The writes produced by one accepted call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Global keys written.
    pub global: BTreeMap<Bytes, StateValue>,

    /// Local keys written, per account.
    pub local: BTreeMap<Address, BTreeMap<Bytes, StateValue>>,
}

impl StateDelta {
    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.local.values().all(BTreeMap::is_empty)
    }

    /// Apply the global writes to a committed map.
    pub fn apply_global(&self, global: &mut StateMap) {
        for (key, value) in &self.global {
            global.insert(key.clone(), value.clone());
        }
    }

    /// Apply one account's local writes to its committed map.
    pub fn apply_local(&self, account: &Address, local: &mut StateMap) {
        if let Some(writes) = self.local.get(account) {
            for (key, value) in writes {
                local.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Read and write access to the state of the application being evaluated.
///
/// Reads of absent keys return `None`; they never fail.
pub trait StateAccess {
    fn global_get(&self, key: &[u8]) -> Option<StateValue>;

    fn global_put(&mut self, key: &[u8], value: StateValue) -> Result<(), StateError>;

    fn local_get(&self, account: &Address, key: &[u8]) -> Option<StateValue>;

    /// Fails with [`StateError::NotOptedIn`] when the account has no local
    /// state for this application.
    fn local_put(
        &mut self,
        account: &Address,
        key: &[u8],
        value: StateValue,
    ) -> Result<(), StateError>;

    fn is_opted_in(&self, account: &Address) -> bool;
}

/// Pending writes layered over committed state.
#[derive(Debug)]
pub struct Overlay<'a> {
    global: &'a StateMap,
    global_schema: StateSchema,
    local_schema: StateSchema,
    locals: BTreeMap<Address, Cow<'a, StateMap>>,
    delta: StateDelta,
}

impl<'a> Overlay<'a> {
    /// Create an overlay over an application's committed global state.
    pub fn new(global: &'a StateMap, global_schema: StateSchema, local_schema: StateSchema) -> Self {
        Self {
            global,
            global_schema,
            local_schema,
            locals: BTreeMap::new(),
            delta: StateDelta::default(),
        }
    }

    /// Make an opted-in account's committed local state visible.
    pub fn with_local(mut self, account: Address, local: &'a StateMap) -> Self {
        self.locals.insert(account, Cow::Borrowed(local));
        self
    }

    /// Make an account visible as opted in with empty local state.
    pub fn with_new_local(mut self, account: Address) -> Self {
        self.locals.insert(account, Cow::Owned(StateMap::new()));
        self
    }

    /// Writes buffered so far.
    pub fn delta(&self) -> &StateDelta {
        &self.delta
    }

    /// Consume the overlay, keeping only its writes.
    pub fn into_delta(self) -> StateDelta {
        self.delta
    }
}

impl StateAccess for Overlay<'_> {
    fn global_get(&self, key: &[u8]) -> Option<StateValue> {
        self.delta
            .global
            .get(key)
            .or_else(|| self.global.get(key))
            .cloned()
    }

    fn global_put(&mut self, key: &[u8], value: StateValue) -> Result<(), StateError> {
        check_entry(key, &value)?;
        check_slots(
            self.global,
            &self.delta.global,
            key,
            &value,
            &self.global_schema,
            Scope::Global,
        )?;
        self.delta.global.insert(Bytes::copy_from_slice(key), value);
        Ok(())
    }

    fn local_get(&self, account: &Address, key: &[u8]) -> Option<StateValue> {
        let base = self.locals.get(account)?;
        self.delta
            .local
            .get(account)
            .and_then(|writes| writes.get(key))
            .or_else(|| base.get(key))
            .cloned()
    }

    fn local_put(
        &mut self,
        account: &Address,
        key: &[u8],
        value: StateValue,
    ) -> Result<(), StateError> {
        let base = self
            .locals
            .get(account)
            .ok_or(StateError::NotOptedIn(*account))?;

        check_entry(key, &value)?;

        let writes = self.delta.local.entry(*account).or_default();
        check_slots(base, writes, key, &value, &self.local_schema, Scope::Local)?;
        writes.insert(Bytes::copy_from_slice(key), value);
        Ok(())
    }

    fn is_opted_in(&self, account: &Address) -> bool {
        self.locals.contains_key(account)
    }
}

/// Check that writing `key = value` keeps its kind within the schema.
///
/// Counts over the merged view: committed keys not yet overwritten, plus
/// pending writes, plus this one.
fn check_slots(
    base: &StateMap,
    writes: &BTreeMap<Bytes, StateValue>,
    key: &[u8],
    value: &StateValue,
    schema: &StateSchema,
    scope: Scope,
) -> Result<(), StateError> {
    let kind = value.kind();

    let committed = base
        .iter()
        .filter(|(k, v)| {
            v.kind() == kind && &k[..] != key && !writes.contains_key(&k[..])
        })
        .count();
    let pending = writes
        .iter()
        .filter(|(k, v)| v.kind() == kind && &k[..] != key)
        .count();

    let limit = schema.slots(kind);
    if (committed + pending + 1) as u64 > limit {
        return Err(StateError::SchemaExceeded { scope, kind, limit });
    }

    Ok(())
}
