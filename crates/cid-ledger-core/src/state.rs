//! Key-value application state and the schemas that bound it.
//!
//! Every value is either an unsigned 64-bit integer or a byte string. A
//! schema declared at creation fixes how many of each kind an application
//! (global) or an opted-in account (local) may hold.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::StateError;

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 64;

/// Maximum combined key and value length in bytes.
pub const MAX_ENTRY_LEN: usize = 128;

/// Maximum entries a global schema may declare.
pub const MAX_GLOBAL_ENTRIES: u64 = 64;

/// Maximum entries a local schema may declare.
pub const MAX_LOCAL_ENTRIES: u64 = 16;

/// The two kinds of stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ValueKind {
    Bytes = 1,
    Uint = 2,
}

impl ValueKind {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Bytes),
            2 => Some(Self::Uint),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bytes => f.write_str("byte-slice"),
            ValueKind::Uint => f.write_str("uint"),
        }
    }
}

/// Which state a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Local,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Local => f.write_str("local"),
        }
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateValue {
    Uint(u64),
    Bytes(Bytes),
}

impl StateValue {
    /// A byte-string value.
    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Bytes(value.into())
    }

    /// The empty byte string.
    pub fn empty_bytes() -> Self {
        Self::Bytes(Bytes::new())
    }

    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            StateValue::Uint(_) => ValueKind::Uint,
            StateValue::Bytes(_) => ValueKind::Bytes,
        }
    }

    /// The byte string, if this is one.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            StateValue::Bytes(b) => Some(b),
            StateValue::Uint(_) => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            StateValue::Uint(n) => Some(*n),
            StateValue::Bytes(_) => None,
        }
    }

    /// Bytes this value counts against the entry limit.
    fn stored_len(&self) -> usize {
        match self {
            StateValue::Uint(_) => 8,
            StateValue::Bytes(b) => b.len(),
        }
    }
}

/// Slot budget for one state scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl StateSchema {
    pub const fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        Self {
            num_uints,
            num_byte_slices,
        }
    }

    /// Slots available for values of the given kind.
    pub fn slots(&self, kind: ValueKind) -> u64 {
        match kind {
            ValueKind::Uint => self.num_uints,
            ValueKind::Bytes => self.num_byte_slices,
        }
    }

    /// Total declared entries.
    pub fn total(&self) -> u64 {
        self.num_uints.saturating_add(self.num_byte_slices)
    }

    /// Whether nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// An ordered key-value map of state entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMap(BTreeMap<Bytes, StateValue>);

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &[u8]) -> Option<&StateValue> {
        self.0.get(key)
    }

    /// Get a byte-string value.
    pub fn get_bytes(&self, key: &[u8]) -> Option<&Bytes> {
        self.get(key).and_then(StateValue::as_bytes)
    }

    pub fn insert(&mut self, key: impl Into<Bytes>, value: StateValue) -> Option<StateValue> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &StateValue)> {
        self.0.iter()
    }

    /// Number of entries holding the given kind.
    pub fn count(&self, kind: ValueKind) -> u64 {
        self.0.values().filter(|v| v.kind() == kind).count() as u64
    }

    /// Whether the entries fit the given schema.
    pub fn fits(&self, schema: &StateSchema) -> bool {
        self.count(ValueKind::Uint) <= schema.num_uints
            && self.count(ValueKind::Bytes) <= schema.num_byte_slices
    }
}

impl FromIterator<(Bytes, StateValue)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (Bytes, StateValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for StateMap {
    type Item = (Bytes, StateValue);
    type IntoIter = std::collections::btree_map::IntoIter<Bytes, StateValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Check a single entry against the per-key size limits.
pub fn check_entry(key: &[u8], value: &StateValue) -> Result<(), StateError> {
    if key.len() > MAX_KEY_LEN {
        return Err(StateError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_LEN,
        });
    }

    let len = key.len() + value.stored_len();
    if len > MAX_ENTRY_LEN {
        return Err(StateError::EntryTooLong {
            len,
            max: MAX_ENTRY_LEN,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_roundtrip() {
        for kind in [ValueKind::Bytes, ValueKind::Uint] {
            assert_eq!(ValueKind::from_u8(kind.to_u8()), Some(kind));
        }
        assert_eq!(ValueKind::from_u8(0), None);
    }

    #[test]
    fn test_state_map_counts_by_kind() {
        let mut map = StateMap::new();
        map.insert(&b"a"[..], StateValue::Uint(1));
        map.insert(&b"b"[..], StateValue::bytes(&b"x"[..]));
        map.insert(&b"c"[..], StateValue::empty_bytes());

        assert_eq!(map.count(ValueKind::Uint), 1);
        assert_eq!(map.count(ValueKind::Bytes), 2);
        assert!(map.fits(&StateSchema::new(1, 2)));
        assert!(!map.fits(&StateSchema::new(1, 1)));
    }

    #[test]
    fn test_check_entry_limits() {
        let key = vec![b'k'; MAX_KEY_LEN];
        assert!(check_entry(&key, &StateValue::bytes(vec![0u8; 64])).is_ok());
        assert!(matches!(
            check_entry(&key, &StateValue::bytes(vec![0u8; 65])),
            Err(StateError::EntryTooLong { len: 129, .. })
        ));

        let long_key = vec![b'k'; MAX_KEY_LEN + 1];
        assert!(matches!(
            check_entry(&long_key, &StateValue::Uint(0)),
            Err(StateError::KeyTooLong { .. })
        ));
    }
}
