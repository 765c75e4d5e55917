//! State collaborator: The narrow read/write interface to the host's store
//!
//! The core never owns persistent state. It reads through [`StateReader`]
//! and, when executing, writes through [`StateStore`]:
//! - [`MemoryState`]: ordered in-memory store for tests and tooling
//! - [`Overlay`]: copy-on-write view used to stage a batch over a snapshot
//! - typed loaders decode stored records and flag corrupt bytes

pub mod keys;
mod records;

pub use records::{EnclaveRecord, EventRecord, ObjectRecord, RegionRecord};

use crate::codec::DecodeError;
use std::collections::BTreeMap;

/// Read access to a state snapshot
pub trait StateReader {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Read/write access used by `execute`
pub trait StateStore: StateReader {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn remove(&mut self, key: &[u8]);
}

/// Stored bytes that fail to decode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("corrupt state at key {key}: {source}")]
pub struct StateError {
    /// Hex-encoded key
    pub key: String,
    #[source]
    pub source: DecodeError,
}

fn load<T>(
    state: &dyn StateReader,
    key: &[u8],
    decode: fn(&[u8]) -> Result<T, DecodeError>,
) -> Result<Option<T>, StateError> {
    match state.get(key) {
        None => Ok(None),
        Some(bytes) => decode(&bytes).map(Some).map_err(|source| StateError {
            key: hex::encode(key),
            source,
        }),
    }
}

pub fn load_object(state: &dyn StateReader, id: &str) -> Result<Option<ObjectRecord>, StateError> {
    load(state, &keys::object_key(id), ObjectRecord::decode)
}

pub fn load_region(state: &dyn StateReader, id: &str) -> Result<Option<RegionRecord>, StateError> {
    load(state, &keys::region_key(id), RegionRecord::decode)
}

pub fn load_enclave(
    state: &dyn StateReader,
    address: &[u8],
) -> Result<Option<EnclaveRecord>, StateError> {
    load(state, &keys::enclave_key(address), EnclaveRecord::decode)
}

pub fn object_exists(state: &dyn StateReader, id: &str) -> bool {
    state.exists(&keys::object_key(id))
}

/// Ordered in-memory state
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryState {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.entries.iter()
    }

    /// Build from hex-encoded key/value pairs
    pub fn from_hex_map(map: &BTreeMap<String, String>) -> Result<Self, hex::FromHexError> {
        let mut entries = BTreeMap::new();
        for (k, v) in map {
            entries.insert(hex::decode(k)?, hex::decode(v)?);
        }
        Ok(Self { entries })
    }

    pub fn put_object(&mut self, id: &str, record: &ObjectRecord) {
        self.insert(keys::object_key(id), record.encode());
    }

    pub fn put_region(&mut self, id: &str, record: &RegionRecord) {
        self.insert(keys::region_key(id), record.encode());
    }

    /// Register an enclave's quote key (normally done by the host)
    pub fn put_enclave(&mut self, address: &[u8], record: &EnclaveRecord) {
        self.insert(keys::enclave_key(address), record.encode());
    }
}

impl StateReader for MemoryState {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn exists(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }
}

impl StateStore for MemoryState {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// Copy-on-write view over a read-only snapshot. Writes and removals are
/// kept in memory and shadow the base; the base is never touched.
pub struct Overlay<'a> {
    base: &'a dyn StateReader,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> Overlay<'a> {
    pub fn new(base: &'a dyn StateReader) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Number of staged writes and removals
    pub fn staged(&self) -> usize {
        self.writes.len()
    }
}

impl StateReader for Overlay<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(staged) => staged.clone(),
            None => self.base.get(key),
        }
    }

    fn exists(&self, key: &[u8]) -> bool {
        match self.writes.get(key) {
            Some(staged) => staged.is_some(),
            None => self.base.exists(key),
        }
    }
}

impl StateStore for Overlay<'_> {
    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn remove(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}
