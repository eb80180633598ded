//! Input-tuple cache and query-fingerprint answer cache (§4.9): "tuples
//! are built once and reused globally", and `retrieve` answers may
//! "optionally [be] cached by query fingerprint".

use crate::id::{Address, ID};
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use std::sync::Mutex;

/// Keyed by the ground aux-input atom's address, since the cache is
/// meant to be reused globally regardless of which external atom asked
/// for it (§4.9).
#[derive(Default)]
pub struct EAInputTupleCache {
    by_address: Mutex<FxHashMap<Address, Vec<ID>>>,
}

impl EAInputTupleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with(&self, address: Address, build: impl FnOnce() -> Vec<ID>) -> Vec<ID> {
        let mut guard = self.by_address.lock().unwrap();
        guard.entry(address).or_insert_with(build).clone()
    }
}

/// A fingerprint of one `retrieve` call: the external atom, the
/// projected-interpretation bits actually read, and the concrete input
/// tuple. Two calls with the same fingerprint are guaranteed to produce
/// the same answer (PluginAtom::retrieve is a pure function of its
/// query), so the answer can be memoised.
#[derive(Default)]
pub struct QueryFingerprintCache {
    answers: Mutex<FxHashMap<[u8; 32], super::Answer>>,
}

impl QueryFingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fingerprint(ext_atom_id: ID, interp_bits: &[u32], inputs: &[ID]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(ext_atom_id.kind.to_le_bytes());
        hasher.update(ext_atom_id.address.to_le_bytes());
        for bit in interp_bits {
            hasher.update(bit.to_le_bytes());
        }
        for input in inputs {
            hasher.update(input.kind.to_le_bytes());
            hasher.update(input.address.to_le_bytes());
        }
        hasher.finalize().into()
    }

    pub fn get(&self, fingerprint: &[u8; 32]) -> Option<super::Answer> {
        let guard = self.answers.lock().unwrap();
        guard.get(fingerprint).cloned()
    }

    pub fn insert(&self, fingerprint: [u8; 32], answer: &super::Answer) {
        let mut guard = self.answers.lock().unwrap();
        guard.insert(fingerprint, answer.clone());
    }
}
