//! Sharded byte-array value store
//!
//! `ByteStore` is the Byte-Array Value Store behind the bitmap engine: an
//! in-memory map from opaque binary keys to growable byte sequences, plus a
//! per-key latch table for command-scoped linearization.
//!
//! # Design
//!
//! - DashMap + FxHash: sharded writes, lock-free reads, O(1) lookups
//! - Values and latches live in separate maps: acquiring a latch never
//!   creates a value, so read-only commands on absent keys leave no trace
//!   in the value map
//! - Latches are created on demand and retained for the life of the store;
//!   a latch entry says nothing about value existence
//!
//! # Latch discipline
//!
//! Callers acquire guards *before* touching value bytes and hold them for
//! the whole command:
//!
//! - readers take [`SharedGuard`]s, writers take [`ExclusiveGuard`]s
//! - multi-key commands acquire every key through
//!   [`ByteStore::acquire_exclusive_many`], which sorts the key set
//!   byte-lexicographically and deduplicates before acquiring, so two
//!   commands touching overlapping key sets cannot deadlock
//!
//! The `ByteArrayStore` accessors themselves are atomic per call; the
//! guards provide the cross-call exclusion. Closures passed to
//! `with_bytes`/`with_bytes_mut` must not re-enter the store.

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHasher;

use bitvault_core::ByteArrayStore;

use crate::guard::{ExclusiveGuard, Latch, SharedGuard};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// In-memory byte-array value store with per-key latches.
///
/// # Thread Safety
///
/// All operations are thread-safe. Value accessors are atomic per call;
/// command-scoped linearization comes from the latch guards.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use bitvault_storage::ByteStore;
///
/// let store = Arc::new(ByteStore::new());
/// let _guard = store.acquire_exclusive(b"k");
/// store.with_bytes_mut(b"k", 1, |buf| buf[0] = 0x80);
/// ```
pub struct ByteStore {
    /// Key -> value bytes.
    values: DashMap<Vec<u8>, Vec<u8>, FxBuildHasher>,
    /// Key -> latch. Independent of value existence.
    latches: DashMap<Vec<u8>, Latch, FxBuildHasher>,
}

impl ByteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        ByteStore {
            values: DashMap::with_hasher(FxBuildHasher::default()),
            latches: DashMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Create a store with pre-allocated capacity for `keys` entries.
    pub fn with_capacity(keys: usize) -> Self {
        ByteStore {
            values: DashMap::with_capacity_and_hasher(keys, FxBuildHasher::default()),
            latches: DashMap::with_capacity_and_hasher(keys, FxBuildHasher::default()),
        }
    }

    /// Fetch (creating on demand) the latch for a key.
    ///
    /// Latch entries are retained once created: dropping a latch while a
    /// guard is live would let a second latch appear for the same key and
    /// break mutual exclusion.
    fn latch(&self, key: &[u8]) -> Latch {
        if let Some(latch) = self.latches.get(key) {
            return latch.value().clone();
        }
        self.latches.entry(key.to_vec()).or_default().value().clone()
    }

    /// Acquire a shared (reader) hold on `key`.
    pub fn acquire_shared(&self, key: &[u8]) -> SharedGuard {
        SharedGuard::acquire(&self.latch(key))
    }

    /// Acquire an exclusive (writer) hold on `key`.
    pub fn acquire_exclusive(&self, key: &[u8]) -> ExclusiveGuard {
        ExclusiveGuard::acquire(&self.latch(key))
    }

    /// Acquire exclusive holds on every key in `keys`.
    ///
    /// Keys are sorted byte-lexicographically and deduplicated first;
    /// acquisition then proceeds in that order. Any two commands acquiring
    /// overlapping key sets through this method order their acquisitions
    /// identically, which rules out lock cycles.
    pub fn acquire_exclusive_many(&self, keys: &[&[u8]]) -> Vec<ExclusiveGuard> {
        let mut ordered: Vec<&[u8]> = keys.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        ordered
            .into_iter()
            .map(|key| self.acquire_exclusive(key))
            .collect()
    }

    /// Number of keys currently holding a value.
    pub fn key_count(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ByteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ByteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStore")
            .field("key_count", &self.key_count())
            .field("latch_count", &self.latches.len())
            .finish()
    }
}

impl ByteArrayStore for ByteStore {
    fn with_bytes<R>(&self, key: &[u8], f: impl FnOnce(&[u8]) -> R) -> R {
        match self.values.get(key) {
            Some(entry) => f(entry.value().as_slice()),
            None => f(&[]),
        }
    }

    fn with_bytes_mut<R>(
        &self,
        key: &[u8],
        grow_to: usize,
        f: impl FnOnce(&mut Vec<u8>) -> R,
    ) -> R {
        let mut entry = self.values.entry(key.to_vec()).or_default();
        let buf = entry.value_mut();
        if buf.len() < grow_to {
            buf.resize(grow_to, 0);
        }
        f(buf)
    }

    fn write_bytes(&self, key: &[u8], value: Vec<u8>) {
        self.values.insert(key.to_vec(), value);
    }

    fn read_bytes(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    fn strlen(&self, key: &[u8]) -> usize {
        self.values.get(key).map(|entry| entry.value().len()).unwrap_or(0)
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.values.contains_key(key)
    }

    fn remove(&self, key: &[u8]) -> bool {
        // The latch entry stays: a concurrently held guard must keep
        // excluding later acquirers of the same key.
        self.values.remove(key).is_some()
    }
}
