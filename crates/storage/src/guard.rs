//! Per-key latch guards
//!
//! Commands acquire a latch per touched key before reading or writing value
//! bytes, and hold it for the whole command. Guards own a clone of the
//! latch `Arc`, so they stay valid independently of the latch table and
//! release on every exit path, including early returns and panics.

use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

/// A per-key latch. Readers share it; writers hold it exclusively.
pub(crate) type Latch = Arc<RwLock<()>>;

/// Shared (reader) hold on a key latch.
///
/// Held by GETBIT, BITCOUNT, BITPOS, and BITFIELD_RO for the duration of
/// the command.
pub struct SharedGuard {
    _latch: ArcRwLockReadGuard<RawRwLock, ()>,
}

impl SharedGuard {
    pub(crate) fn acquire(latch: &Latch) -> Self {
        SharedGuard {
            _latch: latch.read_arc(),
        }
    }
}

/// Exclusive (writer) hold on a key latch.
///
/// Held by SETBIT, BITFIELD, and (per key) BITOP for the duration of the
/// command.
pub struct ExclusiveGuard {
    _latch: ArcRwLockWriteGuard<RawRwLock, ()>,
}

impl ExclusiveGuard {
    pub(crate) fn acquire(latch: &Latch) -> Self {
        ExclusiveGuard {
            _latch: latch.write_arc(),
        }
    }
}

impl std::fmt::Debug for SharedGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedGuard")
    }
}

impl std::fmt::Debug for ExclusiveGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExclusiveGuard")
    }
}
