//! BITFIELD / BITFIELD_RO handlers.

use bitvault_core::{Limits, Result};
use bitvault_engine::bitfield;
use bitvault_engine::FieldOp;
use bitvault_storage::ByteStore;

use crate::Output;

/// Handle BITFIELD: the whole sub-op sequence runs under one exclusive
/// key latch, so it is atomic against every other command on the key.
/// FAIL-policy nulls surface as `None` entries and do not undo preceding
/// writes in the same call.
pub fn bit_field(
    store: &ByteStore,
    limits: &Limits,
    key: &[u8],
    ops: &[FieldOp],
) -> Result<Output> {
    let _guard = store.acquire_exclusive(key);
    Ok(Output::Ints(bitfield::execute(store, key, ops, limits)?))
}

/// Handle BITFIELD_RO: GET-only by construction (the parser already
/// rejected everything else), so a shared latch suffices.
pub fn bit_field_ro(
    store: &ByteStore,
    limits: &Limits,
    key: &[u8],
    ops: &[FieldOp],
) -> Result<Output> {
    debug_assert!(ops.iter().all(|op| !op.is_write()));
    let _guard = store.acquire_shared(key);
    Ok(Output::Ints(bitfield::execute(store, key, ops, limits)?))
}
