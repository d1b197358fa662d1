//! Single-key bit command handlers: SETBIT, GETBIT, BITCOUNT, BITPOS.

use bitvault_core::{BitUnit, ByteArrayStore, Limits, Result};
use bitvault_engine::{accessor, count, search};
use bitvault_storage::ByteStore;

use crate::command::CountRange;
use crate::Output;

/// Handle SETBIT: write one bit under an exclusive key latch, answering
/// the prior bit.
pub fn set_bit(
    store: &ByteStore,
    limits: &Limits,
    key: &[u8],
    offset: u64,
    value: bool,
) -> Result<Output> {
    let _guard = store.acquire_exclusive(key);
    let prior = accessor::set_bit(store, key, offset, value, limits)?;
    Ok(Output::Int(prior as i64))
}

/// Handle GETBIT: read one bit under a shared key latch.
pub fn get_bit(store: &ByteStore, key: &[u8], offset: u64) -> Result<Output> {
    let _guard = store.acquire_shared(key);
    Ok(Output::Int(accessor::get_bit(store, key, offset) as i64))
}

/// Handle BITCOUNT. An omitted range counts the whole value.
pub fn bit_count(store: &ByteStore, key: &[u8], range: Option<&CountRange>) -> Result<Output> {
    let _guard = store.acquire_shared(key);
    let count = store.with_bytes(key, |bytes| match range {
        Some(range) => count::bitcount(bytes, range.start, range.end, range.unit),
        None => count::bitcount(bytes, 0, -1, BitUnit::Byte),
    });
    Ok(Output::Int(count as i64))
}

/// Handle BITPOS. A `None` end is semantically distinct from `-1`: it
/// enables the zero-search tail rule.
pub fn bit_pos(
    store: &ByteStore,
    key: &[u8],
    bit: bool,
    start: Option<i64>,
    end: Option<i64>,
    unit: BitUnit,
) -> Result<Output> {
    let _guard = store.acquire_shared(key);
    let pos = store.with_bytes(key, |bytes| {
        search::bitpos(bytes, bit, start.unwrap_or(0), end, unit)
    });
    Ok(Output::Int(pos))
}
