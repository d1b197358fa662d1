//! BITOP handler: fold N source keys into a destination key.

use bitvault_core::{BitwiseOp, ByteArrayStore, Result};
use bitvault_engine::combine;
use bitvault_storage::ByteStore;

use crate::Output;

/// Handle BITOP.
///
/// Every touched key (sources and destination) is acquired exclusively in
/// byte-lexicographic order before any byte is read, so the fold sees a
/// consistent cut of all inputs and the destination write is atomic with
/// respect to other commands.
///
/// When every source is absent or empty nothing is written: the
/// destination is left exactly as it was (no key springs into existence)
/// and the answered length is 0.
pub fn bit_op(
    store: &ByteStore,
    op: BitwiseOp,
    dest: &[u8],
    sources: &[Vec<u8>],
) -> Result<Output> {
    let mut keys: Vec<&[u8]> = sources.iter().map(|k| k.as_slice()).collect();
    keys.push(dest);
    let _guards = store.acquire_exclusive_many(&keys);

    let inputs: Vec<Vec<u8>> = sources
        .iter()
        .map(|key| store.read_bytes(key).unwrap_or_default())
        .collect();

    if inputs.iter().all(|src| src.is_empty()) {
        return Ok(Output::Int(0));
    }

    let folded = combine::apply(op, &inputs);
    let written = folded.len();
    store.write_bytes(dest, folded);
    Ok(Output::Int(written as i64))
}
