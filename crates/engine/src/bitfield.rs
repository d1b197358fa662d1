//! Typed fixed-width bitfield codec
//!
//! BITFIELD treats a value as packed integers of arbitrary width (1..=64
//! signed, 1..=63 unsigned) at arbitrary bit offsets, MSB first: the
//! high-order bit of a field occupies its bit offset. One call is a
//! sequence of sub-operations against the same key, executed atomically
//! and answered positionally; an `OVERFLOW` sub-op switches the policy for
//! the *following* SET/INCRBY sub-ops and produces no answer of its own.
//!
//! Overflow detection is width-parametric and derived from sign and
//! magnitude against precomputed bounds. For widths below 64 the bound
//! distances `max - old` / `min - old` always fit in `i64`, so plain
//! comparisons are complete; at width 64 the sign-split conditions avoid
//! computing distances that could not fit.

use serde::{Deserialize, Serialize};

use bitvault_core::{ByteArrayStore, Error, FieldType, Limits, OverflowPolicy, Result};

/// One step of a BITFIELD call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOp {
    /// Read a field. Never grows the key.
    Get {
        /// Field encoding.
        ty: FieldType,
        /// Absolute bit offset of the field's high bit.
        offset: u64,
    },
    /// Write a field, answering the prior value.
    Set {
        /// Field encoding.
        ty: FieldType,
        /// Absolute bit offset of the field's high bit.
        offset: u64,
        /// Literal to store, interpreted per the active overflow policy.
        value: i64,
    },
    /// Add to a field, answering the new stored value.
    IncrBy {
        /// Field encoding.
        ty: FieldType,
        /// Absolute bit offset of the field's high bit.
        offset: u64,
        /// Signed increment.
        incr: i64,
    },
    /// Switch the overflow policy for subsequent SET/INCRBY sub-ops.
    Overflow(OverflowPolicy),
}

impl FieldOp {
    /// Whether this sub-op writes field bits.
    pub fn is_write(&self) -> bool {
        matches!(self, FieldOp::Set { .. } | FieldOp::IncrBy { .. })
    }

    /// One-past-the-end bit of the bits this sub-op writes, if any.
    fn write_extent(&self) -> Option<u64> {
        match self {
            FieldOp::Set { ty, offset, .. } | FieldOp::IncrBy { ty, offset, .. } => {
                Some(offset + ty.width as u64)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Raw field access
// =============================================================================

/// Read `width` bits at `offset` as a raw big-endian bit string. Bits past
/// the end of `bytes` read as 0.
fn read_raw(bytes: &[u8], offset: u64, width: u8) -> u64 {
    let mut value = 0u64;
    for i in 0..width as u64 {
        let pos = offset + i;
        let idx = (pos >> 3) as usize;
        let bit = if idx < bytes.len() {
            (bytes[idx] >> (7 - (pos & 7))) & 1
        } else {
            0
        };
        value = (value << 1) | bit as u64;
    }
    value
}

/// Write the low `width` bits of `value` at `offset`, MSB first. The
/// buffer must already cover the field.
fn write_raw(buf: &mut [u8], offset: u64, width: u8, value: u64) {
    for i in 0..width as u64 {
        let pos = offset + i;
        let idx = (pos >> 3) as usize;
        let mask = 1u8 << (7 - (pos & 7));
        if (value >> (width as u64 - 1 - i)) & 1 != 0 {
            buf[idx] |= mask;
        } else {
            buf[idx] &= !mask;
        }
    }
}

fn sign_extend(raw: u64, width: u8) -> i64 {
    if width == 64 {
        raw as i64
    } else if raw & (1u64 << (width - 1)) != 0 {
        (raw | !((1u64 << width) - 1)) as i64
    } else {
        raw as i64
    }
}

/// Read a field and interpret it per the declared signedness.
///
/// Unsigned fields are at most 63 bits wide, so the result always fits.
pub fn get_field(bytes: &[u8], offset: u64, ty: FieldType) -> i64 {
    let raw = read_raw(bytes, offset, ty.width);
    if ty.signed {
        sign_extend(raw, ty.width)
    } else {
        raw as i64
    }
}

// =============================================================================
// Overflow arithmetic
// =============================================================================

/// Outcome of a bounds check: the value to store, or `None` under FAIL.
type Stored = Option<u64>;

/// Coerce a SET literal for a signed field under the active policy.
/// Returns the raw bits to store.
fn store_signed(value: i64, ty: FieldType, policy: OverflowPolicy) -> Stored {
    let maxs = ty.max_signed();
    let mins = ty.min_signed();
    match policy {
        OverflowPolicy::Wrap => Some(value as u64 & ty.mask()),
        OverflowPolicy::Sat => {
            let clamped = value.clamp(mins, maxs);
            Some(clamped as u64 & ty.mask())
        }
        OverflowPolicy::Fail => {
            if value > maxs || value < mins {
                None
            } else {
                Some(value as u64 & ty.mask())
            }
        }
    }
}

/// Coerce a SET literal for an unsigned field. The literal's 64-bit
/// pattern is compared unsigned, so negative literals overflow high.
fn store_unsigned(value: i64, ty: FieldType, policy: OverflowPolicy) -> Stored {
    let maxu = ty.max_unsigned();
    let raw = value as u64;
    match policy {
        OverflowPolicy::Wrap => Some(raw & ty.mask()),
        OverflowPolicy::Sat => Some(raw.min(maxu)),
        OverflowPolicy::Fail => {
            if raw > maxu {
                None
            } else {
                Some(raw)
            }
        }
    }
}

/// `old + incr` for a signed field. Returns the new interpreted value, or
/// `None` under FAIL overflow.
fn incr_signed(old: i64, incr: i64, ty: FieldType, policy: OverflowPolicy) -> Option<i64> {
    let maxs = ty.max_signed();
    let mins = ty.min_signed();

    let (over, under) = if ty.width == 64 {
        // The distances max-old / min-old are only computed on the side
        // where they fit.
        (
            old >= 0 && incr > 0 && incr > maxs - old,
            old < 0 && incr < 0 && incr < mins - old,
        )
    } else {
        // old is in [mins, maxs], so both distances fit in i64 and the
        // comparisons are complete for any incr.
        (incr > maxs - old, incr < mins - old)
    };

    match policy {
        OverflowPolicy::Wrap => {
            let raw = (old.wrapping_add(incr) as u64) & ty.mask();
            Some(sign_extend(raw, ty.width))
        }
        OverflowPolicy::Sat => {
            if over {
                Some(maxs)
            } else if under {
                Some(mins)
            } else {
                Some(old.wrapping_add(incr))
            }
        }
        OverflowPolicy::Fail => {
            if over || under {
                None
            } else {
                Some(old.wrapping_add(incr))
            }
        }
    }
}

/// `old + incr` for an unsigned field. Returns the new stored value, or
/// `None` under FAIL overflow.
fn incr_unsigned(old: u64, incr: i64, ty: FieldType, policy: OverflowPolicy) -> Option<u64> {
    let maxu = ty.max_unsigned();
    let over = incr >= 0 && incr as u64 > maxu - old;
    let under = incr < 0 && incr.unsigned_abs() > old;

    match policy {
        OverflowPolicy::Wrap => Some(old.wrapping_add(incr as u64) & ty.mask()),
        OverflowPolicy::Sat => {
            if over {
                Some(maxu)
            } else if under {
                Some(0)
            } else {
                Some(old.wrapping_add(incr as u64))
            }
        }
        OverflowPolicy::Fail => {
            if over || under {
                None
            } else {
                Some(old.wrapping_add(incr as u64))
            }
        }
    }
}

// =============================================================================
// Sub-op sequence execution
// =============================================================================

/// Run one sub-op against the field buffer. `None` answers are FAIL-policy
/// nulls; OVERFLOW answers nothing and updates the policy in place.
fn run_op(buf: &mut [u8], op: &FieldOp, policy: &mut OverflowPolicy) -> Option<Option<i64>> {
    match *op {
        FieldOp::Overflow(next) => {
            *policy = next;
            None
        }
        FieldOp::Get { ty, offset } => Some(Some(get_field(buf, offset, ty))),
        FieldOp::Set { ty, offset, value } => {
            let old = get_field(buf, offset, ty);
            let stored = if ty.signed {
                store_signed(value, ty, *policy)
            } else {
                store_unsigned(value, ty, *policy)
            };
            match stored {
                Some(raw) => {
                    write_raw(buf, offset, ty.width, raw);
                    Some(Some(old))
                }
                None => Some(None),
            }
        }
        FieldOp::IncrBy { ty, offset, incr } => {
            if ty.signed {
                let old = get_field(buf, offset, ty);
                match incr_signed(old, incr, ty, *policy) {
                    Some(new) => {
                        write_raw(buf, offset, ty.width, new as u64 & ty.mask());
                        Some(Some(new))
                    }
                    None => Some(None),
                }
            } else {
                let old = read_raw(buf, offset, ty.width);
                match incr_unsigned(old, incr, ty, *policy) {
                    Some(new) => {
                        write_raw(buf, offset, ty.width, new);
                        Some(Some(new as i64))
                    }
                    None => Some(None),
                }
            }
        }
    }
}

/// Execute a BITFIELD sub-op sequence against `key`.
///
/// When the sequence contains write sub-ops the value grows once, up
/// front, to cover the highest written bit; later FAIL nulls do not undo
/// that growth. GET-only sequences read through the shared path and never
/// create the key. The caller holds the key latch for the whole call.
pub fn execute<S: ByteArrayStore>(
    store: &S,
    key: &[u8],
    ops: &[FieldOp],
    limits: &Limits,
) -> Result<Vec<Option<i64>>> {
    let highest = ops.iter().filter_map(FieldOp::write_extent).max();

    let needed_bytes = match highest {
        Some(bits) => {
            let bytes = (bits + 7) / 8;
            if bytes > limits.max_value_bytes as u64 {
                return Err(Error::BitOffsetRange);
            }
            Some(bytes as usize)
        }
        None => None,
    };

    let mut results = Vec::with_capacity(ops.len());
    let mut policy = OverflowPolicy::default();

    match needed_bytes {
        Some(needed) => store.with_bytes_mut(key, needed, |buf| {
            for op in ops {
                if let Some(answer) = run_op(buf, op, &mut policy) {
                    results.push(answer);
                }
            }
        }),
        None => store.with_bytes(key, |bytes| {
            for op in ops {
                match *op {
                    FieldOp::Get { ty, offset } => {
                        results.push(Some(get_field(bytes, offset, ty)));
                    }
                    // A write-free sequence may still carry OVERFLOW
                    // tokens; without writes the policy is inert.
                    FieldOp::Overflow(_) => {}
                    _ => unreachable!("write op without write extent"),
                }
            }
        }),
    }

    Ok(results)
}
