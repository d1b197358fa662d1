//! The BitVault bitmap engine
//!
//! Bit-exact operations over byte-array values held in a
//! [`ByteArrayStore`](bitvault_core::ByteArrayStore):
//!
//! - [`accessor`]: single-bit reads and writes (GETBIT/SETBIT)
//! - [`count`]: population counting over byte and bit ranges (BITCOUNT)
//! - [`search`]: first-bit search (BITPOS)
//! - [`combine`]: multi-source bitwise folds (BITOP)
//! - [`bitfield`]: typed fixed-width integer fields with overflow
//!   policies (BITFIELD)
//! - [`kernels`]: the accelerated popcount/scan inner loops backing
//!   `count` and `search`
//!
//! Everything here is synchronous and non-suspending; commands acquire
//! per-key latches at the dispatch layer and the engine runs to completion
//! under them. Kernels never hold byte references across calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod bitfield;
pub mod combine;
pub mod count;
pub mod kernels;
pub mod search;

pub use bitfield::FieldOp;
