//! Core types and traits for BitVault
//!
//! This crate defines the foundational vocabulary used throughout the
//! system:
//! - Error: the unified error type whose `Display` strings are the wire
//!   messages
//! - Limits: configurable value-size limits and the frozen BITOP source cap
//! - Token grammar: `BitUnit`, `OverflowPolicy`, `FieldType`, `BitwiseOp`
//!   and the numeric argument parsers
//! - Traits: the `ByteArrayStore` contract between kernels and storage

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use limits::{Limits, MAX_BITOP_SOURCES};
pub use traits::ByteArrayStore;
pub use types::{
    parse_bit_offset, parse_field_offset, parse_i64, BitUnit, BitwiseOp, FieldType,
    OverflowPolicy,
};
