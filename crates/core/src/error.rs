//! Error types for the BitVault engine
//!
//! This module defines the unified error type used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! ## Wire contract
//!
//! The `Display` rendering of each variant is the message a client sees on
//! the wire, so the strings here are frozen:
//!
//! | Variant | Message |
//! |---------|---------|
//! | `BitOffsetRange` | `bit offset is not an integer or out of range` |
//! | `ValueRange` | `value is not an integer or out of range.` |
//! | `InvalidFieldType` | `Invalid bitfield type. Use something like i16 u8. ...` |
//! | `InvalidOverflowType` | `Invalid OVERFLOW type specified` |
//! | `BitopSourceLimit` | `Bitop source key limit (64) exceeded` |
//! | `Syntax` | `syntax error` |
//!
//! Changing any of these strings is a wire-protocol break.
//!
//! ## Error classification
//!
//! All errors are reported synchronously, before any state change, and none
//! are retried by the engine. A FAIL-policy overflow inside a BITFIELD call
//! is *not* an error: it surfaces as a null sub-result in the output array.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for BitVault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all bitmap-engine operations.
///
/// Errors are structured so the dispatcher can forward them to the wire
/// layer without rewording: the `Display` string *is* the client-visible
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum Error {
    // ==================== Argument Errors ====================
    /// Bit offset is negative, non-numeric, or addresses a byte beyond the
    /// configured value-size limit.
    #[error("bit offset is not an integer or out of range")]
    BitOffsetRange,

    /// A value argument (SETBIT bit, BITFIELD SET/INCRBY operand) is not a
    /// valid integer for its position.
    #[error("value is not an integer or out of range.")]
    ValueRange,

    /// BITPOS bit argument was neither `0` nor `1`.
    #[error("The bit argument must be 1 or 0.")]
    BitArgument,

    /// A BITFIELD type token was not `i1..i64` / `u1..u63`.
    #[error("Invalid bitfield type. Use something like i16 u8. Note that u64 is not supported but i64 is")]
    InvalidFieldType,

    /// An OVERFLOW sub-op named an unknown policy.
    #[error("Invalid OVERFLOW type specified")]
    InvalidOverflowType,

    // ==================== Limit Errors ====================
    /// BITOP was given more than the allowed number of source keys.
    #[error("Bitop source key limit (64) exceeded")]
    BitopSourceLimit,

    /// BITOP NOT was given more than one source key.
    #[error("BITOP NOT must be called with a single source key.")]
    NotSingleSource,

    // ==================== Shape Errors ====================
    /// Catch-all for malformed sub-op sequences, unknown option tokens, and
    /// write sub-ops inside BITFIELD_RO.
    #[error("syntax error")]
    Syntax,

    /// Command received the wrong number of arguments.
    #[error("wrong number of arguments for '{command}' command")]
    WrongArity {
        /// Lower-cased command name.
        command: String,
    },

    /// The first argument named no known command.
    #[error("unknown command '{command}'")]
    UnknownCommand {
        /// The unrecognized command token.
        command: String,
    },
}

impl Error {
    /// Wrong-arity constructor.
    pub fn wrong_arity(command: impl Into<String>) -> Self {
        Error::WrongArity {
            command: command.into(),
        }
    }

    /// Unknown-command constructor.
    pub fn unknown_command(command: impl Into<String>) -> Self {
        Error::UnknownCommand {
            command: command.into(),
        }
    }

    /// True for errors caused by an argument the client can correct.
    ///
    /// Every engine error is in this class today; the distinction exists so
    /// transport layers can map future internal failures differently.
    pub fn is_validation_error(&self) -> bool {
        true
    }

    /// True for errors about numeric arguments being out of range.
    pub fn is_range_error(&self) -> bool {
        matches!(self, Error::BitOffsetRange | Error::ValueRange)
    }
}
