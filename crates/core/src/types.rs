//! Token grammar shared by the engine and the dispatcher
//!
//! Every closed token vocabulary of the command surface lives here as an
//! enum with a `parse`/`as_str` pair, so the engine kernels and the argv
//! parser agree on exactly one grammar:
//!
//! - [`BitUnit`]: the `BYTE`/`BIT` range-unit tokens of BITCOUNT/BITPOS
//! - [`OverflowPolicy`]: the `WRAP`/`SAT`/`FAIL` tokens of BITFIELD
//! - [`FieldType`]: the `i<width>`/`u<width>` encoding tokens of BITFIELD
//! - [`BitwiseOp`]: the BITOP operator tokens
//!
//! Tokens arrive as raw argument bytes, not strings: keys and arguments on
//! this wire protocol are binary-safe, so all parsing here is `&[u8]`-first
//! and case-insensitivity is ASCII-only.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// BitUnit
// =============================================================================

/// Range unit for BITCOUNT and BITPOS: index by bytes or by bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitUnit {
    /// `start`/`end` index whole bytes (the historical default).
    Byte,
    /// `start`/`end` index individual bits.
    Bit,
}

impl BitUnit {
    /// Parse a unit token (case-insensitive). Unknown tokens are a syntax
    /// error, matching the dispatcher's option-token handling.
    pub fn parse(token: &[u8]) -> Result<Self> {
        if token.eq_ignore_ascii_case(b"BYTE") {
            Ok(BitUnit::Byte)
        } else if token.eq_ignore_ascii_case(b"BIT") {
            Ok(BitUnit::Bit)
        } else {
            Err(Error::Syntax)
        }
    }

    /// Canonical token spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            BitUnit::Byte => "BYTE",
            BitUnit::Bit => "BIT",
        }
    }
}

impl std::fmt::Display for BitUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// OverflowPolicy
// =============================================================================

/// Behavior when a BITFIELD SET/INCRBY result falls outside the
/// representable range of its field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Truncate to the field width (two's-complement wrap). The default.
    #[default]
    Wrap,
    /// Clamp to the nearest representable bound.
    Sat,
    /// Leave the stored value unchanged and yield a null sub-result.
    Fail,
}

impl OverflowPolicy {
    /// Parse a policy token (case-insensitive).
    pub fn parse(token: &[u8]) -> Result<Self> {
        if token.eq_ignore_ascii_case(b"WRAP") {
            Ok(OverflowPolicy::Wrap)
        } else if token.eq_ignore_ascii_case(b"SAT") {
            Ok(OverflowPolicy::Sat)
        } else if token.eq_ignore_ascii_case(b"FAIL") {
            Ok(OverflowPolicy::Fail)
        } else {
            Err(Error::InvalidOverflowType)
        }
    }

    /// Canonical token spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Wrap => "WRAP",
            OverflowPolicy::Sat => "SAT",
            OverflowPolicy::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// FieldType
// =============================================================================

/// A BITFIELD encoding: signed or unsigned, width 1..=64 bits.
///
/// Unsigned widths stop at 63 because results are returned as signed 64-bit
/// integers on the wire; a full `u64` would not round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    /// Two's-complement interpretation when true.
    pub signed: bool,
    /// Field width in bits. 1..=64 signed, 1..=63 unsigned.
    pub width: u8,
}

impl FieldType {
    /// Parse a type token such as `i16` or `u8` (sign marker is
    /// case-insensitive).
    pub fn parse(token: &[u8]) -> Result<Self> {
        if token.len() < 2 {
            return Err(Error::InvalidFieldType);
        }
        let signed = match token[0] {
            b'i' | b'I' => true,
            b'u' | b'U' => false,
            _ => return Err(Error::InvalidFieldType),
        };
        let digits = std::str::from_utf8(&token[1..]).map_err(|_| Error::InvalidFieldType)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidFieldType);
        }
        let width: u32 = digits.parse().map_err(|_| Error::InvalidFieldType)?;
        let max = if signed { 64 } else { 63 };
        if width == 0 || width > max {
            return Err(Error::InvalidFieldType);
        }
        Ok(FieldType {
            signed,
            width: width as u8,
        })
    }

    /// Largest representable signed value for this width.
    pub fn max_signed(&self) -> i64 {
        if self.width == 64 {
            i64::MAX
        } else {
            (1i64 << (self.width - 1)) - 1
        }
    }

    /// Smallest representable signed value for this width.
    pub fn min_signed(&self) -> i64 {
        -self.max_signed() - 1
    }

    /// Largest representable unsigned value for this width.
    ///
    /// Only meaningful for unsigned types (width <= 63).
    pub fn max_unsigned(&self) -> u64 {
        debug_assert!(self.width <= 63);
        (1u64 << self.width) - 1
    }

    /// Mask selecting the low `width` bits of a raw 64-bit value.
    pub fn mask(&self) -> u64 {
        if self.width == 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.signed { 'i' } else { 'u' }, self.width)
    }
}

// =============================================================================
// BitwiseOp
// =============================================================================

/// BITOP fold operator over N source values.
///
/// All operators take one or more sources except `Not`, which is unary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitwiseOp {
    /// Byte-wise `a & b & ...`
    And,
    /// Byte-wise `a | b | ...`
    Or,
    /// Byte-wise `a ^ b ^ ...`
    Xor,
    /// Byte-wise `~a` (exactly one source).
    Not,
    /// `a & ~(b | c | ...)` — bits of the first source set nowhere else.
    Diff,
    /// `~a & (b | c | ...)` — bits set somewhere else but not in the first.
    Diff1,
    /// `a & (b | c | ...)` — bits of the first source set somewhere else too.
    AndOr,
    /// Bits set in exactly one source.
    One,
}

impl BitwiseOp {
    /// Parse an operator token (case-insensitive). Unknown operators are a
    /// syntax error.
    pub fn parse(token: &[u8]) -> Result<Self> {
        if token.eq_ignore_ascii_case(b"AND") {
            Ok(BitwiseOp::And)
        } else if token.eq_ignore_ascii_case(b"OR") {
            Ok(BitwiseOp::Or)
        } else if token.eq_ignore_ascii_case(b"XOR") {
            Ok(BitwiseOp::Xor)
        } else if token.eq_ignore_ascii_case(b"NOT") {
            Ok(BitwiseOp::Not)
        } else if token.eq_ignore_ascii_case(b"DIFF") {
            Ok(BitwiseOp::Diff)
        } else if token.eq_ignore_ascii_case(b"DIFF1") {
            Ok(BitwiseOp::Diff1)
        } else if token.eq_ignore_ascii_case(b"ANDOR") {
            Ok(BitwiseOp::AndOr)
        } else if token.eq_ignore_ascii_case(b"ONE") {
            Ok(BitwiseOp::One)
        } else {
            Err(Error::Syntax)
        }
    }

    /// Canonical token spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            BitwiseOp::And => "AND",
            BitwiseOp::Or => "OR",
            BitwiseOp::Xor => "XOR",
            BitwiseOp::Not => "NOT",
            BitwiseOp::Diff => "DIFF",
            BitwiseOp::Diff1 => "DIFF1",
            BitwiseOp::AndOr => "ANDOR",
            BitwiseOp::One => "ONE",
        }
    }

    /// True for operators taking exactly one source.
    pub fn is_unary(&self) -> bool {
        matches!(self, BitwiseOp::Not)
    }
}

impl std::fmt::Display for BitwiseOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Numeric argument parsing
// =============================================================================

/// Parse a signed 64-bit integer argument. Returns `None` for non-UTF-8,
/// empty, or non-numeric input.
pub fn parse_i64(arg: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(arg).ok()?;
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok()
}

/// Parse an absolute bit offset: a nonnegative integer fitting in 63 bits.
pub fn parse_bit_offset(arg: &[u8]) -> Result<u64> {
    match parse_i64(arg) {
        Some(n) if n >= 0 => Ok(n as u64),
        _ => Err(Error::BitOffsetRange),
    }
}

/// Parse a BITFIELD offset token: either an absolute bit offset, or `#N`
/// meaning `N * width` (type-multiple addressing).
pub fn parse_field_offset(arg: &[u8], width: u8) -> Result<u64> {
    if let Some(rest) = arg.strip_prefix(b"#") {
        let slot = match parse_i64(rest) {
            Some(n) if n >= 0 => n as u64,
            _ => return Err(Error::BitOffsetRange),
        };
        slot.checked_mul(width as u64)
            .filter(|off| *off <= i64::MAX as u64)
            .ok_or(Error::BitOffsetRange)
    } else {
        parse_bit_offset(arg)
    }
}
