//! Size limits for bitmap values
//!
//! This module defines the configurable size limits the engine enforces.
//! Violations surface as the frozen wire errors from [`crate::error`].
//!
//! ## Contract
//!
//! The BITOP source cap is frozen at 64 because the wire error message spells
//! the number out. The value-size cap is configurable at store construction
//! time; the default matches the compatibility target's proto limit.

use crate::error::{Error, Result};

/// Maximum number of BITOP source keys. Frozen: the wire error message
/// names this number.
pub const MAX_BITOP_SOURCES: usize = 64;

/// Size limits for bitmap values.
///
/// Growth beyond `max_value_bytes` is reported as
/// [`Error::BitOffsetRange`] before any state change.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum value length in bytes (default: 512 MiB).
    pub max_value_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_value_bytes: 512 * 1024 * 1024, // 512 MiB
        }
    }
}

impl Limits {
    /// Create limits with small values for testing.
    ///
    /// Useful for unit tests that need to exercise limit enforcement
    /// without allocating huge values.
    pub fn with_small_limits() -> Self {
        Limits {
            max_value_bytes: 1024,
        }
    }

    /// Validate that a value may grow to `len` bytes.
    pub fn validate_grow(&self, len: usize) -> Result<()> {
        if len > self.max_value_bytes {
            return Err(Error::BitOffsetRange);
        }
        Ok(())
    }

    /// Highest addressable bit offset under this limit.
    pub fn max_bit_offset(&self) -> u64 {
        self.max_value_bytes as u64 * 8 - 1
    }
}
