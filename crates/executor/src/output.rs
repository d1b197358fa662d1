//! Output enum for command execution results.
//!
//! Every command produces exactly one output shape. The mapping is
//! deterministic: the same command always produces the same variant
//! (though the values differ with store state).

use serde::{Deserialize, Serialize};

/// Successful command execution results.
///
/// Each [`Command`](crate::Command) variant maps to exactly one `Output`
/// variant:
///
/// - `Int` — SETBIT, GETBIT, BITCOUNT, BITPOS, BITOP
/// - `Ints` — BITFIELD and BITFIELD_RO: one entry per answering sub-op, in
///   call order; `None` marks a FAIL-policy null
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// A single integer reply.
    Int(i64),

    /// An array of optional integer replies (BITFIELD).
    Ints(Vec<Option<i64>>),
}

impl Output {
    /// The integer reply, if this is one. Convenient in tests and SDK glue.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Output::Int(n) => Some(*n),
            Output::Ints(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_int() {
        assert_eq!(Output::Int(7).as_int(), Some(7));
        assert_eq!(Output::Ints(vec![Some(1)]).as_int(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let out = Output::Ints(vec![Some(-3), None, Some(0)]);
        let json = serde_json::to_string(&out).unwrap();
        let back: Output = serde_json::from_str(&json).unwrap();
        assert_eq!(out, back);
    }
}
