//! Command enum defining all bitmap operations.
//!
//! Commands are the instruction set of the engine. Every operation that can
//! be performed is represented as a variant of this enum.
//!
//! Commands are:
//! - **Self-contained**: all parameters needed for execution are in the
//!   variant
//! - **Serializable**: convert to/from JSON for SDKs and fixtures
//! - **Typed**: every operand is parsed and range-checked before dispatch
//! - **Pure data**: no closures or executable code
//!
//! [`Command::parse`] maps a raw argument vector (as handed over by the
//! wire framing layer) to a command, performing all arity and token
//! validation. A command that parses is ready to execute; a command that
//! does not parse has changed no state.

use serde::{Deserialize, Serialize};

use bitvault_core::{
    parse_bit_offset, parse_field_offset, parse_i64, BitUnit, BitwiseOp, Error, FieldType,
    OverflowPolicy, Result, MAX_BITOP_SOURCES,
};
use bitvault_engine::FieldOp;

/// An explicit BITCOUNT range: `[start, end]` in the given unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    /// Inclusive range start; negative counts from the end.
    pub start: i64,
    /// Inclusive range end; negative counts from the end.
    pub end: i64,
    /// Whether the range indexes bytes or bits.
    pub unit: BitUnit,
}

/// A command is a self-contained, serializable bitmap operation.
///
/// # Command surface
///
/// | Variant | Wire form | Returns |
/// |---------|-----------|---------|
/// | `SetBit` | `SETBIT key offset 0\|1` | `Output::Int` (prior bit) |
/// | `GetBit` | `GETBIT key offset` | `Output::Int` |
/// | `BitCount` | `BITCOUNT key [start end [BYTE\|BIT]]` | `Output::Int` |
/// | `BitPos` | `BITPOS key bit [start [end [BYTE\|BIT]]]` | `Output::Int` |
/// | `BitOp` | `BITOP op dst src...` | `Output::Int` (length written) |
/// | `BitField` | `BITFIELD key (GET\|SET\|INCRBY\|OVERFLOW)...` | `Output::Ints` |
/// | `BitFieldRo` | `BITFIELD_RO key (GET ...)+` | `Output::Ints` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    /// Set the bit at `offset`, answering the prior bit.
    SetBit {
        /// Target key.
        key: Vec<u8>,
        /// Absolute bit offset.
        offset: u64,
        /// New bit value.
        value: bool,
    },

    /// Read the bit at `offset`.
    GetBit {
        /// Target key.
        key: Vec<u8>,
        /// Absolute bit offset.
        offset: u64,
    },

    /// Count set bits, optionally within a range.
    BitCount {
        /// Target key.
        key: Vec<u8>,
        /// Explicit range, if the caller supplied one.
        range: Option<CountRange>,
    },

    /// Find the first bit equal to `bit`.
    BitPos {
        /// Target key.
        key: Vec<u8>,
        /// Target bit value.
        bit: bool,
        /// Range start, if supplied.
        start: Option<i64>,
        /// Range end, if supplied. Omission changes zero-search semantics.
        end: Option<i64>,
        /// Range unit.
        unit: BitUnit,
    },

    /// Fold `sources` under `op` into `dest`, answering the written length.
    BitOp {
        /// Fold operator.
        op: BitwiseOp,
        /// Destination key.
        dest: Vec<u8>,
        /// Source keys, in argument order.
        sources: Vec<Vec<u8>>,
    },

    /// Execute a bitfield sub-op sequence.
    BitField {
        /// Target key.
        key: Vec<u8>,
        /// Parsed sub-ops, in call order.
        ops: Vec<FieldOp>,
    },

    /// Execute a read-only bitfield sub-op sequence (GET only).
    BitFieldRo {
        /// Target key.
        key: Vec<u8>,
        /// Parsed sub-ops; only `FieldOp::Get` can appear here.
        ops: Vec<FieldOp>,
    },
}

impl Command {
    /// Parse an argument vector into a command.
    ///
    /// All validation happens here: arity, token case folding, numeric
    /// ranges, sub-op grammar, and the BITOP source cap. Errors are
    /// reported before any state changes.
    pub fn parse(args: &[Vec<u8>]) -> Result<Command> {
        let Some(name) = args.first() else {
            return Err(Error::Syntax);
        };

        if name.eq_ignore_ascii_case(b"SETBIT") {
            parse_setbit(args)
        } else if name.eq_ignore_ascii_case(b"GETBIT") {
            parse_getbit(args)
        } else if name.eq_ignore_ascii_case(b"BITCOUNT") {
            parse_bitcount(args)
        } else if name.eq_ignore_ascii_case(b"BITPOS") {
            parse_bitpos(args)
        } else if name.eq_ignore_ascii_case(b"BITOP") {
            parse_bitop(args)
        } else if name.eq_ignore_ascii_case(b"BITFIELD") {
            parse_bitfield(args, false)
        } else if name.eq_ignore_ascii_case(b"BITFIELD_RO") {
            parse_bitfield(args, true)
        } else {
            Err(Error::unknown_command(
                String::from_utf8_lossy(name).into_owned(),
            ))
        }
    }

    /// Lower-cased command name, for logs and arity errors.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetBit { .. } => "setbit",
            Command::GetBit { .. } => "getbit",
            Command::BitCount { .. } => "bitcount",
            Command::BitPos { .. } => "bitpos",
            Command::BitOp { .. } => "bitop",
            Command::BitField { .. } => "bitfield",
            Command::BitFieldRo { .. } => "bitfield_ro",
        }
    }

    /// Whether this command can mutate a value.
    ///
    /// Drives the reader/writer latch choice: readers share a key latch,
    /// writers hold it exclusively. BITFIELD counts as a writer even when
    /// its sub-ops happen to be all GETs.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Command::SetBit { .. } | Command::BitOp { .. } | Command::BitField { .. }
        )
    }
}

fn parse_setbit(args: &[Vec<u8>]) -> Result<Command> {
    if args.len() != 4 {
        return Err(Error::wrong_arity("setbit"));
    }
    let offset = parse_bit_offset(&args[2])?;
    let value = match args[3].as_slice() {
        b"0" => false,
        b"1" => true,
        _ => return Err(Error::ValueRange),
    };
    Ok(Command::SetBit {
        key: args[1].clone(),
        offset,
        value,
    })
}

fn parse_getbit(args: &[Vec<u8>]) -> Result<Command> {
    if args.len() != 3 {
        return Err(Error::wrong_arity("getbit"));
    }
    Ok(Command::GetBit {
        key: args[1].clone(),
        offset: parse_bit_offset(&args[2])?,
    })
}

fn parse_bitcount(args: &[Vec<u8>]) -> Result<Command> {
    match args.len() {
        2 => Ok(Command::BitCount {
            key: args[1].clone(),
            range: None,
        }),
        4 | 5 => {
            let start = parse_i64(&args[2]).ok_or(Error::ValueRange)?;
            let end = parse_i64(&args[3]).ok_or(Error::ValueRange)?;
            let unit = if args.len() == 5 {
                BitUnit::parse(&args[4])?
            } else {
                BitUnit::Byte
            };
            Ok(Command::BitCount {
                key: args[1].clone(),
                range: Some(CountRange { start, end, unit }),
            })
        }
        0 | 1 => Err(Error::wrong_arity("bitcount")),
        // A lone start (or trailing junk) is a shape problem, not arity.
        _ => Err(Error::Syntax),
    }
}

fn parse_bitpos(args: &[Vec<u8>]) -> Result<Command> {
    if args.len() < 3 {
        return Err(Error::wrong_arity("bitpos"));
    }
    if args.len() > 6 {
        return Err(Error::Syntax);
    }
    let bit = match parse_i64(&args[2]) {
        Some(0) => false,
        Some(1) => true,
        _ => return Err(Error::BitArgument),
    };
    let start = match args.get(3) {
        Some(arg) => Some(parse_i64(arg).ok_or(Error::ValueRange)?),
        None => None,
    };
    let end = match args.get(4) {
        Some(arg) => Some(parse_i64(arg).ok_or(Error::ValueRange)?),
        None => None,
    };
    let unit = match args.get(5) {
        Some(arg) => BitUnit::parse(arg)?,
        None => BitUnit::Byte,
    };
    Ok(Command::BitPos {
        key: args[1].clone(),
        bit,
        start,
        end,
        unit,
    })
}

fn parse_bitop(args: &[Vec<u8>]) -> Result<Command> {
    if args.len() < 4 {
        return Err(Error::wrong_arity("bitop"));
    }
    let op = BitwiseOp::parse(&args[1])?;
    let sources: Vec<Vec<u8>> = args[3..].to_vec();
    if sources.len() > MAX_BITOP_SOURCES {
        return Err(Error::BitopSourceLimit);
    }
    if op.is_unary() && sources.len() != 1 {
        return Err(Error::NotSingleSource);
    }
    Ok(Command::BitOp {
        op,
        dest: args[2].clone(),
        sources,
    })
}

fn parse_bitfield(args: &[Vec<u8>], read_only: bool) -> Result<Command> {
    if args.len() < 4 {
        return Err(Error::wrong_arity(if read_only {
            "bitfield_ro"
        } else {
            "bitfield"
        }));
    }
    let ops = parse_field_ops(&args[2..], read_only)?;
    let key = args[1].clone();
    if read_only {
        Ok(Command::BitFieldRo { key, ops })
    } else {
        Ok(Command::BitField { key, ops })
    }
}

/// Parse a bitfield sub-op token stream.
///
/// In read-only mode everything except GET is rejected, including
/// OVERFLOW: the read-only form has no writes for a policy to govern.
fn parse_field_ops(tokens: &[Vec<u8>], read_only: bool) -> Result<Vec<FieldOp>> {
    let mut ops = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let word = &tokens[i];
        if word.eq_ignore_ascii_case(b"GET") {
            let [ty, offset] = take::<2>(tokens, i + 1)?;
            let ty = FieldType::parse(ty)?;
            ops.push(FieldOp::Get {
                ty,
                offset: parse_field_offset(offset, ty.width)?,
            });
            i += 3;
        } else if word.eq_ignore_ascii_case(b"SET") {
            if read_only {
                return Err(Error::Syntax);
            }
            let [ty, offset, value] = take::<3>(tokens, i + 1)?;
            let ty = FieldType::parse(ty)?;
            ops.push(FieldOp::Set {
                ty,
                offset: parse_field_offset(offset, ty.width)?,
                value: parse_i64(value).ok_or(Error::ValueRange)?,
            });
            i += 4;
        } else if word.eq_ignore_ascii_case(b"INCRBY") {
            if read_only {
                return Err(Error::Syntax);
            }
            let [ty, offset, incr] = take::<3>(tokens, i + 1)?;
            let ty = FieldType::parse(ty)?;
            ops.push(FieldOp::IncrBy {
                ty,
                offset: parse_field_offset(offset, ty.width)?,
                incr: parse_i64(incr).ok_or(Error::ValueRange)?,
            });
            i += 4;
        } else if word.eq_ignore_ascii_case(b"OVERFLOW") {
            if read_only {
                return Err(Error::Syntax);
            }
            let [policy] = take::<1>(tokens, i + 1)?;
            ops.push(FieldOp::Overflow(OverflowPolicy::parse(policy)?));
            i += 2;
        } else {
            return Err(Error::Syntax);
        }
    }
    Ok(ops)
}

/// Borrow `N` consecutive operand tokens starting at `at`, or fail with a
/// syntax error when the sub-op is truncated.
fn take<const N: usize>(tokens: &[Vec<u8>], at: usize) -> Result<[&Vec<u8>; N]> {
    if at + N > tokens.len() {
        return Err(Error::Syntax);
    }
    let mut out = [&tokens[at]; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = &tokens[at + i];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|p| p.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_parse_setbit() {
        let cmd = Command::parse(&argv(&["SETBIT", "k", "7", "1"])).unwrap();
        assert_eq!(
            cmd,
            Command::SetBit {
                key: b"k".to_vec(),
                offset: 7,
                value: true,
            }
        );
        assert!(cmd.is_write());
    }

    #[test]
    fn test_parse_setbit_errors() {
        assert_eq!(
            Command::parse(&argv(&["SETBIT", "k", "7"])),
            Err(Error::wrong_arity("setbit"))
        );
        assert_eq!(
            Command::parse(&argv(&["SETBIT", "k", "-1", "1"])),
            Err(Error::BitOffsetRange)
        );
        assert_eq!(
            Command::parse(&argv(&["SETBIT", "k", "x", "1"])),
            Err(Error::BitOffsetRange)
        );
        assert_eq!(
            Command::parse(&argv(&["SETBIT", "k", "7", "2"])),
            Err(Error::ValueRange)
        );
    }

    #[test]
    fn test_parse_getbit() {
        let cmd = Command::parse(&argv(&["getbit", "k", "0"])).unwrap();
        assert_eq!(
            cmd,
            Command::GetBit {
                key: b"k".to_vec(),
                offset: 0,
            }
        );
        assert!(!cmd.is_write());
    }

    #[test]
    fn test_parse_bitcount_forms() {
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k"])).unwrap(),
            Command::BitCount {
                key: b"k".to_vec(),
                range: None,
            }
        );
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k", "1", "-1"])).unwrap(),
            Command::BitCount {
                key: b"k".to_vec(),
                range: Some(CountRange {
                    start: 1,
                    end: -1,
                    unit: BitUnit::Byte,
                }),
            }
        );
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k", "5", "30", "bit"])).unwrap(),
            Command::BitCount {
                key: b"k".to_vec(),
                range: Some(CountRange {
                    start: 5,
                    end: 30,
                    unit: BitUnit::Bit,
                }),
            }
        );
    }

    #[test]
    fn test_parse_bitcount_errors() {
        // start without end is a shape error
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k", "1"])),
            Err(Error::Syntax)
        );
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k", "1", "2", "WORD"])),
            Err(Error::Syntax)
        );
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT", "k", "a", "2"])),
            Err(Error::ValueRange)
        );
        assert_eq!(
            Command::parse(&argv(&["BITCOUNT"])),
            Err(Error::wrong_arity("bitcount"))
        );
    }

    #[test]
    fn test_parse_bitpos_forms() {
        let cmd = Command::parse(&argv(&["BITPOS", "k", "1"])).unwrap();
        assert_eq!(
            cmd,
            Command::BitPos {
                key: b"k".to_vec(),
                bit: true,
                start: None,
                end: None,
                unit: BitUnit::Byte,
            }
        );

        let cmd = Command::parse(&argv(&["BITPOS", "k", "0", "2", "-1", "BIT"])).unwrap();
        assert_eq!(
            cmd,
            Command::BitPos {
                key: b"k".to_vec(),
                bit: false,
                start: Some(2),
                end: Some(-1),
                unit: BitUnit::Bit,
            }
        );
    }

    #[test]
    fn test_parse_bitpos_bit_argument() {
        assert_eq!(
            Command::parse(&argv(&["BITPOS", "k", "2"])),
            Err(Error::BitArgument)
        );
        assert_eq!(
            Command::parse(&argv(&["BITPOS", "k", "x"])),
            Err(Error::BitArgument)
        );
    }

    #[test]
    fn test_parse_bitop() {
        let cmd = Command::parse(&argv(&["BITOP", "xor", "dst", "a", "b"])).unwrap();
        assert_eq!(
            cmd,
            Command::BitOp {
                op: BitwiseOp::Xor,
                dest: b"dst".to_vec(),
                sources: vec![b"a".to_vec(), b"b".to_vec()],
            }
        );
    }

    #[test]
    fn test_parse_bitop_errors() {
        assert_eq!(
            Command::parse(&argv(&["BITOP", "NAND", "dst", "a"])),
            Err(Error::Syntax)
        );
        assert_eq!(
            Command::parse(&argv(&["BITOP", "NOT", "dst", "a", "b"])),
            Err(Error::NotSingleSource)
        );
        assert_eq!(
            Command::parse(&argv(&["BITOP", "AND", "dst"])),
            Err(Error::wrong_arity("bitop"))
        );

        let mut parts = vec!["BITOP", "OR", "dst"];
        let names: Vec<String> = (0..65).map(|i| format!("s{i}")).collect();
        parts.extend(names.iter().map(|s| s.as_str()));
        assert_eq!(
            Command::parse(&argv(&parts)),
            Err(Error::BitopSourceLimit)
        );
    }

    #[test]
    fn test_parse_bitfield_sequence() {
        let cmd = Command::parse(&argv(&[
            "BITFIELD", "k", "SET", "u8", "#1", "255", "OVERFLOW", "SAT", "INCRBY", "u8", "#1",
            "10", "GET", "u8", "#1",
        ]))
        .unwrap();
        let Command::BitField { key, ops } = cmd else {
            panic!("wrong variant");
        };
        assert_eq!(key, b"k".to_vec());
        assert_eq!(ops.len(), 4);
        assert_eq!(
            ops[0],
            FieldOp::Set {
                ty: FieldType {
                    signed: false,
                    width: 8,
                },
                offset: 8,
                value: 255,
            }
        );
        assert_eq!(ops[1], FieldOp::Overflow(OverflowPolicy::Sat));
    }

    #[test]
    fn test_parse_bitfield_errors() {
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k"])),
            Err(Error::wrong_arity("bitfield"))
        );
        // truncated sub-op
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "GET", "u8"])),
            Err(Error::Syntax)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "GET", "u64", "0"])),
            Err(Error::InvalidFieldType)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "GET", "u8", "#"])),
            Err(Error::BitOffsetRange)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "SET", "u8", "0", "1.5"])),
            Err(Error::ValueRange)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "OVERFLOW", "CLAMP"])),
            Err(Error::InvalidOverflowType)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD", "k", "TRIM", "u8", "0"])),
            Err(Error::Syntax)
        );
    }

    #[test]
    fn test_parse_bitfield_ro_rejects_writes() {
        assert_eq!(
            Command::parse(&argv(&["BITFIELD_RO", "k", "SET", "u8", "0", "1"])),
            Err(Error::Syntax)
        );
        assert_eq!(
            Command::parse(&argv(&["BITFIELD_RO", "k", "OVERFLOW", "SAT", "GET", "u8", "0"])),
            Err(Error::Syntax)
        );

        let cmd = Command::parse(&argv(&["BITFIELD_RO", "k", "GET", "i16", "12"])).unwrap();
        assert!(matches!(cmd, Command::BitFieldRo { .. }));
        assert!(!cmd.is_write());
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse(&argv(&["SETBYTE", "k", "0", "1"])),
            Err(Error::unknown_command("SETBYTE"))
        );
    }

    #[test]
    fn test_binary_safe_keys() {
        let args = vec![
            b"SETBIT".to_vec(),
            vec![0x00, 0xff, 0x01],
            b"0".to_vec(),
            b"1".to_vec(),
        ];
        let cmd = Command::parse(&args).unwrap();
        assert_eq!(
            cmd,
            Command::SetBit {
                key: vec![0x00, 0xff, 0x01],
                offset: 0,
                value: true,
            }
        );
    }

    #[test]
    fn test_command_serde_round_trip() {
        let cmd = Command::parse(&argv(&["BITOP", "AND", "d", "a", "b"])).unwrap();
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }
}
