//! Multi-source bitwise folds
//!
//! BITOP semantics: fold N source values byte-wise into one output of
//! length `max(len(src_i))`, with shorter sources zero-extended. The fold
//! is a pure function over the source slices; acquiring the keys, the
//! source cap, NOT's arity, and the atomic destination write all live in
//! the dispatcher.
//!
//! Inner loops run 8 bytes at a time over `u64` lanes with byte tails,
//! which is enough to saturate memory bandwidth for these single-pass
//! operations.

use bitvault_core::BitwiseOp;

/// Copy `src` into a buffer of length `len`, zero-padding the tail.
fn zero_extended(src: &[u8], len: usize) -> Vec<u8> {
    let mut out = src.to_vec();
    out.resize(len, 0);
    out
}

/// `out[i] = f(out[i], src[i])` over the whole of `out`, with `src`
/// zero-extended: bytes past `src.len()` fold against 0.
fn fold_into(out: &mut [u8], src: &[u8], f64: impl Fn(u64, u64) -> u64, f8: impl Fn(u8, u8) -> u8) {
    let n = out.len().min(src.len());
    let (head, tail) = out.split_at_mut(n);

    let mut out_chunks = head.chunks_exact_mut(8);
    let mut src_chunks = src[..n].chunks_exact(8);
    for (o, s) in (&mut out_chunks).zip(&mut src_chunks) {
        let folded = f64(
            u64::from_le_bytes(o.as_ref().try_into().unwrap()),
            u64::from_le_bytes(s.try_into().unwrap()),
        );
        o.copy_from_slice(&folded.to_le_bytes());
    }
    for (o, s) in out_chunks
        .into_remainder()
        .iter_mut()
        .zip(src_chunks.remainder())
    {
        *o = f8(*o, *s);
    }

    for o in tail {
        *o = f8(*o, 0);
    }
}

/// OR of `sources[..]` at length `len`.
fn or_all(sources: &[Vec<u8>], len: usize) -> Vec<u8> {
    let mut acc = vec![0u8; len];
    for src in sources {
        fold_into(&mut acc, src, |a, b| a | b, |a, b| a | b);
    }
    acc
}

/// Bits set in exactly one source, via a pair of streaming accumulators:
/// `once` holds bits seen exactly once so far, `more` bits seen at least
/// twice. Invariant: `once & more == 0`.
fn exactly_one(sources: &[Vec<u8>], len: usize) -> Vec<u8> {
    let mut once = vec![0u8; len];
    let mut more = vec![0u8; len];
    for src in sources {
        let n = len.min(src.len());
        for i in 0..n {
            let b = src[i];
            more[i] |= once[i] & b;
            once[i] = (once[i] | b) & !more[i];
        }
        // Bytes past src.len() fold against 0 and change nothing.
    }
    once
}

/// Fold `sources` under `op`. Preconditions (enforced by the dispatcher):
/// at least one source, and exactly one for NOT.
pub fn apply(op: BitwiseOp, sources: &[Vec<u8>]) -> Vec<u8> {
    debug_assert!(!sources.is_empty());
    debug_assert!(!op.is_unary() || sources.len() == 1);

    let len = sources.iter().map(|s| s.len()).max().unwrap_or(0);

    match op {
        BitwiseOp::Not => sources[0].iter().map(|b| !b).collect(),
        BitwiseOp::And => {
            let mut out = zero_extended(&sources[0], len);
            for src in &sources[1..] {
                fold_into(&mut out, src, |a, b| a & b, |a, b| a & b);
            }
            out
        }
        BitwiseOp::Or => or_all(sources, len),
        BitwiseOp::Xor => {
            let mut out = zero_extended(&sources[0], len);
            for src in &sources[1..] {
                fold_into(&mut out, src, |a, b| a ^ b, |a, b| a ^ b);
            }
            out
        }
        BitwiseOp::Diff => {
            // a & ~(b | c | ...)
            let rest = or_all(&sources[1..], len);
            let mut out = zero_extended(&sources[0], len);
            fold_into(&mut out, &rest, |a, b| a & !b, |a, b| a & !b);
            out
        }
        BitwiseOp::Diff1 => {
            // ~a & (b | c | ...)
            let mut out = or_all(&sources[1..], len);
            let first = zero_extended(&sources[0], len);
            fold_into(&mut out, &first, |a, b| a & !b, |a, b| a & !b);
            out
        }
        BitwiseOp::AndOr => {
            // a & (b | c | ...)
            let mut out = zero_extended(&sources[0], len);
            let rest = or_all(&sources[1..], len);
            fold_into(&mut out, &rest, |a, b| a & b, |a, b| a & b);
            out
        }
        BitwiseOp::One => exactly_one(sources, len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(bytes: &[u8]) -> Vec<u8> {
        bytes.to_vec()
    }

    #[test]
    fn test_and_or_xor_basic() {
        let a = v(&[0b1100_1100]);
        let b = v(&[0b1010_1010]);
        assert_eq!(apply(BitwiseOp::And, &[a.clone(), b.clone()]), [0b1000_1000]);
        assert_eq!(apply(BitwiseOp::Or, &[a.clone(), b.clone()]), [0b1110_1110]);
        assert_eq!(apply(BitwiseOp::Xor, &[a, b]), [0b0110_0110]);
    }

    #[test]
    fn test_not() {
        assert_eq!(apply(BitwiseOp::Not, &[v(&[0x00, 0xf0])]), [0xff, 0x0f]);
    }

    #[test]
    fn test_not_is_involutive() {
        let a = v(b"foobar");
        let double = apply(BitwiseOp::Not, &[apply(BitwiseOp::Not, &[a.clone()])]);
        assert_eq!(double, a);
    }

    #[test]
    fn test_zero_extension_to_longest() {
        let short = v(&[0xff]);
        let long = v(&[0x0f, 0x0f, 0x0f]);

        let and = apply(BitwiseOp::And, &[short.clone(), long.clone()]);
        assert_eq!(and, [0x0f, 0x00, 0x00]);

        let or = apply(BitwiseOp::Or, &[short.clone(), long.clone()]);
        assert_eq!(or, [0xff, 0x0f, 0x0f]);

        let xor = apply(BitwiseOp::Xor, &[short, long]);
        assert_eq!(xor, [0xf0, 0x0f, 0x0f]);
    }

    #[test]
    fn test_xor_commutative_associative() {
        let a = v(&[0x12, 0x34]);
        let b = v(&[0xab]);
        let c = v(&[0xff, 0x00, 0x55]);

        let abc = apply(BitwiseOp::Xor, &[a.clone(), b.clone(), c.clone()]);
        let cba = apply(BitwiseOp::Xor, &[c.clone(), b.clone(), a.clone()]);
        assert_eq!(abc, cba);

        let ab = apply(BitwiseOp::Xor, &[a, b]);
        let ab_c = apply(BitwiseOp::Xor, &[ab, c]);
        assert_eq!(abc, ab_c);
    }

    #[test]
    fn test_diff() {
        // a & ~(b | c)
        let a = v(&[0b1111_0000]);
        let b = v(&[0b1000_0000]);
        let c = v(&[0b0011_0000]);
        assert_eq!(apply(BitwiseOp::Diff, &[a, b, c]), [0b0100_0000]);
    }

    #[test]
    fn test_diff_single_source_is_identity() {
        let a = v(&[0xa5, 0x5a]);
        assert_eq!(apply(BitwiseOp::Diff, &[a.clone()]), a);
    }

    #[test]
    fn test_diff1() {
        // ~a & (b | c)
        let a = v(&[0b1111_0000]);
        let b = v(&[0b1000_1000]);
        let c = v(&[0b0000_0011]);
        assert_eq!(apply(BitwiseOp::Diff1, &[a, b, c]), [0b0000_1011]);
    }

    #[test]
    fn test_andor() {
        // a & (b | c)
        let a = v(&[0b1111_0000]);
        let b = v(&[0b1000_1000]);
        let c = v(&[0b0100_0011]);
        assert_eq!(apply(BitwiseOp::AndOr, &[a, b, c]), [0b1100_0000]);
    }

    #[test]
    fn test_one() {
        let a = v(&[0b1100_0000]);
        let b = v(&[0b1010_0000]);
        let c = v(&[0b1001_0000]);
        // bit0 set in all three, bit1 only in a, bit2 only in b, bit3 only in c
        assert_eq!(apply(BitwiseOp::One, &[a, b, c]), [0b0111_0000]);
    }

    #[test]
    fn test_one_single_source_is_identity() {
        let a = v(&[0x3c]);
        assert_eq!(apply(BitwiseOp::One, &[a.clone()]), a);
    }

    #[test]
    fn test_one_mixed_lengths() {
        let a = v(&[0xff, 0xff]);
        let b = v(&[0xff]);
        // byte 0: every bit seen twice; byte 1: seen once (a only)
        assert_eq!(apply(BitwiseOp::One, &[a, b]), [0x00, 0xff]);
    }

    #[test]
    fn test_long_values_cross_word_chunks() {
        let a: Vec<u8> = (0..100u8).collect();
        let b: Vec<u8> = (0..100u8).rev().collect();

        let expected: Vec<u8> = a.iter().zip(&b).map(|(x, y)| x & y).collect();
        assert_eq!(apply(BitwiseOp::And, &[a.clone(), b.clone()]), expected);

        let expected: Vec<u8> = a.iter().zip(&b).map(|(x, y)| x ^ y).collect();
        assert_eq!(apply(BitwiseOp::Xor, &[a, b]), expected);
    }

    #[test]
    fn test_many_sources() {
        // OR of 64 one-hot single-byte sources lights the whole byte cycle.
        let sources: Vec<Vec<u8>> = (0..64).map(|i| vec![1u8 << (i % 8)]).collect();
        assert_eq!(apply(BitwiseOp::Or, &sources), [0xff]);
        // Each bit was seen 8 times, so ONE is empty.
        assert_eq!(apply(BitwiseOp::One, &sources), [0x00]);
    }
}
