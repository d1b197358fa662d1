//! Byte-slice scan kernels
//!
//! The hot inner loops of BITCOUNT and BITPOS run over contiguous
//! full-byte segments. This module exposes them behind a capability record
//! selected once at process start:
//!
//! - `popcount`: number of set bits in a slice
//! - `scan_skip`: index of the first byte differing from a fill byte
//!   (`0x00` while searching for a set bit, `0xFF` while searching for a
//!   clear bit)
//!
//! Three implementations exist: a 256-entry lookup table (the portable
//! fallback and the oracle for equivalence tests), a word-at-a-time
//! variant, and an AVX2 variant. All must agree bit-for-bit on every
//! input; `test_popcount_equivalence_randomized` below enforces that.

use once_cell::sync::Lazy;

/// Per-byte population counts.
const POPCOUNT_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).count_ones() as u8;
        i += 1;
    }
    table
};

/// Kernel function table, selected once at startup.
pub struct Kernels {
    /// Count set bits in a slice.
    pub popcount: fn(&[u8]) -> u64,
    /// Index of the first byte differing from `skip`, if any.
    pub scan_skip: fn(&[u8], u8) -> Option<usize>,
    /// Implementation label, for logs and benches.
    pub name: &'static str,
}

static ACTIVE: Lazy<Kernels> = Lazy::new(Kernels::detect);

/// The kernel table active for this process.
pub fn active() -> &'static Kernels {
    &ACTIVE
}

impl Kernels {
    /// Probe CPU features and pick the widest available implementation.
    fn detect() -> Kernels {
        #[cfg(target_arch = "x86_64")]
        {
            if std::is_x86_feature_detected!("avx2") {
                return Kernels {
                    popcount: popcount_avx2_entry,
                    scan_skip: scan_skip_avx2_entry,
                    name: "avx2",
                };
            }
        }
        Kernels {
            popcount: popcount_words,
            scan_skip: scan_skip_words,
            name: "words",
        }
    }

    /// The portable reference implementation. Used as the oracle in tests.
    pub fn portable() -> Kernels {
        Kernels {
            popcount: popcount_lut,
            scan_skip: scan_skip_scalar,
            name: "lut",
        }
    }
}

impl std::fmt::Debug for Kernels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernels").field("name", &self.name).finish()
    }
}

// =============================================================================
// Portable implementations
// =============================================================================

/// Table-driven popcount. The oracle.
pub fn popcount_lut(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .map(|&b| POPCOUNT_TABLE[b as usize] as u64)
        .sum()
}

/// Word-at-a-time popcount: 8-byte chunks through `u64::count_ones`, table
/// lookups for the tail.
pub fn popcount_words(bytes: &[u8]) -> u64 {
    let mut chunks = bytes.chunks_exact(8);
    let mut count: u64 = 0;
    for chunk in &mut chunks {
        count += u64::from_le_bytes(chunk.try_into().unwrap()).count_ones() as u64;
    }
    count + popcount_lut(chunks.remainder())
}

/// Byte-at-a-time scan. The oracle.
pub fn scan_skip_scalar(bytes: &[u8], skip: u8) -> Option<usize> {
    bytes.iter().position(|&b| b != skip)
}

/// Word-at-a-time scan: XOR against a splatted fill word, then locate the
/// first nonzero byte with a trailing-zero count.
pub fn scan_skip_words(bytes: &[u8], skip: u8) -> Option<usize> {
    let pattern = u64::from_le_bytes([skip; 8]);
    let mut chunks = bytes.chunks_exact(8);
    let mut offset = 0;
    for chunk in &mut chunks {
        let diff = u64::from_le_bytes(chunk.try_into().unwrap()) ^ pattern;
        if diff != 0 {
            return Some(offset + (diff.trailing_zeros() / 8) as usize);
        }
        offset += 8;
    }
    chunks
        .remainder()
        .iter()
        .position(|&b| b != skip)
        .map(|i| offset + i)
}

// =============================================================================
// AVX2 implementations (x86_64)
// =============================================================================

#[cfg(target_arch = "x86_64")]
fn popcount_avx2_entry(bytes: &[u8]) -> u64 {
    // Selected only after is_x86_feature_detected!("avx2") succeeded.
    unsafe { popcount_avx2(bytes) }
}

#[cfg(target_arch = "x86_64")]
fn scan_skip_avx2_entry(bytes: &[u8], skip: u8) -> Option<usize> {
    unsafe { scan_skip_avx2(bytes, skip) }
}

/// Nibble-shuffle popcount: per-byte counts via two PSHUFB table lookups,
/// horizontally summed with PSADBW into four u64 lanes per 32-byte block.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn popcount_avx2(bytes: &[u8]) -> u64 {
    use std::arch::x86_64::*;

    #[rustfmt::skip]
    let table = _mm256_setr_epi8(
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
        0, 1, 1, 2, 1, 2, 2, 3, 1, 2, 2, 3, 2, 3, 3, 4,
    );
    let low_mask = _mm256_set1_epi8(0x0f);
    let zero = _mm256_setzero_si256();
    let mut total = _mm256_setzero_si256();

    let mut chunks = bytes.chunks_exact(32);
    for chunk in &mut chunks {
        let v = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
        let lo = _mm256_and_si256(v, low_mask);
        let hi = _mm256_and_si256(_mm256_srli_epi16::<4>(v), low_mask);
        let counts = _mm256_add_epi8(
            _mm256_shuffle_epi8(table, lo),
            _mm256_shuffle_epi8(table, hi),
        );
        // Per-byte counts are <= 8, so a single psadbw per block cannot
        // overflow its u64 lanes.
        total = _mm256_add_epi64(total, _mm256_sad_epu8(counts, zero));
    }

    let mut lanes = [0u64; 4];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, total);
    lanes.iter().sum::<u64>() + popcount_lut(chunks.remainder())
}

/// Vector compare against a splatted fill byte; a movemask turns each
/// 32-byte block into one equality bitmap.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn scan_skip_avx2(bytes: &[u8], skip: u8) -> Option<usize> {
    use std::arch::x86_64::*;

    let needle = _mm256_set1_epi8(skip as i8);
    let mut chunks = bytes.chunks_exact(32);
    let mut offset = 0;
    for chunk in &mut chunks {
        let v = _mm256_loadu_si256(chunk.as_ptr() as *const __m256i);
        let eq = _mm256_movemask_epi8(_mm256_cmpeq_epi8(v, needle)) as u32;
        if eq != u32::MAX {
            return Some(offset + (!eq).trailing_zeros() as usize);
        }
        offset += 32;
    }
    chunks
        .remainder()
        .iter()
        .position(|&b| b != skip)
        .map(|i| offset + i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn implementations() -> Vec<(&'static str, fn(&[u8]) -> u64)> {
        let mut impls: Vec<(&'static str, fn(&[u8]) -> u64)> =
            vec![("lut", popcount_lut as fn(&[u8]) -> u64), ("words", popcount_words)];
        #[cfg(target_arch = "x86_64")]
        if std::is_x86_feature_detected!("avx2") {
            impls.push(("avx2", popcount_avx2_entry));
        }
        impls
    }

    fn scan_implementations() -> Vec<(&'static str, fn(&[u8], u8) -> Option<usize>)> {
        let mut impls: Vec<(&'static str, fn(&[u8], u8) -> Option<usize>)> = vec![
            ("scalar", scan_skip_scalar as fn(&[u8], u8) -> Option<usize>),
            ("words", scan_skip_words),
        ];
        #[cfg(target_arch = "x86_64")]
        if std::is_x86_feature_detected!("avx2") {
            impls.push(("avx2", scan_skip_avx2_entry));
        }
        impls
    }

    #[test]
    fn test_popcount_table() {
        assert_eq!(POPCOUNT_TABLE[0], 0);
        assert_eq!(POPCOUNT_TABLE[1], 1);
        assert_eq!(POPCOUNT_TABLE[0xff], 8);
        assert_eq!(POPCOUNT_TABLE[0b10110100], 4);
    }

    #[test]
    fn test_popcount_fixed_cases() {
        for (name, popcount) in implementations() {
            assert_eq!(popcount(&[]), 0, "{name}");
            assert_eq!(popcount(&[0x00]), 0, "{name}");
            assert_eq!(popcount(&[0xff]), 8, "{name}");
            assert_eq!(popcount(b"foobar"), 26, "{name}");
            assert_eq!(popcount(&[0xffu8; 100]), 800, "{name}");
        }
    }

    #[test]
    fn test_popcount_equivalence_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..512);
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            let expected = popcount_lut(&data);
            for (name, popcount) in implementations() {
                assert_eq!(popcount(&data), expected, "{name} diverged on len {len}");
            }
        }
    }

    #[test]
    fn test_scan_skip_fixed_cases() {
        for (name, scan) in scan_implementations() {
            assert_eq!(scan(&[], 0x00), None, "{name}");
            assert_eq!(scan(&[0x00, 0x00], 0x00), None, "{name}");
            assert_eq!(scan(&[0x00, 0x01], 0x00), Some(1), "{name}");
            assert_eq!(scan(&[0xff, 0xfe], 0xff), Some(1), "{name}");
            assert_eq!(scan(&[0x80], 0x00), Some(0), "{name}");

            // Differing byte past a 32-byte block boundary
            let mut long = vec![0u8; 70];
            long[69] = 0x10;
            assert_eq!(scan(&long, 0x00), Some(69), "{name}");
        }
    }

    #[test]
    fn test_scan_skip_equivalence_randomized() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let len = rng.gen_range(0..300);
            let skip = if rng.gen() { 0x00 } else { 0xff };
            // Mostly-fill data so matches land at interesting offsets
            let data: Vec<u8> = (0..len)
                .map(|_| if rng.gen_ratio(15, 16) { skip } else { rng.gen() })
                .collect();
            let expected = scan_skip_scalar(&data, skip);
            for (name, scan) in scan_implementations() {
                assert_eq!(scan(&data, skip), expected, "{name} diverged on len {len}");
            }
        }
    }

    #[test]
    fn test_active_kernels_match_oracle() {
        let kernels = active();
        let data: Vec<u8> = (0..255u8).collect();
        assert_eq!((kernels.popcount)(&data), popcount_lut(&data));
        assert_eq!((kernels.scan_skip)(&data, 0x00), scan_skip_scalar(&data, 0x00));
    }
}
