//! Core trait definitions
//!
//! [`ByteArrayStore`] is the seam between the bitmap kernels and the value
//! storage layer: the kernels never hold byte references across calls, they
//! borrow a value for exactly one closure invocation. Key absence is
//! represented as an empty slice on the read path, so kernels never need an
//! `Option` branch for missing keys.

/// Storage contract for byte-array values addressed by opaque binary keys.
///
/// Implementations must make each method atomic per key; cross-call
/// linearization (reader/writer exclusion, multi-key ordering) is the
/// caller's responsibility via the store's latch surface.
pub trait ByteArrayStore {
    /// Borrow the value for `key` for the duration of `f`.
    ///
    /// An absent key is presented as an empty slice; it is not created.
    fn with_bytes<R>(&self, key: &[u8], f: impl FnOnce(&[u8]) -> R) -> R;

    /// Borrow the value for `key` mutably for the duration of `f`, first
    /// ensuring it exists and is at least `grow_to` bytes long.
    ///
    /// Newly created bytes are zero. Shrinking never happens here.
    fn with_bytes_mut<R>(&self, key: &[u8], grow_to: usize, f: impl FnOnce(&mut Vec<u8>) -> R)
        -> R;

    /// Replace the whole value for `key`, creating it if absent.
    fn write_bytes(&self, key: &[u8], value: Vec<u8>);

    /// Copy the value out, if present.
    fn read_bytes(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Current value length in bytes (0 for absent keys).
    fn strlen(&self, key: &[u8]) -> usize;

    /// Whether the key currently holds a value.
    fn contains(&self, key: &[u8]) -> bool;

    /// Remove the value for `key`. Returns whether it existed.
    ///
    /// The engine itself never calls this during command execution; it is
    /// the hook for the external deletion collaborator.
    fn remove(&self, key: &[u8]) -> bool;
}
