//! 64-bit content hashes and the incremental combiner producing them.
//!
//! Arbor keys everything — extension types, file positions, source scopes,
//! subtree contents — by a compact 64-bit hash derived from BLAKE3. The
//! value zero is reserved to mean "no hash" ([`Hash64::NONE`]).

use serde::{Deserialize, Serialize};

/// A 64-bit content hash.
///
/// Derived from the first eight bytes of a BLAKE3 digest. `Hash64::NONE`
/// (zero) means "absent": a `type_hash` of NONE marks a node without an
/// extension, a `filepos_hash` of NONE marks a payload with no source
/// position.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Hash64(u64);

impl Hash64 {
    /// The absent hash.
    pub const NONE: Hash64 = Hash64(0);

    /// Wrap a raw 64-bit value.
    pub const fn from_u64(v: u64) -> Self {
        Hash64(v)
    }

    /// The raw 64-bit value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is the absent hash.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Hash a string, e.g. an extension type name or a type path.
    pub fn of_str(s: &str) -> Self {
        let mut h = ContentHasher::new();
        h.put_str(s);
        h.finish()
    }

    /// Hash a file path plus a byte offset, producing the reverse-lookup
    /// key for a declaration position.
    pub fn of_file_pos(file: &str, offset: u32) -> Self {
        let mut h = ContentHasher::new();
        h.put_str(file);
        h.put_u64(u64::from(offset));
        h.finish()
    }

    /// Short hex form for logs and summaries.
    pub fn short_hex(self) -> String {
        let bytes = self.0.to_be_bytes();
        hex::encode(&bytes[..4])
    }
}

impl std::fmt::Display for Hash64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0.to_be_bytes()))
    }
}

/// Incremental hash combiner.
///
/// Feeds length-prefixed fields into a BLAKE3 hasher so that adjacent
/// variable-length fields cannot collide by concatenation, and truncates
/// the digest to a [`Hash64`].
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    /// Create a fresh combiner.
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Feed a string field.
    pub fn put_str(&mut self, s: &str) -> &mut Self {
        self.put_u64(s.len() as u64);
        self.inner.update(s.as_bytes());
        self
    }

    /// Feed an unsigned integer field.
    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Feed a signed integer field.
    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.inner.update(&v.to_le_bytes());
        self
    }

    /// Feed a boolean field.
    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.inner.update(&[u8::from(v)]);
        self
    }

    /// Feed a previously computed hash.
    pub fn put_hash(&mut self, h: Hash64) -> &mut Self {
        self.put_u64(h.as_u64());
        self
    }

    /// Finalize into a [`Hash64`].
    pub fn finish(&self) -> Hash64 {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        Hash64(u64::from_le_bytes(bytes))
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_zero_and_absent() {
        assert_eq!(Hash64::NONE.as_u64(), 0);
        assert!(Hash64::NONE.is_none());
        assert!(!Hash64::from_u64(1).is_none());
    }

    #[test]
    fn of_str_is_deterministic_and_discriminating() {
        assert_eq!(Hash64::of_str("CacheEntry"), Hash64::of_str("CacheEntry"));
        assert_ne!(Hash64::of_str("CacheEntry"), Hash64::of_str("cacheentry"));
        assert!(!Hash64::of_str("").is_none());
    }

    #[test]
    fn file_pos_distinguishes_offset_and_file() {
        let a = Hash64::of_file_pos("src/a.cpp", 100);
        let b = Hash64::of_file_pos("src/a.cpp", 101);
        let c = Hash64::of_file_pos("src/b.cpp", 100);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn combiner_is_field_order_sensitive() {
        let mut h1 = ContentHasher::new();
        h1.put_str("ab").put_str("c");
        let mut h2 = ContentHasher::new();
        h2.put_str("a").put_str("bc");
        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn short_hex_is_eight_chars() {
        assert_eq!(Hash64::from_u64(0xdead_beef_0000_0000).short_hex(), "deadbeef");
    }

    #[test]
    fn serde_is_transparent() {
        let h = Hash64::from_u64(42);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "42");
        let back: Hash64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
