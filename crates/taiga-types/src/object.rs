use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is a 32-byte BLAKE3 digest of an object's canonical byte
/// serialisation. Identical bytes always produce the same `ObjectId`, which
/// is what makes the object stores append-only and deduplicating: re-adding
/// a value is a no-op that returns the existing key.
///
/// Ordering is byte-lexicographic on the digest; every enumeration of
/// hashes in taiga (node entries, parents, LCA sets) sorts in this order so
/// that results are deterministic across runs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Wrap a pre-computed BLAKE3 digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// Hash raw bytes directly, without domain separation.
    ///
    /// Object keys are normally derived through [`ContentHasher`], which
    /// prepends a per-kind domain tag; this constructor is for tests and
    /// low-level tooling.
    ///
    /// [`ContentHasher`]: crate::hash::ContentHasher
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Abbreviated hex (first 8 characters), for logs and Debug output.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for ObjectId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; 32] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_bytes_is_deterministic() {
        let id1 = ObjectId::of_bytes(b"hello world");
        let id2 = ObjectId::of_bytes(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(ObjectId::of_bytes(b"hello"), ObjectId::of_bytes(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let id = ObjectId::of_bytes(b"roundtrip");
        let parsed = ObjectId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_length() {
        let err = ObjectId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { .. }));
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = ObjectId::from_hex("zz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(ObjectId::of_bytes(b"x").short_hex().len(), 8);
    }

    #[test]
    fn ordering_is_byte_lexicographic() {
        let lo = ObjectId::from_hash([0; 32]);
        let hi = ObjectId::from_hash([1; 32]);
        assert!(lo < hi);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ObjectId::of_bytes(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}
