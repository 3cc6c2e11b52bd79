//! Field-name hashing and the SHA-256 digest newtype.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash a record/variant field name to its 32-bit wire id.
///
/// `hash(name) = Σ utf8(name)[i] * 223^(len-1-i) mod 2^32`, computed
/// incrementally left-to-right. This id orders fields on the wire and lets
/// callers address a field without storing its name. The hash is not
/// collision-free; containers document how collisions resolve.
pub fn field_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |acc, byte| acc.wrapping_mul(223).wrapping_add(byte as u32))
}

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_hash_golden_values() {
        assert_eq!(field_hash(""), 0);
        assert_eq!(field_hash("a"), 97);
        assert_eq!(field_hash("Ok"), 17724);
        assert_eq!(field_hash("Err"), 3456837);
    }

    #[test]
    fn test_field_hash_is_incremental() {
        // acc*223 + byte, mod 2^32
        let manual = (field_hash("O") as u64 * 223 + b'k' as u64) as u32;
        assert_eq!(field_hash("Ok"), manual);
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            Sha256Hash::hash(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_roundtrip() {
        let digest = Sha256Hash::hash(b"canlink");
        let recovered = Sha256Hash::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, recovered);
    }
}
