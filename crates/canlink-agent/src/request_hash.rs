//! Canonical structural hashing of request content.
//!
//! Request identifiers are derived from a representation-independent hash:
//! the same logical content always produces the same digest regardless of
//! map entry order. Scalars hash their canonical byte encoding, arrays hash
//! the concatenation of element hashes, and maps hash the sorted
//! concatenation of `hash(key) ‖ hash(value)` pairs.

use num_bigint::BigInt;
use num_traits::Signed;
use sha2::{Digest, Sha256};

use canlink_core::{leb128, Sha256Hash};

use crate::error::AgentError;

/// Domain separator prepended to a request id before signing.
const REQUEST_DOMAIN: &[u8] = b"ic-request";

/// An intermediate generic tree hashed into a request identifier.
///
/// This is deliberately not the typed wire `Value`: request content is a
/// plain map of scalars, byte strings, and nested arrays/maps, and the hash
/// has no case for negative integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestValue {
    Text(String),
    Bytes(Vec<u8>),
    Int(BigInt),
    Array(Vec<RequestValue>),
    Map(Vec<(String, RequestValue)>),
}

impl RequestValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(b.into())
    }

    pub fn nat(n: u64) -> Self {
        Self::Int(BigInt::from(n))
    }
}

/// Hash a value tree order-independently.
///
/// Map pair byte sequences are sorted by their full content, key hash and
/// value hash together, so ties between equal key hashes are still resolved
/// deterministically.
pub fn representation_independent_hash(value: &RequestValue) -> Result<Sha256Hash, AgentError> {
    match value {
        RequestValue::Text(text) => Ok(Sha256Hash::hash(text.as_bytes())),
        RequestValue::Bytes(bytes) => Ok(Sha256Hash::hash(bytes)),
        RequestValue::Int(int) => {
            if int.is_negative() {
                return Err(AgentError::NegativeInteger(int.to_string()));
            }
            let mut encoded = Vec::new();
            leb128::encode_unsigned(int.magnitude(), &mut encoded);
            Ok(Sha256Hash::hash(&encoded))
        }
        RequestValue::Array(elements) => {
            let mut concatenated = Vec::with_capacity(elements.len() * 32);
            for element in elements {
                concatenated.extend_from_slice(representation_independent_hash(element)?.as_bytes());
            }
            Ok(Sha256Hash::hash(&concatenated))
        }
        RequestValue::Map(entries) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                if !key.is_ascii() {
                    return Err(AgentError::NonAsciiKey(key.clone()));
                }
                let mut pair = Vec::with_capacity(64);
                pair.extend_from_slice(Sha256Hash::hash(key.as_bytes()).as_bytes());
                pair.extend_from_slice(representation_independent_hash(entry)?.as_bytes());
                pairs.push(pair);
            }
            pairs.sort();
            let mut concatenated = Vec::with_capacity(pairs.len() * 64);
            for pair in pairs {
                concatenated.extend_from_slice(&pair);
            }
            Ok(Sha256Hash::hash(&concatenated))
        }
    }
}

/// The request identifier: the structural hash of the content map.
pub fn request_id(content: &RequestValue) -> Result<Sha256Hash, AgentError> {
    representation_independent_hash(content)
}

/// The digest an external signer must sign for a given request id.
///
/// The domain name is length-prefixed with a single byte and prepended to the
/// request id before the final hash.
pub fn signable(request_id: &Sha256Hash) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update([REQUEST_DOMAIN.len() as u8]);
    hasher.update(REQUEST_DOMAIN);
    hasher.update(request_id.as_bytes());
    Sha256Hash::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_content(nonce: &[u8]) -> RequestValue {
        RequestValue::Map(vec![
            ("request_type".to_string(), RequestValue::text("call")),
            ("method_name".to_string(), RequestValue::text("transfer")),
            ("nonce".to_string(), RequestValue::bytes(nonce.to_vec())),
            ("ingress_expiry".to_string(), RequestValue::nat(1_700_000_000)),
        ])
    }

    #[test]
    fn test_scalar_hashes_match_their_byte_encodings() {
        assert_eq!(
            representation_independent_hash(&RequestValue::text("hi")).unwrap(),
            Sha256Hash::hash(b"hi")
        );
        assert_eq!(
            representation_independent_hash(&RequestValue::bytes(vec![1, 2, 3])).unwrap(),
            Sha256Hash::hash(&[1, 2, 3])
        );
        // 624485 ULEB-encodes to e5 8e 26.
        assert_eq!(
            representation_independent_hash(&RequestValue::nat(624485)).unwrap(),
            Sha256Hash::hash(&[0xe5, 0x8e, 0x26])
        );
    }

    #[test]
    fn test_map_hash_is_order_independent() {
        let forward = RequestValue::Map(vec![
            ("a".to_string(), RequestValue::nat(1)),
            ("b".to_string(), RequestValue::text("two")),
            ("c".to_string(), RequestValue::bytes(vec![3])),
        ]);
        let backward = RequestValue::Map(vec![
            ("c".to_string(), RequestValue::bytes(vec![3])),
            ("b".to_string(), RequestValue::text("two")),
            ("a".to_string(), RequestValue::nat(1)),
        ]);
        assert_eq!(
            representation_independent_hash(&forward).unwrap(),
            representation_independent_hash(&backward).unwrap()
        );
    }

    #[test]
    fn test_array_hash_is_order_sensitive() {
        let ab = RequestValue::Array(vec![RequestValue::nat(1), RequestValue::nat(2)]);
        let ba = RequestValue::Array(vec![RequestValue::nat(2), RequestValue::nat(1)]);
        assert_ne!(
            representation_independent_hash(&ab).unwrap(),
            representation_independent_hash(&ba).unwrap()
        );
    }

    #[test]
    fn test_negative_integer_is_rejected() {
        let value = RequestValue::Int(BigInt::from(-1));
        assert!(matches!(
            representation_independent_hash(&value),
            Err(AgentError::NegativeInteger(_))
        ));
        // Also rejected when buried inside a map.
        let nested = RequestValue::Map(vec![("n".to_string(), value)]);
        assert!(matches!(
            representation_independent_hash(&nested),
            Err(AgentError::NegativeInteger(_))
        ));
    }

    #[test]
    fn test_non_ascii_key_is_rejected() {
        let value = RequestValue::Map(vec![("clé".to_string(), RequestValue::nat(0))]);
        assert!(matches!(
            representation_independent_hash(&value),
            Err(AgentError::NonAsciiKey(_))
        ));
    }

    #[test]
    fn test_request_id_deterministic_and_nonce_sensitive() {
        let a = request_id(&transfer_content(b"nonce-1")).unwrap();
        let b = request_id(&transfer_content(b"nonce-1")).unwrap();
        let c = request_id(&transfer_content(b"nonce-2")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_signable_differs_from_request_id() {
        let id = request_id(&transfer_content(b"n")).unwrap();
        let sig_target = signable(&id);
        assert_ne!(sig_target, id);
        // Deterministic.
        assert_eq!(signable(&id), sig_target);
    }
}
