//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the byte-level behavior of the varint codec, the
//! canonical text format, the wire codec, and the request-id derivation so
//! that independent implementations can cross-check each other.

use num_bigint::BigInt;

use canlink_agent::RequestValue;
use canlink_core::Sha256Hash;

/// An unsigned varint vector.
#[derive(Debug, Clone)]
pub struct UnsignedLebVector {
    pub value: u64,
    pub encoded: &'static [u8],
}

/// A signed varint vector.
#[derive(Debug, Clone)]
pub struct SignedLebVector {
    pub value: i64,
    pub encoded: &'static [u8],
}

pub fn unsigned_leb_vectors() -> Vec<UnsignedLebVector> {
    vec![
        UnsignedLebVector { value: 0, encoded: &[0x00] },
        UnsignedLebVector { value: 1, encoded: &[0x01] },
        UnsignedLebVector { value: 127, encoded: &[0x7f] },
        UnsignedLebVector { value: 128, encoded: &[0x80, 0x01] },
        UnsignedLebVector { value: 624_485, encoded: &[0xe5, 0x8e, 0x26] },
    ]
}

pub fn signed_leb_vectors() -> Vec<SignedLebVector> {
    vec![
        SignedLebVector { value: 0, encoded: &[0x00] },
        SignedLebVector { value: -1, encoded: &[0x7f] },
        SignedLebVector { value: 63, encoded: &[0x3f] },
        // 64 sets the sign bit of its low group, forcing a second byte.
        SignedLebVector { value: 64, encoded: &[0xc0, 0x00] },
        SignedLebVector { value: 127, encoded: &[0xff, 0x00] },
        SignedLebVector { value: -128, encoded: &[0x80, 0x7f] },
        SignedLebVector { value: -129, encoded: &[0xff, 0x7e] },
        SignedLebVector { value: -123_456, encoded: &[0xc0, 0xbb, 0x78] },
    ]
}

/// A canonical-text principal vector.
#[derive(Debug, Clone)]
pub struct PrincipalVector {
    pub name: &'static str,
    pub bytes: &'static [u8],
    pub text: &'static str,
}

pub fn principal_vectors() -> Vec<PrincipalVector> {
    vec![
        PrincipalVector {
            name: "management (empty)",
            bytes: &[],
            text: "aaaaa-aa",
        },
        PrincipalVector {
            name: "anonymous",
            bytes: &[0x04],
            text: "2vxsx-fae",
        },
        PrincipalVector {
            name: "canister 7",
            bytes: &[0, 0, 0, 0, 0, 0, 0, 7, 0x01],
            text: "3zh3f-7yaaa-aaaaa-aaadq-c",
        },
    ]
}

/// A wire-encoding vector: argument list, expected bytes as hex.
#[derive(Debug, Clone)]
pub struct WireVector {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Known encodings checked against [`canlink_candid::encode_args`].
pub fn wire_vectors() -> Vec<WireVector> {
    vec![
        WireVector {
            name: "empty argument list",
            hex: "4449444c0000",
        },
        WireVector {
            name: "single nat64 100",
            hex: "4449444c0001786400000000000000",
        },
    ]
}

/// Field-name hashes pinned to the canonical multiplier-223 fold.
pub fn field_hash_vectors() -> Vec<(&'static str, u32)> {
    vec![
        ("", 0),
        ("a", 97),
        ("Ok", 17724),
        ("Err", 3456837),
        ("to", 25979),
        ("amount", 3573748184),
        ("method_name", 2374371241),
    ]
}

/// Root digest of the empty hash tree.
pub const EMPTY_TREE_DIGEST_HEX: &str =
    "4e3ed35c4e2d1ee89996483fb6260a64cffb6c47dbab216e7930e82f8190d120";

/// Root digest of `fork(labeled("a", leaf("X")), labeled("b", leaf("Y")))`.
pub const TWO_LEAF_TREE_DIGEST_HEX: &str =
    "fd986d3ee9d811cfe613efb45cc8bb1479c2a83b72429d70deff35f7c131b0d3";

/// The request content behind [`REFERENCE_REQUEST_ID_HEX`].
pub fn reference_call_content() -> RequestValue {
    RequestValue::Map(vec![
        ("request_type".to_string(), RequestValue::text("call")),
        ("sender".to_string(), RequestValue::bytes(vec![0x04])),
        (
            "ingress_expiry".to_string(),
            RequestValue::Int(BigInt::from(1_685_570_400_000_000_000u64)),
        ),
        (
            "canister_id".to_string(),
            RequestValue::bytes(vec![0, 0, 0, 0, 0, 0, 0x04, 0xD2]),
        ),
        ("method_name".to_string(), RequestValue::text("hello")),
        (
            "arg".to_string(),
            RequestValue::bytes(b"DIDL\x00\xfd*".to_vec()),
        ),
    ])
}

/// Request id of [`reference_call_content`].
pub const REFERENCE_REQUEST_ID_HEX: &str =
    "1d1091364d6bb8a6c16b203ee75467d59ead468f523eb058880ae8ec80e2b101";

/// Signable digest derived from [`REFERENCE_REQUEST_ID_HEX`].
pub const REFERENCE_SIGNABLE_HEX: &str =
    "665a087ac52a553b948eb5d4b0e78eb865050cd5c1dc647a5dcf93778a8c4a88";

/// Parse a pinned hex digest.
pub fn digest_from_hex(hex_digest: &str) -> Sha256Hash {
    Sha256Hash::from_hex(hex_digest).expect("vector digest is valid hex")
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlink_agent::{request_id, signable};
    use canlink_candid::{encode_args, encode_one, Value};
    use canlink_core::{field_hash, leb128, Principal};

    #[test]
    fn test_unsigned_leb_vectors() {
        for vector in unsigned_leb_vectors() {
            let mut buf = Vec::new();
            leb128::encode_u64(vector.value, &mut buf);
            assert_eq!(buf, vector.encoded, "encoding {}", vector.value);
            let mut cursor = vector.encoded;
            assert_eq!(leb128::decode_u64(&mut cursor).unwrap(), vector.value);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_signed_leb_vectors() {
        for vector in signed_leb_vectors() {
            let mut buf = Vec::new();
            leb128::encode_i64(vector.value, &mut buf);
            assert_eq!(buf, vector.encoded, "encoding {}", vector.value);
            let mut cursor = vector.encoded;
            assert_eq!(leb128::decode_i64(&mut cursor).unwrap(), vector.value);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_principal_vectors() {
        for vector in principal_vectors() {
            let principal = Principal::from_slice(vector.bytes).unwrap();
            assert_eq!(principal.to_text(), vector.text, "{}", vector.name);
            assert_eq!(
                Principal::from_text(vector.text).unwrap(),
                principal,
                "{}",
                vector.name
            );
        }
    }

    #[test]
    fn test_wire_vectors() {
        assert_eq!(hex::encode(encode_args(&[]).unwrap()), wire_vectors()[0].hex);
        assert_eq!(
            hex::encode(encode_one(&Value::Nat64(100)).unwrap()),
            wire_vectors()[1].hex
        );
    }

    #[test]
    fn test_field_hash_vectors() {
        for (name, expected) in field_hash_vectors() {
            assert_eq!(field_hash(name), expected, "hashing {name:?}");
        }
    }

    #[test]
    fn test_tree_digest_vectors() {
        use canlink_cert::HashTree;

        assert_eq!(
            HashTree::Empty.digest(),
            digest_from_hex(EMPTY_TREE_DIGEST_HEX)
        );
        let tree = HashTree::Fork(
            Box::new(HashTree::Labeled(
                b"a".to_vec(),
                Box::new(HashTree::Leaf(b"X".to_vec())),
            )),
            Box::new(HashTree::Labeled(
                b"b".to_vec(),
                Box::new(HashTree::Leaf(b"Y".to_vec())),
            )),
        );
        assert_eq!(tree.digest(), digest_from_hex(TWO_LEAF_TREE_DIGEST_HEX));
    }

    #[test]
    fn test_reference_request_id() {
        let id = request_id(&reference_call_content()).unwrap();
        assert_eq!(id, digest_from_hex(REFERENCE_REQUEST_ID_HEX));
        assert_eq!(signable(&id), digest_from_hex(REFERENCE_SIGNABLE_HEX));
    }
}
