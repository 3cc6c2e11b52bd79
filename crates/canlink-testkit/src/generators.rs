//! Proptest generators for property-based testing.

use proptest::prelude::*;

use canlink_agent::RequestValue;
use canlink_candid::{Record, Value};
use canlink_core::{Principal, MAX_PRINCIPAL_LEN};
use num_bigint::{BigInt, BigUint};

/// Generate raw principal bytes within the length bound.
pub fn principal_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_PRINCIPAL_LEN)
}

/// Generate a principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    principal_bytes().prop_map(|bytes| Principal::from_slice(&bytes).expect("within length bound"))
}

/// Generate an arbitrary-width unsigned big integer from raw magnitude bytes.
pub fn big_uint() -> impl Strategy<Value = BigUint> {
    prop::collection::vec(any::<u8>(), 0..=16).prop_map(|bytes| BigUint::from_bytes_be(&bytes))
}

/// Generate a signed big integer, biased across the sign boundary.
pub fn big_int() -> impl Strategy<Value = BigInt> {
    (big_uint(), any::<bool>()).prop_map(|(magnitude, negative)| {
        let n = BigInt::from(magnitude);
        if negative {
            -n
        } else {
            n
        }
    })
}

/// Generate a plausible field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,15}"
}

/// Generate a scalar wire value.
///
/// Floats are excluded: NaN breaks equality-based round-trip assertions.
pub fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        big_uint().prop_map(Value::Nat),
        big_int().prop_map(Value::Int),
        any::<u8>().prop_map(Value::Nat8),
        any::<u16>().prop_map(Value::Nat16),
        any::<u32>().prop_map(Value::Nat32),
        any::<u64>().prop_map(Value::Nat64),
        any::<i8>().prop_map(Value::Int8),
        any::<i16>().prop_map(Value::Int16),
        any::<i32>().prop_map(Value::Int32),
        any::<i64>().prop_map(Value::Int64),
        ".{0,24}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..=24).prop_map(Value::Blob),
        Just(Value::Reserved),
    ]
}

/// Generate a wire value, nesting records and options up to two levels.
pub fn value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec((field_name(), inner.clone()), 0..4)
                .prop_map(|fields| Value::Record(Record::new(
                    fields.iter().map(|(name, value)| (name.as_str(), value.clone()))
                ))),
            inner.prop_map(|v| Value::Opt(canlink_candid::OptValue::some(v))),
        ]
    })
}

/// Generate a canonical-hash input tree: non-negative ints, ASCII keys.
pub fn request_value() -> impl Strategy<Value = RequestValue> {
    let leaf = prop_oneof![
        "[ -~]{0,16}".prop_map(RequestValue::Text),
        prop::collection::vec(any::<u8>(), 0..=16).prop_map(RequestValue::Bytes),
        big_uint().prop_map(|n| RequestValue::Int(BigInt::from(n))),
    ];
    leaf.prop_recursive(2, 12, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(RequestValue::Array),
            prop::collection::vec(("[a-z_]{1,12}", inner), 0..4).prop_map(RequestValue::Map),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlink_agent::representation_independent_hash;
    use canlink_candid::{decode_one, encode_one};
    use canlink_core::leb128;

    proptest! {
        #[test]
        fn test_principal_text_roundtrip(p in principal()) {
            let text = p.to_text();
            prop_assert_eq!(Principal::from_text(&text).unwrap(), p);
        }

        #[test]
        fn test_signed_leb_roundtrip(n in big_int()) {
            let mut buf = Vec::new();
            leb128::encode_signed(&n, &mut buf);
            let mut cursor = buf.as_slice();
            prop_assert_eq!(leb128::decode_signed(&mut cursor).unwrap(), n);
            prop_assert!(cursor.is_empty());
        }

        #[test]
        fn test_wire_roundtrip(v in value()) {
            let encoded = encode_one(&v).unwrap();
            prop_assert_eq!(decode_one(&encoded).unwrap(), v);
        }

        #[test]
        fn test_structural_hash_deterministic(v in request_value()) {
            let a = representation_independent_hash(&v);
            let b = representation_independent_hash(&v);
            prop_assert_eq!(a.unwrap(), b.unwrap());
        }

        #[test]
        fn test_structural_hash_map_order_independent(
            mut entries in prop::collection::vec(("[a-z_]{1,12}", big_uint()), 1..6)
        ) {
            let forward = RequestValue::Map(
                entries
                    .iter()
                    .map(|(k, n)| (k.clone(), RequestValue::Int(BigInt::from(n.clone()))))
                    .collect(),
            );
            entries.reverse();
            let backward = RequestValue::Map(
                entries
                    .iter()
                    .map(|(k, n)| (k.clone(), RequestValue::Int(BigInt::from(n.clone()))))
                    .collect(),
            );
            prop_assert_eq!(
                representation_independent_hash(&forward).unwrap(),
                representation_independent_hash(&backward).unwrap()
            );
        }
    }
}
