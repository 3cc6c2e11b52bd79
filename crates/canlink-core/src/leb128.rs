//! LEB128 variable-length integer codec.
//!
//! Unsigned and signed (two's-complement) little-endian base-128, operating on
//! arbitrary-precision integers so that `nat`/`int` values beyond 64 bits
//! encode correctly. Every higher layer uses this for lengths, indices, and
//! integer values.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::CoreError;

/// Encode an unsigned integer as ULEB128.
///
/// Emits the low 7 bits per byte, continuation bit set on all but the last.
pub fn encode_unsigned(value: &BigUint, buf: &mut Vec<u8>) {
    let mut n = value.clone();
    let mask = BigUint::from(0x7fu8);
    loop {
        let low = (&n & &mask).to_u8().expect("masked to 7 bits");
        n >>= 7u32;
        if n.is_zero() {
            buf.push(low);
            return;
        }
        buf.push(low | 0x80);
    }
}

/// Encode a signed integer as two's-complement SLEB128.
///
/// The right shift must round toward negative infinity (infinite-width
/// two's-complement semantics); `num-bigint`'s `Shr` does exactly that, so
/// `-129 >> 7 == -2`. The boundary cases around fixed-width edges are pinned
/// by tests below.
pub fn encode_signed(value: &BigInt, buf: &mut Vec<u8>) {
    let mut n = value.clone();
    let mask = BigInt::from(0x7f);
    let minus_one = -BigInt::one();
    loop {
        let low = (&n & &mask).to_u8().expect("masked to 7 bits");
        n >>= 7u32;
        let sign_bit = low & 0x40 != 0;
        let done = (n.is_zero() && !sign_bit) || (n == minus_one && sign_bit);
        if done {
            buf.push(low);
            return;
        }
        buf.push(low | 0x80);
    }
}

/// Encode a `u64` as ULEB128.
pub fn encode_u64(value: u64, buf: &mut Vec<u8>) {
    encode_unsigned(&BigUint::from(value), buf);
}

/// Encode an `i64` as SLEB128.
pub fn encode_i64(value: i64, buf: &mut Vec<u8>) {
    encode_signed(&BigInt::from(value), buf);
}

/// Decode an unsigned LEB128 integer, consuming bytes from the cursor.
///
/// Fails with [`CoreError::UnexpectedEof`] if the stream ends before a byte
/// with a clear continuation bit.
pub fn decode_unsigned(input: &mut &[u8]) -> Result<BigUint, CoreError> {
    let mut result = BigUint::zero();
    let mut shift = 0u64;
    loop {
        let (&byte, rest) = input.split_first().ok_or(CoreError::UnexpectedEof)?;
        *input = rest;
        result |= BigUint::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Decode a signed LEB128 integer, consuming bytes from the cursor.
///
/// Sign-extends by filling all higher bits when bit 6 of the final byte is
/// set, which for an arbitrary-precision value means subtracting `2^shift`.
pub fn decode_signed(input: &mut &[u8]) -> Result<BigInt, CoreError> {
    let mut magnitude = BigUint::zero();
    let mut shift = 0u64;
    loop {
        let (&byte, rest) = input.split_first().ok_or(CoreError::UnexpectedEof)?;
        *input = rest;
        magnitude |= BigUint::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            let mut result = BigInt::from_biguint(Sign::Plus, magnitude);
            if byte & 0x40 != 0 {
                result -= BigInt::one() << shift;
            }
            return Ok(result);
        }
    }
}

/// Decode an unsigned LEB128 value that must fit in a `u64`.
pub fn decode_u64(input: &mut &[u8]) -> Result<u64, CoreError> {
    decode_unsigned(input)?
        .to_u64()
        .ok_or(CoreError::IntegerOverflow("u64"))
}

/// Decode an unsigned LEB128 value that must fit in a `usize`.
///
/// Used for lengths and counts; overflow is a parse error, never a silent
/// truncation.
pub fn decode_usize(input: &mut &[u8]) -> Result<usize, CoreError> {
    decode_unsigned(input)?
        .to_usize()
        .ok_or(CoreError::IntegerOverflow("usize"))
}

/// Decode a signed LEB128 value that must fit in an `i64`.
pub fn decode_i64(input: &mut &[u8]) -> Result<i64, CoreError> {
    decode_signed(input)?
        .to_i64()
        .ok_or(CoreError::IntegerOverflow("i64"))
}

/// Decode a signed LEB128 value that must fit in an `i32`.
pub fn decode_i32(input: &mut &[u8]) -> Result<i32, CoreError> {
    decode_signed(input)?
        .to_i32()
        .ok_or(CoreError::IntegerOverflow("i32"))
}

/// Check a value is non-negative and encode its magnitude as ULEB128.
///
/// The canonical structural hash has no signed-integer case, so a negative
/// value here is the caller's bug, surfaced as an error rather than encoded.
pub fn encode_nonnegative(value: &BigInt, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    if value.is_negative() {
        return Err(CoreError::IntegerOverflow("unsigned magnitude"));
    }
    encode_unsigned(value.magnitude(), buf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unsigned_bytes(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_u64(value, &mut buf);
        buf
    }

    fn signed_bytes(value: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_i64(value, &mut buf);
        buf
    }

    #[test]
    fn test_unsigned_golden_bytes() {
        assert_eq!(unsigned_bytes(0), vec![0x00]);
        assert_eq!(unsigned_bytes(1), vec![0x01]);
        assert_eq!(unsigned_bytes(127), vec![0x7f]);
        assert_eq!(unsigned_bytes(128), vec![0x80, 0x01]);
        assert_eq!(unsigned_bytes(624485), vec![0xe5, 0x8e, 0x26]);
    }

    #[test]
    fn test_signed_golden_bytes() {
        assert_eq!(signed_bytes(0), vec![0x00]);
        assert_eq!(signed_bytes(-1), vec![0x7f]);
        assert_eq!(signed_bytes(63), vec![0x3f]);
        assert_eq!(signed_bytes(64), vec![0xc0, 0x00]);
        assert_eq!(signed_bytes(127), vec![0xff, 0x00]);
        assert_eq!(signed_bytes(-64), vec![0x40]);
        assert_eq!(signed_bytes(-65), vec![0xbf, 0x7f]);
        assert_eq!(signed_bytes(-123456), vec![0xc0, 0xbb, 0x78]);
    }

    #[test]
    fn test_signed_fixed_width_boundaries() {
        // The arbitrary-precision/fixed-width hazard cases: the shift in
        // encode_signed must behave like a two's-complement register.
        assert_eq!(signed_bytes(-128), vec![0x80, 0x7f]);
        assert_eq!(signed_bytes(-129), vec![0xff, 0x7e]);
        for v in [-129i64, -128, -1, 0, 127, 128] {
            let bytes = signed_bytes(v);
            let mut cursor = bytes.as_slice();
            assert_eq!(decode_i64(&mut cursor).unwrap(), v);
            assert!(cursor.is_empty());
        }
    }

    #[test]
    fn test_beyond_64_bit_roundtrip() {
        // 2^100 + 17 does not fit any primitive width.
        let value = (BigUint::one() << 100u32) + BigUint::from(17u8);
        let mut buf = Vec::new();
        encode_unsigned(&value, &mut buf);
        let mut cursor = buf.as_slice();
        assert_eq!(decode_unsigned(&mut cursor).unwrap(), value);

        let negative = -(BigInt::one() << 100u32) - BigInt::from(17u8);
        let mut buf = Vec::new();
        encode_signed(&negative, &mut buf);
        let mut cursor = buf.as_slice();
        assert_eq!(decode_signed(&mut cursor).unwrap(), negative);
    }

    #[test]
    fn test_truncated_input_is_an_error() {
        let mut buf = Vec::new();
        encode_u64(624485, &mut buf);
        buf.pop();
        let mut cursor = buf.as_slice();
        assert_eq!(decode_unsigned(&mut cursor), Err(CoreError::UnexpectedEof));

        let mut empty: &[u8] = &[];
        assert_eq!(decode_signed(&mut empty), Err(CoreError::UnexpectedEof));
    }

    #[test]
    fn test_overflow_is_an_error_not_a_truncation() {
        let value = BigUint::one() << 70u32;
        let mut buf = Vec::new();
        encode_unsigned(&value, &mut buf);
        let mut cursor = buf.as_slice();
        assert_eq!(
            decode_u64(&mut cursor),
            Err(CoreError::IntegerOverflow("u64"))
        );
    }

    #[test]
    fn test_nonnegative_rejects_negative() {
        let mut buf = Vec::new();
        assert!(encode_nonnegative(&BigInt::from(-1), &mut buf).is_err());
        assert!(encode_nonnegative(&BigInt::from(100), &mut buf).is_ok());
        assert_eq!(buf, vec![100]);
    }

    proptest! {
        #[test]
        fn test_unsigned_roundtrip(value: u64) {
            let bytes = unsigned_bytes(value);
            let mut cursor = bytes.as_slice();
            prop_assert_eq!(decode_u64(&mut cursor).unwrap(), value);
            prop_assert!(cursor.is_empty());
        }

        #[test]
        fn test_signed_roundtrip(value: i64) {
            let bytes = signed_bytes(value);
            let mut cursor = bytes.as_slice();
            prop_assert_eq!(decode_i64(&mut cursor).unwrap(), value);
            prop_assert!(cursor.is_empty());
        }

        #[test]
        fn test_big_unsigned_roundtrip(raw in proptest::collection::vec(any::<u8>(), 0..40)) {
            let value = BigUint::from_bytes_le(&raw);
            let mut buf = Vec::new();
            encode_unsigned(&value, &mut buf);
            let mut cursor = buf.as_slice();
            prop_assert_eq!(decode_unsigned(&mut cursor).unwrap(), value);
        }

        #[test]
        fn test_big_signed_roundtrip(raw in proptest::collection::vec(any::<u8>(), 1..40), negative: bool) {
            let magnitude = BigUint::from_bytes_le(&raw);
            let value = if negative {
                -BigInt::from_biguint(Sign::Plus, magnitude)
            } else {
                BigInt::from_biguint(Sign::Plus, magnitude)
            };
            let mut buf = Vec::new();
            encode_signed(&value, &mut buf);
            let mut cursor = buf.as_slice();
            prop_assert_eq!(decode_signed(&mut cursor).unwrap(), value);
        }
    }
}
