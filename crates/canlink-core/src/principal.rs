//! Principals and their canonical text rendering.
//!
//! A principal is an opaque byte sequence identifying an actor on the
//! network. The human-readable form is a CRC32 checksum prepended to the raw
//! bytes, base-32 encoded, lowercased, padding stripped, and grouped into
//! 5-character chunks joined by `-`. Decoding is checksum-validated and fails
//! closed on any tampering.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224};
use std::fmt;

use crate::error::CoreError;

/// Maximum length of a principal's raw bytes.
pub const MAX_PRINCIPAL_LEN: usize = 29;

/// Suffix byte marking a self-authenticating principal.
const SELF_AUTHENTICATING_SUFFIX: u8 = 0x02;

/// The single-byte anonymous principal.
const ANONYMOUS_BYTES: [u8; 1] = [0x04];

/// An opaque actor identifier with a checksummed canonical text form.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Principal(Vec<u8>);

impl Principal {
    /// Create a principal from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() > MAX_PRINCIPAL_LEN {
            return Err(CoreError::PrincipalTooLong(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }

    /// The management principal (empty byte sequence, renders as `aaaaa-aa`).
    pub const fn management() -> Self {
        Self(Vec::new())
    }

    /// The anonymous principal.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_BYTES.to_vec())
    }

    /// Derive a self-authenticating principal from a DER-encoded public key.
    ///
    /// SHA-224 of the DER bytes with a marker suffix, 29 bytes total.
    pub fn self_authenticating(der_public_key: &[u8]) -> Self {
        let mut hasher = Sha224::new();
        hasher.update(der_public_key);
        let mut bytes: Vec<u8> = hasher.finalize().to_vec();
        bytes.push(SELF_AUTHENTICATING_SUFFIX);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Render the canonical text form.
    pub fn to_text(&self) -> String {
        let mut data = crc32(&self.0).to_be_bytes().to_vec();
        data.extend_from_slice(&self.0);
        let encoded = base32_encode(&data);
        let grouped: Vec<&str> = encoded
            .as_bytes()
            .chunks(5)
            .map(|chunk| std::str::from_utf8(chunk).expect("base32 output is ASCII"))
            .collect();
        grouped.join("-")
    }

    /// Parse the canonical text form, validating the checksum.
    ///
    /// Fails closed: a tampered character either breaks the base-32 decode,
    /// the checksum, or the canonical re-encoding check.
    pub fn from_text(text: &str) -> Result<Self, CoreError> {
        let compact: String = text.chars().filter(|c| *c != '-').collect();
        let data = base32_decode(&compact)?;
        if data.len() < 4 {
            return Err(CoreError::MalformedText(
                "too short for a checksum".to_string(),
            ));
        }
        let (checksum, bytes) = data.split_at(4);
        if checksum != crc32(bytes).to_be_bytes() {
            return Err(CoreError::ChecksumMismatch);
        }
        let principal = Self::from_slice(bytes)?;
        // Grouping, case, and trailing-bit canonicality all reduce to one
        // check: the text must round-trip exactly.
        if principal.to_text() != text {
            return Err(CoreError::MalformedText(
                "not in canonical form".to_string(),
            ));
        }
        Ok(principal)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.to_text())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl AsRef<[u8]> for Principal {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Wrap a raw 65-byte uncompressed secp256k1 public key in minimal DER.
///
/// SEQUENCE { SEQUENCE { OID ecPublicKey, OID secp256k1 }, BIT STRING key }.
/// Rejects anything that is not exactly 65 bytes starting with the `0x04`
/// uncompressed-point marker.
pub fn wrap_der(public_key: &[u8]) -> Result<Vec<u8>, CoreError> {
    if public_key.len() != 65 {
        return Err(CoreError::InvalidPublicKey(format!(
            "expected 65 bytes, got {}",
            public_key.len()
        )));
    }
    if public_key[0] != 0x04 {
        return Err(CoreError::InvalidPublicKey(
            "missing uncompressed-point marker 0x04".to_string(),
        ));
    }

    // OID 1.2.840.10045.2.1 (ecPublicKey)
    const EC_PUBLIC_KEY_OID: [u8; 9] = [0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
    // OID 1.3.132.0.10 (secp256k1)
    const SECP256K1_OID: [u8; 7] = [0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a];

    let mut der = Vec::with_capacity(88);
    der.extend_from_slice(&[0x30, 0x56]); // outer SEQUENCE, 86 bytes
    der.extend_from_slice(&[0x30, 0x10]); // algorithm SEQUENCE, 16 bytes
    der.extend_from_slice(&EC_PUBLIC_KEY_OID);
    der.extend_from_slice(&SECP256K1_OID);
    der.extend_from_slice(&[0x03, 0x42, 0x00]); // BIT STRING, 66 bytes, 0 unused bits
    der.extend_from_slice(public_key);
    Ok(der)
}

/// CRC32 (IEEE 802.3, reflected) over the given bytes.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// RFC 4648 base-32, lowercase, no padding emitted.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut acc = 0u32;
    let mut bits = 0u32;
    for &byte in data {
        acc = (acc << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((acc >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((acc << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// RFC 4648 base-32 decode, tolerating absent padding.
fn base32_decode(text: &str) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut acc = 0u32;
    let mut bits = 0u32;
    for c in text.chars() {
        if c == '=' {
            break;
        }
        let value = match c {
            'a'..='z' => c as u32 - 'a' as u32,
            '2'..='7' => c as u32 - '2' as u32 + 26,
            _ => return Err(CoreError::InvalidBase32(c)),
        };
        acc = (acc << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Ok(out)
}
