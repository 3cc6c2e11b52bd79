//! Error types for Canlink core primitives.

use thiserror::Error;

/// Errors from the leaf codecs: LEB128 and canonical text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("decoded value does not fit in {0}")]
    IntegerOverflow(&'static str),

    #[error("checksum mismatch in canonical text")]
    ChecksumMismatch,

    #[error("invalid base32 character {0:?}")]
    InvalidBase32(char),

    #[error("malformed canonical text: {0}")]
    MalformedText(String),

    #[error("principal too long: {0} bytes (max 29)")]
    PrincipalTooLong(usize),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}
