//! Error types for certificate parsing and status extraction.

use thiserror::Error;

/// Errors from decoding a certificate or interpreting its hash tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CertError {
    #[error("certificate is not valid CBOR: {0}")]
    InvalidCbor(String),

    #[error("unexpected certificate shape: {0}")]
    UnexpectedShape(String),

    #[error("unknown hash tree node tag {0}")]
    InvalidNodeTag(i128),

    #[error("hash tree node tag {tag} expects arity {expected}, found {actual}")]
    WrongArity {
        tag: u8,
        expected: usize,
        actual: usize,
    },

    #[error("pruned hash is not 32 bytes")]
    InvalidPrunedHash,

    #[error("required path missing from certificate: {0}")]
    MissingPath(String),

    #[error("invalid reject code {0}")]
    InvalidRejectCode(u64),

    #[error("unrecognized request status {0:?}")]
    InvalidStatus(String),

    #[error("malformed leaf value at {0}")]
    MalformedLeaf(String),
}
