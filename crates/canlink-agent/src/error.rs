//! Error types for request hashing, envelopes, and polling.

use thiserror::Error;

use canlink_cert::CertError;

/// Errors from building, hashing, serializing, or polling a request.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The canonical structural hash has no encoding for negative integers.
    #[error("cannot hash negative integer {0}")]
    NegativeInteger(String),

    /// Map keys in the canonical hash must be ASCII.
    #[error("map key {0:?} is not ASCII")]
    NonAsciiKey(String),

    #[error("failed to serialize envelope: {0}")]
    Serialize(String),

    #[error("response is not valid CBOR: {0}")]
    InvalidResponse(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("unrecognized query response status {0:?}")]
    UnknownQueryStatus(String),

    #[error("signer failed: {0}")]
    Signer(String),

    #[error("envelope has no signature attached")]
    Unsigned,

    #[error("poll budget of {0} attempts exhausted")]
    PollBudgetExhausted(u32),

    #[error(transparent)]
    Cert(#[from] CertError),
}
