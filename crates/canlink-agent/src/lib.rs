//! # Canlink Agent
//!
//! Request construction, canonical hashing, the signing seam, and the call
//! lifecycle state machine.
//!
//! The flow mirrors how a call actually proceeds:
//!
//! 1. Build [`Content`] with a wire-encoded argument.
//! 2. Derive the request id with [`request_hash::request_id`] and the
//!    digest to sign with [`request_hash::signable`].
//! 3. Await an external [`Signer`] and assemble a signed [`Envelope`].
//! 4. Submit the envelope bytes over a caller-owned transport.
//! 5. Poll read-state, decode the certificate, and feed each
//!    [`RequestStatus`](canlink_cert::RequestStatus) into
//!    [`CallState::advance`] until a terminal state.
//!
//! Everything here is side-effect-free except the signer await; transports,
//! retries, and cancellation stay with the caller.

pub mod envelope;
pub mod error;
pub mod poll;
pub mod request_hash;

pub use envelope::{
    decode_read_state_response, CallContent, CallKind, Content, Envelope, QueryResponse,
    ReadStateContent, Signer,
};
pub use error::AgentError;
pub use poll::{CallEvent, CallState, PollBudget};
pub use request_hash::{representation_independent_hash, request_id, signable, RequestValue};
