//! # Canlink Cert
//!
//! Certificate decoding and authenticated-datastructure lookups.
//!
//! A certificate is a CBOR map `{tree, signature}` where `tree` is a binary
//! Merkle hash tree with labeled edges and the signature covers the tree's
//! root hash. This crate parses the tree, computes root hashes with the
//! domain-separated leaf/node hashing scheme, and resolves lookups with a
//! three-way outcome: [`Lookup::Found`], [`Lookup::Absent`], or
//! [`Lookup::Unknown`] when pruning withheld the evidence.
//!
//! [`Certificate::request_status`] layers the request-status state machine on
//! top of raw lookups.

pub mod certificate;
pub mod error;
pub mod tree;

pub use certificate::{Certificate, RejectCode, RequestStatus};
pub use error::CertError;
pub use tree::{HashTree, Label, Lookup, SubtreeLookup};
