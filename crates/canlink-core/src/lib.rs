//! # Canlink Core
//!
//! Leaf primitives for the Canlink wire-protocol stack.
//!
//! This crate contains no I/O and no networking. It is pure computation:
//!
//! - [`leb128`] - unsigned/signed LEB128 varint codec over big integers
//! - [`field_hash`] - the 32-bit field-name hash that orders record fields
//! - [`Sha256Hash`] - digest newtype used by every hashing layer above
//! - [`Principal`] - opaque actor id with checksummed canonical text

pub mod error;
pub mod hash;
pub mod leb128;
pub mod principal;

pub use error::CoreError;
pub use hash::{field_hash, Sha256Hash};
pub use principal::{wrap_der, Principal, MAX_PRINCIPAL_LEN};
