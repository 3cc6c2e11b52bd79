//! # Canlink Candid
//!
//! The self-describing typed value model and its binary wire codec.
//!
//! ## Key Types
//!
//! - [`Value`] - one decoded or encodable datum, a closed recursive enum
//! - [`Type`] - mirrors `Value` one level up, drives the wire type table
//! - [`Record`] - field dictionary sorted by hashed name id
//! - [`VariantValue`] - declared alternatives plus one selected value
//! - [`Sequence`] / [`OptValue`] - homogeneous containers with a declared
//!   element type
//!
//! ## Wire format
//!
//! [`encode_args`] / [`decode_args`] implement the `DIDL` format: magic,
//! type table, argument types, argument values. Field order on the wire is
//! always ascending hashed id; that canonical order is what interop hashes
//! are computed over.

pub mod codec;
pub mod error;
pub mod types;
pub mod value;

pub use codec::{decode_args, decode_one, encode_args, encode_one};
pub use error::CandidError;
pub use types::{FieldType, FuncAnnotation, FuncType, Type};
pub use value::{FuncRef, FuncTarget, OptValue, Record, Sequence, ServiceRef, Value, VariantValue};
