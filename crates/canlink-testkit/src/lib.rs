//! # Canlink Testkit
//!
//! Testing utilities for the Canlink workspace.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: pinned byte-level encodings and digests for
//!   cross-implementation verification
//! - **Generators**: proptest strategies for property-based testing
//! - **Fixtures**: a deterministic in-process signer and certificate
//!   builders for exercising the call lifecycle without a network
//!
//! ## Golden Vectors
//!
//! ```rust
//! use canlink_testkit::vectors::principal_vectors;
//!
//! for vector in principal_vectors() {
//!     println!("{}: {}", vector.name, vector.text);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use canlink_testkit::generators::value;
//!
//! proptest! {
//!     #[test]
//!     fn roundtrips(v in value()) {
//!         let bytes = canlink_candid::encode_one(&v).unwrap();
//!         prop_assert_eq!(canlink_candid::decode_one(&bytes).unwrap(), v);
//!     }
//! }
//! ```
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use canlink_testkit::fixtures::TestFixture;
//!
//! let mut fixture = TestFixture::new();
//! let content = fixture.make_call(canister, "transfer", arg_bytes);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{SeedSigner, TestFixture};
