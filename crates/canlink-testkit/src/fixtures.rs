//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a deterministic in-process
//! signer, call-content builders, and hand-built certificates for driving
//! the polling machinery without a network.

use async_trait::async_trait;
use ciborium::value::Value as Cbor;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};

use canlink_agent::{AgentError, CallContent, CallKind, Content, Signer};
use canlink_core::{wrap_der, Principal, Sha256Hash};

/// A deterministic signer for tests.
///
/// Signatures are keyed hashes rather than real asymmetric signatures; the
/// fixture exercises the signing seam, not a signature scheme.
pub struct SeedSigner {
    secret: [u8; 32],
    der_public_key: Vec<u8>,
}

impl SeedSigner {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let mut rng = StdRng::from_seed(seed);
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        // A plausible uncompressed EC point: marker byte plus 64 bytes.
        let mut point = vec![0x04];
        let mut coords = [0u8; 64];
        rng.fill_bytes(&mut coords);
        point.extend_from_slice(&coords);
        let der_public_key = wrap_der(&point).expect("65-byte point");
        Self {
            secret,
            der_public_key,
        }
    }

    /// The principal this signer authenticates as.
    pub fn principal(&self) -> Principal {
        Principal::self_authenticating(&self.der_public_key)
    }
}

#[async_trait]
impl Signer for SeedSigner {
    async fn sign(&self, message: &Sha256Hash) -> Result<Vec<u8>, AgentError> {
        let mut hasher = Sha256::new();
        hasher.update(self.secret);
        hasher.update(message.as_bytes());
        Ok(hasher.finalize().to_vec())
    }

    fn public_key(&self) -> Vec<u8> {
        self.der_public_key.clone()
    }
}

/// A test fixture with a deterministic signer and nonce source.
pub struct TestFixture {
    pub signer: SeedSigner,
    rng: StdRng,
}

impl TestFixture {
    /// Create with a fixed default seed.
    pub fn new() -> Self {
        Self::with_seed([0x42; 32])
    }

    /// Create with a deterministic seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let mut rng = StdRng::from_seed(seed);
        let mut signer_seed = [0u8; 32];
        rng.fill_bytes(&mut signer_seed);
        Self {
            signer: SeedSigner::from_seed(signer_seed),
            rng,
        }
    }

    /// A fresh nonce from the fixture's generator.
    pub fn nonce(&mut self) -> Vec<u8> {
        let mut nonce = vec![0u8; 16];
        self.rng.fill_bytes(&mut nonce);
        nonce
    }

    /// Build call content addressed from this fixture's principal.
    pub fn make_call(
        &mut self,
        canister_id: Principal,
        method_name: &str,
        arg: Vec<u8>,
    ) -> Content {
        Content::Call(CallContent {
            kind: CallKind::Call,
            sender: self.signer.principal(),
            nonce: self.nonce(),
            ingress_expiry: 1_756_000_000_000_000_000,
            method_name: method_name.to_string(),
            canister_id,
            arg,
        })
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn leaf(bytes: &[u8]) -> Cbor {
    Cbor::Array(vec![Cbor::Integer(3.into()), Cbor::Bytes(bytes.to_vec())])
}

fn labeled(label: &[u8], child: Cbor) -> Cbor {
    Cbor::Array(vec![
        Cbor::Integer(2.into()),
        Cbor::Bytes(label.to_vec()),
        child,
    ])
}

fn fork(left: Cbor, right: Cbor) -> Cbor {
    Cbor::Array(vec![Cbor::Integer(1.into()), left, right])
}

fn certificate_bytes(tree: Cbor) -> Vec<u8> {
    let certificate = Cbor::Map(vec![
        (Cbor::Text("tree".to_string()), tree),
        (
            Cbor::Text("signature".to_string()),
            Cbor::Bytes(vec![0x99; 48]),
        ),
    ]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&certificate, &mut bytes).expect("in-memory write");
    bytes
}

/// Certificate bytes proving a request replied with the given argument.
pub fn replied_certificate(request_id: &Sha256Hash, reply_arg: &[u8]) -> Vec<u8> {
    certificate_bytes(labeled(
        b"request_status",
        labeled(
            request_id.as_bytes(),
            fork(
                labeled(b"reply", leaf(reply_arg)),
                labeled(b"status", leaf(b"replied")),
            ),
        ),
    ))
}

/// Certificate bytes carrying an arbitrary status string for a request.
pub fn status_certificate(request_id: &Sha256Hash, status: &[u8]) -> Vec<u8> {
    certificate_bytes(labeled(
        b"request_status",
        labeled(request_id.as_bytes(), labeled(b"status", leaf(status))),
    ))
}

/// A read-state response wrapping the given certificate bytes.
pub fn read_state_response(certificate: Vec<u8>) -> Vec<u8> {
    let response = Cbor::Map(vec![(
        Cbor::Text("certificate".to_string()),
        Cbor::Bytes(certificate),
    )]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&response, &mut bytes).expect("in-memory write");
    bytes
}
