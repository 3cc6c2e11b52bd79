//! Request envelopes and the signing seam.
//!
//! An envelope wraps request content with an optional public key and
//! signature. Building one is a two-phase handshake with an external signer:
//! the content's request id and signable digest are computed first, the
//! signer (possibly a hardware device, possibly suspended indefinitely)
//! produces a signature over the digest, and the signed envelope is then
//! serialized for transport. The transport itself stays outside this crate.

use async_trait::async_trait;
use ciborium::value::Value as Cbor;

use canlink_core::{Principal, Sha256Hash};
use canlink_cert::Certificate;

use crate::error::AgentError;
use crate::request_hash::{self, RequestValue};

/// CBOR self-describing tag wrapped around outgoing envelopes.
const SELF_DESCRIBED_CBOR: u64 = 55799;

/// Whether a call mutates state or is a read-only query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Query,
}

impl CallKind {
    fn request_type(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Query => "query",
        }
    }
}

/// Content of a call or query request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContent {
    pub kind: CallKind,
    pub sender: Principal,
    pub nonce: Vec<u8>,
    /// Absolute expiry, nanoseconds since the epoch.
    pub ingress_expiry: u64,
    pub method_name: String,
    pub canister_id: Principal,
    /// Argument bytes, already wire-encoded.
    pub arg: Vec<u8>,
}

/// Content of a read-state request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStateContent {
    pub sender: Principal,
    pub nonce: Vec<u8>,
    pub ingress_expiry: u64,
    /// Paths into the certified state tree, each a list of labels.
    pub paths: Vec<Vec<Vec<u8>>>,
}

/// Request content, the hashed and signed portion of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Call(CallContent),
    ReadState(ReadStateContent),
}

impl Content {
    /// The generic value tree the request id is computed over.
    pub fn to_request_value(&self) -> RequestValue {
        match self {
            Content::Call(call) => RequestValue::Map(vec![
                (
                    "request_type".to_string(),
                    RequestValue::text(call.kind.request_type()),
                ),
                (
                    "sender".to_string(),
                    RequestValue::bytes(call.sender.as_slice().to_vec()),
                ),
                ("nonce".to_string(), RequestValue::bytes(call.nonce.clone())),
                (
                    "ingress_expiry".to_string(),
                    RequestValue::nat(call.ingress_expiry),
                ),
                (
                    "method_name".to_string(),
                    RequestValue::text(call.method_name.clone()),
                ),
                (
                    "canister_id".to_string(),
                    RequestValue::bytes(call.canister_id.as_slice().to_vec()),
                ),
                ("arg".to_string(), RequestValue::bytes(call.arg.clone())),
            ]),
            Content::ReadState(read) => RequestValue::Map(vec![
                (
                    "request_type".to_string(),
                    RequestValue::text("read_state"),
                ),
                (
                    "sender".to_string(),
                    RequestValue::bytes(read.sender.as_slice().to_vec()),
                ),
                ("nonce".to_string(), RequestValue::bytes(read.nonce.clone())),
                (
                    "ingress_expiry".to_string(),
                    RequestValue::nat(read.ingress_expiry),
                ),
                (
                    "paths".to_string(),
                    RequestValue::Array(
                        read.paths
                            .iter()
                            .map(|path| {
                                RequestValue::Array(
                                    path.iter()
                                        .map(|label| RequestValue::bytes(label.clone()))
                                        .collect(),
                                )
                            })
                            .collect(),
                    ),
                ),
            ]),
        }
    }

    /// The request identifier for this content.
    pub fn request_id(&self) -> Result<Sha256Hash, AgentError> {
        request_hash::request_id(&self.to_request_value())
    }

    /// The digest an external signer must sign.
    pub fn signable(&self) -> Result<Sha256Hash, AgentError> {
        Ok(request_hash::signable(&self.request_id()?))
    }

    fn to_cbor(&self) -> Cbor {
        match self {
            Content::Call(call) => Cbor::Map(vec![
                text_key("request_type", Cbor::Text(call.kind.request_type().to_string())),
                text_key("sender", Cbor::Bytes(call.sender.as_slice().to_vec())),
                text_key("nonce", Cbor::Bytes(call.nonce.clone())),
                text_key(
                    "ingress_expiry",
                    Cbor::Integer(call.ingress_expiry.into()),
                ),
                text_key("method_name", Cbor::Text(call.method_name.clone())),
                text_key(
                    "canister_id",
                    Cbor::Bytes(call.canister_id.as_slice().to_vec()),
                ),
                text_key("arg", Cbor::Bytes(call.arg.clone())),
            ]),
            Content::ReadState(read) => Cbor::Map(vec![
                text_key("request_type", Cbor::Text("read_state".to_string())),
                text_key("sender", Cbor::Bytes(read.sender.as_slice().to_vec())),
                text_key("nonce", Cbor::Bytes(read.nonce.clone())),
                text_key("ingress_expiry", Cbor::Integer(read.ingress_expiry.into())),
                text_key(
                    "paths",
                    Cbor::Array(
                        read.paths
                            .iter()
                            .map(|path| {
                                Cbor::Array(
                                    path.iter()
                                        .map(|label| Cbor::Bytes(label.clone()))
                                        .collect(),
                                )
                            })
                            .collect(),
                    ),
                ),
            ]),
        }
    }
}

fn text_key(key: &str, value: Cbor) -> (Cbor, Cbor) {
    (Cbor::Text(key.to_string()), value)
}

/// Produces signatures over signable digests.
///
/// Implementations may talk to a hardware device and suspend for as long as
/// they like; the envelope builder awaits them.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign the 32-byte digest, returning the raw signature bytes.
    async fn sign(&self, message: &Sha256Hash) -> Result<Vec<u8>, AgentError>;

    /// The DER-encoded public key matching the signatures.
    fn public_key(&self) -> Vec<u8>;
}

/// A request envelope, unsigned or signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub content: Content,
    pub sender_pubkey: Option<Vec<u8>>,
    pub sender_sig: Option<Vec<u8>>,
}

impl Envelope {
    /// Wrap content with no signature attached.
    pub fn unsigned(content: Content) -> Self {
        Self {
            content,
            sender_pubkey: None,
            sender_sig: None,
        }
    }

    /// Compute the signable digest, await the signer, and attach the result.
    pub async fn sign_with(content: Content, signer: &dyn Signer) -> Result<Self, AgentError> {
        let digest = content.signable()?;
        let signature = signer.sign(&digest).await?;
        Ok(Self {
            content,
            sender_pubkey: Some(signer.public_key()),
            sender_sig: Some(signature),
        })
    }

    /// Attach an externally produced signature and public key.
    pub fn with_signature(mut self, public_key: Vec<u8>, signature: Vec<u8>) -> Self {
        self.sender_pubkey = Some(public_key);
        self.sender_sig = Some(signature);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.sender_sig.is_some()
    }

    /// Serialize for transport, wrapped in the self-describing tag.
    ///
    /// Anonymous requests may omit the signature; requests from a
    /// self-authenticating sender must attach one first.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AgentError> {
        let mut entries = vec![text_key("content", self.content.to_cbor())];
        if let Some(pubkey) = &self.sender_pubkey {
            entries.push(text_key("sender_pubkey", Cbor::Bytes(pubkey.clone())));
        }
        if let Some(sig) = &self.sender_sig {
            entries.push(text_key("sender_sig", Cbor::Bytes(sig.clone())));
        }
        let tagged = Cbor::Tag(SELF_DESCRIBED_CBOR, Box::new(Cbor::Map(entries)));
        let mut bytes = Vec::new();
        ciborium::into_writer(&tagged, &mut bytes)
            .map_err(|e| AgentError::Serialize(e.to_string()))?;
        Ok(bytes)
    }
}

/// A decoded query response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResponse {
    /// The query completed; carries the encoded reply argument.
    Replied(Vec<u8>),
    /// The query was rejected with an optional human-readable message.
    Rejected { message: Option<String> },
}

impl QueryResponse {
    /// Decode a query response map `{status, reply?, reject_message?}`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AgentError> {
        let value: Cbor = ciborium::from_reader(bytes)
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        let map = as_map(&value, "query response")?;
        let status = match map_get(map, "status") {
            Some(Cbor::Text(status)) => status.as_str(),
            _ => {
                return Err(AgentError::UnexpectedResponse(
                    "query response missing status".to_string(),
                ))
            }
        };
        match status {
            "replied" => {
                let reply = map_get(map, "reply").ok_or_else(|| {
                    AgentError::UnexpectedResponse("replied response missing reply".to_string())
                })?;
                let reply_map = as_map(reply, "reply")?;
                match map_get(reply_map, "arg") {
                    Some(Cbor::Bytes(arg)) => Ok(Self::Replied(arg.clone())),
                    _ => Err(AgentError::UnexpectedResponse(
                        "reply missing arg bytes".to_string(),
                    )),
                }
            }
            "rejected" => {
                let message = match map_get(map, "reject_message") {
                    Some(Cbor::Text(message)) => Some(message.clone()),
                    _ => None,
                };
                Ok(Self::Rejected { message })
            }
            other => Err(AgentError::UnknownQueryStatus(other.to_string())),
        }
    }
}

/// Decode a read-state response `{certificate: bytes}` into a certificate.
pub fn decode_read_state_response(bytes: &[u8]) -> Result<Certificate, AgentError> {
    let value: Cbor = ciborium::from_reader(bytes)
        .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
    let value = match &value {
        Cbor::Tag(SELF_DESCRIBED_CBOR, inner) => inner.as_ref(),
        other => other,
    };
    let map = as_map(value, "read-state response")?;
    match map_get(map, "certificate") {
        Some(Cbor::Bytes(certificate)) => Ok(Certificate::from_bytes(certificate)?),
        _ => Err(AgentError::UnexpectedResponse(
            "read-state response missing certificate bytes".to_string(),
        )),
    }
}

fn as_map<'a>(value: &'a Cbor, what: &str) -> Result<&'a [(Cbor, Cbor)], AgentError> {
    match value {
        Cbor::Map(entries) => Ok(entries),
        _ => Err(AgentError::UnexpectedResponse(format!(
            "{what} is not a map"
        ))),
    }
}

fn map_get<'a>(entries: &'a [(Cbor, Cbor)], key: &str) -> Option<&'a Cbor> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Cbor::Text(text) if text == key))
        .map(|(_, v)| v)
}
