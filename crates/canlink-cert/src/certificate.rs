//! Certificates and request-status extraction.
//!
//! A read-state response carries a CBOR certificate `{tree, signature}`.
//! The tree proves values at paths; this module decodes the certificate and
//! turns lookups under `request_status/<id>/...` into a domain status.
//! Verifying the aggregate signature over the root hash is the transport
//! layer's concern; the signature is carried opaquely.

use ciborium::value::Value as Cbor;

use crate::error::CertError;
use crate::tree::{cbor_kind, HashTree, Lookup};

/// CBOR self-describing tag some encoders wrap the top-level value in.
const SELF_DESCRIBED_CBOR: u64 = 55799;

/// A decoded certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The hash tree carrying the certified values.
    pub tree: HashTree,
    /// Signature over the root hash, kept opaque.
    pub signature: Vec<u8>,
}

impl Certificate {
    /// Decode a certificate from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertError> {
        let value: Cbor = ciborium::from_reader(bytes)
            .map_err(|e| CertError::InvalidCbor(e.to_string()))?;
        Self::from_cbor(&value)
    }

    /// Decode a certificate from an already-parsed CBOR value.
    pub fn from_cbor(value: &Cbor) -> Result<Self, CertError> {
        let value = unwrap_self_described(value);
        let map = match value {
            Cbor::Map(entries) => entries,
            other => {
                return Err(CertError::UnexpectedShape(format!(
                    "certificate must be a map, found {}",
                    cbor_kind(other)
                )))
            }
        };

        let tree_value = map_get(map, "tree").ok_or_else(|| {
            CertError::UnexpectedShape("certificate missing tree".to_string())
        })?;
        let signature = match map_get(map, "signature") {
            Some(Cbor::Bytes(bytes)) => bytes.clone(),
            Some(other) => {
                return Err(CertError::UnexpectedShape(format!(
                    "signature must be bytes, found {}",
                    cbor_kind(other)
                )))
            }
            None => {
                return Err(CertError::UnexpectedShape(
                    "certificate missing signature".to_string(),
                ))
            }
        };

        Ok(Self {
            tree: HashTree::from_cbor(tree_value)?,
            signature,
        })
    }

    /// Look up a leaf value in the certified tree.
    pub fn lookup<'a>(&'a self, path: &[&[u8]]) -> Lookup<'a> {
        self.tree.lookup_path(path)
    }

    /// The certified system time, in nanoseconds since the epoch.
    pub fn time(&self) -> Result<u64, CertError> {
        match self.lookup(&[b"time"]) {
            Lookup::Found(bytes) => {
                let mut cursor = bytes;
                let time = canlink_core::leb128::decode_u64(&mut cursor)
                    .map_err(|_| CertError::MalformedLeaf("time".to_string()))?;
                Ok(time)
            }
            _ => Err(CertError::MissingPath("time".to_string())),
        }
    }

    /// Extract the status of a request by its 32-byte request id.
    pub fn request_status(&self, request_id: &[u8; 32]) -> Result<RequestStatus, CertError> {
        let prefix: &[u8] = b"request_status";
        let status_path: [&[u8]; 3] = [prefix, request_id, b"status"];
        let status = match self.lookup(&status_path) {
            // Absent means the network has not recorded the request yet;
            // Unknown means the evidence was pruned. Both are non-terminal:
            // keep polling.
            Lookup::Absent | Lookup::Unknown => return Ok(RequestStatus::Unknown),
            Lookup::Found(bytes) => bytes,
        };

        match status {
            b"received" => Ok(RequestStatus::Received),
            b"processing" => Ok(RequestStatus::Processing),
            b"replied" => {
                let reply_path: [&[u8]; 3] = [prefix, request_id, b"reply"];
                match self.lookup(&reply_path) {
                    Lookup::Found(arg) => Ok(RequestStatus::Replied(arg.to_vec())),
                    _ => Err(CertError::MissingPath("request_status/<id>/reply".to_string())),
                }
            }
            b"rejected" => {
                let code_path: [&[u8]; 3] = [prefix, request_id, b"reject_code"];
                let code = match self.lookup(&code_path) {
                    Lookup::Found(bytes) => {
                        let mut cursor = bytes;
                        let raw = canlink_core::leb128::decode_u64(&mut cursor).map_err(|_| {
                            CertError::MalformedLeaf("reject_code".to_string())
                        })?;
                        RejectCode::from_u64(raw).ok_or(CertError::InvalidRejectCode(raw))?
                    }
                    _ => {
                        return Err(CertError::MissingPath(
                            "request_status/<id>/reject_code".to_string(),
                        ))
                    }
                };
                let message_path: [&[u8]; 3] = [prefix, request_id, b"reject_message"];
                let message = match self.lookup(&message_path) {
                    Lookup::Found(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
                    _ => None,
                };
                Ok(RequestStatus::Rejected { code, message })
            }
            b"done" => Ok(RequestStatus::Done),
            other => Err(CertError::InvalidStatus(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

fn unwrap_self_described(value: &Cbor) -> &Cbor {
    match value {
        Cbor::Tag(SELF_DESCRIBED_CBOR, inner) => inner,
        other => other,
    }
}

fn map_get<'a>(entries: &'a [(Cbor, Cbor)], key: &str) -> Option<&'a Cbor> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Cbor::Text(text) if text == key))
        .map(|(_, v)| v)
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectCode {
    /// Fatal system error, retrying is pointless.
    SysFatal = 1,
    /// Transient system error, a retry may succeed.
    SysTransient = 2,
    /// The destination canister does not exist.
    DestinationInvalid = 3,
    /// The canister explicitly rejected the call.
    CanisterReject = 4,
    /// The canister trapped while handling the call.
    CanisterError = 5,
}

impl RejectCode {
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::SysFatal),
            2 => Some(Self::SysTransient),
            3 => Some(Self::DestinationInvalid),
            4 => Some(Self::CanisterReject),
            5 => Some(Self::CanisterError),
            _ => None,
        }
    }

    pub fn to_u64(self) -> u64 {
        self as u64
    }
}

/// The certified status of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// No definitive status yet (absent from the tree, or pruned away).
    Unknown,
    /// The network has received the request.
    Received,
    /// The request is being executed.
    Processing,
    /// The call completed; carries the encoded reply argument.
    Replied(Vec<u8>),
    /// The call was rejected.
    Rejected {
        code: RejectCode,
        message: Option<String>,
    },
    /// The status was recorded and has since been purged.
    Done,
}
