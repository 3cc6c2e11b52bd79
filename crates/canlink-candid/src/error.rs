//! Error types for the typed value model and wire codec.

use canlink_core::CoreError;
use thiserror::Error;

/// Errors from encoding or decoding the self-describing wire format, and
/// from constructing typed containers.
///
/// Parse failures are distinct conditions, not a generic failure: the caller
/// decides per-variant whether to reject the message or surface a reason.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CandidError {
    #[error("bad magic bytes, expected DIDL")]
    BadMagic,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("length {len} overruns remaining buffer of {remaining} bytes")]
    LengthOverrun { len: usize, remaining: usize },

    #[error("text is not valid UTF-8")]
    InvalidUtf8,

    #[error("decoded value does not fit in {0}")]
    IntegerOverflow(&'static str),

    #[error("variant index {index} outside declared list of {len}")]
    VariantIndexOutOfRange { index: u64, len: usize },

    #[error("field {0:?} is not declared in the variant")]
    FieldNotInVariant(String),

    #[error("element type mismatch: sequence declares {declared}, element is {actual}")]
    ElementTypeMismatch { declared: String, actual: String },

    #[error("cannot infer element type of an empty untyped collection")]
    CannotInferElementType,

    #[error("unknown type opcode {0}")]
    UnknownOpcode(i64),

    #[error("type table index {index} out of range ({len} entries)")]
    TypeIndexOutOfRange { index: i64, len: usize },

    #[error("recursive type tables are not supported")]
    RecursiveType,

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("invalid option tag {0:#04x}")]
    InvalidOptTag(u8),

    #[error("invalid reference tag {0:#04x}")]
    InvalidReferenceTag(u8),

    #[error("invalid function annotation {0:#04x}")]
    InvalidAnnotation(u8),

    #[error("expected {expected} argument values, found {found}")]
    WrongArgCount { expected: usize, found: usize },

    #[error("record/variant fields not in ascending hashed-id order")]
    UnsortedFields,

    #[error("service method type is not a function")]
    ServiceMethodNotFunc,

    #[error("a value of the empty type cannot exist on the wire")]
    EmptyUnencodable,

    #[error("core codec error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for CandidError {
    fn from(e: CoreError) -> Self {
        // EOF and width overflow keep their identity across the layer.
        match e {
            CoreError::UnexpectedEof => CandidError::UnexpectedEof,
            CoreError::IntegerOverflow(width) => CandidError::IntegerOverflow(width),
            other => CandidError::Core(other),
        }
    }
}
