//! The self-describing binary wire codec.
//!
//! A message is `DIDL` magic, a LEB128-framed type table (compound types
//! memoized, SLEB128 opcodes), the argument type list, then the argument
//! values. Record and variant fields travel in ascending hashed-id order;
//! that is the canonical form everything else (hashes, interop tests)
//! depends on.

use std::collections::HashMap;

use canlink_core::{leb128, Principal};

use crate::error::CandidError;
use crate::types::{FieldType, FuncAnnotation, FuncType, Type};
use crate::value::{FuncRef, FuncTarget, OptValue, Record, Sequence, ServiceRef, Value, VariantValue};

/// Magic bytes opening every message.
pub const MAGIC: &[u8; 4] = b"DIDL";

// Type opcodes (SLEB128-encoded on the wire).
const OP_NULL: i64 = -1;
const OP_BOOL: i64 = -2;
const OP_NAT: i64 = -3;
const OP_INT: i64 = -4;
const OP_NAT8: i64 = -5;
const OP_NAT16: i64 = -6;
const OP_NAT32: i64 = -7;
const OP_NAT64: i64 = -8;
const OP_INT8: i64 = -9;
const OP_INT16: i64 = -10;
const OP_INT32: i64 = -11;
const OP_INT64: i64 = -12;
const OP_FLOAT32: i64 = -13;
const OP_FLOAT64: i64 = -14;
const OP_TEXT: i64 = -15;
const OP_RESERVED: i64 = -16;
const OP_EMPTY: i64 = -17;
const OP_OPT: i64 = -18;
const OP_VEC: i64 = -19;
const OP_RECORD: i64 = -20;
const OP_VARIANT: i64 = -21;
const OP_FUNC: i64 = -22;
const OP_SERVICE: i64 = -23;

/// Encode a tuple of argument values to wire bytes.
///
/// Types are derived from the values themselves; vectors and options carry
/// their declared element type explicitly for exactly this purpose.
pub fn encode_args(values: &[Value]) -> Result<Vec<u8>, CandidError> {
    let mut table = TypeTable::default();
    let mut arg_codes = Vec::with_capacity(values.len());
    for value in values {
        arg_codes.push(table.register(&value.ty()));
    }

    let mut buf = MAGIC.to_vec();
    leb128::encode_u64(table.entries.len() as u64, &mut buf);
    for entry in &table.entries {
        buf.extend_from_slice(entry);
    }
    leb128::encode_u64(values.len() as u64, &mut buf);
    for code in &arg_codes {
        leb128::encode_i64(*code, &mut buf);
    }
    for value in values {
        encode_value(value, &mut buf)?;
    }
    Ok(buf)
}

/// Encode a single argument value.
pub fn encode_one(value: &Value) -> Result<Vec<u8>, CandidError> {
    encode_args(std::slice::from_ref(value))
}

/// Decode wire bytes into the argument values they describe.
///
/// Byte sequences come back in their canonical form: `vec nat8` always
/// decodes as [`Value::Blob`], so a [`Value::Vector`] of `Nat8` elements
/// does not survive a round trip as a vector.
pub fn decode_args(bytes: &[u8]) -> Result<Vec<Value>, CandidError> {
    let mut cursor = bytes;
    let magic = take_exact(&mut cursor, 4)?;
    if magic != MAGIC {
        return Err(CandidError::BadMagic);
    }

    let entries = parse_type_table(&mut cursor)?;
    let argc = leb128::decode_usize(&mut cursor)?;
    let mut arg_types = Vec::with_capacity(argc.min(64));
    let mut slots = vec![Slot::Empty; entries.len()];
    for _ in 0..argc {
        let code = leb128::decode_i64(&mut cursor)?;
        arg_types.push(resolve_type(code, &entries, &mut slots)?);
    }

    let mut values = Vec::with_capacity(arg_types.len());
    for ty in &arg_types {
        values.push(decode_value(ty, &mut cursor)?);
    }
    Ok(values)
}

/// Decode a message expected to carry exactly one value.
pub fn decode_one(bytes: &[u8]) -> Result<Value, CandidError> {
    let mut values = decode_args(bytes)?;
    match values.len() {
        1 => Ok(values.remove(0)),
        found => Err(CandidError::WrongArgCount { expected: 1, found }),
    }
}

/// Builder for the wire type table: compound types are appended once and
/// referenced by index thereafter.
#[derive(Default)]
struct TypeTable {
    entries: Vec<Vec<u8>>,
    memo: HashMap<Type, i64>,
}

impl TypeTable {
    /// Register a type, returning its wire code: a negative primitive
    /// opcode or a non-negative table index.
    fn register(&mut self, ty: &Type) -> i64 {
        if let Some(code) = primitive_opcode(ty) {
            return code;
        }
        if let Some(index) = self.memo.get(ty) {
            return *index;
        }

        let entry = match ty {
            Type::Opt(inner) => {
                let child = self.register(inner);
                let mut buf = Vec::new();
                leb128::encode_i64(OP_OPT, &mut buf);
                leb128::encode_i64(child, &mut buf);
                buf
            }
            Type::Vec(inner) => {
                let child = self.register(inner);
                let mut buf = Vec::new();
                leb128::encode_i64(OP_VEC, &mut buf);
                leb128::encode_i64(child, &mut buf);
                buf
            }
            Type::Record(fields) => self.fielded_entry(OP_RECORD, fields),
            Type::Variant(alts) => self.fielded_entry(OP_VARIANT, alts),
            Type::Func(signature) => self.func_entry(signature),
            Type::Service(methods) => {
                let codes: Vec<i64> = methods
                    .iter()
                    .map(|(_, signature)| self.register(&Type::Func(signature.clone())))
                    .collect();
                let mut buf = Vec::new();
                leb128::encode_i64(OP_SERVICE, &mut buf);
                leb128::encode_u64(methods.len() as u64, &mut buf);
                for ((name, _), code) in methods.iter().zip(codes) {
                    leb128::encode_u64(name.len() as u64, &mut buf);
                    buf.extend_from_slice(name.as_bytes());
                    leb128::encode_i64(code, &mut buf);
                }
                buf
            }
            _ => unreachable!("primitive handled above"),
        };

        let index = self.entries.len() as i64;
        self.entries.push(entry);
        self.memo.insert(ty.clone(), index);
        index
    }

    fn fielded_entry(&mut self, opcode: i64, fields: &[FieldType]) -> Vec<u8> {
        let codes: Vec<i64> = fields.iter().map(|f| self.register(&f.ty)).collect();
        let mut buf = Vec::new();
        leb128::encode_i64(opcode, &mut buf);
        leb128::encode_u64(fields.len() as u64, &mut buf);
        for (field, code) in fields.iter().zip(codes) {
            leb128::encode_u64(field.id as u64, &mut buf);
            leb128::encode_i64(code, &mut buf);
        }
        buf
    }

    fn func_entry(&mut self, signature: &FuncType) -> Vec<u8> {
        let arg_codes: Vec<i64> = signature.args.iter().map(|t| self.register(t)).collect();
        let ret_codes: Vec<i64> = signature.rets.iter().map(|t| self.register(t)).collect();
        let mut buf = Vec::new();
        leb128::encode_i64(OP_FUNC, &mut buf);
        leb128::encode_u64(arg_codes.len() as u64, &mut buf);
        for code in arg_codes {
            leb128::encode_i64(code, &mut buf);
        }
        leb128::encode_u64(ret_codes.len() as u64, &mut buf);
        for code in ret_codes {
            leb128::encode_i64(code, &mut buf);
        }
        leb128::encode_u64(signature.annotations.len() as u64, &mut buf);
        for annotation in &signature.annotations {
            buf.push(annotation.to_u8());
        }
        buf
    }
}

fn primitive_opcode(ty: &Type) -> Option<i64> {
    let code = match ty {
        Type::Null => OP_NULL,
        Type::Bool => OP_BOOL,
        Type::Nat => OP_NAT,
        Type::Int => OP_INT,
        Type::Nat8 => OP_NAT8,
        Type::Nat16 => OP_NAT16,
        Type::Nat32 => OP_NAT32,
        Type::Nat64 => OP_NAT64,
        Type::Int8 => OP_INT8,
        Type::Int16 => OP_INT16,
        Type::Int32 => OP_INT32,
        Type::Int64 => OP_INT64,
        Type::Float32 => OP_FLOAT32,
        Type::Float64 => OP_FLOAT64,
        Type::Text => OP_TEXT,
        Type::Reserved => OP_RESERVED,
        Type::Empty => OP_EMPTY,
        _ => return None,
    };
    Some(code)
}

fn encode_value(value: &Value, buf: &mut Vec<u8>) -> Result<(), CandidError> {
    match value {
        Value::Null | Value::Reserved => {}
        Value::Empty => return Err(CandidError::EmptyUnencodable),
        Value::Bool(b) => buf.push(u8::from(*b)),
        Value::Nat(n) => leb128::encode_unsigned(n, buf),
        Value::Int(n) => leb128::encode_signed(n, buf),
        Value::Nat8(n) => buf.push(*n),
        Value::Nat16(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Nat32(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Nat64(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Int8(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Int16(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Int32(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Int64(n) => buf.extend_from_slice(&n.to_le_bytes()),
        Value::Float32(f) => buf.extend_from_slice(&f.to_le_bytes()),
        Value::Float64(f) => buf.extend_from_slice(&f.to_le_bytes()),
        Value::Text(s) => {
            leb128::encode_u64(s.len() as u64, buf);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Opt(opt) => match opt.value() {
            None => buf.push(0),
            Some(inner) => {
                buf.push(1);
                encode_value(inner, buf)?;
            }
        },
        Value::Vector(seq) => {
            leb128::encode_u64(seq.len() as u64, buf);
            for item in seq.items() {
                encode_value(item, buf)?;
            }
        }
        Value::Blob(bytes) => {
            leb128::encode_u64(bytes.len() as u64, buf);
            buf.extend_from_slice(bytes);
        }
        Value::Record(record) => {
            // Fields already sorted by ascending hashed id.
            for (_, field_value) in record.fields() {
                encode_value(field_value, buf)?;
            }
        }
        Value::Variant(variant) => {
            leb128::encode_u64(variant.index() as u64, buf);
            encode_value(variant.value(), buf)?;
        }
        Value::Func(func) => match &func.target {
            None => buf.push(0),
            Some(target) => {
                buf.push(1);
                encode_principal_ref(&target.service, buf);
                leb128::encode_u64(target.method.len() as u64, buf);
                buf.extend_from_slice(target.method.as_bytes());
            }
        },
        Value::Service(service) => match &service.id {
            None => buf.push(0),
            Some(id) => encode_principal_ref(id, buf),
        },
    }
    Ok(())
}

fn encode_principal_ref(principal: &Principal, buf: &mut Vec<u8>) {
    buf.push(1); // transparent reference
    leb128::encode_u64(principal.as_slice().len() as u64, buf);
    buf.extend_from_slice(principal.as_slice());
}

/// A parsed-but-unresolved type table entry; children are wire codes.
enum TableEntry {
    Opt(i64),
    Vec(i64),
    Record(Vec<(u32, i64)>),
    Variant(Vec<(u32, i64)>),
    Func {
        args: Vec<i64>,
        rets: Vec<i64>,
        annotations: Vec<FuncAnnotation>,
    },
    Service(Vec<(String, i64)>),
}

fn parse_type_table(cursor: &mut &[u8]) -> Result<Vec<TableEntry>, CandidError> {
    let count = leb128::decode_usize(cursor)?;
    let mut entries = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let opcode = leb128::decode_i64(cursor)?;
        let entry = match opcode {
            OP_OPT => TableEntry::Opt(leb128::decode_i64(cursor)?),
            OP_VEC => TableEntry::Vec(leb128::decode_i64(cursor)?),
            OP_RECORD => TableEntry::Record(parse_field_list(cursor)?),
            OP_VARIANT => TableEntry::Variant(parse_field_list(cursor)?),
            OP_FUNC => {
                let args = parse_code_list(cursor)?;
                let rets = parse_code_list(cursor)?;
                let annotation_count = leb128::decode_usize(cursor)?;
                let mut annotations = Vec::with_capacity(annotation_count.min(4));
                for _ in 0..annotation_count {
                    let byte = take_exact(cursor, 1)?[0];
                    annotations.push(
                        FuncAnnotation::from_u8(byte)
                            .ok_or(CandidError::InvalidAnnotation(byte))?,
                    );
                }
                TableEntry::Func {
                    args,
                    rets,
                    annotations,
                }
            }
            OP_SERVICE => {
                let method_count = leb128::decode_usize(cursor)?;
                let mut methods = Vec::with_capacity(method_count.min(64));
                for _ in 0..method_count {
                    let name = decode_text(cursor)?;
                    let code = leb128::decode_i64(cursor)?;
                    methods.push((name, code));
                }
                TableEntry::Service(methods)
            }
            other => return Err(CandidError::UnknownOpcode(other)),
        };
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_field_list(cursor: &mut &[u8]) -> Result<Vec<(u32, i64)>, CandidError> {
    let count = leb128::decode_usize(cursor)?;
    let mut fields = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let id = leb128::decode_u64(cursor)?;
        let id = u32::try_from(id).map_err(|_| CandidError::IntegerOverflow("u32"))?;
        let code = leb128::decode_i64(cursor)?;
        fields.push((id, code));
    }
    // Canonical form: strictly ascending hashed ids.
    if fields.windows(2).any(|w| w[0].0 >= w[1].0) {
        return Err(CandidError::UnsortedFields);
    }
    Ok(fields)
}

fn parse_code_list(cursor: &mut &[u8]) -> Result<Vec<i64>, CandidError> {
    let count = leb128::decode_usize(cursor)?;
    let mut codes = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        codes.push(leb128::decode_i64(cursor)?);
    }
    Ok(codes)
}

#[derive(Clone)]
enum Slot {
    Empty,
    InProgress,
    Done(Type),
}

/// Resolve a wire type code against the table.
///
/// Recursive tables are rejected; the value model cannot represent a cyclic
/// type by construction, so a cycle on the wire is a parse error.
fn resolve_type(code: i64, entries: &[TableEntry], slots: &mut [Slot]) -> Result<Type, CandidError> {
    if code < 0 {
        return primitive_type(code);
    }
    let index = usize::try_from(code).map_err(|_| CandidError::TypeIndexOutOfRange {
        index: code,
        len: entries.len(),
    })?;
    if index >= entries.len() {
        return Err(CandidError::TypeIndexOutOfRange {
            index: code,
            len: entries.len(),
        });
    }
    match &slots[index] {
        Slot::Done(ty) => return Ok(ty.clone()),
        Slot::InProgress => return Err(CandidError::RecursiveType),
        Slot::Empty => {}
    }
    slots[index] = Slot::InProgress;

    let ty = match &entries[index] {
        TableEntry::Opt(child) => Type::opt(resolve_type(*child, entries, slots)?),
        TableEntry::Vec(child) => Type::vec(resolve_type(*child, entries, slots)?),
        TableEntry::Record(fields) => Type::Record(resolve_fields(fields, entries, slots)?),
        TableEntry::Variant(alts) => Type::Variant(resolve_fields(alts, entries, slots)?),
        TableEntry::Func {
            args,
            rets,
            annotations,
        } => {
            let args = args
                .iter()
                .map(|code| resolve_type(*code, entries, slots))
                .collect::<Result<_, _>>()?;
            let rets = rets
                .iter()
                .map(|code| resolve_type(*code, entries, slots))
                .collect::<Result<_, _>>()?;
            Type::Func(FuncType {
                args,
                rets,
                annotations: annotations.clone(),
            })
        }
        TableEntry::Service(methods) => {
            let mut resolved = Vec::with_capacity(methods.len());
            for (name, code) in methods {
                match resolve_type(*code, entries, slots)? {
                    Type::Func(signature) => resolved.push((name.clone(), signature)),
                    _ => return Err(CandidError::ServiceMethodNotFunc),
                }
            }
            Type::Service(resolved)
        }
    };

    slots[index] = Slot::Done(ty.clone());
    Ok(ty)
}

fn resolve_fields(
    fields: &[(u32, i64)],
    entries: &[TableEntry],
    slots: &mut [Slot],
) -> Result<Vec<FieldType>, CandidError> {
    fields
        .iter()
        .map(|(id, code)| {
            Ok(FieldType {
                id: *id,
                ty: resolve_type(*code, entries, slots)?,
            })
        })
        .collect()
}

fn primitive_type(code: i64) -> Result<Type, CandidError> {
    let ty = match code {
        OP_NULL => Type::Null,
        OP_BOOL => Type::Bool,
        OP_NAT => Type::Nat,
        OP_INT => Type::Int,
        OP_NAT8 => Type::Nat8,
        OP_NAT16 => Type::Nat16,
        OP_NAT32 => Type::Nat32,
        OP_NAT64 => Type::Nat64,
        OP_INT8 => Type::Int8,
        OP_INT16 => Type::Int16,
        OP_INT32 => Type::Int32,
        OP_INT64 => Type::Int64,
        OP_FLOAT32 => Type::Float32,
        OP_FLOAT64 => Type::Float64,
        OP_TEXT => Type::Text,
        OP_RESERVED => Type::Reserved,
        OP_EMPTY => Type::Empty,
        other => return Err(CandidError::UnknownOpcode(other)),
    };
    Ok(ty)
}

fn decode_value(ty: &Type, cursor: &mut &[u8]) -> Result<Value, CandidError> {
    let value = match ty {
        Type::Null => Value::Null,
        Type::Reserved => Value::Reserved,
        Type::Empty => return Err(CandidError::EmptyUnencodable),
        Type::Bool => match take_exact(cursor, 1)?[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(CandidError::InvalidBool(other)),
        },
        Type::Nat => Value::Nat(leb128::decode_unsigned(cursor)?),
        Type::Int => Value::Int(leb128::decode_signed(cursor)?),
        Type::Nat8 => Value::Nat8(take_exact(cursor, 1)?[0]),
        Type::Nat16 => Value::Nat16(u16::from_le_bytes(take_array(cursor)?)),
        Type::Nat32 => Value::Nat32(u32::from_le_bytes(take_array(cursor)?)),
        Type::Nat64 => Value::Nat64(u64::from_le_bytes(take_array(cursor)?)),
        Type::Int8 => Value::Int8(i8::from_le_bytes(take_array(cursor)?)),
        Type::Int16 => Value::Int16(i16::from_le_bytes(take_array(cursor)?)),
        Type::Int32 => Value::Int32(i32::from_le_bytes(take_array(cursor)?)),
        Type::Int64 => Value::Int64(i64::from_le_bytes(take_array(cursor)?)),
        Type::Float32 => Value::Float32(f32::from_le_bytes(take_array(cursor)?)),
        Type::Float64 => Value::Float64(f64::from_le_bytes(take_array(cursor)?)),
        Type::Text => Value::Text(decode_text(cursor)?),
        Type::Opt(inner) => match take_exact(cursor, 1)?[0] {
            0 => Value::Opt(OptValue::none((**inner).clone())),
            1 => {
                let value = decode_value(inner, cursor)?;
                Value::Opt(OptValue::new((**inner).clone(), Some(value))?)
            }
            other => return Err(CandidError::InvalidOptTag(other)),
        },
        Type::Vec(inner) => {
            if **inner == Type::Nat8 {
                let bytes = take_len(cursor)?;
                Value::Blob(bytes.to_vec())
            } else {
                let count = leb128::decode_usize(cursor)?;
                let mut items = Vec::with_capacity(count.min(4096));
                for _ in 0..count {
                    items.push(decode_value(inner, cursor)?);
                }
                Value::Vector(Sequence::new((**inner).clone(), items)?)
            }
        }
        Type::Record(fields) => {
            let mut decoded = Vec::with_capacity(fields.len());
            for field in fields {
                decoded.push((field.id, decode_value(&field.ty, cursor)?));
            }
            Value::Record(Record::from_hashed(decoded))
        }
        Type::Variant(decls) => {
            let index = leb128::decode_u64(cursor)?;
            let decl = decls
                .get(index as usize)
                .ok_or(CandidError::VariantIndexOutOfRange {
                    index,
                    len: decls.len(),
                })?;
            let value = decode_value(&decl.ty, cursor)?;
            Value::Variant(VariantValue::by_index(decls.clone(), index, value)?)
        }
        Type::Func(signature) => match take_exact(cursor, 1)?[0] {
            0 => Value::Func(FuncRef {
                signature: signature.clone(),
                target: None,
            }),
            1 => {
                let service = decode_principal_ref(cursor)?;
                let method = decode_text(cursor)?;
                Value::Func(FuncRef {
                    signature: signature.clone(),
                    target: Some(FuncTarget { service, method }),
                })
            }
            other => return Err(CandidError::InvalidReferenceTag(other)),
        },
        Type::Service(methods) => match take_exact(cursor, 1)?[0] {
            0 => Value::Service(ServiceRef {
                methods: methods.clone(),
                id: None,
            }),
            1 => {
                let id = decode_principal_body(cursor)?;
                Value::Service(ServiceRef {
                    methods: methods.clone(),
                    id: Some(id),
                })
            }
            other => return Err(CandidError::InvalidReferenceTag(other)),
        },
    };
    Ok(value)
}

fn decode_principal_ref(cursor: &mut &[u8]) -> Result<Principal, CandidError> {
    match take_exact(cursor, 1)?[0] {
        1 => decode_principal_body(cursor),
        other => Err(CandidError::InvalidReferenceTag(other)),
    }
}

fn decode_principal_body(cursor: &mut &[u8]) -> Result<Principal, CandidError> {
    let bytes = take_len(cursor)?;
    Principal::from_slice(bytes).map_err(CandidError::from)
}

fn decode_text(cursor: &mut &[u8]) -> Result<String, CandidError> {
    let bytes = take_len(cursor)?;
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| CandidError::InvalidUtf8)
}

/// Take exactly `n` bytes of fixed-size data.
fn take_exact<'a>(cursor: &mut &'a [u8], n: usize) -> Result<&'a [u8], CandidError> {
    if n > cursor.len() {
        return Err(CandidError::UnexpectedEof);
    }
    let (head, rest) = cursor.split_at(n);
    *cursor = rest;
    Ok(head)
}

/// Take a LEB128 length then that many bytes; the length must not overrun
/// the remaining buffer.
fn take_len<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8], CandidError> {
    let len = leb128::decode_usize(cursor)?;
    if len > cursor.len() {
        return Err(CandidError::LengthOverrun {
            len,
            remaining: cursor.len(),
        });
    }
    let (head, rest) = cursor.split_at(len);
    *cursor = rest;
    Ok(head)
}

fn take_array<const N: usize>(cursor: &mut &[u8]) -> Result<[u8; N], CandidError> {
    let bytes = take_exact(cursor, N)?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    Ok(arr)
}
