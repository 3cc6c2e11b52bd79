//! The type half of the typed value model.
//!
//! `Type` mirrors `Value` one level up: it validates container homogeneity
//! and drives the wire type table. The enum is closed so that adding a
//! variant forces every consumer to be updated at compile time.

use canlink_core::field_hash;
use std::fmt;

/// A Candid-style type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Bool,
    Nat,
    Int,
    Nat8,
    Nat16,
    Nat32,
    Nat64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Text,
    Reserved,
    Empty,
    Opt(Box<Type>),
    Vec(Box<Type>),
    Record(Vec<FieldType>),
    Variant(Vec<FieldType>),
    Func(FuncType),
    Service(Vec<(String, FuncType)>),
}

/// A declared field: hashed name id plus its type.
///
/// Record and variant field lists are always stored sorted by ascending id;
/// that order is the canonical wire order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldType {
    pub id: u32,
    pub ty: Type,
}

impl FieldType {
    /// Declare a field by name.
    pub fn named(name: &str, ty: Type) -> Self {
        Self {
            id: field_hash(name),
            ty,
        }
    }
}

/// Annotations on a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FuncAnnotation {
    /// Read-only call, answered without going through consensus.
    Query = 1,
    /// Fire-and-forget, no response.
    Oneway = 2,
}

impl FuncAnnotation {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Query),
            2 => Some(Self::Oneway),
            _ => None,
        }
    }
}

/// A function signature: argument types, return types, annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    pub args: Vec<Type>,
    pub rets: Vec<Type>,
    pub annotations: Vec<FuncAnnotation>,
}

impl FuncType {
    /// A plain update signature.
    pub fn new(args: Vec<Type>, rets: Vec<Type>) -> Self {
        Self {
            args,
            rets,
            annotations: Vec::new(),
        }
    }

    /// Mark the signature as a query.
    pub fn query(mut self) -> Self {
        self.annotations.push(FuncAnnotation::Query);
        self
    }
}

impl Type {
    /// An option of the given element type.
    pub fn opt(elem: Type) -> Self {
        Type::Opt(Box::new(elem))
    }

    /// A vector of the given element type.
    pub fn vec(elem: Type) -> Self {
        Type::Vec(Box::new(elem))
    }

    /// A record type from named fields, hashed and sorted into canonical
    /// order. A later duplicate of the same hashed id wins.
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Type)>) -> Self {
        Type::Record(sort_fields(
            fields
                .into_iter()
                .map(|(name, ty)| FieldType::named(name, ty))
                .collect(),
        ))
    }

    /// A variant type from named alternatives, hashed and sorted.
    pub fn variant<'a>(alternatives: impl IntoIterator<Item = (&'a str, Type)>) -> Self {
        Type::Variant(sort_fields(
            alternatives
                .into_iter()
                .map(|(name, ty)| FieldType::named(name, ty))
                .collect(),
        ))
    }

    /// Short human-readable name, used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Type::Null => "null".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Nat => "nat".to_string(),
            Type::Int => "int".to_string(),
            Type::Nat8 => "nat8".to_string(),
            Type::Nat16 => "nat16".to_string(),
            Type::Nat32 => "nat32".to_string(),
            Type::Nat64 => "nat64".to_string(),
            Type::Int8 => "int8".to_string(),
            Type::Int16 => "int16".to_string(),
            Type::Int32 => "int32".to_string(),
            Type::Int64 => "int64".to_string(),
            Type::Float32 => "float32".to_string(),
            Type::Float64 => "float64".to_string(),
            Type::Text => "text".to_string(),
            Type::Reserved => "reserved".to_string(),
            Type::Empty => "empty".to_string(),
            Type::Opt(inner) => format!("opt {}", inner.describe()),
            Type::Vec(inner) => format!("vec {}", inner.describe()),
            Type::Record(fields) => format!("record ({} fields)", fields.len()),
            Type::Variant(alts) => format!("variant ({} alternatives)", alts.len()),
            Type::Func(_) => "func".to_string(),
            Type::Service(methods) => format!("service ({} methods)", methods.len()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Sort a field list into ascending hashed-id order, keeping the last entry
/// for any duplicated id.
pub(crate) fn sort_fields(mut fields: Vec<FieldType>) -> Vec<FieldType> {
    fields.sort_by_key(|f| f.id); // stable: input order survives for equal ids
    let mut out: Vec<FieldType> = Vec::with_capacity(fields.len());
    for field in fields {
        match out.last_mut() {
            Some(last) if last.id == field.id => *last = field,
            _ => out.push(field),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields_sorted_by_hash() {
        let ty = Type::record([("amount", Type::Nat64), ("to", Type::vec(Type::Nat8))]);
        let Type::Record(fields) = &ty else {
            panic!("expected record");
        };
        assert!(fields.windows(2).all(|w| w[0].id < w[1].id));

        // Construction order must not matter.
        let reordered = Type::record([("to", Type::vec(Type::Nat8)), ("amount", Type::Nat64)]);
        assert_eq!(ty, reordered);
    }

    #[test]
    fn test_duplicate_field_last_wins() {
        let ty = Type::record([("x", Type::Nat8), ("x", Type::Text)]);
        let Type::Record(fields) = &ty else {
            panic!("expected record");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].ty, Type::Text);
    }

    #[test]
    fn test_annotation_roundtrip() {
        for ann in [FuncAnnotation::Query, FuncAnnotation::Oneway] {
            assert_eq!(FuncAnnotation::from_u8(ann.to_u8()), Some(ann));
        }
        assert_eq!(FuncAnnotation::from_u8(3), None);
    }
}
