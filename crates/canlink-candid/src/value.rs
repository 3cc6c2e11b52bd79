//! The value half of the typed value model.
//!
//! A `Value` is one decoded or encodable datum. Every container validates
//! its invariants at construction, so a `Value` in hand is always
//! well-formed: record fields sorted by hashed id, variant index in bounds,
//! sequence elements homogeneous.

use canlink_core::{field_hash, Principal};
use num_bigint::{BigInt, BigUint};

use crate::error::CandidError;
use crate::types::{sort_fields, FieldType, FuncType, Type};

/// A Candid-style value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Nat(BigUint),
    Int(BigInt),
    Nat8(u8),
    Nat16(u16),
    Nat32(u32),
    Nat64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Reserved,
    /// The uninhabited bottom type; a value of it can never reach the wire.
    Empty,
    Opt(OptValue),
    Vector(Sequence),
    Blob(Vec<u8>),
    Record(Record),
    Variant(VariantValue),
    Func(FuncRef),
    Service(ServiceRef),
}

impl Value {
    /// Shorthand for a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Shorthand for a blob value.
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Blob(bytes.into())
    }

    /// Derive the runtime type of this value.
    pub fn ty(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Nat(_) => Type::Nat,
            Value::Int(_) => Type::Int,
            Value::Nat8(_) => Type::Nat8,
            Value::Nat16(_) => Type::Nat16,
            Value::Nat32(_) => Type::Nat32,
            Value::Nat64(_) => Type::Nat64,
            Value::Int8(_) => Type::Int8,
            Value::Int16(_) => Type::Int16,
            Value::Int32(_) => Type::Int32,
            Value::Int64(_) => Type::Int64,
            Value::Float32(_) => Type::Float32,
            Value::Float64(_) => Type::Float64,
            Value::Text(_) => Type::Text,
            Value::Reserved => Type::Reserved,
            Value::Empty => Type::Empty,
            Value::Opt(opt) => Type::opt(opt.elem_ty.clone()),
            Value::Vector(seq) => Type::vec(seq.elem_ty.clone()),
            Value::Blob(_) => Type::vec(Type::Nat8),
            Value::Record(record) => Type::Record(
                record
                    .fields
                    .iter()
                    .map(|(id, value)| FieldType {
                        id: *id,
                        ty: value.ty(),
                    })
                    .collect(),
            ),
            Value::Variant(variant) => Type::Variant(variant.decls.clone()),
            Value::Func(func) => Type::Func(func.signature.clone()),
            Value::Service(service) => Type::Service(service.methods.clone()),
        }
    }
}

/// An ordered field dictionary: `(hashed id, Value)` pairs sorted ascending.
///
/// The field-name hash is not collision-free; when two names collide, the
/// later entry wins and the earlier one is dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(u32, Value)>,
}

impl Record {
    /// Build from named fields; hashes, sorts, and deduplicates (last wins).
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self::from_hashed(
            fields
                .into_iter()
                .map(|(name, value)| (field_hash(name), value))
                .collect(),
        )
    }

    /// Build from already-hashed ids; sorts and deduplicates (last wins).
    pub fn from_hashed(mut fields: Vec<(u32, Value)>) -> Self {
        fields.sort_by_key(|(id, _)| *id); // stable sort keeps input order per id
        let mut deduped: Vec<(u32, Value)> = Vec::with_capacity(fields.len());
        for (id, value) in fields {
            match deduped.last_mut() {
                Some((last_id, last_value)) if *last_id == id => *last_value = value,
                _ => deduped.push((id, value)),
            }
        }
        Self { fields: deduped }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_by_id(field_hash(name))
    }

    /// Look up a field by hashed id. O(log n) over the sorted list.
    pub fn get_by_id(&self, id: u32) -> Option<&Value> {
        self.fields
            .binary_search_by_key(&id, |(field_id, _)| *field_id)
            .ok()
            .map(|index| &self.fields[index].1)
    }

    /// The fields in canonical (ascending hashed id) order.
    pub fn fields(&self) -> &[(u32, Value)] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A tagged choice: declared alternatives plus exactly one selected value.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantValue {
    decls: Vec<FieldType>,
    index: usize,
    value: Box<Value>,
}

impl VariantValue {
    /// Select an alternative by name against the declared list.
    ///
    /// Fails if the name is absent from the declarations.
    pub fn new(decls: Vec<FieldType>, name: &str, value: Value) -> Result<Self, CandidError> {
        let decls = sort_fields(decls);
        let id = field_hash(name);
        let index = decls
            .binary_search_by_key(&id, |decl| decl.id)
            .map_err(|_| CandidError::FieldNotInVariant(name.to_string()))?;
        Ok(Self {
            decls,
            index,
            value: Box::new(value),
        })
    }

    /// Select an alternative by index; the index must be in bounds.
    pub fn by_index(decls: Vec<FieldType>, index: u64, value: Value) -> Result<Self, CandidError> {
        let decls = sort_fields(decls);
        if index as usize >= decls.len() {
            return Err(CandidError::VariantIndexOutOfRange {
                index,
                len: decls.len(),
            });
        }
        Ok(Self {
            decls,
            index: index as usize,
            value: Box::new(value),
        })
    }

    /// The declared alternatives in canonical order.
    pub fn decls(&self) -> &[FieldType] {
        &self.decls
    }

    /// The selected alternative's position in the declared list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The selected alternative's hashed id.
    pub fn selected_id(&self) -> u32 {
        self.decls[self.index].id
    }

    /// The carried value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A homogeneous sequence: declared element type plus zero or more values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    elem_ty: Type,
    items: Vec<Value>,
}

impl Sequence {
    /// Build against a declared element type, validating every element.
    pub fn new(elem_ty: Type, items: Vec<Value>) -> Result<Self, CandidError> {
        for item in &items {
            let actual = item.ty();
            if actual != elem_ty {
                return Err(CandidError::ElementTypeMismatch {
                    declared: elem_ty.describe(),
                    actual: actual.describe(),
                });
            }
        }
        Ok(Self { elem_ty, items })
    }

    /// Infer the element type from the first element and validate the rest.
    pub fn from_values(items: Vec<Value>) -> Result<Self, CandidError> {
        let elem_ty = items
            .first()
            .map(Value::ty)
            .ok_or(CandidError::CannotInferElementType)?;
        Self::new(elem_ty, items)
    }

    /// An empty sequence of the given element type.
    pub fn empty(elem_ty: Type) -> Self {
        Self {
            elem_ty,
            items: Vec::new(),
        }
    }

    /// The declared element type.
    pub fn elem_ty(&self) -> &Type {
        &self.elem_ty
    }

    /// The elements in order.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An optional value: declared element type plus zero-or-one value.
#[derive(Debug, Clone, PartialEq)]
pub struct OptValue {
    elem_ty: Type,
    value: Option<Box<Value>>,
}

impl OptValue {
    /// A present value; the element type is taken from the value itself.
    pub fn some(value: Value) -> Self {
        Self {
            elem_ty: value.ty(),
            value: Some(Box::new(value)),
        }
    }

    /// An absent value of the given element type.
    pub fn none(elem_ty: Type) -> Self {
        Self {
            elem_ty,
            value: None,
        }
    }

    /// A possibly-absent value against a declared element type.
    pub fn new(elem_ty: Type, value: Option<Value>) -> Result<Self, CandidError> {
        if let Some(inner) = &value {
            let actual = inner.ty();
            if actual != elem_ty {
                return Err(CandidError::ElementTypeMismatch {
                    declared: elem_ty.describe(),
                    actual: actual.describe(),
                });
            }
        }
        Ok(Self {
            elem_ty,
            value: value.map(Box::new),
        })
    }

    /// The declared element type.
    pub fn elem_ty(&self) -> &Type {
        &self.elem_ty
    }

    /// The carried value, if present.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_deref()
    }
}

/// A bound method on a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncTarget {
    pub service: Principal,
    pub method: String,
}

/// A function reference: a signature plus an optionally bound target.
///
/// An unbound reference encodes as an opaque reference on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncRef {
    pub signature: FuncType,
    pub target: Option<FuncTarget>,
}

/// A service reference: a named method table plus an optional id.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRef {
    pub methods: Vec<(String, FuncType)>,
    pub id: Option<Principal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_order_independent() {
        let a = Record::new([
            ("to", Value::blob(vec![1, 2, 3])),
            ("amount", Value::Nat64(100)),
        ]);
        let b = Record::new([
            ("amount", Value::Nat64(100)),
            ("to", Value::blob(vec![1, 2, 3])),
        ]);
        assert_eq!(a, b);
        assert!(a.fields().windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_record_lookup_by_name_and_id() {
        let record = Record::new([("amount", Value::Nat64(7))]);
        assert_eq!(record.get("amount"), Some(&Value::Nat64(7)));
        assert_eq!(
            record.get_by_id(field_hash("amount")),
            Some(&Value::Nat64(7))
        );
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_record_duplicate_last_wins() {
        let record = Record::new([("x", Value::Nat8(1)), ("x", Value::Nat8(2))]);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("x"), Some(&Value::Nat8(2)));
    }

    #[test]
    fn test_variant_unknown_name_fails() {
        let decls = vec![
            FieldType::named("Ok", Type::Nat64),
            FieldType::named("Err", Type::Text),
        ];
        let err = VariantValue::new(decls, "Oops", Value::Null).unwrap_err();
        assert_eq!(err, CandidError::FieldNotInVariant("Oops".to_string()));
    }

    #[test]
    fn test_variant_index_bounds() {
        let decls = vec![FieldType::named("Ok", Type::Null)];
        assert!(VariantValue::by_index(decls.clone(), 0, Value::Null).is_ok());
        assert_eq!(
            VariantValue::by_index(decls, 1, Value::Null).unwrap_err(),
            CandidError::VariantIndexOutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_variant_selected_id() {
        let decls = vec![
            FieldType::named("Ok", Type::Nat64),
            FieldType::named("Err", Type::Text),
        ];
        let variant = VariantValue::new(decls, "Ok", Value::Nat64(1)).unwrap();
        assert_eq!(variant.selected_id(), field_hash("Ok"));
    }

    #[test]
    fn test_sequence_rejects_mixed_types() {
        let err = Sequence::from_values(vec![Value::Nat8(1), Value::text("x")]).unwrap_err();
        assert!(matches!(err, CandidError::ElementTypeMismatch { .. }));
    }

    #[test]
    fn test_sequence_inference() {
        let seq = Sequence::from_values(vec![Value::Nat64(1), Value::Nat64(2)]).unwrap();
        assert_eq!(seq.elem_ty(), &Type::Nat64);
        assert!(Sequence::from_values(vec![]).is_err());
    }

    #[test]
    fn test_opt_type_check() {
        assert!(OptValue::new(Type::Text, Some(Value::text("hi"))).is_ok());
        assert!(OptValue::new(Type::Text, Some(Value::Nat8(1))).is_err());
        assert!(OptValue::new(Type::Text, None).is_ok());
    }

    #[test]
    fn test_value_type_derivation() {
        let value = Value::Record(Record::new([
            ("to", Value::blob(vec![0u8; 20])),
            ("amount", Value::Nat64(100)),
        ]));
        let ty = value.ty();
        assert_eq!(
            ty,
            Type::record([
                ("to", Type::vec(Type::Nat8)),
                ("amount", Type::Nat64),
            ])
        );
    }
}
