//! Typed instances: the strongly-shaped side of a conversion.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::value::Value;

/// One typed field value, conforming to exactly one descriptor kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    /// Enumeration member, by symbol.
    Symbol(String),
    Instance(Instance),
    Seq(Vec<TypedValue>),
    Map(IndexMap<String, TypedValue>),
    /// Unconstrained tree kept verbatim.
    Raw(Value),
    /// Optional field with no value.
    None,
}

impl TypedValue {
    pub fn is_none(&self) -> bool {
        matches!(self, TypedValue::None)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<i64> for TypedValue {
    fn from(i: i64) -> Self {
        TypedValue::Int(i)
    }
}

impl From<f64> for TypedValue {
    fn from(f: f64) -> Self {
        TypedValue::Float(OrderedFloat(f))
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Str(s.to_owned())
    }
}

/// Schema-conformant record. Immutable once built; produced by the
/// deserializer or assembled directly for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    schema: String,
    fields: IndexMap<String, TypedValue>,
}

impl Instance {
    pub fn new<K, I>(schema: impl Into<String>, fields: I) -> Instance
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TypedValue)>,
    {
        Instance {
            schema: schema.into(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Name of the schema this instance conforms to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
