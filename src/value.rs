//! Untyped value tree shared by every format adapter.
//!
//! `Value` is the intermediate representation between raw JSON/YAML/CSV text
//! and typed instances: a plain recursive union with structural equality and
//! nothing else. Mappings keep insertion order (IndexMap) so serialized
//! output is deterministic; equality on mappings is order-insensitive.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Sequence(Vec<Value>),
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Runtime kind name, used in error diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(xs) => Some(xs),
            _ => None,
        }
    }

    /// Mapping literal helper for construction sites that would otherwise
    /// drown in `IndexMap::insert` noise.
    pub fn from_pairs<K, I>(pairs: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(OrderedFloat(f))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self {
        Value::Sequence(xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_equality_ignores_key_order() {
        let a = Value::from_pairs([("x", Value::from(1)), ("y", Value::from(2))]);
        let b = Value::from_pairs([("y", Value::from(2)), ("x", Value::from(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_equality_respects_order() {
        let a = Value::Sequence(vec![Value::from(1), Value::from(2)]);
        let b = Value::Sequence(vec![Value::from(2), Value::from(1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind(), "null");
        assert_eq!(Value::from(1.5).kind(), "float");
        assert_eq!(Value::from_pairs::<&str, _>([]).kind(), "mapping");
    }
}
