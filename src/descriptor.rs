//! Resolved per-field conversion strategies.
//!
//! The registry compiles each `TypeExpr` into a `Descriptor` exactly once;
//! the engine then dispatches on descriptor kind with no name resolution
//! left to do (nested schemas stay by-id so self-recursive shapes do not
//! recurse at compile time).

use std::sync::Arc;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bool,
    Int,
    Float,
    Str,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Str => "string",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Descriptor {
    Scalar(Primitive),
    Optional(Box<Descriptor>),
    Enumeration(Arc<EnumTable>),
    /// Nested schema, resolved through the registry at conversion time.
    Nested(String),
    Sequence(Box<Descriptor>),
    Mapping(Box<Descriptor>),
    /// Verbatim passthrough; no contract beyond "is a tree".
    Raw,
}

impl Descriptor {
    /// Kind name expected of the input node, for mismatch diagnostics.
    pub fn expected(&self) -> &'static str {
        match self {
            Descriptor::Scalar(p) => p.name(),
            Descriptor::Optional(inner) => inner.expected(),
            Descriptor::Enumeration(_) => "string or number",
            Descriptor::Nested(_) => "mapping",
            Descriptor::Sequence(_) => "sequence",
            Descriptor::Mapping(_) => "mapping",
            Descriptor::Raw => "any",
        }
    }
}

/// Immutable lookup table for one enumeration. Shared by every field that
/// references the enumeration.
#[derive(Debug)]
pub struct EnumTable {
    name: String,
    members: Vec<(String, Value)>,
}

impl EnumTable {
    pub(crate) fn new(name: String, members: Vec<(String, Value)>) -> EnumTable {
        EnumTable { name, members }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact, case-sensitive match on the declared raw value.
    pub fn symbol_for(&self, raw: &Value) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, r)| r == raw)
            .map(|(s, _)| s.as_str())
    }

    pub fn raw_for(&self, symbol: &str) -> Option<&Value> {
        self.members
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub descriptor: Descriptor,
    pub default: Option<Value>,
}

/// Ordered descriptor list for one schema; cached entry of the registry.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub name: String,
    pub fields: Vec<CompiledField>,
}

impl CompiledSchema {
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
