//! Schema declarations: what the caller writes down once per data shape.
//!
//! A `SchemaDef` is raw input. Nothing here is validated; the registry
//! derives (and checks) descriptors lazily the first time the schema is
//! used for a conversion.

use crate::value::Value;

/// Declared type of one field, before resolution against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Bool,
    Int,
    Float,
    Str,
    /// Field may be absent or null.
    Optional(Box<TypeExpr>),
    /// Reference to a registered enumeration, by name.
    Enum(String),
    /// Reference to a registered schema, by name. May refer to the schema
    /// under construction (self-recursive shapes are legal).
    Schema(String),
    /// Homogeneous ordered sequence.
    Seq(Box<TypeExpr>),
    /// Homogeneous string-keyed mapping.
    Map(Box<TypeExpr>),
    /// Unconstrained passthrough.
    Any,
}

impl TypeExpr {
    pub fn optional(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Optional(Box::new(inner))
    }

    pub fn seq(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Seq(Box::new(inner))
    }

    pub fn map(inner: TypeExpr) -> TypeExpr {
        TypeExpr::Map(Box::new(inner))
    }

    pub fn schema(name: impl Into<String>) -> TypeExpr {
        TypeExpr::Schema(name.into())
    }

    pub fn enumeration(name: impl Into<String>) -> TypeExpr {
        TypeExpr::Enum(name.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    /// Untyped default, substituted when the field is absent from the input
    /// mapping. Converted through the field's descriptor like any node, so
    /// a nonsense default surfaces as a normal conversion error.
    pub default: Option<Value>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> FieldDef {
        FieldDef { name: name.into(), ty, default: None }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> FieldDef {
        self.default = Some(default.into());
        self
    }
}

/// One named data shape: a non-empty ordered list of fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl SchemaDef {
    pub fn new(name: impl Into<String>) -> SchemaDef {
        SchemaDef { name: name.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, ty: TypeExpr) -> SchemaDef {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    pub fn field_def(mut self, def: FieldDef) -> SchemaDef {
        self.fields.push(def);
        self
    }
}

/// Closed set of symbolic members, each tied to one scalar raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    /// `(symbol, raw)` pairs in declaration order.
    pub members: Vec<(String, Value)>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> EnumDef {
        EnumDef { name: name.into(), members: Vec::new() }
    }

    pub fn member(mut self, symbol: impl Into<String>, raw: impl Into<Value>) -> EnumDef {
        self.members.push((symbol.into(), raw.into()));
        self
    }
}
