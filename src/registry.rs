//! Schema registry: declaration tables plus the compiled-descriptor cache.
//!
//! Descriptors are derived once per schema, lazily at first use, and cached
//! behind an `Arc`. First use is serialized by the cache's write lock;
//! after that the entry is immutable and reads need no coordination beyond
//! the lock's read side.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::descriptor::{CompiledField, CompiledSchema, Descriptor, EnumTable, Primitive};
use crate::error::{Error, Result};
use crate::schema::{EnumDef, SchemaDef, TypeExpr};
use crate::value::Value;

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, SchemaDef>>,
    enums: RwLock<HashMap<String, EnumDef>>,
    compiled: RwLock<HashMap<String, Arc<CompiledSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> SchemaRegistry {
        SchemaRegistry::default()
    }

    /// Process-wide default registry.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    pub fn register_schema(&self, def: SchemaDef) -> Result<()> {
        let mut schemas = self.schemas.write().expect("schema table poisoned");
        if schemas.contains_key(&def.name) {
            return Err(Error::schema(format!("schema `{}` is already registered", def.name)));
        }
        schemas.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn register_enum(&self, def: EnumDef) -> Result<()> {
        let mut enums = self.enums.write().expect("enum table poisoned");
        if enums.contains_key(&def.name) {
            return Err(Error::schema(format!(
                "enumeration `{}` is already registered",
                def.name
            )));
        }
        enums.insert(def.name.clone(), def);
        Ok(())
    }

    /// Ordered `(name, descriptor, default)` list for `name`, derived on
    /// first use and cached. All malformed-schema conditions surface here.
    pub fn compiled(&self, name: &str) -> Result<Arc<CompiledSchema>> {
        if let Some(hit) = self.compiled.read().expect("descriptor cache poisoned").get(name) {
            return Ok(Arc::clone(hit));
        }

        // Slow path: serialize derivation behind the write lock and
        // re-check, so concurrent first-users agree on one entry.
        let mut cache = self.compiled.write().expect("descriptor cache poisoned");
        if let Some(hit) = cache.get(name) {
            return Ok(Arc::clone(hit));
        }
        let entry = Arc::new(self.derive(name)?);
        cache.insert(name.to_owned(), Arc::clone(&entry));
        Ok(entry)
    }

    fn derive(&self, name: &str) -> Result<CompiledSchema> {
        let schemas = self.schemas.read().expect("schema table poisoned");
        let enums = self.enums.read().expect("enum table poisoned");

        let def = schemas
            .get(name)
            .ok_or_else(|| Error::schema(format!("schema `{name}` is not registered")))?;
        if def.fields.is_empty() {
            return Err(Error::schema(format!("schema `{name}` declares no fields")));
        }

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            if fields.iter().any(|f: &CompiledField| f.name == field.name) {
                return Err(Error::schema(format!(
                    "schema `{name}` declares field `{}` twice",
                    field.name
                )));
            }
            let descriptor = resolve(&field.ty, &schemas, &enums, name, &field.name)?;
            fields.push(CompiledField {
                name: field.name.clone(),
                descriptor,
                default: field.default.clone(),
            });
        }

        Ok(CompiledSchema { name: name.to_owned(), fields })
    }
}

fn resolve(
    expr: &TypeExpr,
    schemas: &HashMap<String, SchemaDef>,
    enums: &HashMap<String, EnumDef>,
    schema: &str,
    field: &str,
) -> Result<Descriptor> {
    let descriptor = match expr {
        TypeExpr::Bool => Descriptor::Scalar(Primitive::Bool),
        TypeExpr::Int => Descriptor::Scalar(Primitive::Int),
        TypeExpr::Float => Descriptor::Scalar(Primitive::Float),
        TypeExpr::Str => Descriptor::Scalar(Primitive::Str),
        TypeExpr::Any => Descriptor::Raw,
        TypeExpr::Optional(inner) => {
            Descriptor::Optional(Box::new(resolve(inner, schemas, enums, schema, field)?))
        }
        TypeExpr::Seq(inner) => {
            Descriptor::Sequence(Box::new(resolve(inner, schemas, enums, schema, field)?))
        }
        TypeExpr::Map(inner) => {
            Descriptor::Mapping(Box::new(resolve(inner, schemas, enums, schema, field)?))
        }
        TypeExpr::Schema(target) => {
            if !schemas.contains_key(target) {
                return Err(Error::schema(format!(
                    "field `{schema}.{field}` references unknown schema `{target}`"
                )));
            }
            Descriptor::Nested(target.clone())
        }
        TypeExpr::Enum(target) => {
            let def = enums.get(target).ok_or_else(|| {
                Error::schema(format!(
                    "field `{schema}.{field}` references unknown enumeration `{target}`"
                ))
            })?;
            Descriptor::Enumeration(Arc::new(compile_enum(def)?))
        }
    };
    Ok(descriptor)
}

fn compile_enum(def: &EnumDef) -> Result<EnumTable> {
    if def.members.is_empty() {
        return Err(Error::schema(format!("enumeration `{}` declares no members", def.name)));
    }
    for (i, (symbol, raw)) in def.members.iter().enumerate() {
        if !matches!(raw, Value::String(_) | Value::Int(_) | Value::Float(_)) {
            return Err(Error::schema(format!(
                "enumeration `{}` member `{symbol}` has a raw value that is not a string or number",
                def.name
            )));
        }
        for (other_symbol, other_raw) in &def.members[..i] {
            if other_symbol == symbol {
                return Err(Error::schema(format!(
                    "enumeration `{}` declares member `{symbol}` twice",
                    def.name
                )));
            }
            if other_raw == raw {
                return Err(Error::schema(format!(
                    "enumeration `{}` declares raw value of `{symbol}` twice",
                    def.name
                )));
            }
        }
    }
    Ok(EnumTable::new(def.name.clone(), def.members.clone()))
}
