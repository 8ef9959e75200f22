//! Tabular flattener: project typed instances onto flat rows for CSV.
//!
//! Column keys are dotted paths (`address.city`) descending through nested
//! schemas and mappings. Sequences of scalars collapse into one delimited
//! cell; anything that cannot become a single cell is `NotFlattenable`.

use indexmap::IndexMap;

use crate::descriptor::Descriptor;
use crate::error::{Error, Result};
use crate::instance::{Instance, TypedValue};
use crate::registry::SchemaRegistry;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Requested column keys, in output order. Defaults to the schema's
    /// top-level declared field order.
    pub columns: Option<Vec<String>>,
    /// Joint between elements of a flattened scalar sequence.
    pub join_delimiter: String,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        FlattenOptions { columns: None, join_delimiter: ";".to_owned() }
    }
}

impl FlattenOptions {
    pub fn with_columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> FlattenOptions {
        FlattenOptions {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..FlattenOptions::default()
        }
    }
}

/// Flattened projection: one row per instance, one cell per column key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<IndexMap<String, String>>,
}

impl SchemaRegistry {
    pub fn flatten(
        &self,
        schema: &str,
        instances: &[Instance],
        options: &FlattenOptions,
    ) -> Result<Table> {
        let compiled = self.compiled(schema)?;
        let columns: Vec<String> = match &options.columns {
            Some(keys) => keys.clone(),
            // Nested fields stay out of the default list; they are only
            // reachable by explicit request (dotted or otherwise).
            None => compiled
                .fields
                .iter()
                .filter(|f| cell_capable(&f.descriptor))
                .map(|f| f.name.clone())
                .collect(),
        };

        let mut rows = Vec::with_capacity(instances.len());
        for instance in instances {
            let mut row = IndexMap::with_capacity(columns.len());
            for key in &columns {
                let segments: Vec<&str> = key.split('.').collect();
                let head = segments[0];
                let field = compiled.field(head).ok_or_else(|| {
                    Error::schema(format!(
                        "column `{key}`: schema `{}` has no field `{head}`",
                        compiled.name
                    ))
                })?;
                let cell = match instance.get(head) {
                    Some(value) => self.project(
                        &field.descriptor,
                        value,
                        &segments[1..],
                        key,
                        &options.join_delimiter,
                    )?,
                    None => String::new(),
                };
                row.insert(key.clone(), cell);
            }
            rows.push(row);
        }
        Ok(Table { columns, rows })
    }

    /// Descend the remaining dotted segments, then render the cell.
    fn project(
        &self,
        descriptor: &Descriptor,
        value: &TypedValue,
        rest: &[&str],
        key: &str,
        joint: &str,
    ) -> Result<String> {
        // Missing optionals render as the empty cell at any depth.
        if let Descriptor::Optional(inner) = descriptor {
            return if value.is_none() {
                Ok(String::new())
            } else {
                self.project(inner, value, rest, key, joint)
            };
        }
        if rest.is_empty() {
            return self.render(descriptor, value, key, joint);
        }

        let segment = rest[0];
        match (descriptor, value) {
            (Descriptor::Nested(name), TypedValue::Instance(nested)) => {
                let compiled = self.compiled(name)?;
                let field = compiled.field(segment).ok_or_else(|| {
                    Error::schema(format!(
                        "column `{key}`: schema `{name}` has no field `{segment}`"
                    ))
                })?;
                match nested.get(segment) {
                    Some(v) => self.project(&field.descriptor, v, &rest[1..], key, joint),
                    None => Ok(String::new()),
                }
            }
            (Descriptor::Mapping(inner), TypedValue::Map(entries)) => match entries.get(segment) {
                Some(v) => self.project(inner, v, &rest[1..], key, joint),
                None => Ok(String::new()),
            },
            _ => Err(Error::schema(format!(
                "column `{key}`: cannot descend into `{segment}`"
            ))),
        }
    }

    fn render(
        &self,
        descriptor: &Descriptor,
        value: &TypedValue,
        key: &str,
        joint: &str,
    ) -> Result<String> {
        match (descriptor, value) {
            (Descriptor::Optional(_), TypedValue::None) => Ok(String::new()),
            (Descriptor::Optional(inner), _) => self.render(inner, value, key, joint),
            (Descriptor::Scalar(_), _) => scalar_cell(value, key),
            (Descriptor::Enumeration(table), TypedValue::Symbol(symbol)) => {
                match table.raw_for(symbol) {
                    Some(raw) => Ok(raw_text(raw)),
                    None => Err(Error::schema(format!(
                        "column `{key}`: enumeration `{}` has no member `{symbol}`",
                        table.name()
                    ))),
                }
            }
            (Descriptor::Sequence(inner), TypedValue::Seq(items)) => {
                // A sequence of compound values has no single-cell form,
                // even when empty.
                if matches!(
                    strip_optional(inner),
                    Descriptor::Nested(_) | Descriptor::Sequence(_) | Descriptor::Mapping(_)
                ) {
                    return Err(Error::NotFlattenable { path: key.to_owned() });
                }
                let cells = items
                    .iter()
                    .map(|item| self.render(inner, item, key, joint))
                    .collect::<Result<Vec<_>>>()?;
                Ok(cells.join(joint))
            }
            (Descriptor::Raw, TypedValue::Raw(node)) => match node {
                Value::Null => Ok(String::new()),
                node if node.is_scalar() => Ok(raw_text(node)),
                _ => Err(Error::NotFlattenable { path: key.to_owned() }),
            },
            _ => Err(Error::NotFlattenable { path: key.to_owned() }),
        }
    }
}

/// Whether a field of this type can ever render as a single cell.
fn cell_capable(descriptor: &Descriptor) -> bool {
    match strip_optional(descriptor) {
        Descriptor::Scalar(_) | Descriptor::Enumeration(_) | Descriptor::Raw => true,
        Descriptor::Sequence(inner) => matches!(
            strip_optional(inner),
            Descriptor::Scalar(_) | Descriptor::Enumeration(_) | Descriptor::Raw
        ),
        _ => false,
    }
}

fn strip_optional(descriptor: &Descriptor) -> &Descriptor {
    match descriptor {
        Descriptor::Optional(inner) => strip_optional(inner),
        other => other,
    }
}

fn scalar_cell(value: &TypedValue, key: &str) -> Result<String> {
    match value {
        TypedValue::Bool(b) => Ok(b.to_string()),
        TypedValue::Int(i) => Ok(i.to_string()),
        TypedValue::Float(f) => Ok(f.to_string()),
        TypedValue::Str(s) => Ok(s.clone()),
        _ => Err(Error::NotFlattenable { path: key.to_owned() }),
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        other => format!("{other:?}"),
    }
}
