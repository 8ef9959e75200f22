//! Format adapters: text codecs on either side of the value tree.
//!
//! The engine never sees textual syntax; these functions bridge between
//! raw JSON/YAML/CSV text and `Value`/`Table`, plus the convenience
//! round-trips (`from_json`, `to_yaml`, `to_csv`, ...) that compose a
//! codec with the conversion engine.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::error::{Error, Result};
use crate::flatten::{FlattenOptions, Table};
use crate::instance::Instance;
use crate::registry::SchemaRegistry;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// JSON
// ————————————————————————————————————————————————————————————————————————————

pub fn decode_json(text: &str) -> Result<Value> {
    let node: serde_json::Value = serde_json::from_str(text)?;
    Ok(from_json(node))
}

pub fn encode_json(value: &Value, pretty: bool) -> Result<String> {
    let node = to_json(value);
    let text = if pretty {
        serde_json::to_string_pretty(&node)?
    } else {
        serde_json::to_string(&node)?
    };
    Ok(text)
}

fn from_json(node: serde_json::Value) -> Value {
    match node {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                // u64 beyond i64::MAX lands here too, losing precision the
                // same way a float literal would.
                Value::Float(OrderedFloat(f))
            } else {
                Value::Null
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(xs) => Value::Sequence(xs.into_iter().map(from_json).collect()),
        serde_json::Value::Object(m) => {
            // `preserve_order` keeps the document's key order intact.
            Value::Mapping(m.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(f.0)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(xs) => serde_json::Value::Array(xs.iter().map(to_json).collect()),
        Value::Mapping(m) => serde_json::Value::Object(
            m.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
        ),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// YAML
// ————————————————————————————————————————————————————————————————————————————

pub fn decode_yaml(text: &str) -> Result<Value> {
    let node: serde_yaml::Value = serde_yaml::from_str(text)?;
    from_yaml(node)
}

pub fn encode_yaml(value: &Value) -> Result<String> {
    Ok(serde_yaml::to_string(&to_yaml(value))?)
}

fn from_yaml(node: serde_yaml::Value) -> Result<Value> {
    Ok(match node {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(OrderedFloat(f))
            } else {
                Value::Null
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(xs) => {
            Value::Sequence(xs.into_iter().map(from_yaml).collect::<Result<_>>()?)
        }
        serde_yaml::Value::Mapping(m) => {
            let mut out = IndexMap::with_capacity(m.len());
            for (key, value) in m {
                out.insert(yaml_key(key)?, from_yaml(value)?);
            }
            Value::Mapping(out)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value)?,
    })
}

/// Value trees are string-keyed; scalar YAML keys are stringified, anything
/// else is rejected.
fn yaml_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Codec(format!("YAML mapping key is not a scalar: {other:?}"))),
    }
}

fn to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Int(i) => serde_yaml::Value::Number((*i).into()),
        Value::Float(f) => serde_yaml::Value::Number(f.0.into()),
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Sequence(xs) => serde_yaml::Value::Sequence(xs.iter().map(to_yaml).collect()),
        Value::Mapping(m) => serde_yaml::Value::Mapping(
            m.iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), to_yaml(v)))
                .collect(),
        ),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CSV
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Emit the column key list as the first record.
    pub header: bool,
    pub delimiter: u8,
    /// CRLF record terminator instead of LF.
    pub crlf: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions { header: false, delimiter: b',', crlf: false }
    }
}

pub fn write_csv(table: &Table, options: &CsvOptions) -> Result<String> {
    let terminator = if options.crlf {
        csv::Terminator::CRLF
    } else {
        csv::Terminator::Any(b'\n')
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(terminator)
        .from_writer(Vec::new());

    if options.header {
        writer.write_record(&table.columns)?;
    }
    for row in &table.rows {
        writer.write_record(
            table
                .columns
                .iter()
                .map(|column| row.get(column).map(String::as_str).unwrap_or("")),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Codec(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Codec(e.to_string()))
}

// ————————————————————————————————————————————————————————————————————————————
// Convenience round-trips
// ————————————————————————————————————————————————————————————————————————————

impl SchemaRegistry {
    pub fn from_json(&self, schema: &str, text: &str) -> Result<Instance> {
        self.deserialize(schema, &decode_json(text)?)
    }

    pub fn from_json_sequence(&self, schema: &str, text: &str) -> Result<Vec<Instance>> {
        self.deserialize_sequence(schema, &decode_json(text)?)
    }

    pub fn from_yaml(&self, schema: &str, text: &str) -> Result<Instance> {
        self.deserialize(schema, &decode_yaml(text)?)
    }

    pub fn from_yaml_sequence(&self, schema: &str, text: &str) -> Result<Vec<Instance>> {
        self.deserialize_sequence(schema, &decode_yaml(text)?)
    }

    pub fn to_json(&self, instance: &Instance, pretty: bool) -> Result<String> {
        encode_json(&self.serialize(instance)?, pretty)
    }

    pub fn to_yaml(&self, instance: &Instance) -> Result<String> {
        encode_yaml(&self.serialize(instance)?)
    }

    pub fn to_csv(
        &self,
        schema: &str,
        instances: &[Instance],
        flatten: &FlattenOptions,
        csv: &CsvOptions,
    ) -> Result<String> {
        write_csv(&self.flatten(schema, instances, flatten)?, csv)
    }
}
