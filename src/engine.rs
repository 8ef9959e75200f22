//! Type-directed conversion engine.
//!
//! Recursive dispatch over descriptor kinds, both directions:
//! deserialize validates and coerces an untyped tree into an `Instance`,
//! serialize walks an `Instance` back into a tree. Each call is a pure,
//! finite walk; the only shared state is the registry's read-only cache.
//!
//! Policy knobs live here, not in the descriptors:
//! - the only scalar coercion is int → float widening;
//! - absent fields fall back to the declared default, then to "no value"
//!   for optionals, then to `MissingField`;
//! - extra keys in input mappings are ignored;
//! - optional fields with no value are omitted from output mappings;
//! - output mapping key order is schema declaration order.

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::descriptor::{CompiledSchema, Descriptor, Primitive};
use crate::error::{Error, Result};
use crate::instance::{Instance, TypedValue};
use crate::registry::SchemaRegistry;
use crate::value::Value;

impl SchemaRegistry {
    /// Validate and coerce `node` into a typed instance of `schema`.
    pub fn deserialize(&self, schema: &str, node: &Value) -> Result<Instance> {
        let compiled = self.compiled(schema)?;
        self.de_instance(&compiled, node, "")
    }

    /// Deserialize a top-level sequence of instances.
    pub fn deserialize_sequence(&self, schema: &str, node: &Value) -> Result<Vec<Instance>> {
        let compiled = self.compiled(schema)?;
        let items = node.as_sequence().ok_or_else(|| Error::TypeMismatch {
            path: root_path("").into(),
            expected: "sequence",
            actual: node.kind(),
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.de_instance(&compiled, item, &index_path("", i)))
            .collect()
    }

    /// Walk `instance` back into an untyped tree. Total on instances built
    /// by the deserializer; a hand-built instance that does not conform to
    /// its schema surfaces as a `Schema` or `MissingField` error.
    pub fn serialize(&self, instance: &Instance) -> Result<Value> {
        let compiled = self.compiled(instance.schema())?;
        self.ser_instance(&compiled, instance, "")
    }

    /// Serialize many instances of one schema into a sequence node.
    pub fn serialize_sequence(&self, instances: &[Instance]) -> Result<Value> {
        instances
            .iter()
            .map(|i| self.serialize(i))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence)
    }

    fn de_instance(&self, schema: &CompiledSchema, node: &Value, path: &str) -> Result<Instance> {
        let mapping = node.as_mapping().ok_or_else(|| Error::TypeMismatch {
            path: root_path(path).into(),
            expected: "mapping",
            actual: node.kind(),
        })?;

        let mut fields = IndexMap::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let field_path = field_path(path, &field.name);
            let value = match mapping.get(&field.name) {
                Some(node) => self.de_value(&field.descriptor, node, &field_path)?,
                None => match (&field.default, &field.descriptor) {
                    (Some(default), _) => self.de_value(&field.descriptor, default, &field_path)?,
                    (None, Descriptor::Optional(_)) => TypedValue::None,
                    (None, _) => return Err(Error::MissingField { path: field_path }),
                },
            };
            fields.insert(field.name.clone(), value);
        }
        Ok(Instance::new(schema.name.clone(), fields))
    }

    fn de_value(&self, descriptor: &Descriptor, node: &Value, path: &str) -> Result<TypedValue> {
        match descriptor {
            Descriptor::Scalar(primitive) => de_scalar(*primitive, node, path),
            Descriptor::Optional(inner) => {
                if node.is_null() {
                    Ok(TypedValue::None)
                } else {
                    self.de_value(inner, node, path)
                }
            }
            Descriptor::Enumeration(table) => match node {
                Value::String(_) | Value::Int(_) | Value::Float(_) => {
                    match table.symbol_for(node) {
                        Some(symbol) => Ok(TypedValue::Symbol(symbol.to_owned())),
                        None => Err(Error::UnknownEnumValue {
                            path: path.to_owned(),
                            raw: scalar_text(node),
                        }),
                    }
                }
                _ => Err(mismatch(path, "string or number", node)),
            },
            Descriptor::Nested(name) => {
                let nested = self.compiled(name)?;
                self.de_instance(&nested, node, path).map(TypedValue::Instance)
            }
            Descriptor::Sequence(inner) => {
                let items = node
                    .as_sequence()
                    .ok_or_else(|| mismatch(path, "sequence", node))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.de_value(inner, item, &index_path(path, i)))
                    .collect::<Result<Vec<_>>>()
                    .map(TypedValue::Seq)
            }
            Descriptor::Mapping(inner) => {
                let entries = node
                    .as_mapping()
                    .ok_or_else(|| mismatch(path, "mapping", node))?;
                entries
                    .iter()
                    .map(|(key, item)| {
                        self.de_value(inner, item, &field_path(path, key))
                            .map(|v| (key.clone(), v))
                    })
                    .collect::<Result<IndexMap<_, _>>>()
                    .map(TypedValue::Map)
            }
            Descriptor::Raw => Ok(TypedValue::Raw(node.clone())),
        }
    }

    fn ser_instance(&self, schema: &CompiledSchema, instance: &Instance, path: &str) -> Result<Value> {
        let mut out = IndexMap::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let field_path = field_path(path, &field.name);
            match instance.get(&field.name) {
                // "no value" means the key is omitted, not emitted as null.
                Some(TypedValue::None) => {
                    if !matches!(field.descriptor, Descriptor::Optional(_)) {
                        return Err(Error::MissingField { path: field_path });
                    }
                }
                Some(value) => {
                    out.insert(
                        field.name.clone(),
                        self.ser_value(&field.descriptor, value, &field_path)?,
                    );
                }
                None => {
                    if !matches!(field.descriptor, Descriptor::Optional(_)) {
                        return Err(Error::MissingField { path: field_path });
                    }
                }
            }
        }
        Ok(Value::Mapping(out))
    }

    fn ser_value(&self, descriptor: &Descriptor, value: &TypedValue, path: &str) -> Result<Value> {
        match (descriptor, value) {
            (Descriptor::Optional(_), TypedValue::None) => Ok(Value::Null),
            (Descriptor::Optional(inner), _) => self.ser_value(inner, value, path),
            (Descriptor::Scalar(Primitive::Bool), TypedValue::Bool(b)) => Ok(Value::Bool(*b)),
            (Descriptor::Scalar(Primitive::Int), TypedValue::Int(i)) => Ok(Value::Int(*i)),
            (Descriptor::Scalar(Primitive::Float), TypedValue::Float(f)) => Ok(Value::Float(*f)),
            (Descriptor::Scalar(Primitive::Float), TypedValue::Int(i)) => {
                Ok(Value::Float(OrderedFloat(*i as f64)))
            }
            (Descriptor::Scalar(Primitive::Str), TypedValue::Str(s)) => {
                Ok(Value::String(s.clone()))
            }
            (Descriptor::Enumeration(table), TypedValue::Symbol(symbol)) => {
                table.raw_for(symbol).cloned().ok_or_else(|| {
                    Error::schema(format!(
                        "`{path}`: enumeration `{}` has no member `{symbol}`",
                        table.name()
                    ))
                })
            }
            (Descriptor::Nested(name), TypedValue::Instance(nested)) => {
                let compiled = self.compiled(name)?;
                self.ser_instance(&compiled, nested, path)
            }
            (Descriptor::Sequence(inner), TypedValue::Seq(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.ser_value(inner, item, &index_path(path, i)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            (Descriptor::Mapping(inner), TypedValue::Map(entries)) => entries
                .iter()
                .map(|(key, item)| {
                    self.ser_value(inner, item, &field_path(path, key))
                        .map(|v| (key.clone(), v))
                })
                .collect::<Result<IndexMap<_, _>>>()
                .map(Value::Mapping),
            (Descriptor::Raw, TypedValue::Raw(node)) => Ok(node.clone()),
            (descriptor, value) => Err(Error::schema(format!(
                "`{path}`: value {value:?} does not conform to declared type ({})",
                descriptor.expected()
            ))),
        }
    }
}

fn de_scalar(primitive: Primitive, node: &Value, path: &str) -> Result<TypedValue> {
    match (primitive, node) {
        (Primitive::Bool, Value::Bool(b)) => Ok(TypedValue::Bool(*b)),
        (Primitive::Int, Value::Int(i)) => Ok(TypedValue::Int(*i)),
        (Primitive::Float, Value::Float(f)) => Ok(TypedValue::Float(*f)),
        // The single permitted coercion: numeric widening.
        (Primitive::Float, Value::Int(i)) => Ok(TypedValue::Float(OrderedFloat(*i as f64))),
        (Primitive::Str, Value::String(s)) => Ok(TypedValue::Str(s.clone())),
        _ => Err(mismatch(path, primitive.name(), node)),
    }
}

fn mismatch(path: &str, expected: &'static str, node: &Value) -> Error {
    Error::TypeMismatch {
        path: root_path(path).into(),
        expected,
        actual: node.kind(),
    }
}

/// Render a scalar for diagnostics, without quoting.
fn scalar_text(node: &Value) -> String {
    match node {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

fn field_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_owned()
    } else {
        format!("{path}.{name}")
    }
}

fn index_path(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

fn root_path(path: &str) -> &str {
    if path.is_empty() { "." } else { path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, SchemaDef, TypeExpr};

    fn registry() -> SchemaRegistry {
        let reg = SchemaRegistry::new();
        reg.register_enum(
            EnumDef::new("Color")
                .member("RED", "red")
                .member("GREEN", "green")
                .member("BLUE", "blue"),
        )
        .unwrap();
        reg.register_schema(
            SchemaDef::new("Food")
                .field("name", TypeExpr::Str)
                .field("color", TypeExpr::optional(TypeExpr::enumeration("Color"))),
        )
        .unwrap();
        reg.register_schema(
            SchemaDef::new("Human")
                .field("id", TypeExpr::Int)
                .field("name", TypeExpr::Str)
                .field("favorites", TypeExpr::seq(TypeExpr::schema("Food"))),
        )
        .unwrap();
        reg
    }

    fn tom() -> Value {
        Value::from_pairs([
            ("id", Value::from(1)),
            ("name", Value::from("Tom")),
            (
                "favorites",
                Value::Sequence(vec![
                    Value::from_pairs([
                        ("name", Value::from("Apple")),
                        ("color", Value::from("red")),
                    ]),
                    Value::from_pairs([("name", Value::from("Orange"))]),
                ]),
            ),
        ])
    }

    #[test]
    fn nested_deserialize_and_field_access() {
        let reg = registry();
        let human = reg.deserialize("Human", &tom()).unwrap();
        assert_eq!(human.get("id"), Some(&TypedValue::Int(1)));
        let favorites = match human.get("favorites").unwrap() {
            TypedValue::Seq(xs) => xs,
            other => panic!("expected sequence, got {other:?}"),
        };
        assert_eq!(favorites.len(), 2);
        match &favorites[0] {
            TypedValue::Instance(apple) => {
                assert_eq!(apple.get("color"), Some(&TypedValue::Symbol("RED".into())));
            }
            other => panic!("expected instance, got {other:?}"),
        }
        assert_eq!(favorites[1], TypedValue::Instance(Instance::new(
            "Food",
            [
                ("name", TypedValue::from("Orange")),
                ("color", TypedValue::None),
            ],
        )));
    }

    #[test]
    fn int_widens_to_float_but_not_the_reverse() {
        let reg = SchemaRegistry::new();
        reg.register_schema(SchemaDef::new("P").field("x", TypeExpr::Float))
            .unwrap();
        reg.register_schema(SchemaDef::new("Q").field("n", TypeExpr::Int))
            .unwrap();

        let p = reg.deserialize("P", &Value::from_pairs([("x", Value::from(3))])).unwrap();
        assert_eq!(p.get("x"), Some(&TypedValue::from(3.0)));

        let err = reg
            .deserialize("Q", &Value::from_pairs([("n", Value::from(3.5))]))
            .unwrap_err();
        match err {
            Error::TypeMismatch { path, expected, actual } => {
                assert_eq!(path, "n");
                assert_eq!(expected, "int");
                assert_eq!(actual, "float");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_required_field_names_path() {
        let reg = registry();
        let err = reg
            .deserialize("Human", &Value::from_pairs::<&str, _>([]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { ref path } if path == "id"));
    }

    #[test]
    fn unknown_enum_value_names_path_and_raw() {
        let reg = registry();
        let node = Value::from_pairs([
            ("name", Value::from("Plum")),
            ("color", Value::from("purple")),
        ]);
        let err = reg.deserialize("Food", &node).unwrap_err();
        match err {
            Error::UnknownEnumValue { path, raw } => {
                assert_eq!(path, "color");
                assert_eq!(raw, "purple");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nested_error_paths_are_dotted_and_indexed() {
        let reg = registry();
        let mut node = tom();
        if let Value::Mapping(m) = &mut node {
            m.insert(
                "favorites".into(),
                Value::Sequence(vec![Value::from_pairs([("name", Value::from(9))])]),
            );
        }
        let err = reg.deserialize("Human", &node).unwrap_err();
        match err {
            Error::TypeMismatch { path, .. } => assert_eq!(path, "favorites[0].name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_keys_are_ignored() {
        let reg = registry();
        let node = Value::from_pairs([
            ("name", Value::from("Apple")),
            ("hogehoge", Value::from("ooooo")),
        ]);
        let food = reg.deserialize("Food", &node).unwrap();
        assert!(food.get("hogehoge").is_none());
        let tree = reg.serialize(&food).unwrap();
        assert_eq!(tree, Value::from_pairs([("name", Value::from("Apple"))]));
    }

    #[test]
    fn explicit_null_and_absence_both_mean_no_value() {
        let reg = registry();
        let absent = reg
            .deserialize("Food", &Value::from_pairs([("name", Value::from("Apple"))]))
            .unwrap();
        let null = reg
            .deserialize(
                "Food",
                &Value::from_pairs([("name", Value::from("Apple")), ("color", Value::Null)]),
            )
            .unwrap();
        assert_eq!(absent, null);
        assert_eq!(absent.get("color"), Some(&TypedValue::None));
    }

    #[test]
    fn null_for_required_field_is_a_mismatch() {
        let reg = registry();
        let err = reg
            .deserialize("Food", &Value::from_pairs([("name", Value::Null)]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref path, .. } if path == "name"));
    }

    #[test]
    fn default_applies_only_when_absent() {
        let reg = SchemaRegistry::new();
        reg.register_schema(
            SchemaDef::new("Machine")
                .field("id", TypeExpr::Int)
                .field_def(
                    crate::schema::FieldDef::new("name", TypeExpr::Str).with_default("unnamed"),
                ),
        )
        .unwrap();

        let defaulted = reg
            .deserialize("Machine", &Value::from_pairs([("id", Value::from(1))]))
            .unwrap();
        assert_eq!(defaulted.get("name"), Some(&TypedValue::from("unnamed")));

        let named = reg
            .deserialize(
                "Machine",
                &Value::from_pairs([("id", Value::from(1)), ("name", Value::from("press"))]),
            )
            .unwrap();
        assert_eq!(named.get("name"), Some(&TypedValue::from("press")));
    }

    #[test]
    fn raw_field_passes_any_tree_through() {
        let reg = SchemaRegistry::new();
        reg.register_schema(SchemaDef::new("Envelope").field("payload", TypeExpr::Any))
            .unwrap();
        let node = Value::from_pairs([(
            "payload",
            Value::Sequence(vec![Value::from(1), Value::from_pairs([("k", Value::Null)])]),
        )]);
        let envelope = reg.deserialize("Envelope", &node).unwrap();
        assert_eq!(reg.serialize(&envelope).unwrap(), node);
    }

    #[test]
    fn mapping_field_round_trips() {
        let reg = SchemaRegistry::new();
        reg.register_schema(
            SchemaDef::new("Entry")
                .field("name", TypeExpr::Str)
                .field("names_by_lang", TypeExpr::optional(TypeExpr::map(TypeExpr::Str))),
        )
        .unwrap();
        let node = Value::from_pairs([
            ("name", Value::from("Apple")),
            (
                "names_by_lang",
                Value::from_pairs([("en", Value::from("Apple")), ("de", Value::from("Apfel"))]),
            ),
        ]);
        let entry = reg.deserialize("Entry", &node).unwrap();
        assert_eq!(reg.serialize(&entry).unwrap(), node);
    }

    #[test]
    fn serialize_omits_no_value_and_keeps_declared_order() {
        let reg = registry();
        let food = reg
            .deserialize("Food", &Value::from_pairs([("name", Value::from("Apple"))]))
            .unwrap();
        let tree = reg.serialize(&food).unwrap();
        let mapping = tree.as_mapping().unwrap();
        assert!(!mapping.contains_key("color"));
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn round_trip_is_identity_and_idempotent() {
        let reg = registry();
        let human = reg.deserialize("Human", &tom()).unwrap();
        let tree = reg.serialize(&human).unwrap();
        assert_eq!(reg.deserialize("Human", &tree).unwrap(), human);
        assert_eq!(reg.serialize(&human).unwrap(), tree);
    }

    #[test]
    fn sequence_of_instances() {
        let reg = registry();
        let node = Value::Sequence(vec![
            Value::from_pairs([("name", Value::from("Apple"))]),
            Value::from_pairs([("name", Value::from("Orange"))]),
        ]);
        let foods = reg.deserialize_sequence("Food", &node).unwrap();
        assert_eq!(foods.len(), 2);
        assert_eq!(reg.serialize_sequence(&foods).unwrap(), node);

        let err = reg
            .deserialize_sequence(
                "Food",
                &Value::Sequence(vec![Value::from_pairs::<&str, _>([])]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { ref path } if path == "[0].name"));
    }

    #[test]
    fn numeric_enum_raw_values() {
        let reg = SchemaRegistry::new();
        reg.register_enum(EnumDef::new("Level").member("LOW", Value::Int(1)).member(
            "HIGH",
            Value::Int(2),
        ))
        .unwrap();
        reg.register_schema(SchemaDef::new("Alarm").field("level", TypeExpr::enumeration("Level")))
            .unwrap();

        let alarm = reg
            .deserialize("Alarm", &Value::from_pairs([("level", Value::from(2))]))
            .unwrap();
        assert_eq!(alarm.get("level"), Some(&TypedValue::Symbol("HIGH".into())));
        assert_eq!(
            reg.serialize(&alarm).unwrap(),
            Value::from_pairs([("level", Value::from(2))]),
        );
    }
}
