//! treeform: schema-driven conversion between typed records and the
//! untyped value trees behind JSON, YAML and CSV.
//!
//! Declare a shape once as a [`SchemaDef`] (fields with semantic types:
//! scalars, optionals, enumerations, nested schemas, sequences, mappings),
//! register it, and convert instances in both directions without
//! per-field marshalling code:
//!
//! - raw text → codec → [`Value`] tree → engine → [`Instance`]
//! - [`Instance`] → engine → [`Value`] tree → codec → raw text
//! - `[Instance]` → engine → flattener → [`Table`] → CSV
//!
//! ```
//! use treeform::{SchemaDef, SchemaRegistry, TypeExpr, TypedValue};
//!
//! let reg = SchemaRegistry::new();
//! reg.register_schema(
//!     SchemaDef::new("Machine")
//!         .field("id", TypeExpr::Int)
//!         .field("name", TypeExpr::optional(TypeExpr::Str)),
//! )
//! .unwrap();
//!
//! let machine = reg.from_json("Machine", r#"{"id": 1}"#).unwrap();
//! assert_eq!(machine.get("id"), Some(&TypedValue::Int(1)));
//! assert_eq!(reg.to_json(&machine, false).unwrap(), r#"{"id":1}"#);
//! ```

pub mod codec;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod instance;
pub mod registry;
pub mod schema;
pub mod value;

pub use codec::{decode_json, decode_yaml, encode_json, encode_yaml, write_csv, CsvOptions};
pub use descriptor::{CompiledSchema, Descriptor, EnumTable, Primitive};
pub use error::{Error, Result};
pub use flatten::{FlattenOptions, Table};
pub use instance::{Instance, TypedValue};
pub use registry::SchemaRegistry;
pub use schema::{EnumDef, FieldDef, SchemaDef, TypeExpr};
pub use value::Value;
