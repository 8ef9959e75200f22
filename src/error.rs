//! Crate-wide error taxonomy.
//!
//! Conversion failures carry the dotted field path from the schema root
//! (`favorites[1].name`) so the caller can point at the offending node
//! without replaying the walk.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema itself is malformed. Surfaced at first use, not at
    /// registration.
    #[error("schema error: {0}")]
    Schema(String),

    #[error("type mismatch at `{path}`: expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown enumeration value at `{path}`: `{raw}`")]
    UnknownEnumValue { path: String, raw: String },

    #[error("missing required field `{path}`")]
    MissingField { path: String },

    #[error("field `{path}` cannot be flattened to a single cell")]
    NotFlattenable { path: String },

    #[error("JSON codec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML codec: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV codec: {0}")]
    Csv(#[from] csv::Error),

    /// Adapter-level failure with no upstream error value (e.g. a YAML
    /// mapping key that is not a scalar).
    #[error("codec: {0}")]
    Codec(String),
}

impl Error {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
