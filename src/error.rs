use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(
        "No parse function for source type '{source_type}' to value type '{value}' — call .parse() on the builder"
    )]
    MissingParser {
        source_type: &'static str,
        value: &'static str,
    },

    #[error("No key parse function for key type '{key}' — call .parse_key() on the builder")]
    MissingKeyParser { key: &'static str },

    #[error("Entry of type '{type_name}' is not bound to a path — call .path() on the builder")]
    Unbound { type_name: &'static str },

    #[error("An entry is already registered at path '{path}'")]
    DuplicatePath { path: String },

    #[error("Failed to parse element [{index}] (raw: {raw}): {source}")]
    Element {
        index: usize,
        raw: String,
        source: Box<SchemaError>,
    },

    #[error("Failed to parse entry '{key}' (raw: {raw}): {source}")]
    Entry {
        key: String,
        raw: String,
        source: Box<SchemaError>,
    },

    #[error("Expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Cannot convert raw value into '{target}': {reason}")]
    Deserialize {
        target: &'static str,
        reason: String,
    },

    #[error("Cannot convert '{source_type}' into a raw value: {reason}")]
    Serialize {
        source_type: &'static str,
        reason: String,
    },

    #[error("Invalid value: {0}")]
    Invalid(String),
}

impl SchemaError {
    /// Transform failure with a custom reason, for use inside parse/serialize
    /// functions supplied to the builders.
    pub fn invalid(reason: impl Into<String>) -> Self {
        SchemaError::Invalid(reason.into())
    }

    /// Wrap an element-level failure with its index and offending raw value.
    pub(crate) fn at_index(self, index: usize, raw: &crate::types::Raw) -> Self {
        SchemaError::Element {
            index,
            raw: raw.to_string(),
            source: Box::new(self),
        }
    }

    /// Wrap an entry-level failure with its key and offending raw value.
    pub(crate) fn at_key(self, key: &str, raw: &crate::types::Raw) -> Self {
        SchemaError::Entry {
            key: key.to_string(),
            raw: raw.to_string(),
            source: Box::new(self),
        }
    }

    /// True for errors raised while defining a schema (as opposed to errors
    /// raised while transforming data at read/write time).
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            SchemaError::MissingParser { .. }
                | SchemaError::MissingKeyParser { .. }
                | SchemaError::Unbound { .. }
                | SchemaError::DuplicatePath { .. }
        )
    }
}
