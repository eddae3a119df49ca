//! Per-entry metadata shared by all entry kinds: the logical type descriptor,
//! the default supplier, and the registration slots (path key, version) an
//! external declaration pass fills in through the builders.

use crate::default::DefaultSource;
use crate::error::SchemaError;
use crate::types::ValueType;

#[derive(Debug, Clone)]
pub struct ValueManifest<T> {
    value_type: ValueType,
    default: DefaultSource<T>,
    path: Option<String>,
    version: u32,
}

impl<T> ValueManifest<T> {
    pub(crate) fn new(
        value_type: ValueType,
        default: DefaultSource<T>,
        path: Option<String>,
        version: u32,
    ) -> Self {
        ValueManifest {
            value_type,
            default,
            path,
            version,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The stable path key used for persistence lookups, if bound.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Path key, or a definition error naming the fix when unbound.
    pub(crate) fn require_path(&self) -> Result<&str, SchemaError> {
        self.path.as_deref().ok_or(SchemaError::Unbound {
            type_name: self.value_type.name(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn has_default(&self) -> bool {
        !self.default.is_none()
    }
}

impl<T: Clone> ValueManifest<T> {
    /// Materialize a fresh default. Factories run on every call; fixed
    /// values are cloned on every call.
    pub fn default_value(&self) -> Option<T> {
        self.default.materialize()
    }
}
