//! The context holder entries read from and write to.
//!
//! A [`Context`] pairs an in-memory raw key/value tree with the generic serde
//! fallback transforms (`deserialize`/`serialize`). How the tree got here —
//! file, database, remote service — is the persistence layer's business, not
//! this crate's: a context never touches the filesystem or the network.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SchemaError;
use crate::types::{Raw, RawTable};

/// Raw-data holder handed to every parse/serialize call.
#[derive(Debug, Clone, Default)]
pub struct Context {
    data: RawTable,
}

impl Context {
    /// An empty context. Reads against it fall through to entry defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing raw table.
    pub fn from_table(data: RawTable) -> Self {
        Context { data }
    }

    pub fn table(&self) -> &RawTable {
        &self.data
    }

    pub fn into_table(self) -> RawTable {
        self.data
    }

    /// Look up a raw value by dotted key path (e.g. `"database.url"`).
    pub fn get_raw(&self, dotted_key: &str) -> Option<&Raw> {
        let (path, leaf) = match dotted_key.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, dotted_key),
        };

        let tbl = match path {
            Some(path) => {
                let mut current = &self.data;
                for segment in path.split('.') {
                    current = current.get(segment)?.as_table()?;
                }
                current
            }
            None => &self.data,
        };

        tbl.get(leaf)
    }

    /// Set a raw value at a dotted key path, creating intermediate tables as
    /// needed. A non-table value sitting on an intermediate segment is
    /// replaced by a table.
    pub fn set_raw(&mut self, dotted_key: &str, raw: Raw) {
        let segments: Vec<&str> = dotted_key.split('.').collect();
        let mut current = &mut self.data;

        for segment in &segments[..segments.len() - 1] {
            let slot = current
                .entry(segment.to_string())
                .or_insert_with(|| Raw::Table(RawTable::new()));
            if !slot.is_table() {
                *slot = Raw::Table(RawTable::new());
            }
            let Raw::Table(tbl) = slot else { return };
            current = tbl;
        }

        if let Some(leaf) = segments.last() {
            current.insert(leaf.to_string(), raw);
        }
    }

    /// Remove the raw value at a dotted key path, returning it if present.
    /// Intermediate tables are left in place.
    pub fn remove_raw(&mut self, dotted_key: &str) -> Option<Raw> {
        let (path, leaf) = match dotted_key.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, dotted_key),
        };

        let tbl = match path {
            Some(path) => {
                let mut current = &mut self.data;
                for segment in path.split('.') {
                    current = current.get_mut(segment)?.as_table_mut()?;
                }
                current
            }
            None => &mut self.data,
        };

        tbl.remove(leaf)
    }

    /// Generic fallback parse: convert a raw value into any deserializable
    /// type. Used by the builders when no explicit parse function bridges a
    /// step; failures surface as adapter-resolution errors, never coerced.
    pub fn deserialize<T: DeserializeOwned>(&self, raw: &Raw) -> Result<T, SchemaError> {
        raw.clone()
            .try_into()
            .map_err(|e: toml::de::Error| SchemaError::Deserialize {
                target: std::any::type_name::<T>(),
                reason: e.to_string(),
            })
    }

    /// Generic fallback serialize: convert any serializable value into a raw
    /// value.
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Raw, SchemaError> {
        Raw::try_from(value).map_err(|e| SchemaError::Serialize {
            source_type: std::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{SERVER_DOC, ctx};

    #[test]
    fn get_flat_key() {
        let ctx = ctx("port = 8080");
        assert_eq!(ctx.get_raw("port").unwrap().as_integer(), Some(8080));
    }

    #[test]
    fn get_nested_key() {
        let ctx = ctx("[database]\npool_size = 5");
        let val = ctx.get_raw("database.pool_size").unwrap();
        assert_eq!(val.as_integer(), Some(5));
    }

    #[test]
    fn get_missing_key() {
        let ctx = ctx("port = 8080");
        assert!(ctx.get_raw("nope").is_none());
        assert!(ctx.get_raw("port.deeper").is_none());
    }

    #[test]
    fn reads_across_a_layered_document() {
        let ctx = ctx(SERVER_DOC);
        assert_eq!(ctx.get_raw("host").unwrap().as_str(), Some("localhost"));
        assert_eq!(
            ctx.get_raw("database.url").unwrap().as_str(),
            Some("postgres://localhost/app")
        );
        assert_eq!(
            ctx.get_raw("database.pool-size").unwrap().as_integer(),
            Some(5)
        );
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut ctx = Context::new();
        ctx.set_raw("database.pool.size", Raw::Integer(5));
        assert_eq!(
            ctx.get_raw("database.pool.size").unwrap().as_integer(),
            Some(5)
        );
    }

    #[test]
    fn set_overwrites_scalar_on_path() {
        let mut ctx = ctx("database = 1");
        ctx.set_raw("database.url", Raw::String("x".into()));
        assert_eq!(ctx.get_raw("database.url").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn remove_returns_value() {
        let mut ctx = ctx("[database]\nurl = \"postgres://\"");
        let removed = ctx.remove_raw("database.url").unwrap();
        assert_eq!(removed.as_str(), Some("postgres://"));
        assert!(ctx.get_raw("database.url").is_none());
        // Parent table survives.
        assert!(ctx.get_raw("database").is_some());
    }

    #[test]
    fn deserialize_fallback() {
        let ctx = Context::new();
        let n: u16 = ctx.deserialize(&Raw::Integer(8080)).unwrap();
        assert_eq!(n, 8080);
        let s: String = ctx.deserialize(&Raw::String("hi".into())).unwrap();
        assert_eq!(s, "hi");
    }

    #[test]
    fn deserialize_mismatch_is_adapter_error() {
        let ctx = Context::new();
        let res: Result<u16, _> = ctx.deserialize(&Raw::String("not a number".into()));
        assert!(matches!(res, Err(SchemaError::Deserialize { .. })));
    }

    #[test]
    fn serialize_fallback() {
        let ctx = Context::new();
        let raw = ctx.serialize(&8080i64).unwrap();
        assert_eq!(raw.as_integer(), Some(8080));
    }
}
