//! Schema registry: a flat, path-keyed index over heterogeneous entries.
//!
//! Entries are registered behind the object-safe [`SchemaEntry`] trait so
//! scalars, lists, sets and maps of any logical type can share one registry.
//! Registration requires a bound path and rejects duplicates; iteration
//! follows registration order.

use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::error::SchemaError;
use crate::list::ConfiguredList;
use crate::map::{ConfigMap, ConfiguredMap};
use crate::set::ConfiguredSet;
use crate::types::ValueType;
use crate::value::ConfiguredValue;

/// Type-erased view over a configured entry, enough for registry bookkeeping
/// and introspection.
pub trait SchemaEntry: Send + Sync {
    /// The dotted path this entry is bound to, if any.
    fn path(&self) -> Option<&str>;

    /// The declared schema version of the entry.
    fn version(&self) -> u32;

    /// Descriptor of the entry's logical type as a whole (the collection
    /// type for list/set/map entries).
    fn value_type(&self) -> ValueType;

    /// Readable name of the entry's logical type.
    fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    /// Element descriptor for collection entries.
    fn element_type(&self) -> Option<ValueType> {
        None
    }

    /// Key descriptor for map entries.
    fn key_type(&self) -> Option<ValueType> {
        None
    }
}

impl<V> SchemaEntry for ConfiguredValue<V>
where
    V: Send + Sync + 'static,
{
    fn path(&self) -> Option<&str> {
        ConfiguredValue::path(self)
    }

    fn version(&self) -> u32 {
        ConfiguredValue::version(self)
    }

    fn value_type(&self) -> ValueType {
        ConfiguredValue::value_type(self)
    }
}

impl<V> SchemaEntry for ConfiguredList<V>
where
    V: Send + Sync + 'static,
{
    fn path(&self) -> Option<&str> {
        ConfiguredList::path(self)
    }

    fn version(&self) -> u32 {
        ConfiguredList::version(self)
    }

    fn value_type(&self) -> ValueType {
        ValueType::of::<Vec<V>>()
    }

    fn element_type(&self) -> Option<ValueType> {
        Some(self.elem_type())
    }
}

impl<V> SchemaEntry for ConfiguredSet<V>
where
    V: Eq + Hash + Send + Sync + 'static,
{
    fn path(&self) -> Option<&str> {
        ConfiguredSet::path(self)
    }

    fn version(&self) -> u32 {
        ConfiguredSet::version(self)
    }

    fn value_type(&self) -> ValueType {
        ValueType::of::<IndexSet<V>>()
    }

    fn element_type(&self) -> Option<ValueType> {
        Some(self.elem_type())
    }
}

impl<K, V> SchemaEntry for ConfiguredMap<K, V>
where
    K: Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn path(&self) -> Option<&str> {
        ConfiguredMap::path(self)
    }

    fn version(&self) -> u32 {
        ConfiguredMap::version(self)
    }

    fn value_type(&self) -> ValueType {
        ValueType::of::<ConfigMap<K, V>>()
    }

    fn element_type(&self) -> Option<ValueType> {
        Some(self.elem_type())
    }

    fn key_type(&self) -> Option<ValueType> {
        Some(ConfiguredMap::key_type(self))
    }
}

/// A registration-ordered index of entries by dotted path.
#[derive(Default)]
pub struct Schema {
    entries: IndexMap<String, Box<dyn SchemaEntry>>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Register an entry under its bound path. Fails when the entry was never
    /// bound with `.path(...)` or when the path is already taken.
    pub fn register(&mut self, entry: impl SchemaEntry + 'static) -> Result<(), SchemaError> {
        let Some(path) = entry.path() else {
            return Err(SchemaError::Unbound {
                type_name: entry.value_type().name(),
            });
        };
        let path = path.to_string();
        if self.entries.contains_key(&path) {
            return Err(SchemaError::DuplicatePath { path });
        }
        self.entries.insert(path, Box::new(entry));
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&dyn SchemaEntry> {
        self.entries.get(path).map(Box::as_ref)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn SchemaEntry)> {
        self.entries.iter().map(|(p, e)| (p.as_str(), e.as_ref()))
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("paths", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_entry() -> ConfiguredValue<String> {
        ConfiguredValue::builder()
            .from_string()
            .defaults("localhost".to_string())
            .path("server.host")
            .build()
            .unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let mut schema = Schema::new();
        schema.register(host_entry()).unwrap();

        let entry = schema.get("server.host").unwrap();
        assert_eq!(entry.path(), Some("server.host"));
        assert!(entry.value_type().is_string());
        assert_eq!(entry.element_type(), None);
        assert_eq!(entry.key_type(), None);
    }

    #[test]
    fn unbound_entry_is_rejected() {
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .build()
            .unwrap();

        let mut schema = Schema::new();
        let err = schema.register(entry).unwrap_err();
        assert!(matches!(err, SchemaError::Unbound { .. }));
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let mut schema = Schema::new();
        schema.register(host_entry()).unwrap();
        let err = schema.register(host_entry()).unwrap_err();
        match err {
            SchemaError::DuplicatePath { path } => assert_eq!(path, "server.host"),
            other => panic!("Expected DuplicatePath, got {other:?}"),
        }
    }

    #[test]
    fn iteration_follows_registration_order() {
        let list = ConfiguredList::<String>::builder()
            .from_string()
            .path("server.aliases")
            .build()
            .unwrap();
        let map = ConfiguredMap::<String, String>::builder()
            .as_linked_map()
            .from_string()
            .path("users")
            .build()
            .unwrap();

        let mut schema = Schema::new();
        schema.register(list).unwrap();
        schema.register(map).unwrap();
        schema.register(host_entry()).unwrap();

        let paths: Vec<&str> = schema.paths().collect();
        assert_eq!(paths, ["server.aliases", "users", "server.host"]);

        let map_entry = schema.get("users").unwrap();
        assert!(map_entry.key_type().unwrap().is_string());
        assert!(map_entry.element_type().unwrap().is_string());
    }
}
