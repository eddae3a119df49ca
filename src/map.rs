//! Map entries: raw-string keys and source-typed values under one path key.
//!
//! The backing structure is part of the entry's identity. It is selected on
//! the creator stage (`as_hash_map` / `as_linked_map` / `as_tree_map`, or any
//! custom constructor) and determines the iteration order of everything the
//! entry materializes: hash gives no order guarantee, linked follows
//! insertion, sorted follows `Ord` on the keys. Key and value adapters are
//! independent; each gets the string identity fast path on its own.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::adapter::{
    ParseFn, SerializeFn, ValueAdapter, compose_parser, compose_serializer, identity_cast,
    identity_parser, identity_ref, identity_serializer,
};
use crate::context::Context;
use crate::default::DefaultSource;
use crate::error::SchemaError;
use crate::manifest::ValueManifest;
use crate::types::{MapKind, Raw, RawTable, ValueType};

/// A map materialized by a [`ConfiguredMap`] entry, tagged with its backing
/// structure.
#[derive(Debug, Clone)]
pub enum ConfigMap<K, V> {
    Hash(HashMap<K, V>),
    Linked(IndexMap<K, V>),
    Sorted(BTreeMap<K, V>),
}

impl<K, V> ConfigMap<K, V>
where
    K: Eq + Hash + Ord,
{
    pub fn new(kind: MapKind) -> Self {
        match kind {
            MapKind::Hash => ConfigMap::Hash(HashMap::new()),
            MapKind::Linked => ConfigMap::Linked(IndexMap::new()),
            MapKind::Sorted => ConfigMap::Sorted(BTreeMap::new()),
        }
    }

    pub fn kind(&self) -> MapKind {
        match self {
            ConfigMap::Hash(_) => MapKind::Hash,
            ConfigMap::Linked(_) => MapKind::Linked,
            ConfigMap::Sorted(_) => MapKind::Sorted,
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self {
            ConfigMap::Hash(m) => m.insert(key, value),
            ConfigMap::Linked(m) => m.insert(key, value),
            ConfigMap::Sorted(m) => m.insert(key, value),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self {
            ConfigMap::Hash(m) => m.get(key),
            ConfigMap::Linked(m) => m.get(key),
            ConfigMap::Sorted(m) => m.get(key),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        match self {
            ConfigMap::Hash(m) => m.len(),
            ConfigMap::Linked(m) => m.len(),
            ConfigMap::Sorted(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate in the backing structure's order.
    pub fn iter(&self) -> ConfigMapIter<'_, K, V> {
        match self {
            ConfigMap::Hash(m) => ConfigMapIter::Hash(m.iter()),
            ConfigMap::Linked(m) => ConfigMapIter::Linked(m.iter()),
            ConfigMap::Sorted(m) => ConfigMapIter::Sorted(m.iter()),
        }
    }
}

/// Iterator over a [`ConfigMap`] in backing order.
pub enum ConfigMapIter<'a, K, V> {
    Hash(std::collections::hash_map::Iter<'a, K, V>),
    Linked(indexmap::map::Iter<'a, K, V>),
    Sorted(std::collections::btree_map::Iter<'a, K, V>),
}

impl<'a, K, V> Iterator for ConfigMapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ConfigMapIter::Hash(it) => it.next(),
            ConfigMapIter::Linked(it) => it.next(),
            ConfigMapIter::Sorted(it) => it.next(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a ConfigMap<K, V>
where
    K: Eq + Hash + Ord,
{
    type Item = (&'a K, &'a V);
    type IntoIter = ConfigMapIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Order-insensitive equality: same size, same key/value associations. The
/// backing kind is deliberately not compared.
impl<K, V> PartialEq for ConfigMap<K, V>
where
    K: Eq + Hash + Ord,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

type MapConstructor<K, V> = Arc<dyn Fn() -> ConfigMap<K, V> + Send + Sync>;
type KeyParseFn<K> = Arc<dyn Fn(&Context, &str) -> Result<K, SchemaError> + Send + Sync>;
type KeySerializeFn<K> = Arc<dyn Fn(&Context, &K) -> Result<String, SchemaError> + Send + Sync>;

/// Creator stage for a map entry: pick the backing structure, then bind the
/// value source type with `from`.
pub struct ConfigMapCreator<K, V> {
    constructor: MapConstructor<K, V>,
}

impl<K, V> ConfigMapCreator<K, V>
where
    K: Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Starts with the unordered (hash) backing, used when no backing is
    /// ever selected.
    pub(crate) fn new() -> Self {
        ConfigMapCreator {
            constructor: Arc::new(|| ConfigMap::new(MapKind::Hash)),
        }
    }

    /// Unordered backing.
    pub fn as_hash_map(mut self) -> Self {
        self.constructor = Arc::new(|| ConfigMap::new(MapKind::Hash));
        self
    }

    /// Insertion-ordered backing.
    pub fn as_linked_map(mut self) -> Self {
        self.constructor = Arc::new(|| ConfigMap::new(MapKind::Linked));
        self
    }

    /// Key-sorted backing.
    pub fn as_tree_map(mut self) -> Self {
        self.constructor = Arc::new(|| ConfigMap::new(MapKind::Sorted));
        self
    }

    /// Custom backing constructor, e.g. a pre-seeded map.
    pub fn constructor<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> ConfigMap<K, V> + Send + Sync + 'static,
    {
        self.constructor = Arc::new(factory);
        self
    }

    /// Bind the value source type. Key identity is pre-registered when `K`
    /// is exactly `String`; value identity when `S` is exactly `V`.
    pub fn from<S>(self) -> SourceMapBuilder<S, K, V>
    where
        S: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let key_identity = ValueType::of::<K>().is_string();
        let value_identity = ValueType::of::<S>() == ValueType::of::<V>();
        SourceMapBuilder {
            constructor: self.constructor,
            source_type: ValueType::of::<S>(),
            key_parser: key_identity.then(identity_key_parser::<K>),
            key_serializer: key_identity.then(identity_key_serializer::<K>),
            value_parser: value_identity.then(identity_parser::<S, V>),
            value_serializer: value_identity.then(identity_serializer::<S, V>),
            default: DefaultSource::None,
            path: None,
            version: 1,
            _marker: PhantomData,
        }
    }

    /// Sugar for `from::<String>()`.
    pub fn from_string(self) -> SourceMapBuilder<String, K, V> {
        self.from::<String>()
    }
}

fn identity_key_parser<K: Send + Sync + 'static>() -> KeyParseFn<K> {
    Arc::new(|_: &Context, key: &str| identity_cast::<String, K>(key.to_string()))
}

fn identity_key_serializer<K: Send + Sync + 'static>() -> KeySerializeFn<K> {
    Arc::new(|_: &Context, key: &K| identity_ref::<K, String>(key).cloned())
}

/// Accumulating stage for a map entry with value source type `S`.
pub struct SourceMapBuilder<S, K, V> {
    constructor: MapConstructor<K, V>,
    source_type: ValueType,
    key_parser: Option<KeyParseFn<K>>,
    key_serializer: Option<KeySerializeFn<K>>,
    value_parser: Option<ParseFn<V>>,
    value_serializer: Option<SerializeFn<V>>,
    default: DefaultSource<Vec<(K, V)>>,
    path: Option<String>,
    version: u32,
    _marker: PhantomData<fn(S)>,
}

impl<S, K, V> SourceMapBuilder<S, K, V>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    K: Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Set the key parse function (raw key string → `K`). Last write wins.
    pub fn parse_key<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, &str) -> Result<K, SchemaError> + Send + Sync + 'static,
    {
        self.key_parser = Some(Arc::new(parse));
        self
    }

    /// Set the key serialize function (`K` → raw key string).
    pub fn serialize_key<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &K) -> Result<String, SchemaError> + Send + Sync + 'static,
    {
        self.key_serializer = Some(Arc::new(serialize));
        self
    }

    /// Set the value parse function (source → logical). Last write wins.
    pub fn parse_value<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, S) -> Result<V, SchemaError> + Send + Sync + 'static,
    {
        self.value_parser = Some(compose_parser(parse));
        self
    }

    /// Set the value serialize function (logical → source).
    pub fn serialize_value<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &V) -> Result<S, SchemaError> + Send + Sync + 'static,
    {
        self.value_serializer = Some(compose_serializer(serialize));
        self
    }

    /// Set the fixed default entries. Insertion order of the literals is
    /// fed to the backing structure on materialization.
    pub fn defaults(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        self.default = DefaultSource::Fixed(pairs.into_iter().collect());
        self
    }

    /// Sugar for [`defaults`](Self::defaults).
    pub fn default_map(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        self.defaults(pairs)
    }

    /// Set a default factory, invoked once per materialization.
    pub fn defaults_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Vec<(K, V)> + Send + Sync + 'static,
    {
        self.default = DefaultSource::Factory(Arc::new(factory));
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Freeze into an immutable entry. Both the key and the value transform
    /// must be resolvable; either missing is a definition error.
    pub fn build(self) -> Result<ConfiguredMap<K, V>, SchemaError> {
        if self.key_parser.is_none() {
            return Err(SchemaError::MissingKeyParser {
                key: ValueType::of::<K>().name(),
            });
        }
        if self.value_parser.is_none() {
            return Err(SchemaError::MissingParser {
                source_type: self.source_type.name(),
                value: ValueType::of::<V>().name(),
            });
        }
        let kind = (self.constructor)().kind();
        Ok(ConfiguredMap {
            manifest: ValueManifest::new(
                ValueType::of::<ConfigMap<K, V>>(),
                self.default,
                self.path,
                self.version,
            ),
            constructor: self.constructor,
            kind,
            key_parser: self.key_parser,
            key_serializer: self.key_serializer,
            value: ValueAdapter::new(
                ValueType::of::<V>(),
                self.source_type,
                self.value_parser,
                self.value_serializer,
            ),
            key_type: ValueType::of::<K>(),
        })
    }
}

/// An immutable map entry descriptor.
pub struct ConfiguredMap<K, V> {
    manifest: ValueManifest<Vec<(K, V)>>,
    constructor: MapConstructor<K, V>,
    kind: MapKind,
    key_type: ValueType,
    key_parser: Option<KeyParseFn<K>>,
    key_serializer: Option<KeySerializeFn<K>>,
    value: ValueAdapter<V>,
}

impl<K, V> ConfiguredMap<K, V>
where
    K: Eq + Hash + Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Start declaring a map entry with key type `K` and value type `V`.
    pub fn builder() -> ConfigMapCreator<K, V> {
        ConfigMapCreator::new()
    }

    /// The backing structure this entry materializes.
    pub fn kind(&self) -> MapKind {
        self.kind
    }

    pub fn key_type(&self) -> ValueType {
        self.key_type
    }

    /// The value side's logical type descriptor.
    pub fn elem_type(&self) -> ValueType {
        self.value.value_type()
    }

    pub fn path(&self) -> Option<&str> {
        self.manifest.path()
    }

    pub fn version(&self) -> u32 {
        self.manifest.version()
    }

    /// Parse a raw table into a fresh backing map. Key or value failure
    /// aborts the whole parse with the offending key and raw value attached.
    pub fn parse(&self, ctx: &Context, raw: &Raw) -> Result<ConfigMap<K, V>, SchemaError> {
        let table = raw.as_table().ok_or(SchemaError::UnexpectedShape {
            expected: "table",
            found: raw.type_str(),
        })?;

        let key_parser = self.key_parser.as_ref().ok_or(SchemaError::MissingKeyParser {
            key: self.key_type.name(),
        })?;

        let mut map = (self.constructor)();
        for (raw_key, item) in table {
            let key = key_parser(ctx, raw_key)
                .map_err(|e| e.at_key(raw_key, &Raw::String(raw_key.clone())))?;
            let value = self
                .value
                .parse(ctx, item)
                .map_err(|e| e.at_key(raw_key, item))?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Serialize a map back into a raw table, following the map's iteration
    /// order. `Ok(None)` when either serialize function is missing.
    pub fn serialize(
        &self,
        ctx: &Context,
        map: &ConfigMap<K, V>,
    ) -> Result<Option<Raw>, SchemaError> {
        let Some(key_serializer) = &self.key_serializer else {
            return Ok(None);
        };
        if !self.value.has_serializer() {
            return Ok(None);
        }

        let mut table = RawTable::new();
        for (key, value) in map {
            let raw_key = key_serializer(ctx, key)?;
            if let Some(raw_value) = self.value.serialize(ctx, value)? {
                table.insert(raw_key, raw_value);
            }
        }
        Ok(Some(Raw::Table(table)))
    }
}

impl<K, V> ConfiguredMap<K, V>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Materialize a fresh default map: a new backing instance fed the
    /// declared entries in their literal order. Independent per call.
    pub fn default_map(&self) -> Option<ConfigMap<K, V>> {
        let pairs = self.manifest.default_value()?;
        let mut map = (self.constructor)();
        for (key, value) in pairs {
            map.insert(key, value);
        }
        Some(map)
    }

    pub fn get(&self, ctx: &Context) -> Result<Option<ConfigMap<K, V>>, SchemaError> {
        let path = self.manifest.require_path()?;
        match ctx.get_raw(path) {
            Some(raw) => self.parse(ctx, raw).map(Some),
            None => Ok(self.default_map()),
        }
    }

    pub fn set(&self, ctx: &mut Context, map: &ConfigMap<K, V>) -> Result<(), SchemaError> {
        let path = self.manifest.require_path()?.to_string();
        if let Some(raw) = self.serialize(ctx, map)? {
            ctx.set_raw(&path, raw);
        }
        Ok(())
    }
}

impl<K, V> std::fmt::Debug for ConfiguredMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredMap")
            .field("kind", &self.kind)
            .field("key_type", &self.key_type)
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ctx;

    fn string_map() -> ConfigMapCreator<String, String> {
        ConfiguredMap::<String, String>::builder()
    }

    #[test]
    fn string_map_identity_round_trip() {
        let entry = string_map().from_string().build().unwrap();

        let mut table = RawTable::new();
        table.insert("Carm Jos".into(), Raw::String("Carm".into()));
        let raw = Raw::Table(table);

        let ctx = Context::new();
        let parsed = entry.parse(&ctx, &raw).unwrap();
        assert_eq!(
            parsed.get(&"Carm Jos".to_string()),
            Some(&"Carm".to_string())
        );

        let back = entry.serialize(&ctx, &parsed).unwrap().unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn default_map_matches_declared_pairs() {
        let entry = string_map()
            .from_string()
            .default_map([("Carm Jos".to_string(), "Carm".to_string())])
            .build()
            .unwrap();

        let defaults = entry.default_map().unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(
            defaults.get(&"Carm Jos".to_string()),
            Some(&"Carm".to_string())
        );
    }

    #[test]
    fn linked_backing_keeps_insertion_order() {
        let entry = string_map()
            .as_linked_map()
            .from_string()
            .defaults([
                ("key".to_string(), "value".to_string()),
                ("aaa".to_string(), "first-by-sort".to_string()),
            ])
            .build()
            .unwrap();

        assert_eq!(entry.kind(), MapKind::Linked);
        let defaults = entry.default_map().unwrap();
        let keys: Vec<&String> = defaults.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["key", "aaa"]);
    }

    #[test]
    fn sorted_backing_orders_by_key() {
        let entry = string_map()
            .as_tree_map()
            .from_string()
            .defaults([
                ("zebra".to_string(), "1".to_string()),
                ("apple".to_string(), "2".to_string()),
            ])
            .build()
            .unwrap();

        assert_eq!(entry.kind(), MapKind::Sorted);
        let defaults = entry.default_map().unwrap();
        let keys: Vec<&String> = defaults.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["apple", "zebra"]);
    }

    #[test]
    fn hash_backing_holds_same_associations() {
        let entry = string_map()
            .from_string()
            .defaults([
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
            ])
            .build()
            .unwrap();

        assert_eq!(entry.kind(), MapKind::Hash);
        let defaults = entry.default_map().unwrap();
        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults.get(&"a".to_string()), Some(&"1".to_string()));
        assert_eq!(defaults.get(&"b".to_string()), Some(&"2".to_string()));
    }

    #[test]
    fn default_map_is_fresh_per_call() {
        let entry = string_map()
            .as_linked_map()
            .from_string()
            .defaults([("k".to_string(), "v".to_string())])
            .build()
            .unwrap();

        let mut first = entry.default_map().unwrap();
        first.insert("extra".to_string(), "x".to_string());
        let second = entry.default_map().unwrap();
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn non_string_keys_require_parse_key() {
        let result = ConfiguredMap::<u32, String>::builder().from_string().build();
        assert!(matches!(result, Err(SchemaError::MissingKeyParser { .. })));
    }

    #[test]
    fn typed_keys_and_values() {
        let entry = ConfiguredMap::<u32, u16>::builder()
            .as_tree_map()
            .from::<i64>()
            .parse_key(|_, s| s.parse().map_err(|_| SchemaError::invalid("bad key")))
            .serialize_key(|_, k| Ok(k.to_string()))
            .parse_value(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
            .serialize_value(|_, v| Ok(i64::from(*v)))
            .path("limits")
            .build()
            .unwrap();

        let mut ctx = ctx("[limits]\n\"10\" = 100\n\"2\" = 20");
        let map = entry.get(&ctx).unwrap().unwrap();
        let keys: Vec<u32> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, [2, 10]); // tree backing sorts numerically

        entry.set(&mut ctx, &map).unwrap();
        let raw = ctx.get_raw("limits").unwrap().as_table().unwrap();
        assert_eq!(raw.get("2").and_then(Raw::as_integer), Some(20));
    }

    #[test]
    fn value_failure_names_the_key() {
        let entry = ConfiguredMap::<String, u16>::builder()
            .from::<i64>()
            .parse_value(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
            .build()
            .unwrap();

        let mut table = RawTable::new();
        table.insert("huge".into(), Raw::Integer(1_000_000));
        let err = entry.parse(&Context::new(), &Raw::Table(table)).unwrap_err();
        match err {
            SchemaError::Entry { key, .. } => assert_eq!(key, "huge"),
            other => panic!("Expected Entry, got {other:?}"),
        }
    }

    #[test]
    fn custom_constructor_seeds_backing() {
        let entry = string_map()
            .constructor(|| {
                let mut map = ConfigMap::new(MapKind::Linked);
                map.insert("seed".to_string(), "1".to_string());
                map
            })
            .from_string()
            .build()
            .unwrap();

        assert_eq!(entry.kind(), MapKind::Linked);
        let parsed = entry.parse(&Context::new(), &Raw::Table(RawTable::new())).unwrap();
        assert_eq!(parsed.get(&"seed".to_string()), Some(&"1".to_string()));
    }

    #[test]
    fn non_table_raw_is_shape_error() {
        let entry = string_map().from_string().build().unwrap();
        let err = entry.parse(&Context::new(), &Raw::Integer(3)).unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedShape { .. }));
    }
}
