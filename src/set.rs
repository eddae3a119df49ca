//! Set entries: deduplicated, insertion-ordered values under one path key.
//!
//! Backed by [`IndexSet`] so iteration follows first insertion, matching the
//! order of literal defaults and of elements in the raw array. Duplicate raw
//! elements collapse silently; the first occurrence keeps its position.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::adapter::{
    ParseFn, SerializeFn, ValueAdapter, compose_parser, compose_serializer, identity_parser,
    identity_serializer,
};
use crate::context::Context;
use crate::default::DefaultSource;
use crate::error::SchemaError;
use crate::list::{WholeParseFn, WholeSerializeFn};
use crate::manifest::ValueManifest;
use crate::types::{Raw, ValueType};

/// Creator stage for a set entry with element type `V`.
pub struct ConfigSetBuilder<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V> ConfigSetBuilder<V>
where
    V: Eq + Hash + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        ConfigSetBuilder {
            _marker: PhantomData,
        }
    }

    /// Bind the element source type; identity transform pre-registered when
    /// `S` is exactly `V`.
    pub fn from<S>(self) -> SourceSetBuilder<S, V>
    where
        S: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let identity = ValueType::of::<S>() == ValueType::of::<V>();
        SourceSetBuilder {
            source_type: ValueType::of::<S>(),
            elem_parser: identity.then(identity_parser::<S, V>),
            elem_serializer: identity.then(identity_serializer::<S, V>),
            whole_parser: None,
            whole_serializer: None,
            default: DefaultSource::None,
            path: None,
            version: 1,
            _marker: PhantomData,
        }
    }

    /// Sugar for `from::<String>()`.
    pub fn from_string(self) -> SourceSetBuilder<String, V> {
        self.from::<String>()
    }
}

/// Accumulating stage for a set entry with element source type `S`.
pub struct SourceSetBuilder<S, V> {
    source_type: ValueType,
    elem_parser: Option<ParseFn<V>>,
    elem_serializer: Option<SerializeFn<V>>,
    whole_parser: Option<WholeParseFn<IndexSet<V>>>,
    whole_serializer: Option<WholeSerializeFn<IndexSet<V>>>,
    default: DefaultSource<IndexSet<V>>,
    path: Option<String>,
    version: u32,
    _marker: PhantomData<fn(S) -> V>,
}

impl<S, V> SourceSetBuilder<S, V>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Eq + Hash + Send + Sync + 'static,
{
    /// Set the per-element parse function. Last write wins.
    pub fn parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, S) -> Result<V, SchemaError> + Send + Sync + 'static,
    {
        self.elem_parser = Some(compose_parser(parse));
        self
    }

    /// Set the per-element serialize function. Last write wins.
    pub fn serialize<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &V) -> Result<S, SchemaError> + Send + Sync + 'static,
    {
        self.elem_serializer = Some(compose_serializer(serialize));
        self
    }

    /// Whole-collection parse override; wins over the element transform.
    pub fn parse_all<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, &Raw) -> Result<IndexSet<V>, SchemaError> + Send + Sync + 'static,
    {
        self.whole_parser = Some(Arc::new(parse));
        self
    }

    /// Whole-collection serialize override.
    pub fn serialize_all<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &IndexSet<V>) -> Result<Raw, SchemaError> + Send + Sync + 'static,
    {
        self.whole_serializer = Some(Arc::new(serialize));
        self
    }

    /// Set a fixed default. Duplicates collapse; insertion order is kept.
    pub fn defaults(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.default = DefaultSource::Fixed(values.into_iter().collect());
        self
    }

    /// Set a default factory, invoked once per materialization.
    pub fn defaults_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> IndexSet<V> + Send + Sync + 'static,
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

    /// Freeze into an immutable entry; same parse-function validation as
    /// list entries.
    pub fn build(self) -> Result<ConfiguredSet<V>, SchemaError> {
        if self.elem_parser.is_none() && self.whole_parser.is_none() {
            return Err(SchemaError::MissingParser {
                source_type: self.source_type.name(),
                value: ValueType::of::<V>().name(),
            });
        }
        Ok(ConfiguredSet {
            manifest: ValueManifest::new(
                ValueType::of::<IndexSet<V>>(),
                self.default,
                self.path,
                self.version,
            ),
            elem: ValueAdapter::new(
                ValueType::of::<V>(),
                self.source_type,
                self.elem_parser,
                self.elem_serializer,
            ),
            whole_parser: self.whole_parser,
            whole_serializer: self.whole_serializer,
        })
    }
}

/// An immutable set entry descriptor.
pub struct ConfiguredSet<V> {
    manifest: ValueManifest<IndexSet<V>>,
    elem: ValueAdapter<V>,
    whole_parser: Option<WholeParseFn<IndexSet<V>>>,
    whole_serializer: Option<WholeSerializeFn<IndexSet<V>>>,
}

impl<V> ConfiguredSet<V>
where
    V: Eq + Hash + Send + Sync + 'static,
{
    /// Start declaring a set entry with element type `V`.
    pub fn builder() -> ConfigSetBuilder<V> {
        ConfigSetBuilder::new()
    }

    pub fn elem_type(&self) -> ValueType {
        self.elem.value_type()
    }

    pub fn path(&self) -> Option<&str> {
        self.manifest.path()
    }

    pub fn version(&self) -> u32 {
        self.manifest.version()
    }

    /// Parse a raw array into a deduplicated set, keeping first-occurrence
    /// order. An element failure aborts the whole parse.
    pub fn parse(&self, ctx: &Context, raw: &Raw) -> Result<IndexSet<V>, SchemaError> {
        if let Some(whole) = &self.whole_parser {
            return whole(ctx, raw);
        }
        let items = raw.as_array().ok_or(SchemaError::UnexpectedShape {
            expected: "array",
            found: raw.type_str(),
        })?;
        let mut values = IndexSet::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let value = self
                .elem
                .parse(ctx, item)
                .map_err(|e| e.at_index(index, item))?;
            values.insert(value);
        }
        Ok(values)
    }

    /// Serialize the set back into a raw array in iteration order.
    pub fn serialize(
        &self,
        ctx: &Context,
        values: &IndexSet<V>,
    ) -> Result<Option<Raw>, SchemaError> {
        if let Some(whole) = &self.whole_serializer {
            return whole(ctx, values).map(Some);
        }
        if !self.elem.has_serializer() {
            return Ok(None);
        }
        let mut items = Vec::with_capacity(values.len());
        for value in values {
            if let Some(raw) = self.elem.serialize(ctx, value)? {
                items.push(raw);
            }
        }
        Ok(Some(Raw::Array(items)))
    }
}

impl<V> ConfiguredSet<V>
where
    V: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Materialize a fresh default set. Independent per call.
    pub fn default_value(&self) -> Option<IndexSet<V>> {
        self.manifest.default_value()
    }

    pub fn get(&self, ctx: &Context) -> Result<Option<IndexSet<V>>, SchemaError> {
        let path = self.manifest.require_path()?;
        match ctx.get_raw(path) {
            Some(raw) => self.parse(ctx, raw).map(Some),
            None => Ok(self.default_value()),
        }
    }

    pub fn set(&self, ctx: &mut Context, values: &IndexSet<V>) -> Result<(), SchemaError> {
        let path = self.manifest.require_path()?.to_string();
        if let Some(raw) = self.serialize(ctx, values)? {
            ctx.set_raw(&path, raw);
        }
        Ok(())
    }
}

impl<V> std::fmt::Debug for ConfiguredSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredSet")
            .field("elem", &self.elem)
            .field("whole_parser", &self.whole_parser.is_some())
            .field("whole_serializer", &self.whole_serializer.is_some())
            .finish()
    }
}
