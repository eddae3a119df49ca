//! List entries: an ordered sequence of logical values under one path key.
//!
//! Two transform modes coexist. The element transform applies per element of
//! the raw array; the whole-collection override (`parse_all`/`serialize_all`)
//! runs once over the entire raw representation and, when present, takes
//! priority over element-wise composition.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::adapter::{
    ParseFn, SerializeFn, ValueAdapter, compose_parser, compose_serializer, identity_parser,
    identity_serializer,
};
use crate::context::Context;
use crate::default::DefaultSource;
use crate::error::SchemaError;
use crate::manifest::ValueManifest;
use crate::types::{Raw, ValueType};

pub(crate) type WholeParseFn<C> =
    Arc<dyn Fn(&Context, &Raw) -> Result<C, SchemaError> + Send + Sync>;
pub(crate) type WholeSerializeFn<C> =
    Arc<dyn Fn(&Context, &C) -> Result<Raw, SchemaError> + Send + Sync>;

/// Creator stage for a list entry with element type `V`.
pub struct ConfigListBuilder<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V: Send + Sync + 'static> ConfigListBuilder<V> {
    pub(crate) fn new() -> Self {
        ConfigListBuilder {
            _marker: PhantomData,
        }
    }

    /// Bind the element source type. When `S` is exactly `V`, the identity
    /// element transform is pre-registered.
    pub fn from<S>(self) -> SourceListBuilder<S, V>
    where
        S: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let identity = ValueType::of::<S>() == ValueType::of::<V>();
        SourceListBuilder {
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
    pub fn from_string(self) -> SourceListBuilder<String, V> {
        self.from::<String>()
    }
}

/// Accumulating stage for a list entry with element source type `S`.
pub struct SourceListBuilder<S, V> {
    source_type: ValueType,
    elem_parser: Option<ParseFn<V>>,
    elem_serializer: Option<SerializeFn<V>>,
    whole_parser: Option<WholeParseFn<Vec<V>>>,
    whole_serializer: Option<WholeSerializeFn<Vec<V>>>,
    default: DefaultSource<Vec<V>>,
    path: Option<String>,
    version: u32,
    _marker: PhantomData<fn(S) -> V>,
}

impl<S, V> SourceListBuilder<S, V>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Send + Sync + 'static,
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

    /// Set the whole-collection parse override. Takes priority over the
    /// element transform when both are present.
    pub fn parse_all<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, &Raw) -> Result<Vec<V>, SchemaError> + Send + Sync + 'static,
    {
        self.whole_parser = Some(Arc::new(parse));
        self
    }

    /// Set the whole-collection serialize override.
    pub fn serialize_all<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &Vec<V>) -> Result<Raw, SchemaError> + Send + Sync + 'static,
    {
        self.whole_serializer = Some(Arc::new(serialize));
        self
    }

    /// Set a fixed default sequence. Replaces any previously set default.
    pub fn defaults(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.default = DefaultSource::Fixed(values.into_iter().collect());
        self
    }

    /// Set a default factory, invoked once per materialization so each
    /// owning configuration instance gets its own list.
    pub fn defaults_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Vec<V> + Send + Sync + 'static,
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

    /// Freeze into an immutable entry. A definition error if neither an
    /// element parse function nor a whole-collection override exists for a
    /// non-identity source/element pair.
    pub fn build(self) -> Result<ConfiguredList<V>, SchemaError> {
        if self.elem_parser.is_none() && self.whole_parser.is_none() {
            return Err(SchemaError::MissingParser {
                source_type: self.source_type.name(),
                value: ValueType::of::<V>().name(),
            });
        }
        Ok(ConfiguredList {
            manifest: ValueManifest::new(
                ValueType::of::<Vec<V>>(),
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

/// An immutable list entry descriptor.
pub struct ConfiguredList<V> {
    manifest: ValueManifest<Vec<V>>,
    elem: ValueAdapter<V>,
    whole_parser: Option<WholeParseFn<Vec<V>>>,
    whole_serializer: Option<WholeSerializeFn<Vec<V>>>,
}

impl<V: Send + Sync + 'static> ConfiguredList<V> {
    /// Start declaring a list entry with element type `V`.
    pub fn builder() -> ConfigListBuilder<V> {
        ConfigListBuilder::new()
    }

    /// The element's logical type descriptor.
    pub fn elem_type(&self) -> ValueType {
        self.elem.value_type()
    }

    pub fn path(&self) -> Option<&str> {
        self.manifest.path()
    }

    pub fn version(&self) -> u32 {
        self.manifest.version()
    }

    /// Parse a raw array into logical values. An element failure aborts the
    /// whole parse with the offending index and raw value attached.
    pub fn parse(&self, ctx: &Context, raw: &Raw) -> Result<Vec<V>, SchemaError> {
        if let Some(whole) = &self.whole_parser {
            return whole(ctx, raw);
        }
        let items = raw.as_array().ok_or(SchemaError::UnexpectedShape {
            expected: "array",
            found: raw.type_str(),
        })?;
        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let value = self
                .elem
                .parse(ctx, item)
                .map_err(|e| e.at_index(index, item))?;
            values.push(value);
        }
        Ok(values)
    }

    /// Serialize logical values back into a raw array. `Ok(None)` when no
    /// serialize function was declared.
    pub fn serialize(&self, ctx: &Context, values: &Vec<V>) -> Result<Option<Raw>, SchemaError> {
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

impl<V> ConfiguredList<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Shorthand for a list whose element source and logical types are the
    /// same: identity transforms plus a fixed default sequence.
    pub fn of(defaults: impl IntoIterator<Item = V>) -> ConfiguredList<V> {
        ConfiguredList {
            manifest: ValueManifest::new(
                ValueType::of::<Vec<V>>(),
                DefaultSource::Fixed(defaults.into_iter().collect()),
                None,
                1,
            ),
            elem: ValueAdapter::new(
                ValueType::of::<V>(),
                ValueType::of::<V>(),
                Some(identity_parser::<V, V>()),
                Some(identity_serializer::<V, V>()),
            ),
            whole_parser: None,
            whole_serializer: None,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> ConfiguredList<V> {
    /// Materialize a fresh default sequence. Independent per call.
    pub fn default_value(&self) -> Option<Vec<V>> {
        self.manifest.default_value()
    }

    /// Read the list at this entry's path key, falling back to the default
    /// when no raw data is present.
    pub fn get(&self, ctx: &Context) -> Result<Option<Vec<V>>, SchemaError> {
        let path = self.manifest.require_path()?;
        match ctx.get_raw(path) {
            Some(raw) => self.parse(ctx, raw).map(Some),
            None => Ok(self.default_value()),
        }
    }

    /// Write the list at this entry's path key.
    pub fn set(&self, ctx: &mut Context, values: &Vec<V>) -> Result<(), SchemaError> {
        let path = self.manifest.require_path()?.to_string();
        if let Some(raw) = self.serialize(ctx, values)? {
            ctx.set_raw(&path, raw);
        }
        Ok(())
    }
}

impl<V> std::fmt::Debug for ConfiguredList<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredList")
            .field("elem", &self.elem)
            .field("whole_parser", &self.whole_parser.is_some())
            .field("whole_serializer", &self.whole_serializer.is_some())
            .finish()
    }
}
