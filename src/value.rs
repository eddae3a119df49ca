//! Scalar entries: one logical value per path key.
//!
//! Declaration flows through two builder stages. The creator stage picks the
//! logical type; `from::<S>()` binds the source-representation type and
//! returns the accumulating stage, whose chained calls all take and return
//! the same builder by value. `build()` consumes it, so a finished
//! [`ConfiguredValue`] can never be mutated again.

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

/// Creator stage for a scalar entry of logical type `V`.
pub struct ConfigValueBuilder<V> {
    _marker: PhantomData<fn() -> V>,
}

impl<V: Send + Sync + 'static> ConfigValueBuilder<V> {
    pub(crate) fn new() -> Self {
        ConfigValueBuilder {
            _marker: PhantomData,
        }
    }

    /// Bind the source-representation type. When `S` is exactly `V`, an
    /// identity transform is pre-registered and no explicit parse function
    /// is required.
    pub fn from<S>(self) -> SourceValueBuilder<S, V>
    where
        S: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let identity = ValueType::of::<S>() == ValueType::of::<V>();
        SourceValueBuilder {
            source_type: ValueType::of::<S>(),
            parser: identity.then(identity_parser::<S, V>),
            serializer: identity.then(identity_serializer::<S, V>),
            default: DefaultSource::None,
            path: None,
            version: 1,
            _marker: PhantomData,
        }
    }

    /// Sugar for `from::<String>()`, the textual-source fast path.
    pub fn from_string(self) -> SourceValueBuilder<String, V> {
        self.from::<String>()
    }
}

/// Accumulating stage for a scalar entry with source type `S` and logical
/// type `V`.
pub struct SourceValueBuilder<S, V> {
    source_type: ValueType,
    parser: Option<ParseFn<V>>,
    serializer: Option<SerializeFn<V>>,
    default: DefaultSource<V>,
    path: Option<String>,
    version: u32,
    _marker: PhantomData<fn(S) -> V>,
}

impl<S, V> SourceValueBuilder<S, V>
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Set the parse function (source → logical). Last write wins.
    pub fn parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Context, S) -> Result<V, SchemaError> + Send + Sync + 'static,
    {
        self.parser = Some(compose_parser(parse));
        self
    }

    /// Set the serialize function (logical → source). Last write wins.
    pub fn serialize<F>(mut self, serialize: F) -> Self
    where
        F: Fn(&Context, &V) -> Result<S, SchemaError> + Send + Sync + 'static,
    {
        self.serializer = Some(compose_serializer(serialize));
        self
    }

    /// Set a fixed default. Replaces any previously set default.
    pub fn defaults(mut self, value: V) -> Self {
        self.default = DefaultSource::Fixed(value);
        self
    }

    /// Set a default factory, invoked once per materialization.
    pub fn defaults_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.default = DefaultSource::Factory(Arc::new(factory));
        self
    }

    /// Bind the stable path key used for persistence lookups.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the entry's schema version (default 1). The core stores it for
    /// the surrounding framework and does not interpret it.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Freeze the builder into an immutable entry.
    ///
    /// Fails with a definition error if no parse function exists and the
    /// source type is not exactly the logical type.
    pub fn build(self) -> Result<ConfiguredValue<V>, SchemaError> {
        if self.parser.is_none() {
            return Err(SchemaError::MissingParser {
                source_type: self.source_type.name(),
                value: ValueType::of::<V>().name(),
            });
        }
        Ok(ConfiguredValue {
            manifest: ValueManifest::new(ValueType::of::<V>(), self.default, self.path, self.version),
            adapter: ValueAdapter::new(
                ValueType::of::<V>(),
                self.source_type,
                self.parser,
                self.serializer,
            ),
        })
    }
}

/// An immutable scalar entry descriptor. Safe to share across threads once
/// built.
#[derive(Debug)]
pub struct ConfiguredValue<V> {
    manifest: ValueManifest<V>,
    adapter: ValueAdapter<V>,
}

impl<V: Send + Sync + 'static> ConfiguredValue<V> {
    /// Start declaring a scalar entry of logical type `V`.
    pub fn builder() -> ConfigValueBuilder<V> {
        ConfigValueBuilder::new()
    }

    pub fn value_type(&self) -> ValueType {
        self.manifest.value_type()
    }

    pub fn source_type(&self) -> ValueType {
        self.adapter.source_type()
    }

    pub fn path(&self) -> Option<&str> {
        self.manifest.path()
    }

    pub fn version(&self) -> u32 {
        self.manifest.version()
    }

    /// Parse raw data into a logical value using the stored transform.
    pub fn parse(&self, ctx: &Context, raw: &Raw) -> Result<V, SchemaError> {
        self.adapter.parse(ctx, raw)
    }

    /// Serialize a logical value into raw data. `Ok(None)` when the entry
    /// declared no serialize function.
    pub fn serialize(&self, ctx: &Context, value: &V) -> Result<Option<Raw>, SchemaError> {
        self.adapter.serialize(ctx, value)
    }
}

impl<V: Clone + Send + Sync + 'static> ConfiguredValue<V> {
    /// Shorthand for an entry whose source and logical types are the same:
    /// identity transforms plus a fixed default.
    pub fn of(default: V) -> ConfiguredValue<V>
    where
        V: Serialize + DeserializeOwned,
    {
        let vt = ValueType::of::<V>();
        ConfiguredValue {
            manifest: ValueManifest::new(vt, DefaultSource::Fixed(default), None, 1),
            adapter: ValueAdapter::new(
                vt,
                vt,
                Some(identity_parser::<V, V>()),
                Some(identity_serializer::<V, V>()),
            ),
        }
    }

    /// Materialize a fresh default, if one was declared.
    pub fn default_value(&self) -> Option<V> {
        self.manifest.default_value()
    }

    /// Read the value at this entry's path key: parse the raw data if
    /// present, fall back to the default otherwise. Transform errors
    /// propagate untouched.
    pub fn get(&self, ctx: &Context) -> Result<Option<V>, SchemaError> {
        let path = self.manifest.require_path()?;
        match ctx.get_raw(path) {
            Some(raw) => self.parse(ctx, raw).map(Some),
            None => Ok(self.default_value()),
        }
    }

    /// Write a value at this entry's path key via the stored serialize
    /// function. A missing serialize function leaves the context untouched.
    pub fn set(&self, ctx: &mut Context, value: &V) -> Result<(), SchemaError> {
        let path = self.manifest.require_path()?.to_string();
        if let Some(raw) = self.serialize(ctx, value)? {
            ctx.set_raw(&path, raw);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::ctx;

    #[test]
    fn string_identity_round_trip() {
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .path("greeting")
            .build()
            .unwrap();

        let ctx = Context::new();
        for v in ["", "hello", "Carm Jos", "äöü"] {
            let raw = entry.serialize(&ctx, &v.to_string()).unwrap().unwrap();
            assert_eq!(entry.parse(&ctx, &raw).unwrap(), v);
        }
    }

    #[test]
    fn same_type_non_string_gets_identity() {
        let entry = ConfiguredValue::<i64>::builder()
            .from::<i64>()
            .defaults(30)
            .build()
            .unwrap();

        let ctx = Context::new();
        assert_eq!(entry.parse(&ctx, &Raw::Integer(7)).unwrap(), 7);
        let raw = entry.serialize(&ctx, &9).unwrap().unwrap();
        assert_eq!(raw.as_integer(), Some(9));
    }

    #[test]
    fn missing_parser_fails_at_build() {
        // i64 source, u16 logical: no identity, no parse supplied.
        let result = ConfiguredValue::<u16>::builder().from::<i64>().build();
        let err = result.unwrap_err();
        assert!(err.is_definition());
        assert!(matches!(err, SchemaError::MissingParser { .. }));
    }

    #[test]
    fn explicit_transform_pair() {
        let entry = ConfiguredValue::<u16>::builder()
            .from::<i64>()
            .parse(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
            .serialize(|_, n| Ok(i64::from(*n)))
            .path("server.port")
            .build()
            .unwrap();

        let ctx = ctx("[server]\nport = 8080");
        assert_eq!(entry.get(&ctx).unwrap(), Some(8080));
    }

    #[test]
    fn parse_last_write_wins() {
        let entry = ConfiguredValue::<u16>::builder()
            .from::<i64>()
            .parse(|_, _| Ok(1))
            .parse(|_, _| Ok(2))
            .build()
            .unwrap();
        let ctx = Context::new();
        assert_eq!(entry.parse(&ctx, &Raw::Integer(0)).unwrap(), 2);
    }

    #[test]
    fn defaults_replace_not_accumulate() {
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .defaults("first".into())
            .defaults("second".into())
            .build()
            .unwrap();
        assert_eq!(entry.default_value(), Some("second".to_string()));
    }

    #[test]
    fn get_falls_back_to_default() {
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .defaults("localhost".into())
            .path("host")
            .build()
            .unwrap();

        assert_eq!(
            entry.get(&Context::new()).unwrap(),
            Some("localhost".to_string())
        );
        assert_eq!(
            entry.get(&ctx("host = \"example.org\"")).unwrap(),
            Some("example.org".to_string())
        );
    }

    #[test]
    fn get_without_path_is_definition_error() {
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .build()
            .unwrap();
        let err = entry.get(&Context::new()).unwrap_err();
        assert!(matches!(err, SchemaError::Unbound { .. }));
    }

    #[test]
    fn set_writes_through_serializer() {
        let entry = ConfiguredValue::<u16>::builder()
            .from::<i64>()
            .parse(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
            .serialize(|_, n| Ok(i64::from(*n)))
            .path("server.port")
            .build()
            .unwrap();

        let mut ctx = Context::new();
        entry.set(&mut ctx, &9000).unwrap();
        assert_eq!(
            ctx.get_raw("server.port").unwrap().as_integer(),
            Some(9000)
        );
        assert_eq!(entry.get(&ctx).unwrap(), Some(9000));
    }

    #[test]
    fn transform_error_propagates_from_get() {
        let entry = ConfiguredValue::<u16>::builder()
            .from::<i64>()
            .parse(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
            .defaults(80)
            .path("port")
            .build()
            .unwrap();

        // A present-but-bad value is an error, not a silent default.
        let err = entry.get(&ctx("port = 100000")).unwrap_err();
        assert!(!err.is_definition());
    }

    #[test]
    fn of_shorthand() {
        let entry = ConfiguredValue::of("Carm".to_string());
        assert_eq!(entry.default_value(), Some("Carm".to_string()));
        let ctx = Context::new();
        let raw = entry.serialize(&ctx, &"x".to_string()).unwrap().unwrap();
        assert_eq!(entry.parse(&ctx, &raw).unwrap(), "x");
    }

    #[test]
    fn default_factory_runs_per_read() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let entry = ConfiguredValue::<String>::builder()
            .from_string()
            .defaults_with(move || {
                counted.fetch_add(1, Ordering::SeqCst);
                "fresh".to_string()
            })
            .path("name")
            .build()
            .unwrap();

        let ctx = Context::new();
        entry.get(&ctx).unwrap();
        entry.get(&ctx).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
