//! Transform plumbing between the raw representation and logical values.
//!
//! Builders accept parse/serialize functions typed against the declared
//! source type `S`. They are composed here with the context's serde fallback
//! (raw ↔ `S`) so that finished entries operate on [`Raw`] alone and `S` is
//! erased at build time.

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::SchemaError;
use crate::types::{Raw, ValueType};

/// Composed parse function: raw data in, logical value out.
pub type ParseFn<V> = Arc<dyn Fn(&Context, &Raw) -> Result<V, SchemaError> + Send + Sync>;

/// Composed serialize function: logical value in, raw data (or nothing) out.
pub type SerializeFn<V> = Arc<dyn Fn(&Context, &V) -> Result<Option<Raw>, SchemaError> + Send + Sync>;

/// Frozen transform pair for one logical type, with the source and logical
/// type descriptors it was declared against.
pub struct ValueAdapter<V> {
    value_type: ValueType,
    source_type: ValueType,
    parser: Option<ParseFn<V>>,
    serializer: Option<SerializeFn<V>>,
}

impl<V> ValueAdapter<V> {
    pub(crate) fn new(
        value_type: ValueType,
        source_type: ValueType,
        parser: Option<ParseFn<V>>,
        serializer: Option<SerializeFn<V>>,
    ) -> Self {
        ValueAdapter {
            value_type,
            source_type,
            parser,
            serializer,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn source_type(&self) -> ValueType {
        self.source_type
    }

    pub(crate) fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    pub(crate) fn has_serializer(&self) -> bool {
        self.serializer.is_some()
    }

    /// Parse raw data into a logical value. A missing parse function is a
    /// definition-level mistake surfaced here for completeness; `build()`
    /// rejects such entries before one can exist.
    pub fn parse(&self, ctx: &Context, raw: &Raw) -> Result<V, SchemaError> {
        match &self.parser {
            Some(parse) => parse(ctx, raw),
            None => Err(SchemaError::MissingParser {
                source_type: self.source_type.name(),
                value: self.value_type.name(),
            }),
        }
    }

    /// Serialize a logical value into raw data. `Ok(None)` when no serialize
    /// function was supplied: the entry is read-only with respect to writes.
    pub fn serialize(&self, ctx: &Context, value: &V) -> Result<Option<Raw>, SchemaError> {
        match &self.serializer {
            Some(serialize) => serialize(ctx, value),
            None => Ok(None),
        }
    }
}

impl<V> std::fmt::Debug for ValueAdapter<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueAdapter")
            .field("value_type", &self.value_type)
            .field("source_type", &self.source_type)
            .field("parser", &self.parser.is_some())
            .field("serializer", &self.serializer.is_some())
            .finish()
    }
}

/// Move `value` from `S` to `V` when the two are the same runtime type.
/// The builders only install closures over this after an exact
/// [`ValueType`] equality check, so the `None` arm is unreachable in
/// practice and mapped to an adapter-resolution error.
pub(crate) fn identity_cast<S: 'static, V: 'static>(value: S) -> Result<V, SchemaError> {
    let boxed: Box<dyn Any> = Box::new(value);
    boxed
        .downcast::<V>()
        .map(|v| *v)
        .map_err(|_| SchemaError::Deserialize {
            target: std::any::type_name::<V>(),
            reason: format!("not the same type as '{}'", std::any::type_name::<S>()),
        })
}

/// Borrow `value` as `S` when `V` and `S` are the same runtime type.
pub(crate) fn identity_ref<V: 'static, S: 'static>(value: &V) -> Result<&S, SchemaError> {
    let any: &dyn Any = value;
    any.downcast_ref::<S>().ok_or_else(|| SchemaError::Serialize {
        source_type: std::any::type_name::<V>(),
        reason: format!("not the same type as '{}'", std::any::type_name::<S>()),
    })
}

/// Identity parse function for entries whose source and logical types are the
/// same exact type: raw → `S` via the serde fallback, then a no-op move.
pub(crate) fn identity_parser<S, V>() -> ParseFn<V>
where
    S: DeserializeOwned + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    Arc::new(|ctx: &Context, raw: &Raw| {
        let source: S = ctx.deserialize(raw)?;
        identity_cast::<S, V>(source)
    })
}

/// Identity serialize counterpart: no-op borrow, then `S` → raw via serde.
pub(crate) fn identity_serializer<S, V>() -> SerializeFn<V>
where
    S: Serialize + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    Arc::new(|ctx: &Context, value: &V| {
        let source: &S = identity_ref::<V, S>(value)?;
        ctx.serialize(source).map(Some)
    })
}

/// Compose a user parse function over `S` with the raw → `S` serde step.
pub(crate) fn compose_parser<S, V, F>(parse: F) -> ParseFn<V>
where
    S: DeserializeOwned + Send + Sync + 'static,
    V: Send + Sync + 'static,
    F: Fn(&Context, S) -> Result<V, SchemaError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &Context, raw: &Raw| {
        let source: S = ctx.deserialize(raw)?;
        parse(ctx, source)
    })
}

/// Compose a user serialize function over `S` with the `S` → raw serde step.
pub(crate) fn compose_serializer<S, V, F>(serialize: F) -> SerializeFn<V>
where
    S: Serialize + Send + Sync + 'static,
    V: Send + Sync + 'static,
    F: Fn(&Context, &V) -> Result<S, SchemaError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &Context, value: &V| {
        let source: S = serialize(ctx, value)?;
        ctx.serialize(&source).map(Some)
    })
}
