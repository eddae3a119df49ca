//! Typed configuration entries for Rust applications. Declare a value, its
//! transforms, and its defaults once, and read or write it through any
//! raw-data context.
//!
//! Schemafig separates a configuration entry's *source type* — how the value
//! sits in raw data — from its *logical type* — what the application works
//! with. A builder chain declares both, plus the transforms between them,
//! and freezes into an immutable entry descriptor:
//!
//! ```ignore
//! let port: ConfiguredValue<u16> = ConfiguredValue::builder()
//!     .from::<i64>()
//!     .parse(|_, n| u16::try_from(n).map_err(|e| SchemaError::invalid(e.to_string())))
//!     .serialize(|_, p| Ok(i64::from(*p)))
//!     .defaults(8080)
//!     .path("server.port")
//!     .build()?;
//!
//! let value = port.get(&ctx)?; // parsed from raw data, or the default
//! ```
//!
//! # Why schemafig
//!
//! Configuration code usually grows the same plumbing over and over: fetch a
//! raw value, convert it, validate it, fall back to a default, and do the
//! inverse when writing back. Each setting wires that by hand, and list or
//! map settings multiply the boilerplate per element.
//!
//! Schemafig replaces that plumbing with one declaration per entry. The
//! entry knows its path, its transforms, and its defaults; `get` and `set`
//! derive from that single definition, for scalars and for collections
//! alike.
//!
//! # Design: declare, then freeze
//!
//! Every entry goes through the same staged builder:
//!
//! - **Creator stage** fixes the logical shape — scalar, list, set, or map —
//!   and, for maps, the backing structure.
//! - **`from::<S>()`** binds the source type. When `S` is exactly the
//!   logical type, identity transforms are pre-registered and the entry
//!   works with no further setup; `from_string()` is sugar for the common
//!   string case.
//! - **Accumulating stage** takes transforms, defaults, a path, and a
//!   version. Repeated calls replace earlier ones: last write wins.
//! - **`build()`** validates the definition (a resolvable parse transform is
//!   mandatory, serialize is optional) and freezes it. The finished entry
//!   has no mutators; concurrent readers share it freely.
//!
//! Defaults are factories, not shared constants: every materialization
//! returns an independent instance, so mutating one read's default never
//! leaks into the next.
//!
//! # Collections
//!
//! [`ConfiguredList`] parses raw arrays element-wise in order;
//! [`ConfiguredSet`] additionally deduplicates, keeping first-occurrence
//! order. Both accept a whole-collection override (`parse_all` /
//! `serialize_all`) that wins over the element transform when both are
//! declared — useful when the raw shape is not an array at all, like a
//! comma-joined string.
//!
//! [`ConfiguredMap`] keys raw tables. Its backing structure is part of the
//! declaration: `as_hash_map()` for no order guarantee, `as_linked_map()`
//! for insertion order, `as_tree_map()` for key-sorted order, or a custom
//! constructor. Key and value transforms are declared independently.
//!
//! # Error handling
//!
//! All fallible operations return [`SchemaError`]. Definition mistakes — a
//! missing parse transform, an unbound entry, a duplicate path — surface at
//! `build()` or registration, naming the builder method to call. Data
//! failures carry the element index or map key and the offending raw value,
//! and user transform errors propagate unchanged. See the [`error`] module
//! for the full set.

pub mod error;
pub mod types;

mod adapter;
mod context;
mod default;
mod list;
mod manifest;
mod map;
mod schema;
mod set;
mod value;

#[cfg(test)]
mod fixtures;

pub use adapter::ValueAdapter;
pub use context::Context;
pub use default::DefaultSource;
pub use error::SchemaError;
pub use list::{ConfigListBuilder, ConfiguredList, SourceListBuilder};
pub use map::{
    ConfigMap, ConfigMapCreator, ConfigMapIter, ConfiguredMap, SourceMapBuilder,
};
pub use schema::{Schema, SchemaEntry};
pub use set::{ConfigSetBuilder, ConfiguredSet, SourceSetBuilder};
pub use types::{MapKind, Raw, RawTable, ValueType};
pub use value::{ConfigValueBuilder, ConfiguredValue, SourceValueBuilder};
