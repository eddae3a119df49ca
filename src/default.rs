//! Default-value suppliers.
//!
//! Defaults are stored, not evaluated: a fixed default is cloned and a
//! factory is invoked on every materialization, so each owning configuration
//! instance gets an independent value. This is what keeps a mutable default
//! collection from being aliased across instances.

use std::sync::Arc;

/// Tagged default supplier for a built entry.
#[derive(Clone)]
pub enum DefaultSource<T> {
    /// No default declared.
    None,
    /// A fixed value, cloned per materialization.
    Fixed(T),
    /// A zero-arg factory, invoked per materialization.
    Factory(Arc<dyn Fn() -> T + Send + Sync>),
}

impl<T: Clone> DefaultSource<T> {
    /// Produce a fresh default, or `None` when none was declared. Never
    /// caches the produced instance.
    pub fn materialize(&self) -> Option<T> {
        match self {
            DefaultSource::None => None,
            DefaultSource::Fixed(value) => Some(value.clone()),
            DefaultSource::Factory(factory) => Some(factory()),
        }
    }
}

impl<T> DefaultSource<T> {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultSource::None)
    }
}

impl<T> std::fmt::Debug for DefaultSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultSource::None => f.write_str("DefaultSource::None"),
            DefaultSource::Fixed(_) => f.write_str("DefaultSource::Fixed(..)"),
            DefaultSource::Factory(_) => f.write_str("DefaultSource::Factory(..)"),
        }
    }
}
