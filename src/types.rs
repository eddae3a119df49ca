use std::any::TypeId;

/// The raw representation configuration data takes before parsing and after
/// serialization. Keys of raw tables keep their insertion order.
pub type Raw = toml::Value;

/// Raw key/value table, the shape map entries and the [`Context`](crate::Context)
/// data tree are made of.
pub type RawTable = toml::map::Map<String, Raw>;

/// Runtime descriptor for a source or logical type.
///
/// Two descriptors are interchangeable iff their underlying type ids are
/// equal — an exact comparison, never an "is-assignable" check. The `String`
/// descriptor is the distinguished one: [`is_string()`](Self::is_string) is
/// the single dispatch point that selects the identity fast path throughout
/// the builder hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    /// Descriptor for `T`. Total and idempotent: any `'static` type gets a
    /// descriptor, and repeated calls produce equal descriptors.
    pub fn of<T: 'static>() -> Self {
        ValueType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Whether this descriptor identifies exactly `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Whether this descriptor identifies exactly `String`.
    pub fn is_string(&self) -> bool {
        self.is::<String>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Backing structure selected for a map entry. Part of the entry's identity:
/// it determines the iteration order of everything the entry materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Unordered (hash) backing. The default.
    Hash,
    /// Insertion-ordered backing.
    Linked,
    /// Key-sorted backing.
    Sorted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_is_idempotent() {
        assert_eq!(ValueType::of::<String>(), ValueType::of::<String>());
        assert_eq!(ValueType::of::<i64>(), ValueType::of::<i64>());
    }

    #[test]
    fn distinct_types_differ() {
        assert_ne!(ValueType::of::<String>(), ValueType::of::<i64>());
        assert_ne!(ValueType::of::<u16>(), ValueType::of::<i16>());
    }

    #[test]
    fn string_fast_path_is_exact() {
        assert!(ValueType::of::<String>().is_string());
        // String-like types do not get the fast path.
        assert!(!ValueType::of::<&'static str>().is_string());
        assert!(!ValueType::of::<std::path::PathBuf>().is_string());
    }

    #[test]
    fn name_is_readable() {
        assert!(ValueType::of::<String>().name().contains("String"));
        assert_eq!(ValueType::of::<i64>().to_string(), "i64");
    }
}
