use core::any::Any;

use crate::Presence;

/// A property about to be written.
pub struct PropertyValue<'a> {
    /// Type path of the bean that owns the property.
    pub host: &'static str,
    /// Wire field name.
    pub name: &'static str,
    pub value: &'a dyn Any,
    pub presence: Presence,
}

/// Decides which properties are omitted and how empty containers are
/// written.
pub trait SerializationFilter: Send + Sync {
    /// Returns `true` to omit the property from the output.
    fn is_skipped(&self, property: &PropertyValue<'_>) -> bool;

    /// Write empty collections as a short marker instead of an empty list.
    fn skip_empty_collection(&self) -> bool {
        false
    }

    /// Write empty maps as a short marker instead of an empty container.
    fn skip_empty_map(&self) -> bool {
        false
    }
}

/// Omits `None` and empty strings, and compacts empty collections and maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipNullAndEmptySerializationFilter;

impl SerializationFilter for SkipNullAndEmptySerializationFilter {
    fn is_skipped(&self, property: &PropertyValue<'_>) -> bool {
        matches!(property.presence, Presence::Null | Presence::EmptyString)
    }

    fn skip_empty_collection(&self) -> bool {
        true
    }

    fn skip_empty_map(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{PropertyValue, SerializationFilter, SkipNullAndEmptySerializationFilter};
    use crate::Presence;

    #[test]
    fn skips_null_and_empty_strings_only() {
        let filter = SkipNullAndEmptySerializationFilter;
        let check = |presence| {
            filter.is_skipped(&PropertyValue {
                host: "Host",
                name: "field",
                value: &(),
                presence,
            })
        };
        assert!(check(Presence::Null));
        assert!(check(Presence::EmptyString));
        assert!(!check(Presence::EmptyCollection));
        assert!(!check(Presence::Value));
        assert!(filter.skip_empty_collection());
    }
}
