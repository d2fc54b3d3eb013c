//! Read and write options.
//!
//! The plain options derive `serde` so hosts can keep them in their own
//! settings files; runtime hooks are skipped.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::bean::BeanInfo;
use crate::polymorphic::TypeResolver;
use crate::{SerializationFilter, SkipNullAndEmptySerializationFilter};

/// Hook applied to every bean right after construction.
pub type BeanConstructed = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// Supplies parameter names for a constructor declared with an arity only.
///
/// Receives the bean and the arity, returns the property names in
/// parameter order.
pub type PropertyMappingResolver = Arc<dyn Fn(&BeanInfo, usize) -> Option<Vec<String>> + Send + Sync>;

// -----------------------------------------------------------------------------
// WriteConfiguration

/// Options of a write call.
///
/// # Examples
///
/// ```
/// use vc_binding::WriteConfiguration;
///
/// let config = WriteConfiguration::default()
///     .with_binary(false)
///     .with_skip_null_and_empty()
///     .with_order_map_entries_by_keys(true);
/// assert!(!config.binary);
/// assert!(config.filter.is_some());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfiguration {
    /// Compact binary output; pretty text otherwise.
    pub binary: bool,
    /// Sort map entries by key for reproducible output.
    pub order_map_entries_by_keys: bool,
    /// Permit open polymorphism by type path.
    pub allow_any_subtypes: bool,
    #[serde(skip)]
    pub filter: Option<Arc<dyn SerializationFilter>>,
    /// Overrides the global subtype registry.
    #[serde(skip)]
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl Default for WriteConfiguration {
    fn default() -> Self {
        Self {
            binary: true,
            order_map_entries_by_keys: false,
            allow_any_subtypes: false,
            filter: None,
            type_resolver: None,
        }
    }
}

impl WriteConfiguration {
    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_order_map_entries_by_keys(mut self, order: bool) -> Self {
        self.order_map_entries_by_keys = order;
        self
    }

    pub fn with_allow_any_subtypes(mut self, allow: bool) -> Self {
        self.allow_any_subtypes = allow;
        self
    }

    pub fn with_filter(mut self, filter: impl SerializationFilter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Shorthand for [`SkipNullAndEmptySerializationFilter`].
    pub fn with_skip_null_and_empty(self) -> Self {
        self.with_filter(SkipNullAndEmptySerializationFilter)
    }

    pub fn with_type_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.type_resolver = Some(resolver);
        self
    }

    #[inline]
    pub(crate) fn skip_empty_collection(&self) -> bool {
        self.filter.as_ref().is_some_and(|f| f.skip_empty_collection())
    }

    #[inline]
    pub(crate) fn skip_empty_map(&self) -> bool {
        self.filter.as_ref().is_some_and(|f| f.skip_empty_map())
    }
}

impl fmt::Debug for WriteConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteConfiguration")
            .field("binary", &self.binary)
            .field("order_map_entries_by_keys", &self.order_map_entries_by_keys)
            .field("allow_any_subtypes", &self.allow_any_subtypes)
            .field("filter", &self.filter.is_some())
            .field("type_resolver", &self.type_resolver.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ReadConfiguration

/// Options of a read call.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfiguration {
    /// Permit open polymorphism by type path.
    pub allow_any_subtypes: bool,
    /// Overrides the global subtype registry.
    #[serde(skip)]
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
    #[serde(skip)]
    pub bean_constructed: Option<BeanConstructed>,
    #[serde(skip)]
    pub resolve_property_mapping: Option<PropertyMappingResolver>,
}

impl ReadConfiguration {
    pub fn with_allow_any_subtypes(mut self, allow: bool) -> Self {
        self.allow_any_subtypes = allow;
        self
    }

    pub fn with_type_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.type_resolver = Some(resolver);
        self
    }

    pub fn with_bean_constructed(mut self, hook: impl Fn(&mut dyn Any) + Send + Sync + 'static) -> Self {
        self.bean_constructed = Some(Arc::new(hook));
        self
    }

    pub fn with_property_mapping(
        mut self,
        resolver: impl Fn(&BeanInfo, usize) -> Option<Vec<String>> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_property_mapping = Some(Arc::new(resolver));
        self
    }
}

impl fmt::Debug for ReadConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadConfiguration")
            .field("allow_any_subtypes", &self.allow_any_subtypes)
            .field("type_resolver", &self.type_resolver.is_some())
            .field("bean_constructed", &self.bean_constructed.is_some())
            .field("resolve_property_mapping", &self.resolve_property_mapping.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{ReadConfiguration, WriteConfiguration};

    #[test]
    fn plain_options_round_trip_through_json() {
        let config = WriteConfiguration::default()
            .with_binary(false)
            .with_allow_any_subtypes(true)
            .with_skip_null_and_empty();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"binary":false,"order_map_entries_by_keys":false,"allow_any_subtypes":true}"#
        );

        let back: WriteConfiguration = serde_json::from_str(&json).unwrap();
        assert!(!back.binary);
        assert!(back.allow_any_subtypes);
        assert!(back.filter.is_none());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: WriteConfiguration = serde_json::from_str("{}").unwrap();
        assert!(config.binary);

        let config: ReadConfiguration =
            serde_json::from_str(r#"{"allow_any_subtypes":true}"#).unwrap();
        assert!(config.allow_any_subtypes);
        assert!(config.bean_constructed.is_none());
    }
}
