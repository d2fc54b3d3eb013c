//! The binding traits.
//!
//! A binding is the type-directed codec for one [`TypeKey`]. It is created
//! on the first cache miss, initialized once against a
//! [`BindingInitContext`] (where it resolves the bindings of its members),
//! and then shared for the lifetime of its [`BindingProducer`].
//!
//! Two roles exist:
//!
//! - [`RootBinding`]: reads and writes a standalone value. Root bindings
//!   are cached by the producer.
//! - [`NestedBinding`]: reads and writes a member of a host: a bean
//!   property, a collection element, a map entry. Scalars have dedicated
//!   nested bindings; every other type is served by a
//!   [`RootBindingAdapter`] over its cached root binding.
//!
//! [`BindingProducer`]: crate::BindingProducer

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, type_name};
use core::cmp::Ordering;

use crate::access::Accessor;
use crate::{BindingInitContext, ReadContext, Result, SerializationError, TypeKey, WriteContext};

// -----------------------------------------------------------------------------
// Presence

/// How a value looks to a [`SerializationFilter`](crate::SerializationFilter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// `None`
    Null,
    /// An empty `String`.
    EmptyString,
    EmptyCollection,
    EmptyMap,
    /// Anything else.
    Value,
}

// -----------------------------------------------------------------------------
// Bind

/// Types that can be serialized.
///
/// Implemented for scalars, collections, maps, `Option`, shared handles,
/// and by `#[derive(Bean)]` for user structs.
pub trait Bind: Any + Sized {
    /// Cache key of this type.
    fn type_key() -> TypeKey;

    /// Builds an uninitialized root binding.
    ///
    /// Types that cannot be serialized fail here, at resolution time.
    fn create_binding() -> Result<Arc<dyn RootBinding>>;

    /// Resolves the binding used when this type is a member of a host.
    ///
    /// The default adapts the cached root binding.
    fn nested_binding(ctx: &mut BindingInitContext<'_>) -> Result<Arc<dyn NestedBinding>> {
        let root = ctx.root_binding::<Self>()?;
        Ok(Arc::new(RootBindingAdapter::new(root)))
    }
}

// -----------------------------------------------------------------------------
// RootBinding

/// Codec for a standalone value.
///
/// Values cross this trait as `&dyn Any` / `Box<dyn Any>` holding exactly
/// the bound type.
pub trait RootBinding: Any + Send + Sync {
    /// Name of the bound type, used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Resolves member bindings. Runs once, before any use.
    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()>;

    /// Reads the current value of the reader.
    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>>;

    /// Reads the current value into an existing instance.
    ///
    /// Collections and maps reuse the existing storage.
    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()>;

    fn presence(&self, value: &dyn Any) -> Presence {
        let _ = value;
        Presence::Value
    }

    /// Value used when a constructor argument is missing from the input.
    fn absent_value(&self) -> Option<Box<dyn Any>> {
        None
    }

    /// Natural ordering, if the type has one.
    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        let _ = (a, b);
        None
    }
}

// -----------------------------------------------------------------------------
// NestedBinding

/// Codec for a member of a host object.
pub trait NestedBinding: Send + Sync {
    fn binding_name(&self) -> &'static str;

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()>;

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>>;

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()>;

    fn presence(&self, value: &dyn Any) -> Presence {
        let _ = value;
        Presence::Value
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        None
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        let _ = (a, b);
        None
    }

    /// Writes the property `accessor` of `host`.
    fn serialize_property(
        &self,
        host: &dyn Any,
        accessor: &dyn Accessor,
        ctx: &mut WriteContext<'_>,
    ) -> Result<()> {
        let value = accessor.read(host)?;
        self.serialize(value, ctx)
    }

    /// Reads the current value into the property `accessor` of `host`.
    fn deserialize_property(
        &self,
        host: &mut dyn Any,
        accessor: &dyn Accessor,
        ctx: &mut ReadContext<'_, '_>,
    ) -> Result<()> {
        let slot = accessor.read_mut(host)?;
        self.deserialize_into(slot, ctx)
    }
}

// -----------------------------------------------------------------------------
// RootBindingAdapter

/// Lets a root binding serve as a nested binding.
pub struct RootBindingAdapter {
    root: Arc<dyn RootBinding>,
}

impl RootBindingAdapter {
    #[inline]
    pub fn new(root: Arc<dyn RootBinding>) -> Self {
        Self { root }
    }

    #[inline]
    pub fn root(&self) -> &Arc<dyn RootBinding> {
        &self.root
    }
}

impl NestedBinding for RootBindingAdapter {
    fn binding_name(&self) -> &'static str {
        self.root.type_name()
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        self.root.serialize(value, ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        self.root.deserialize(ctx)
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        self.root.deserialize_into(target, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        self.root.presence(value)
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        self.root.absent_value()
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        self.root.compare(a, b)
    }
}

// -----------------------------------------------------------------------------
// Helpers

/// Downcasts a value handed to a binding.
#[inline]
pub(crate) fn value_ref<T: Any>(value: &dyn Any) -> Result<&T> {
    value
        .downcast_ref::<T>()
        .ok_or_else(|| SerializationError::type_mismatch(type_name::<T>()))
}

#[inline]
pub(crate) fn value_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T> {
    value
        .downcast_mut::<T>()
        .ok_or_else(|| SerializationError::type_mismatch(type_name::<T>()))
}

#[inline]
pub(crate) fn unbox<T: Any>(value: Box<dyn Any>) -> Result<T> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| SerializationError::type_mismatch(type_name::<T>()))
}

/// Reads with `deserialize` and overwrites `target`.
pub(crate) fn replace_with<T: Any>(target: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
    *value_mut::<T>(target)? = unbox::<T>(value)?;
    Ok(())
}
