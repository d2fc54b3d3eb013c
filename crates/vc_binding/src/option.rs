//! `Option<T>`: `None` is written as `NULL`.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, type_name};
use core::cmp::Ordering;
use core::marker::PhantomData;
use std::sync::OnceLock;

use crate::binding::{unbox, value_mut, value_ref};
use crate::{
    Bind, BindingInitContext, NestedBinding, Presence, RawType, ReadContext, Result, RootBinding,
    SerializationError, TypeKey, WriteContext,
};

impl<T: Bind> Bind for Option<T> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::Option, [T::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(OptionBinding::<T>::new()))
    }
}

/// Binding of `Option<T>` over the nested binding of `T`.
pub struct OptionBinding<T> {
    inner: OnceLock<Arc<dyn NestedBinding>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bind> OptionBinding<T> {
    pub fn new() -> Self {
        Self {
            inner: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    fn inner(&self) -> Result<&dyn NestedBinding> {
        self.inner
            .get()
            .map(|inner| &**inner)
            .ok_or_else(|| SerializationError::uninitialized(type_name::<Option<T>>()))
    }
}

impl<T: Bind> RootBinding for OptionBinding<T> {
    fn type_name(&self) -> &'static str {
        type_name::<Option<T>>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let inner = ctx.nested_binding::<T>()?;
        let _ = self.inner.set(inner);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        match value_ref::<Option<T>>(value)? {
            Some(value) => self.inner()?.serialize(value, ctx),
            None => Ok(ctx.writer().write_null()?),
        }
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        if ctx.reader().is_null() {
            return Ok(Box::new(None::<T>));
        }
        let value = unbox::<T>(self.inner()?.deserialize(ctx)?)?;
        Ok(Box::new(Some(value)))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        let target = value_mut::<Option<T>>(target)?;
        if ctx.reader().is_null() {
            *target = None;
            return Ok(());
        }
        let inner = self.inner()?;
        match target {
            Some(existing) => inner.deserialize_into(existing, ctx),
            None => {
                *target = Some(unbox::<T>(inner.deserialize(ctx)?)?);
                Ok(())
            }
        }
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        match value.downcast_ref::<Option<T>>() {
            Some(None) => Presence::Null,
            Some(Some(value)) => self.inner.get().map_or(Presence::Value, |inner| inner.presence(value)),
            None => Presence::Value,
        }
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(None::<T>))
    }

    fn compare(&self, a: &dyn Any, b: &dyn Any) -> Option<Ordering> {
        match (a.downcast_ref::<Option<T>>()?, b.downcast_ref::<Option<T>>()?) {
            (Some(a), Some(b)) => self.inner.get()?.compare(a, b),
            (a, b) => Some(a.is_some().cmp(&b.is_some())),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::{BindingProducer, Presence};

    #[test]
    fn presence_of_none_and_empty() {
        let producer = BindingProducer::new();
        let binding = producer.root_binding::<Option<String>>().unwrap();
        assert_eq!(binding.presence(&None::<String>), Presence::Null);
        assert_eq!(binding.presence(&Some(String::new())), Presence::EmptyString);
        assert_eq!(binding.presence(&Some(String::from("x"))), Presence::Value);
        assert!(binding.absent_value().unwrap().is::<Option<String>>());
    }

    #[test]
    fn none_sorts_first() {
        let producer = BindingProducer::new();
        let binding = producer.root_binding::<Option<i32>>().unwrap();
        assert_eq!(binding.compare(&None::<i32>, &Some(1)), Some(core::cmp::Ordering::Less));
        assert_eq!(binding.compare(&Some(2), &Some(1)), Some(core::cmp::Ordering::Greater));
    }
}
