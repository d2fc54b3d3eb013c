//! Shared handles: `Rc<T>`, `Arc<T>` and [`Shared<T>`] over a bean.
//!
//! A handle is written in full the first time its target is met, with an
//! `@id` field, and as a bare `INT` back-reference afterwards. `Rc` and
//! `Arc` targets are registered once fully read, which supports sharing
//! but not cycles. [`Shared`] targets are registered as soon as their id
//! is read, so a graph may refer back to an object still being read.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::any::{Any, TypeId, type_name};
use core::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use core::fmt;
use core::marker::PhantomData;
use std::sync::OnceLock;

use vc_value::ValueKind;

use crate::bean::{Bean, BeanBinding, Instance, Registration};
use crate::binding::{replace_with, value_ref};
use crate::identity::ObjectId;
use crate::{
    Bind, BindingInitContext, ErrorKind, RawType, ReadContext, Result, RootBinding,
    SerializationError, TypeKey, WriteContext,
};

// -----------------------------------------------------------------------------
// Shared

/// Shared, mutable ownership of a bean that may take part in cycles.
///
/// # Examples
///
/// ```
/// use vc_binding::Shared;
///
/// let a = Shared::new(1);
/// let b = a.clone();
/// *b.borrow_mut() += 1;
/// assert_eq!(*a.borrow(), 2);
/// assert!(Shared::ptr_eq(&a, &b));
/// ```
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Panics if the value is mutably borrowed, like [`RefCell::borrow`].
    #[inline]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Panics if the value is borrowed, like [`RefCell::borrow_mut`].
    #[inline]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    #[inline]
    pub fn try_borrow(&self) -> Result<Ref<'_, T>, BorrowError> {
        self.0.try_borrow()
    }

    #[inline]
    pub fn try_borrow_mut(&self) -> Result<RefMut<'_, T>, BorrowMutError> {
        self.0.try_borrow_mut()
    }

    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    #[inline]
    pub fn as_rc(&self) -> &Rc<RefCell<T>> {
        &self.0
    }
}

impl<T> Clone for Shared<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> From<Box<T>> for Shared<T> {
    #[inline]
    fn from(value: Box<T>) -> Self {
        Self::new(*value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Shared").field(&*value).finish(),
            Err(_) => f.write_str("Shared(<borrowed>)"),
        }
    }
}

// -----------------------------------------------------------------------------
// SharedHandle

/// A handle whose target has an identity.
pub(crate) trait SharedHandle: Any + Clone {
    type Target: Bean;

    const RAW: RawType;

    /// How the target becomes referencable while it is read.
    const REGISTRATION: Registration;

    /// Identity of the target.
    fn address(&self) -> usize;

    fn with_target<R>(&self, f: impl FnOnce(&Self::Target) -> Result<R>) -> Result<R>;

    fn from_instance(instance: Instance<Self::Target>) -> Result<Self>;
}

impl<T: Bean> SharedHandle for Rc<T> {
    type Target = T;

    const RAW: RawType = RawType::Rc;
    const REGISTRATION: Registration = Registration::Late;

    #[inline]
    fn address(&self) -> usize {
        Rc::as_ptr(self) as *const () as usize
    }

    fn with_target<R>(&self, f: impl FnOnce(&T) -> Result<R>) -> Result<R> {
        f(self)
    }

    fn from_instance(instance: Instance<T>) -> Result<Self> {
        Ok(Rc::from(instance.into_owned()?))
    }
}

impl<T: Bean> SharedHandle for Arc<T> {
    type Target = T;

    const RAW: RawType = RawType::Arc;
    const REGISTRATION: Registration = Registration::Late;

    #[inline]
    fn address(&self) -> usize {
        Arc::as_ptr(self) as *const () as usize
    }

    fn with_target<R>(&self, f: impl FnOnce(&T) -> Result<R>) -> Result<R> {
        f(self)
    }

    fn from_instance(instance: Instance<T>) -> Result<Self> {
        Ok(Arc::from(instance.into_owned()?))
    }
}

impl<T: Bean> SharedHandle for Shared<T> {
    type Target = T;

    const RAW: RawType = RawType::Shared;
    const REGISTRATION: Registration = Registration::Early;

    #[inline]
    fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    fn with_target<R>(&self, f: impl FnOnce(&T) -> Result<R>) -> Result<R> {
        let value = self.try_borrow().map_err(|_| {
            SerializationError::new(
                ErrorKind::Shape,
                alloc::format!("`{}` is mutably borrowed while being written", type_name::<T>()),
            )
        })?;
        f(&value)
    }

    fn from_instance(instance: Instance<T>) -> Result<Self> {
        match instance {
            Instance::Shared(shared) => Ok(shared),
            Instance::Owned(value) => Ok(Shared::from(value)),
        }
    }
}

macro_rules! impl_shared_bind {
    ($($handle:ident),*) => {$(
        impl<T: Bean> Bind for $handle<T> {
            fn type_key() -> TypeKey {
                TypeKey::parameterized(<Self as SharedHandle>::RAW, [T::type_key()])
            }

            fn create_binding() -> Result<Arc<dyn RootBinding>> {
                Ok(Arc::new(SharedBinding::<Self>::new()))
            }
        }
    )*};
}

impl_shared_bind!(Rc, Arc, Shared);

// -----------------------------------------------------------------------------
// SharedBinding

/// Binding of a [`SharedHandle`] over the [`BeanBinding`] of its target.
pub(crate) struct SharedBinding<H> {
    target: OnceLock<Arc<dyn RootBinding>>,
    _marker: PhantomData<fn() -> H>,
}

impl<H: SharedHandle> SharedBinding<H> {
    fn new() -> Self {
        Self {
            target: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    fn bean(&self) -> Result<&BeanBinding<H::Target>> {
        let target = self
            .target
            .get()
            .ok_or_else(|| SerializationError::uninitialized(type_name::<H>()))?;
        downcast_bean::<H::Target>(target)
    }
}

fn downcast_bean<T: Bean>(binding: &Arc<dyn RootBinding>) -> Result<&BeanBinding<T>> {
    let binding: &dyn Any = &**binding;
    binding.downcast_ref::<BeanBinding<T>>().ok_or_else(|| {
        SerializationError::unsupported(alloc::format!(
            "shared handles need a bean binding for `{}`",
            type_name::<T>()
        ))
    })
}

impl<H: SharedHandle> RootBinding for SharedBinding<H> {
    fn type_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let target = ctx.root_binding::<H::Target>()?;
        downcast_bean::<H::Target>(&target)?;
        let _ = self.target.set(target);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let handle = value_ref::<H>(value)?;
        match ctx.object_ids().assign(handle.address(), TypeId::of::<H>()) {
            ObjectId::Seen(id) => Ok(ctx.writer().write_int(i64::from(id))?),
            ObjectId::New(id) => {
                let bean = self.bean()?;
                handle.with_target(|target| bean.write_struct(target, Some(id), ctx))
            }
        }
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        match ctx.kind() {
            Some(ValueKind::Int) => {
                let id = ctx.reader().int_value()?;
                let id = u32::try_from(id).map_err(|_| {
                    SerializationError::new(ErrorKind::UnknownReference, alloc::format!("invalid object id {id}"))
                })?;
                Ok(Box::new(ctx.object_ids().resolve::<H>(id)?))
            }
            Some(ValueKind::Struct) => {
                let (instance, id) = self.bean()?.read_instance(ctx, H::REGISTRATION)?;
                let handle = H::from_instance(instance)?;
                if let (Registration::Late, Some(id)) = (H::REGISTRATION, id) {
                    ctx.object_ids().register(id, handle.clone())?;
                }
                Ok(Box::new(handle))
            }
            found => Err(SerializationError::shape("STRUCT or INT", found, type_name::<H>())),
        }
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        if ctx.reader().is_null() {
            return Ok(());
        }
        let value = self.deserialize(ctx)?;
        replace_with::<H>(target, value)
    }
}
