//! Sequences: `Vec`, `VecDeque`, `HashSet`, `BTreeSet` and `Box<[T]>`.
//!
//! A collection is written as a `LIST` of its elements. With
//! [`skip_empty_collection`](crate::SerializationFilter::skip_empty_collection)
//! an empty collection is written as the `INT` marker [`EMPTY`] instead.
//! `Vec<u8>` and `Box<[u8]>` are blobs.

use alloc::boxed::Box;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use std::collections::HashSet;
use std::hash::RandomState;
use std::sync::OnceLock;

use vc_value::{ContainerKind, ValueKind};

use crate::binding::{unbox, value_mut, value_ref};
use crate::scalar::ScalarBinding;
use crate::{
    Bind, BindingInitContext, ErrorKind, NestedBinding, Presence, RawType, ReadContext, Result,
    RootBinding, SerializationError, TypeKey, WriteContext,
};

/// Marker of an empty collection or map.
pub const EMPTY: i64 = 0;

/// Marker of a shared empty instance. Accepted on read, never written.
pub const EMPTY_SHARED: i64 = 1;

// -----------------------------------------------------------------------------
// CollectionLike

/// A growable sequence of bindable items.
pub trait CollectionLike: Any + Default {
    type Item: Bind;

    fn len(&self) -> usize;

    fn iter(&self) -> impl Iterator<Item = &Self::Item>;

    fn clear(&mut self);

    fn push(&mut self, item: Self::Item);
}

impl<T: Bind> CollectionLike for Vec<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        <[T]>::iter(self)
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn push(&mut self, item: T) {
        Vec::push(self, item);
    }
}

impl<T: Bind> CollectionLike for VecDeque<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        VecDeque::iter(self)
    }

    fn clear(&mut self) {
        VecDeque::clear(self);
    }

    fn push(&mut self, item: T) {
        self.push_back(item);
    }
}

impl<T, S> CollectionLike for HashSet<T, S>
where
    T: Bind + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        HashSet::iter(self)
    }

    fn clear(&mut self) {
        HashSet::clear(self);
    }

    fn push(&mut self, item: T) {
        self.insert(item);
    }
}

impl<T: Bind + Ord> CollectionLike for BTreeSet<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        BTreeSet::iter(self)
    }

    fn clear(&mut self) {
        BTreeSet::clear(self);
    }

    fn push(&mut self, item: T) {
        self.insert(item);
    }
}

// -----------------------------------------------------------------------------
// Bind

#[inline]
fn is_byte<T: Any>() -> bool {
    TypeId::of::<T>() == TypeId::of::<u8>()
}

impl<T: Bind> Bind for Vec<T> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::Vec, [T::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        if is_byte::<T>() {
            return Ok(Arc::new(ScalarBinding::<Vec<u8>>::new()));
        }
        Ok(Arc::new(CollectionBinding::<Self>::new()))
    }
}

impl<T: Bind> Bind for VecDeque<T> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::VecDeque, [T::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(CollectionBinding::<Self>::new()))
    }
}

impl<T, S> Bind for HashSet<T, S>
where
    T: Bind + Eq + Hash,
    S: BuildHasher + Default + 'static,
{
    fn type_key() -> TypeKey {
        if TypeId::of::<S>() == TypeId::of::<RandomState>() {
            TypeKey::parameterized(RawType::HashSet, [T::type_key()])
        } else {
            TypeKey::named::<Self>()
        }
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(CollectionBinding::<Self>::new()))
    }
}

impl<T: Bind + Ord> Bind for BTreeSet<T> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::BTreeSet, [T::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(CollectionBinding::<Self>::new()))
    }
}

impl<T: Bind> Bind for Box<[T]> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::Array, [T::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        if is_byte::<T>() {
            return Ok(Arc::new(ScalarBinding::<Box<[u8]>>::new()));
        }
        Ok(Arc::new(ArrayBinding::<T>::new()))
    }
}

// -----------------------------------------------------------------------------
// Shared encoding

fn element_binding<'a>(
    cell: &'a OnceLock<Arc<dyn NestedBinding>>,
    type_name: &str,
) -> Result<&'a dyn NestedBinding> {
    cell.get()
        .map(|element| &**element)
        .ok_or_else(|| SerializationError::uninitialized(type_name))
}

/// Writes `items` as a `LIST`.
fn write_list<'v>(
    element: &dyn NestedBinding,
    items: impl Iterator<Item = &'v dyn Any>,
    ctx: &mut WriteContext<'_>,
) -> Result<()> {
    ctx.writer().step_in(ContainerKind::List)?;
    for item in items {
        element.serialize(item, ctx)?;
    }
    ctx.writer().step_out()?;
    Ok(())
}

/// Validates an empty marker.
pub(crate) fn read_empty_marker(ctx: &mut ReadContext<'_, '_>, type_name: &str) -> Result<()> {
    match ctx.reader().int_value()? {
        EMPTY | EMPTY_SHARED => Ok(()),
        code => Err(SerializationError::new(
            ErrorKind::Shape,
            alloc::format!("invalid empty marker {code} for {type_name}"),
        )),
    }
}

/// Reads a `LIST`, an empty marker, or `NULL`, handing every element to `push`.
fn read_list(
    element: &dyn NestedBinding,
    ctx: &mut ReadContext<'_, '_>,
    type_name: &str,
    mut push: impl FnMut(Box<dyn Any>) -> Result<()>,
) -> Result<()> {
    match ctx.kind() {
        Some(ValueKind::Null) => Ok(()),
        Some(ValueKind::Int) => read_empty_marker(ctx, type_name),
        Some(ValueKind::List) => {
            ctx.reader().step_in()?;
            while ctx.reader().next()?.is_some() {
                push(element.deserialize(ctx)?)?;
            }
            ctx.reader().step_out()?;
            Ok(())
        }
        found => Err(SerializationError::shape("LIST", found, type_name)),
    }
}

// -----------------------------------------------------------------------------
// CollectionBinding

/// Binding of a [`CollectionLike`] over the nested binding of its items.
pub struct CollectionBinding<C> {
    element: OnceLock<Arc<dyn NestedBinding>>,
    _marker: PhantomData<fn() -> C>,
}

impl<C: CollectionLike> CollectionBinding<C> {
    pub fn new() -> Self {
        Self {
            element: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    /// Writes `items` as a `LIST`, regardless of the empty filter.
    pub fn write_items<'v>(
        &self,
        items: impl IntoIterator<Item = &'v C::Item>,
        ctx: &mut WriteContext<'_>,
    ) -> Result<()> {
        let element = element_binding(&self.element, type_name::<C>())?;
        write_list(element, items.into_iter().map(|item| item as &dyn Any), ctx)
    }

    /// Clears `target` and fills it from the current value.
    fn read_items(&self, target: &mut C, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        let element = element_binding(&self.element, type_name::<C>())?;
        target.clear();
        read_list(element, ctx, type_name::<C>(), |item| {
            target.push(unbox::<C::Item>(item)?);
            Ok(())
        })
    }
}

impl<C: CollectionLike> RootBinding for CollectionBinding<C> {
    fn type_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let element = ctx.nested_binding::<C::Item>()?;
        let _ = self.element.set(element);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let items = value_ref::<C>(value)?;
        if items.len() == 0 && ctx.config().skip_empty_collection() {
            return Ok(ctx.writer().write_int(EMPTY)?);
        }
        self.write_items(items.iter(), ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let mut items = C::default();
        self.read_items(&mut items, ctx)?;
        Ok(Box::new(items))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        self.read_items(value_mut::<C>(target)?, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        match value.downcast_ref::<C>() {
            Some(items) if items.len() == 0 => Presence::EmptyCollection,
            _ => Presence::Value,
        }
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(C::default()))
    }
}

// -----------------------------------------------------------------------------
// ArrayBinding

/// Binding of `Box<[T]>`, collected into a `Vec` and then frozen.
pub struct ArrayBinding<T> {
    element: OnceLock<Arc<dyn NestedBinding>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bind> ArrayBinding<T> {
    pub fn new() -> Self {
        Self {
            element: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    fn read_array(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<[T]>> {
        let element = element_binding(&self.element, type_name::<Box<[T]>>())?;
        let mut items = Vec::new();
        read_list(element, ctx, type_name::<Box<[T]>>(), |item| {
            items.push(unbox::<T>(item)?);
            Ok(())
        })?;
        Ok(items.into_boxed_slice())
    }
}

impl<T: Bind> RootBinding for ArrayBinding<T> {
    fn type_name(&self) -> &'static str {
        type_name::<Box<[T]>>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let element = ctx.nested_binding::<T>()?;
        let _ = self.element.set(element);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let items = value_ref::<Box<[T]>>(value)?;
        if items.is_empty() && ctx.config().skip_empty_collection() {
            return Ok(ctx.writer().write_int(EMPTY)?);
        }
        let element = element_binding(&self.element, type_name::<Box<[T]>>())?;
        write_list(element, items.iter().map(|item| item as &dyn Any), ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        Ok(Box::new(self.read_array(ctx)?))
    }

    /// Arrays have a fixed length, the target is replaced.
    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        let array = self.read_array(ctx)?;
        *value_mut::<Box<[T]>>(target)? = array;
        Ok(())
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        match value.downcast_ref::<Box<[T]>>() {
            Some(items) if items.is_empty() => Presence::EmptyCollection,
            _ => Presence::Value,
        }
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(Box::<[T]>::default()))
    }
}
