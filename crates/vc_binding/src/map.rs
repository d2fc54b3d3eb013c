//! Maps: `HashMap` and `BTreeMap`.
//!
//! String-keyed maps are written as a `STRUCT` whose field names are the
//! keys; other maps as a flat `LIST` alternating key and value. An empty
//! map may be compacted to the same marker as an empty collection.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::cmp::Ordering;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use std::collections::HashMap;
use std::hash::RandomState;
use std::sync::OnceLock;

use vc_value::{ContainerKind, ValueKind};

use crate::binding::{unbox, value_mut, value_ref};
use crate::collection::{EMPTY, read_empty_marker};
use crate::{
    Bind, BindingInitContext, NestedBinding, Presence, RawType, ReadContext, Result, RootBinding,
    SerializationError, TypeKey, WriteContext,
};

// -----------------------------------------------------------------------------
// MapLike

/// A key-value container.
pub trait MapLike: Any + Default {
    type Key: Bind;
    type Value: Bind;

    /// Iteration already follows key order.
    const SORTED: bool;

    fn len(&self) -> usize;

    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    fn clear(&mut self);

    fn insert(&mut self, key: Self::Key, value: Self::Value);
}

impl<K, V, S> MapLike for HashMap<K, V, S>
where
    K: Bind + Eq + Hash,
    V: Bind,
    S: BuildHasher + Default + 'static,
{
    type Key = K;
    type Value = V;

    const SORTED: bool = false;

    #[inline]
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn clear(&mut self) {
        HashMap::clear(self);
    }

    fn insert(&mut self, key: K, value: V) {
        HashMap::insert(self, key, value);
    }
}

impl<K: Bind + Ord, V: Bind> MapLike for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    const SORTED: bool = true;

    #[inline]
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    fn insert(&mut self, key: K, value: V) {
        BTreeMap::insert(self, key, value);
    }
}

// -----------------------------------------------------------------------------
// Bind

impl<K, V, S> Bind for HashMap<K, V, S>
where
    K: Bind + Eq + Hash,
    V: Bind,
    S: BuildHasher + Default + 'static,
{
    fn type_key() -> TypeKey {
        if TypeId::of::<S>() == TypeId::of::<RandomState>() {
            TypeKey::parameterized(RawType::HashMap, [K::type_key(), V::type_key()])
        } else {
            TypeKey::named::<Self>()
        }
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        if TypeId::of::<K>() == TypeId::of::<i32>() && TypeId::of::<V>() == TypeId::of::<i32>() {
            return Ok(Arc::new(IntMapBinding::<S>::new()));
        }
        Ok(Arc::new(MapBinding::<Self>::new()))
    }
}

impl<K: Bind + Ord, V: Bind> Bind for BTreeMap<K, V> {
    fn type_key() -> TypeKey {
        TypeKey::parameterized(RawType::BTreeMap, [K::type_key(), V::type_key()])
    }

    fn create_binding() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(MapBinding::<Self>::new()))
    }
}

// -----------------------------------------------------------------------------
// MapBinding

struct Members {
    key: Arc<dyn NestedBinding>,
    value: Arc<dyn NestedBinding>,
}

/// Binding of a [`MapLike`] over the nested bindings of keys and values.
pub struct MapBinding<M> {
    members: OnceLock<Members>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: MapLike> MapBinding<M> {
    pub fn new() -> Self {
        Self {
            members: OnceLock::new(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn string_keys() -> bool {
        TypeId::of::<M::Key>() == TypeId::of::<String>()
    }

    fn members(&self) -> Result<&Members> {
        self.members
            .get()
            .ok_or_else(|| SerializationError::uninitialized(type_name::<M>()))
    }

    fn write_entries(&self, map: &M, ctx: &mut WriteContext<'_>) -> Result<()> {
        let Members { key, value } = self.members()?;

        let mut entries: Vec<(&M::Key, &M::Value)> = map.entries().collect();
        if ctx.config().order_map_entries_by_keys && !M::SORTED && entries.len() > 1 {
            // Only naturally ordered keys are sorted.
            if key.compare(entries[0].0, entries[1].0).is_some() {
                entries.sort_by(|a, b| key.compare(a.0, b.0).unwrap_or(Ordering::Equal));
            }
        }

        if Self::string_keys() {
            ctx.writer().step_in(ContainerKind::Struct)?;
            for (k, v) in entries {
                let name = value_ref::<String>(k)?;
                ctx.writer().set_field_name(name);
                value.serialize(v, ctx)?;
            }
        } else {
            ctx.writer().step_in(ContainerKind::List)?;
            for (k, v) in entries {
                key.serialize(k, ctx)?;
                value.serialize(v, ctx)?;
            }
        }
        ctx.writer().step_out()?;
        Ok(())
    }

    fn read_entries(&self, target: &mut M, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        let Members { key, value } = self.members()?;
        target.clear();

        match ctx.kind() {
            Some(ValueKind::Null) => Ok(()),
            Some(ValueKind::Int) => read_empty_marker(ctx, type_name::<M>()),
            Some(ValueKind::Struct) if Self::string_keys() => {
                ctx.reader().step_in()?;
                while ctx.reader().next()?.is_some() {
                    let name = ctx
                        .reader()
                        .field_name()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    let k = unbox::<M::Key>(Box::new(name))?;
                    let v = unbox::<M::Value>(value.deserialize(ctx)?)?;
                    target.insert(k, v);
                }
                ctx.reader().step_out()?;
                Ok(())
            }
            Some(ValueKind::List) => {
                ctx.reader().step_in()?;
                while ctx.reader().next()?.is_some() {
                    let k = unbox::<M::Key>(key.deserialize(ctx)?)?;
                    if ctx.reader().next()?.is_none() {
                        return Err(SerializationError::shape("map value", None, type_name::<M>()));
                    }
                    let v = unbox::<M::Value>(value.deserialize(ctx)?)?;
                    target.insert(k, v);
                }
                ctx.reader().step_out()?;
                Ok(())
            }
            found => {
                let expected = if Self::string_keys() { "STRUCT" } else { "LIST" };
                Err(SerializationError::shape(expected, found, type_name::<M>()))
            }
        }
    }
}

impl<M: MapLike> RootBinding for MapBinding<M> {
    fn type_name(&self) -> &'static str {
        type_name::<M>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let key = ctx.nested_binding::<M::Key>()?;
        let value = ctx.nested_binding::<M::Value>()?;
        let _ = self.members.set(Members { key, value });
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let map = value_ref::<M>(value)?;
        if map.len() == 0 && ctx.config().skip_empty_map() {
            return Ok(ctx.writer().write_int(EMPTY)?);
        }
        self.write_entries(map, ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let mut map = M::default();
        self.read_entries(&mut map, ctx)?;
        Ok(Box::new(map))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        self.read_entries(value_mut::<M>(target)?, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        match value.downcast_ref::<M>() {
            Some(map) if map.len() == 0 => Presence::EmptyMap,
            _ => Presence::Value,
        }
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(M::default()))
    }
}

// -----------------------------------------------------------------------------
// IntMapBinding

/// `HashMap<i32, i32, S>` written as raw integer pairs.
///
/// Integers outside the `i32` range are narrowed with `as` on read, so a
/// stream written by a wider map keeps only the low 32 bits.
pub struct IntMapBinding<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S: BuildHasher + Default + 'static> IntMapBinding<S> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn read_pairs(target: &mut HashMap<i32, i32, S>, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        target.clear();
        match ctx.kind() {
            Some(ValueKind::Null) => Ok(()),
            Some(ValueKind::Int) => read_empty_marker(ctx, type_name::<HashMap<i32, i32, S>>()),
            Some(ValueKind::List) => {
                let reader = ctx.reader();
                reader.step_in()?;
                while let Some(kind) = reader.next()? {
                    let key = int_member(reader.int_value(), Some(kind))?;
                    let kind = reader.next()?;
                    let value = int_member(reader.int_value(), kind)?;
                    target.insert(key, value);
                }
                reader.step_out()?;
                Ok(())
            }
            found => Err(SerializationError::shape(
                "LIST",
                found,
                type_name::<HashMap<i32, i32, S>>(),
            )),
        }
    }
}

fn int_member(value: vc_value::Result<i64>, kind: Option<ValueKind>) -> Result<i32> {
    match kind {
        // Narrowing, not checked.
        Some(ValueKind::Int) => Ok(value? as i32),
        found => Err(SerializationError::shape("INT", found, "HashMap<i32, i32>")),
    }
}

impl<S: BuildHasher + Default + 'static> RootBinding for IntMapBinding<S> {
    fn type_name(&self) -> &'static str {
        type_name::<HashMap<i32, i32, S>>()
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let map = value_ref::<HashMap<i32, i32, S>>(value)?;
        if map.is_empty() && ctx.config().skip_empty_map() {
            return Ok(ctx.writer().write_int(EMPTY)?);
        }

        let mut entries: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
        if ctx.config().order_map_entries_by_keys {
            entries.sort_unstable_by_key(|(k, _)| *k);
        }

        let writer = ctx.writer();
        writer.step_in(ContainerKind::List)?;
        for (k, v) in entries {
            writer.write_int(i64::from(k))?;
            writer.write_int(i64::from(v))?;
        }
        writer.step_out()?;
        Ok(())
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let mut map = HashMap::<i32, i32, S>::default();
        Self::read_pairs(&mut map, ctx)?;
        Ok(Box::new(map))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        Self::read_pairs(value_mut::<HashMap<i32, i32, S>>(target)?, ctx)
    }

    fn presence(&self, value: &dyn Any) -> Presence {
        match value.downcast_ref::<HashMap<i32, i32, S>>() {
            Some(map) if map.is_empty() => Presence::EmptyMap,
            _ => Presence::Value,
        }
    }

    fn absent_value(&self) -> Option<Box<dyn Any>> {
        Some(Box::new(HashMap::<i32, i32, S>::default()))
    }
}
