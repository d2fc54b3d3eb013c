use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use std::sync::OnceLock;

use super::Upcast;
use crate::bean::simple_name;
use crate::binding::{replace_with, value_ref};
use crate::producer::CreateBinding;
use crate::{
    Bind, BindingInitContext, ReadContext, Result, RootBinding, SerializationError, TypeKey,
    WriteContext,
};

type Wrap<B> = Box<dyn Fn(Box<dyn Any>) -> Result<Box<B>> + Send + Sync>;

/// One allowed concrete type of a closed polymorphic binding.
pub struct Subtype<B: ?Sized> {
    name: &'static str,
    type_id: TypeId,
    type_key: fn() -> TypeKey,
    create: CreateBinding,
    wrap: Wrap<B>,
}

impl<B: ?Sized + 'static> Subtype<B> {
    /// `wrap` is usually `|value| value`, an unsizing coercion.
    pub fn of<C: Bind>(wrap: fn(Box<C>) -> Box<B>) -> Self {
        Self {
            name: simple_name(type_name::<C>()),
            type_id: TypeId::of::<C>(),
            type_key: C::type_key,
            create: C::create_binding,
            wrap: Box::new(move |value: Box<dyn Any>| {
                value
                    .downcast::<C>()
                    .map(wrap)
                    .map_err(|_| SerializationError::type_mismatch(type_name::<C>()))
            }),
        }
    }

    /// The annotation written for this subtype.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Binding of `Box<B>` over a fixed list of [`Subtype`]s.
pub struct ClosedPolymorphicBinding<B: ?Sized + 'static> {
    subtypes: Box<[Subtype<B>]>,
    upcast: Upcast<B>,
    bindings: OnceLock<Box<[Arc<dyn RootBinding>]>>,
}

impl<B: ?Sized + 'static> ClosedPolymorphicBinding<B> {
    pub fn new(subtypes: Vec<Subtype<B>>, upcast: Upcast<B>) -> Self {
        Self {
            subtypes: subtypes.into_boxed_slice(),
            upcast,
            bindings: OnceLock::new(),
        }
    }

    fn binding(&self, index: usize) -> Result<&dyn RootBinding> {
        self.bindings
            .get()
            .and_then(|bindings| bindings.get(index))
            .map(|binding| &**binding)
            .ok_or_else(|| SerializationError::uninitialized(type_name::<Box<B>>()))
    }

    fn allowed(&self) -> String {
        self.subtypes
            .iter()
            .map(Subtype::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<B: ?Sized + 'static> RootBinding for ClosedPolymorphicBinding<B> {
    fn type_name(&self) -> &'static str {
        type_name::<Box<B>>()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let bindings = self
            .subtypes
            .iter()
            .map(|subtype| ctx.root_binding_dyn((subtype.type_key)(), subtype.create))
            .collect::<Result<Box<[_]>>>()?;
        let _ = self.bindings.set(bindings);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let value = (self.upcast)(&**value_ref::<Box<B>>(value)?);
        let type_id = value.type_id();
        let index = self
            .subtypes
            .iter()
            .position(|subtype| subtype.type_id == type_id)
            .ok_or_else(|| {
                SerializationError::polymorphism(alloc::format!(
                    "value of {} is not one of the allowed subtypes [{}]",
                    type_name::<Box<B>>(),
                    self.allowed()
                ))
            })?;

        ctx.writer().add_type_annotation(self.subtypes[index].name);
        self.binding(index)?.serialize(value, ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let annotation = ctx.reader().type_annotations().next().map(ToString::to_string);
        let Some(annotation) = annotation else {
            return Err(SerializationError::polymorphism(alloc::format!(
                "missing type annotation for {}",
                type_name::<Box<B>>()
            )));
        };
        let index = self
            .subtypes
            .iter()
            .position(|subtype| subtype.name == annotation)
            .ok_or_else(|| {
                SerializationError::polymorphism(alloc::format!(
                    "unknown subtype `{annotation}` for {}, expected one of [{}]",
                    type_name::<Box<B>>(),
                    self.allowed()
                ))
            })?;

        let value = self.binding(index)?.deserialize(ctx)?;
        let value: Box<B> = (self.subtypes[index].wrap)(value)?;
        Ok(Box::new(value))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        if ctx.reader().is_null() {
            return Ok(());
        }
        let value = self.deserialize(ctx)?;
        replace_with::<Box<B>>(target, value)
    }
}
