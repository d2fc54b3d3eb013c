use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::marker::PhantomData;
use std::sync::OnceLock;

use vc_value::tree::{ElementReader, capture};
use vc_value::{ContainerKind, ValueKind, ValueReader};

use crate::bean::{Bean, BeanInfo, ConstructorArgs, ConstructorInfo, ConstructorKind};
use crate::binding::{replace_with, value_ref};
use crate::hash::{FixedHashState, HashMap};
use crate::identity::ID_FIELD;
use crate::{
    BindingInitContext, ErrorKind, NestedBinding, PropertyValue, ReadConfiguration, ReadContext,
    Result, RootBinding, SerializationError, Shared, WriteContext,
};

/// When a bean read as part of a shared handle becomes referencable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Owned value, ids are ignored.
    Ignore,
    /// Wrapped in a [`Shared`] and registered as soon as its id is read,
    /// before the remaining fields.
    Early,
    /// Registered by the caller once fully read.
    Late,
}

/// A bean being read.
pub(crate) enum Instance<T> {
    Owned(Box<T>),
    Shared(Shared<T>),
}

impl<T: Any> Instance<T> {
    fn new(value: Box<T>, registration: Registration) -> Self {
        match registration {
            Registration::Early => Self::Shared(Shared::from(value)),
            Registration::Ignore | Registration::Late => Self::Owned(value),
        }
    }

    fn with_mut<R>(&mut self, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        match self {
            Self::Owned(value) => f(value),
            Self::Shared(shared) => {
                let mut value = shared.try_borrow_mut().map_err(|_| {
                    SerializationError::new(
                        ErrorKind::Construction,
                        alloc::format!("`{}` is borrowed while being read", type_name::<T>()),
                    )
                })?;
                f(&mut value)
            }
        }
    }

    pub(crate) fn into_owned(self) -> Result<Box<T>> {
        match self {
            Self::Owned(value) => Ok(value),
            Self::Shared(_) => Err(SerializationError::type_mismatch(type_name::<T>())),
        }
    }
}

/// Constructor chosen for a bean, with the property index of each parameter.
struct ResolvedConstructor {
    constructor: usize,
    params: Box<[usize]>,
}

// -----------------------------------------------------------------------------
// BeanBinding

/// Root binding of a [`Bean`].
///
/// The property table is built once from [`Bean::bean_info`]; the
/// constructor is chosen on the first read that needs one and kept.
pub struct BeanBinding<T> {
    info: BeanInfo,
    index: HashMap<&'static str, usize>,
    bindings: OnceLock<Box<[Arc<dyn NestedBinding>]>>,
    constructor: OnceLock<ResolvedConstructor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Bean> BeanBinding<T> {
    /// Fails on duplicate or reserved property names.
    pub fn new() -> Result<Self> {
        let info = T::bean_info();
        let mut index = HashMap::with_hasher(FixedHashState);
        for (i, property) in info.properties().iter().enumerate() {
            let name = property.name();
            if name == ID_FIELD || index.insert(name, i).is_some() {
                return Err(SerializationError::unsupported(alloc::format!(
                    "property name `{name}` of {} is reserved or duplicated",
                    info.type_path()
                )));
            }
        }
        Ok(Self {
            info,
            index,
            bindings: OnceLock::new(),
            constructor: OnceLock::new(),
            _marker: PhantomData,
        })
    }

    /// Entry point of the derived [`Bind::create_binding`](crate::Bind::create_binding).
    pub fn create() -> Result<Arc<dyn RootBinding>> {
        Ok(Arc::new(Self::new()?))
    }

    #[inline]
    pub fn info(&self) -> &BeanInfo {
        &self.info
    }

    fn bindings(&self) -> Result<&[Arc<dyn NestedBinding>]> {
        self.bindings
            .get()
            .map(|bindings| &**bindings)
            .ok_or_else(|| SerializationError::uninitialized(self.info.type_path()))
    }

    fn field_error(&self, error: SerializationError, index: usize, binding: &dyn NestedBinding) -> SerializationError {
        error.context(alloc::format!(
            "field `{}` ({}) of {}",
            self.info.properties()[index].name(),
            binding.binding_name(),
            self.info.type_path(),
        ))
    }

    // -------------------------------------------------------------------------
    // Write

    /// Writes `value` as a `STRUCT`, led by its object id if it has one.
    pub(crate) fn write_struct(&self, value: &T, id: Option<u32>, ctx: &mut WriteContext<'_>) -> Result<()> {
        let bindings = self.bindings()?;
        let filter = ctx.config().filter.as_deref();

        let writer = ctx.writer();
        writer.step_in(ContainerKind::Struct)?;
        if let Some(id) = id {
            writer.set_field_name(ID_FIELD);
            writer.write_int(i64::from(id))?;
        }

        for (index, (property, binding)) in self.info.properties().iter().zip(bindings).enumerate() {
            let accessor = property.accessor();
            if let Some(filter) = filter {
                let field = accessor.read(value)?;
                let skipped = filter.is_skipped(&PropertyValue {
                    host: self.info.type_path(),
                    name: property.name(),
                    value: field,
                    presence: binding.presence(field),
                });
                if skipped {
                    continue;
                }
            }
            ctx.writer().set_field_name(property.name());
            binding
                .serialize_property(value, accessor, ctx)
                .map_err(|error| self.field_error(error, index, &**binding))?;
        }

        ctx.writer().step_out()?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Read

    /// Reads the current `STRUCT` into a new instance.
    ///
    /// Returns the object id found in the struct, if any.
    pub(crate) fn read_instance(
        &self,
        ctx: &mut ReadContext<'_, '_>,
        registration: Registration,
    ) -> Result<(Instance<T>, Option<u32>)> {
        ctx.expect_kind(ValueKind::Struct, self.info.type_path())?;
        match self.info.default_constructor() {
            Some(create) => {
                let mut instance = Instance::new(Self::downcast(create())?, registration);
                let id = self.fill(&mut instance, ctx, registration, &[], true)?;
                self.constructed(&mut instance, ctx)?;
                Ok((instance, id))
            }
            None => self.read_constructed(ctx, registration),
        }
    }

    fn downcast(value: Box<dyn Any>) -> Result<Box<T>> {
        value
            .downcast::<T>()
            .map_err(|_| SerializationError::type_mismatch(type_name::<T>()))
    }

    fn read_id(ctx: &mut ReadContext<'_, '_>) -> Result<u32> {
        let found = ctx.kind();
        let id = match found {
            Some(ValueKind::Int) => ctx.reader().int_value()?,
            _ => return Err(SerializationError::shape("INT", found, ID_FIELD)),
        };
        u32::try_from(id).map_err(|_| {
            SerializationError::new(ErrorKind::Shape, alloc::format!("invalid object id {id}"))
        })
    }

    fn register(instance: &Instance<T>, id: u32, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        match instance {
            Instance::Shared(shared) => ctx.object_ids().register(id, shared.clone()),
            Instance::Owned(_) => Ok(()),
        }
    }

    /// Applies the post-construction hook.
    fn constructed(&self, instance: &mut Instance<T>, ctx: &ReadContext<'_, '_>) -> Result<()> {
        if let Some(hook) = &ctx.config().bean_constructed {
            instance.with_mut(|value| {
                hook(value as &mut dyn Any);
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Reads the fields of the current `STRUCT` into `instance`.
    ///
    /// Properties listed in `skip` are left alone.
    fn fill(
        &self,
        instance: &mut Instance<T>,
        ctx: &mut ReadContext<'_, '_>,
        registration: Registration,
        skip: &[usize],
        report_unknown: bool,
    ) -> Result<Option<u32>> {
        let bindings = self.bindings()?;
        let properties = self.info.properties();
        let mut id = None;

        ctx.reader().step_in()?;
        while ctx.reader().next()?.is_some() {
            let name = field_name(ctx.reader());
            if name == ID_FIELD {
                let value = Self::read_id(ctx)?;
                if registration == Registration::Early {
                    Self::register(instance, value, ctx)?;
                }
                id = Some(value);
                continue;
            }
            match self.index.get(name.as_str()) {
                Some(index) if skip.contains(index) => {}
                Some(&index) => {
                    let binding = &*bindings[index];
                    let accessor = properties[index].accessor();
                    instance
                        .with_mut(|value| binding.deserialize_property(value, accessor, ctx))
                        .map_err(|error| self.field_error(error, index, binding))?;
                }
                None if report_unknown => ctx.report_unknown_field(self.info.type_path(), &name),
                None => {}
            }
        }
        ctx.reader().step_out()?;
        Ok(id)
    }

    // -------------------------------------------------------------------------
    // Constructors

    fn constructor(&self, config: &ReadConfiguration) -> Result<&ResolvedConstructor> {
        if let Some(resolved) = self.constructor.get() {
            return Ok(resolved);
        }
        let resolved = self.resolve_constructor(config)?;
        Ok(self.constructor.get_or_init(|| resolved))
    }

    /// Declared names first, then the configured resolver, then the
    /// primary constructor.
    fn resolve_constructor(&self, config: &ReadConfiguration) -> Result<ResolvedConstructor> {
        let constructors = self.info.constructors();
        let of_kind = |kind| {
            constructors
                .iter()
                .enumerate()
                .filter(move |(_, constructor)| constructor.kind() == kind)
        };

        if let Some((index, declared)) = of_kind(ConstructorKind::Declared).next() {
            return self.map_params(index, declared.params());
        }
        if let Some(resolve) = &config.resolve_property_mapping {
            for (index, positional) in of_kind(ConstructorKind::Positional) {
                if let Some(names) = resolve(&self.info, positional.arity())
                    && names.len() == positional.arity()
                {
                    return self.map_params(index, names.as_slice());
                }
            }
        }
        if let Some((index, primary)) = of_kind(ConstructorKind::Primary).next() {
            return self.map_params(index, primary.params());
        }

        Err(SerializationError::new(
            ErrorKind::ConstructorResolution,
            alloc::format!(
                "cannot resolve a constructor for {}: it has no default constructor, \
                 no declared parameter names and no property mapping",
                self.info.type_path()
            ),
        ))
    }

    fn map_params(&self, constructor: usize, names: &[impl AsRef<str>]) -> Result<ResolvedConstructor> {
        let params = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.index.get(name).copied().ok_or_else(|| {
                    SerializationError::new(
                        ErrorKind::ConstructorResolution,
                        alloc::format!(
                            "constructor parameter `{name}` of {} matches no property",
                            self.info.type_path()
                        ),
                    )
                })
            })
            .collect::<Result<Box<[usize]>>>()?;
        Ok(ResolvedConstructor { constructor, params })
    }

    /// Reads a bean without default constructor.
    ///
    /// When properties remain after construction the struct is captured
    /// and read twice: constructor arguments first, the rest once the
    /// instance exists and is registered.
    fn read_constructed(
        &self,
        ctx: &mut ReadContext<'_, '_>,
        registration: Registration,
    ) -> Result<(Instance<T>, Option<u32>)> {
        let resolved = self.constructor(ctx.config())?;
        let constructor = &self.info.constructors()[resolved.constructor];

        if self.info.properties().len() <= resolved.params.len() {
            return self.construct(resolved, constructor, ctx, registration);
        }

        let mut replay = ElementReader::single(capture(ctx.reader())?);
        replay.next()?;
        let (mut instance, id) = self.construct(resolved, constructor, &mut ctx.with_reader(&mut replay), registration)?;

        replay.rewind();
        replay.next()?;
        self.fill(
            &mut instance,
            &mut ctx.with_reader(&mut replay),
            Registration::Ignore,
            &resolved.params,
            false,
        )?;
        Ok((instance, id))
    }

    fn construct(
        &self,
        resolved: &ResolvedConstructor,
        constructor: &ConstructorInfo,
        ctx: &mut ReadContext<'_, '_>,
        registration: Registration,
    ) -> Result<(Instance<T>, Option<u32>)> {
        let bindings = self.bindings()?;
        let properties = self.info.properties();
        let mut values: Vec<Option<Box<dyn Any>>> = resolved.params.iter().map(|_| None).collect();
        let mut id = None;

        ctx.reader().step_in()?;
        while ctx.reader().next()?.is_some() {
            let name = field_name(ctx.reader());
            if name == ID_FIELD {
                id = Some(Self::read_id(ctx)?);
                continue;
            }
            let Some(&index) = self.index.get(name.as_str()) else {
                ctx.report_unknown_field(self.info.type_path(), &name);
                continue;
            };
            if let Some(slot) = resolved.params.iter().position(|&param| param == index) {
                let binding = &*bindings[index];
                let value = binding
                    .deserialize(ctx)
                    .map_err(|error| self.field_error(error, index, binding))?;
                values[slot] = Some(value);
            }
        }
        ctx.reader().step_out()?;

        let names: Vec<&'static str> = resolved.params.iter().map(|&param| properties[param].name()).collect();
        for (slot, &param) in resolved.params.iter().enumerate() {
            if values[slot].is_none() {
                let absent = bindings[param].absent_value().ok_or_else(|| {
                    SerializationError::new(
                        ErrorKind::Construction,
                        alloc::format!(
                            "missing constructor argument `{}` for {}",
                            names[slot],
                            self.info.type_path()
                        ),
                    )
                })?;
                values[slot] = Some(absent);
            }
        }

        let described = resolved
            .params
            .iter()
            .map(|&param| alloc::format!("{}: {}", properties[param].name(), bindings[param].binding_name()))
            .collect::<Vec<String>>()
            .join(", ");
        let value = (constructor.invoke())(ConstructorArgs::new(names, values)).map_err(|error| {
            SerializationError::new(
                ErrorKind::Construction,
                alloc::format!("cannot construct {}({described}): {error}", self.info.type_path()),
            )
            .with_source(error)
        })?;

        let mut instance = Instance::new(Self::downcast(value)?, registration);
        if let (Registration::Early, Some(id)) = (registration, id) {
            Self::register(&instance, id, ctx)?;
        }
        self.constructed(&mut instance, ctx)?;
        Ok((instance, id))
    }
}

#[inline]
fn field_name(reader: &dyn ValueReader) -> String {
    reader.field_name().map(ToString::to_string).unwrap_or_default()
}

impl<T: Bean> RootBinding for BeanBinding<T> {
    fn type_name(&self) -> &'static str {
        self.info.type_path()
    }

    fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
        let bindings = self
            .info
            .properties()
            .iter()
            .map(|property| {
                (property.resolve())(ctx).map_err(|error| {
                    error.context(alloc::format!(
                        "property `{}` of {}",
                        property.name(),
                        self.info.type_path()
                    ))
                })
            })
            .collect::<Result<Box<[_]>>>()?;
        let _ = self.bindings.set(bindings);
        Ok(())
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        self.write_struct(value_ref::<T>(value)?, None, ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let (instance, _) = self.read_instance(ctx, Registration::Ignore)?;
        let value: Box<dyn Any> = instance.into_owned()?;
        Ok(value)
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        if ctx.reader().is_null() {
            return Ok(());
        }
        let value = self.deserialize(ctx)?;
        replace_with::<T>(target, value)
    }
}
