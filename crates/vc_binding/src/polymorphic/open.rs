use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId, type_name};
use core::fmt;
use core::marker::PhantomData;
use std::sync::LazyLock;

use super::Upcast;
use crate::bean::Bean;
use crate::binding::{replace_with, value_ref};
use crate::hash::{FixedHashState, HashMap};
use crate::producer::CreateBinding;
use crate::{ReadContext, Result, RootBinding, SerializationError, TypeKey, WriteContext};

// -----------------------------------------------------------------------------
// SubtypeEntry

/// A bean registered as an implementor of a trait.
///
/// Built by [`subtype_entry!`](crate::subtype_entry).
#[derive(Clone, Copy)]
pub struct SubtypeEntry {
    supertype: fn() -> TypeId,
    type_id: fn() -> TypeId,
    type_path: &'static str,
    type_key: fn() -> TypeKey,
    create: CreateBinding,
    wrap: fn(Box<dyn Any>) -> Option<Box<dyn Any>>,
}

impl SubtypeEntry {
    /// `wrap` turns a `Box<C>` into a `Box<Box<B>>`, both erased.
    pub const fn new<B: ?Sized + 'static, C: Bean>(wrap: fn(Box<dyn Any>) -> Option<Box<dyn Any>>) -> Self {
        Self {
            supertype: TypeId::of::<B>,
            type_id: TypeId::of::<C>,
            type_path: C::TYPE_PATH,
            type_key: C::type_key,
            create: C::create_binding,
            wrap,
        }
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    #[inline]
    pub fn supertype(&self) -> TypeId {
        (self.supertype)()
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }
}

impl fmt::Debug for SubtypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtypeEntry")
            .field("type_path", &self.type_path)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "auto_register")]
inventory::collect!(SubtypeEntry);

// -----------------------------------------------------------------------------
// TypeResolver

/// Maps type paths to concrete types for open polymorphism.
pub trait TypeResolver: Send + Sync {
    /// Every entry registered under `type_path`, one per supertype.
    fn resolve(&self, type_path: &str) -> &[SubtypeEntry];

    /// The entry of concrete type `type_id` as an implementor of `supertype`.
    fn find(&self, supertype: TypeId, type_id: TypeId) -> Option<&SubtypeEntry>;
}

/// A [`TypeResolver`] over explicitly registered entries.
///
/// # Examples
///
/// ```
/// use core::any::Any;
/// use vc_binding::polymorphic::{SubtypeRegistry, TypeResolver};
/// use vc_binding::{Bean, subtype_entry};
///
/// trait Event: Any {}
///
/// #[derive(Bean, Default)]
/// #[bean(default)]
/// struct Started {
///     at: i64,
/// }
///
/// impl Event for Started {}
///
/// let registry = SubtypeRegistry::new().with(subtype_entry!(dyn Event => Started));
/// assert_eq!(registry.resolve(<Started as Bean>::TYPE_PATH).len(), 1);
/// ```
#[derive(Default)]
pub struct SubtypeRegistry {
    by_path: HashMap<&'static str, Vec<SubtypeEntry>>,
    by_type: HashMap<(TypeId, TypeId), SubtypeEntry>,
}

impl SubtypeRegistry {
    pub fn new() -> Self {
        Self {
            by_path: HashMap::with_hasher(FixedHashState),
            by_type: HashMap::with_hasher(FixedHashState),
        }
    }

    /// The registry used when a configuration names no resolver.
    ///
    /// Holds every [`register_subtype!`](crate::register_subtype) entry of
    /// the program.
    pub fn global() -> &'static Self {
        static GLOBAL: LazyLock<SubtypeRegistry> = LazyLock::new(|| {
            #[cfg_attr(not(feature = "auto_register"), expect(unused_mut))]
            let mut registry = SubtypeRegistry::new();
            #[cfg(feature = "auto_register")]
            for entry in inventory::iter::<SubtypeEntry> {
                registry.register(*entry);
            }
            registry
        });
        &GLOBAL
    }

    pub fn register(&mut self, entry: SubtypeEntry) {
        let key = (entry.supertype(), entry.type_id());
        if self.by_type.insert(key, entry).is_none() {
            self.by_path.entry(entry.type_path).or_default().push(entry);
        }
    }

    pub fn with(mut self, entry: SubtypeEntry) -> Self {
        self.register(entry);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }
}

impl TypeResolver for SubtypeRegistry {
    fn resolve(&self, type_path: &str) -> &[SubtypeEntry] {
        self.by_path.get(type_path).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find(&self, supertype: TypeId, type_id: TypeId) -> Option<&SubtypeEntry> {
        self.by_type.get(&(supertype, type_id))
    }
}

fn resolver(configured: &Option<Arc<dyn TypeResolver>>) -> &dyn TypeResolver {
    match configured {
        Some(resolver) => &**resolver,
        None => SubtypeRegistry::global(),
    }
}

// -----------------------------------------------------------------------------
// OpenPolymorphicBinding

/// Binding of `Box<B>` over any subtype known to the [`TypeResolver`].
pub struct OpenPolymorphicBinding<B: ?Sized + 'static> {
    upcast: Upcast<B>,
    _marker: PhantomData<fn() -> Box<B>>,
}

impl<B: ?Sized + 'static> OpenPolymorphicBinding<B> {
    pub fn new(upcast: Upcast<B>) -> Self {
        Self {
            upcast,
            _marker: PhantomData,
        }
    }

    #[cold]
    fn not_allowed() -> SerializationError {
        SerializationError::polymorphism(alloc::format!(
            "{} accepts any subtype, enable `allow_any_subtypes` to use it",
            type_name::<Box<B>>()
        ))
    }
}

impl<B: ?Sized + 'static> RootBinding for OpenPolymorphicBinding<B> {
    fn type_name(&self) -> &'static str {
        type_name::<Box<B>>()
    }

    fn serialize(&self, value: &dyn Any, ctx: &mut WriteContext<'_>) -> Result<()> {
        let config = ctx.config();
        if !config.allow_any_subtypes {
            return Err(Self::not_allowed());
        }
        let value = (self.upcast)(&**value_ref::<Box<B>>(value)?);
        let entry = resolver(&config.type_resolver)
            .find(TypeId::of::<B>(), value.type_id())
            .copied()
            .ok_or_else(|| {
                SerializationError::polymorphism(alloc::format!(
                    "the concrete type of this {} is not registered",
                    type_name::<Box<B>>()
                ))
            })?;

        let binding = ctx.producer().root_binding_dyn((entry.type_key)(), entry.create)?;
        ctx.writer().add_type_annotation(entry.type_path);
        binding.serialize(value, ctx)
    }

    fn deserialize(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
        let config = ctx.config();
        if !config.allow_any_subtypes {
            return Err(Self::not_allowed());
        }
        let annotation = ctx.reader().type_annotations().next().map(ToString::to_string);
        let Some(type_path) = annotation else {
            return Err(SerializationError::polymorphism(alloc::format!(
                "missing type annotation for {}",
                type_name::<Box<B>>()
            )));
        };

        let entries = resolver(&config.type_resolver).resolve(&type_path);
        if entries.is_empty() {
            return Err(SerializationError::polymorphism(alloc::format!(
                "unknown type `{type_path}` for {}",
                type_name::<Box<B>>()
            )));
        }
        let entry = entries
            .iter()
            .find(|entry| entry.supertype() == TypeId::of::<B>())
            .copied()
            .ok_or_else(|| {
                SerializationError::polymorphism(alloc::format!(
                    "`{type_path}` is not a subtype of {}",
                    type_name::<Box<B>>()
                ))
            })?;

        let binding = ctx.producer().root_binding_dyn((entry.type_key)(), entry.create)?;
        let value = binding.deserialize(ctx)?;
        (entry.wrap)(value).ok_or_else(|| SerializationError::type_mismatch(type_name::<Box<B>>()))
    }

    fn deserialize_into(&self, target: &mut dyn Any, ctx: &mut ReadContext<'_, '_>) -> Result<()> {
        if ctx.reader().is_null() {
            return Ok(());
        }
        let value = self.deserialize(ctx)?;
        replace_with::<Box<B>>(target, value)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use core::any::Any;

    use super::{SubtypeRegistry, TypeResolver};
    use crate::{
        Bean, ErrorKind, ObjectSerializer, ReadConfiguration, WriteConfiguration, impl_open_polymorphic,
        subtype_entry,
    };

    trait Event: Any {
        fn at(&self) -> i64;
    }

    trait Command: Any {}

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Started {
        at: i64,
    }

    #[derive(Bean, Default)]
    #[bean(default)]
    struct Stopped {
        at: i64,
    }

    impl Event for Started {
        fn at(&self) -> i64 {
            self.at
        }
    }

    impl Event for Stopped {
        fn at(&self) -> i64 {
            self.at
        }
    }

    impl Command for Started {}

    impl_open_polymorphic!(dyn Event);
    impl_open_polymorphic!(dyn Command);

    #[cfg(feature = "auto_register")]
    crate::register_subtype!(dyn Event => Stopped);

    fn registry() -> Arc<dyn TypeResolver> {
        Arc::new(SubtypeRegistry::new().with(subtype_entry!(dyn Event => Started)))
    }

    fn write_config() -> WriteConfiguration {
        WriteConfiguration::default()
            .with_binary(false)
            .with_allow_any_subtypes(true)
            .with_type_resolver(registry())
    }

    fn read_config() -> ReadConfiguration {
        ReadConfiguration::default()
            .with_allow_any_subtypes(true)
            .with_type_resolver(registry())
    }

    #[test]
    fn annotated_by_type_path() {
        let serializer = ObjectSerializer::new();
        let event: Box<dyn Event> = Box::new(Started { at: 5 });

        let text = serializer.to_text(&event, &write_config()).unwrap();
        assert!(text.contains(Started::TYPE_PATH));

        let back: Box<dyn Event> = serializer.read_text(&text, &read_config()).unwrap();
        assert_eq!(back.at(), 5);
        assert!((&*back as &dyn Any).is::<Started>());
    }

    #[test]
    fn both_sides_must_opt_in() {
        let serializer = ObjectSerializer::new();
        let event: Box<dyn Event> = Box::new(Started { at: 5 });

        let config = write_config().with_allow_any_subtypes(false);
        let error = serializer.to_text(&event, &config).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);

        let text = serializer.to_text(&event, &write_config()).unwrap();
        let config = read_config().with_allow_any_subtypes(false);
        let error = serializer.read_text::<Box<dyn Event>>(&text, &config).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
        assert!(error.message().contains("allow_any_subtypes"));
    }

    #[test]
    fn unknown_and_unrelated_types_are_rejected() {
        let serializer = ObjectSerializer::new();

        let error = serializer
            .read_text::<Box<dyn Event>>("'app::Missing'::{ at: 1 }", &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
        assert!(error.message().contains("app::Missing"));

        let error = serializer
            .read_text::<Box<dyn Event>>("{ at: 1 }", &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);

        // `Started` is only registered as an `Event`.
        let text = alloc::format!("'{}'::{{ at: 1 }}", Started::TYPE_PATH);
        let error = serializer
            .read_text::<Box<dyn Command>>(&text, &read_config())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
        assert!(error.message().contains("is not a subtype"));

        let command: Box<dyn Command> = Box::new(Started { at: 1 });
        let error = serializer.to_text(&command, &write_config()).err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Polymorphism);
    }

    #[test]
    fn registry_indexes_by_path_and_supertype() {
        let registry = SubtypeRegistry::new()
            .with(subtype_entry!(dyn Event => Started))
            .with(subtype_entry!(dyn Command => Started))
            .with(subtype_entry!(dyn Event => Started));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve(Started::TYPE_PATH).len(), 2);
        assert!(registry.resolve(Stopped::TYPE_PATH).is_empty());
    }

    #[cfg(feature = "auto_register")]
    #[test]
    fn registered_subtypes_reach_the_global_registry() {
        let global = SubtypeRegistry::global();
        assert_eq!(global.resolve(Stopped::TYPE_PATH).len(), 1);

        let serializer = ObjectSerializer::new();
        let event: Box<dyn Event> = Box::new(Stopped { at: 9 });
        let config = WriteConfiguration::default().with_allow_any_subtypes(true);
        let bytes = serializer.to_bytes(&event, &config).unwrap();

        let config = ReadConfiguration::default().with_allow_any_subtypes(true);
        let back: Box<dyn Event> = serializer.read(&bytes, &config).unwrap();
        assert_eq!(back.at(), 9);
    }
}
