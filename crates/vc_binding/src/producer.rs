//! The binding cache.
//!
//! [`BindingProducer`] maps a [`TypeKey`] to its initialized
//! [`RootBinding`]. Lookups take a read lock; a miss takes the write lock,
//! checks again, and resolves the binding together with every binding it
//! reaches during `init`. Those are collected in a [`BindingInitContext`]
//! and published only when the whole resolution succeeds, so a cycle
//! between types finds its own partially initialized binding and a
//! failure leaves the cache untouched.

use alloc::sync::Arc;
use core::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::hash::{FixedHashState, HashMap};
use crate::{Bind, NestedBinding, Result, RootBinding, TypeKey};

type BindingMap = HashMap<TypeKey, Arc<dyn RootBinding>>;

/// Builds an uninitialized root binding, see [`Bind::create_binding`].
pub type CreateBinding = fn() -> Result<Arc<dyn RootBinding>>;

// -----------------------------------------------------------------------------
// BindingProducer

/// Thread-safe cache of root bindings.
///
/// # Examples
///
/// ```
/// use vc_binding::BindingProducer;
///
/// let producer = BindingProducer::new();
/// let first = producer.root_binding::<Vec<i32>>().unwrap();
/// let second = producer.root_binding::<Vec<i32>>().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert!(producer.contains::<Vec<i32>>());
/// ```
pub struct BindingProducer {
    cache: RwLock<BindingMap>,
}

impl Default for BindingProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingProducer {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::with_hasher(FixedHashState)),
        }
    }

    #[inline]
    fn read(&self) -> RwLockReadGuard<'_, BindingMap> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write(&self) -> RwLockWriteGuard<'_, BindingMap> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the initialized root binding of `T`.
    #[inline]
    pub fn root_binding<T: Bind>(&self) -> Result<Arc<dyn RootBinding>> {
        self.root_binding_dyn(T::type_key(), T::create_binding)
    }

    /// Type-erased [`root_binding`](Self::root_binding).
    pub fn root_binding_dyn(&self, key: TypeKey, create: CreateBinding) -> Result<Arc<dyn RootBinding>> {
        if let Some(binding) = self.read().get(&key) {
            return Ok(binding.clone());
        }
        self.resolve(&key, |ctx| ctx.root_binding_dyn(key.clone(), create))
    }

    /// Resolves the binding of `T` as a member of a host.
    ///
    /// Nested bindings are not cached; the root bindings they adapt are.
    pub fn nested_binding<T: Bind>(&self) -> Result<Arc<dyn NestedBinding>> {
        self.resolve(&T::type_key(), T::nested_binding)
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn resolve<R>(
        &self,
        key: &TypeKey,
        f: impl FnOnce(&mut BindingInitContext<'_>) -> Result<R>,
    ) -> Result<R> {
        let mut cache = self.write();
        let mut ctx = BindingInitContext::new(&cache);
        match f(&mut ctx) {
            Ok(binding) => {
                let pending = ctx.into_pending();
                if !pending.is_empty() {
                    log::debug!("publishing {} binding(s) for {key}", pending.len());
                }
                cache.extend(pending);
                Ok(binding)
            }
            Err(error) => {
                log::warn!(
                    "discarding {} binding(s) created for {key}: {error}",
                    ctx.pending_len()
                );
                Err(error)
            }
        }
    }

    /// Drops every cached binding.
    pub fn clear_binding_cache(&self) {
        self.write().clear();
    }

    /// Number of cached bindings.
    #[inline]
    pub fn cached_len(&self) -> usize {
        self.read().len()
    }

    /// Whether the binding of `T` is cached.
    #[inline]
    pub fn contains<T: Bind>(&self) -> bool {
        self.read().contains_key(&T::type_key())
    }
}

impl fmt::Debug for BindingProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProducer")
            .field("cached", &self.cached_len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// BindingInitContext

/// Resolves member bindings while the producer's write lock is held.
pub struct BindingInitContext<'a> {
    cached: &'a BindingMap,
    pending: BindingMap,
}

impl<'a> BindingInitContext<'a> {
    fn new(cached: &'a BindingMap) -> Self {
        Self {
            cached,
            pending: HashMap::with_hasher(FixedHashState),
        }
    }

    fn into_pending(self) -> BindingMap {
        self.pending
    }

    #[inline]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the root binding of `T`, creating and initializing it on a
    /// miss.
    ///
    /// During a cycle the returned binding may still be initializing.
    #[inline]
    pub fn root_binding<T: Bind>(&mut self) -> Result<Arc<dyn RootBinding>> {
        self.root_binding_dyn(T::type_key(), T::create_binding)
    }

    pub fn root_binding_dyn(&mut self, key: TypeKey, create: CreateBinding) -> Result<Arc<dyn RootBinding>> {
        if let Some(binding) = self.cached.get(&key).or_else(|| self.pending.get(&key)) {
            return Ok(binding.clone());
        }

        let binding = create()?;
        log::debug!("created binding for {key}");
        self.pending.insert(key.clone(), binding.clone());

        if let Err(error) = binding.init(self) {
            self.pending.remove(&key);
            return Err(error.context(alloc::format!("binding for {key}")));
        }
        Ok(binding)
    }

    #[inline]
    pub fn nested_binding<T: Bind>(&mut self) -> Result<Arc<dyn NestedBinding>> {
        T::nested_binding(self)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use core::any::Any;

    use super::{BindingInitContext, BindingProducer};
    use crate::{
        Bind, ErrorKind, ReadContext, Result, RootBinding, SerializationError, TypeKey,
        WriteContext,
    };

    /// Resolves `Vec<i32>` and then fails on `char`.
    struct Broken;

    struct BrokenBinding;

    impl RootBinding for BrokenBinding {
        fn type_name(&self) -> &'static str {
            "Broken"
        }

        fn init(&self, ctx: &mut BindingInitContext<'_>) -> Result<()> {
            ctx.root_binding::<Vec<i32>>()?;
            ctx.root_binding::<char>()?;
            Ok(())
        }

        fn serialize(&self, _: &dyn Any, _: &mut WriteContext<'_>) -> Result<()> {
            Ok(())
        }

        fn deserialize(&self, _: &mut ReadContext<'_, '_>) -> Result<Box<dyn Any>> {
            Ok(Box::new(Broken))
        }

        fn deserialize_into(&self, _: &mut dyn Any, _: &mut ReadContext<'_, '_>) -> Result<()> {
            Ok(())
        }
    }

    impl Bind for Broken {
        fn type_key() -> TypeKey {
            TypeKey::named::<Self>()
        }

        fn create_binding() -> Result<Arc<dyn RootBinding>> {
            Ok(Arc::new(BrokenBinding))
        }
    }

    #[test]
    fn failed_resolution_leaves_cache_untouched() {
        let producer = BindingProducer::new();
        let error = producer.root_binding::<Broken>().err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert!(error.message().starts_with("binding for "));
        assert_eq!(producer.cached_len(), 0);
        assert!(!producer.contains::<Vec<i32>>());

        producer.root_binding::<Vec<i32>>().unwrap();
        assert!(producer.contains::<Vec<i32>>());
        assert_eq!(producer.cached_len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let producer = BindingProducer::new();
        producer.root_binding::<Vec<String>>().unwrap();
        producer.root_binding::<Option<i64>>().unwrap();
        assert_eq!(producer.cached_len(), 2);
        producer.clear_binding_cache();
        assert_eq!(producer.cached_len(), 0);
    }

    #[test]
    fn unsupported_types_fail_at_resolution() {
        let producer = BindingProducer::new();
        let error: SerializationError = producer.root_binding::<u8>().err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        let error = producer.nested_binding::<char>().err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
    }
}
