//! Trait objects.
//!
//! A `Box<dyn Trait>` is written through the binding of its concrete type,
//! preceded by a type annotation naming that type:
//!
//! - closed: the concrete type is one of a fixed list, the annotation is
//!   its simple name. See [`impl_closed_polymorphic!`](crate::impl_closed_polymorphic).
//! - open: any registered type, the annotation is its full type path.
//!   Both sides must opt in with `allow_any_subtypes`. See
//!   [`impl_open_polymorphic!`](crate::impl_open_polymorphic) and
//!   [`register_subtype!`](crate::register_subtype).
//!
//! The trait must have `Any` as a supertrait.

mod closed;
mod open;

// -----------------------------------------------------------------------------
// Exports

pub use closed::{ClosedPolymorphicBinding, Subtype};
pub use open::{OpenPolymorphicBinding, SubtypeEntry, SubtypeRegistry, TypeResolver};

/// Recovers the concrete value behind a trait object.
pub type Upcast<B> = for<'a> fn(&'a B) -> &'a dyn core::any::Any;

/// Implements [`Bind`](crate::Bind) for `Box<dyn Trait>` over a fixed set
/// of concrete beans.
///
/// ```
/// use core::any::Any;
/// use vc_binding::{Bean, ObjectSerializer, impl_closed_polymorphic};
///
/// trait Shape: Any {
///     fn area(&self) -> f64;
/// }
///
/// #[derive(Bean, Default)]
/// #[bean(default)]
/// struct Square {
///     side: f64,
/// }
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.side * self.side
///     }
/// }
///
/// impl_closed_polymorphic!(dyn Shape => [Square]);
///
/// let serializer = ObjectSerializer::new();
/// let shape: Box<dyn Shape> = Box::new(Square { side: 2.0 });
/// let bytes = serializer.to_bytes(&shape, &Default::default()).unwrap();
/// let back: Box<dyn Shape> = serializer.read(&bytes, &Default::default()).unwrap();
/// assert_eq!(back.area(), 4.0);
/// ```
#[macro_export]
macro_rules! impl_closed_polymorphic {
    (dyn $trait:path => [$($subtype:ty),+ $(,)?]) => {
        impl $crate::Bind for ::std::boxed::Box<dyn $trait> {
            fn type_key() -> $crate::TypeKey {
                $crate::TypeKey::named::<Self>()
            }

            fn create_binding() -> $crate::Result<::std::sync::Arc<dyn $crate::RootBinding>> {
                fn __upcast<'a>(value: &'a (dyn $trait + 'static)) -> &'a (dyn ::core::any::Any + 'static) {
                    value
                }

                let subtypes = ::std::vec![
                    $($crate::polymorphic::Subtype::<dyn $trait>::of::<$subtype>(|value| value)),+
                ];
                ::core::result::Result::Ok(::std::sync::Arc::new(
                    $crate::polymorphic::ClosedPolymorphicBinding::<dyn $trait>::new(subtypes, __upcast),
                ))
            }
        }
    };
}

/// Implements [`Bind`](crate::Bind) for `Box<dyn Trait>` over every
/// subtype known to the type resolver.
#[macro_export]
macro_rules! impl_open_polymorphic {
    (dyn $trait:path) => {
        impl $crate::Bind for ::std::boxed::Box<dyn $trait> {
            fn type_key() -> $crate::TypeKey {
                $crate::TypeKey::named::<Self>()
            }

            fn create_binding() -> $crate::Result<::std::sync::Arc<dyn $crate::RootBinding>> {
                fn __upcast<'a>(value: &'a (dyn $trait + 'static)) -> &'a (dyn ::core::any::Any + 'static) {
                    value
                }

                ::core::result::Result::Ok(::std::sync::Arc::new(
                    $crate::polymorphic::OpenPolymorphicBinding::<dyn $trait>::new(__upcast),
                ))
            }
        }
    };
}

/// Builds the [`SubtypeEntry`] of bean `Ty` as an implementor of `dyn Trait`.
#[macro_export]
macro_rules! subtype_entry {
    (dyn $trait:path => $subtype:ty) => {{
        fn __wrap(
            value: ::std::boxed::Box<dyn ::core::any::Any>,
        ) -> ::core::option::Option<::std::boxed::Box<dyn ::core::any::Any>> {
            let value: ::std::boxed::Box<dyn $trait> = value.downcast::<$subtype>().ok()?;
            ::core::option::Option::Some(::std::boxed::Box::new(value))
        }

        $crate::polymorphic::SubtypeEntry::new::<dyn $trait, $subtype>(__wrap)
    }};
}

/// Registers bean `Ty` as an implementor of `dyn Trait` in
/// [`SubtypeRegistry::global`].
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! register_subtype {
    (dyn $trait:path => $subtype:ty) => {
        const _: () = {
            $crate::__macro_exports::inventory::submit! {
                $crate::subtype_entry!(dyn $trait => $subtype)
            }
        };
    };
}
