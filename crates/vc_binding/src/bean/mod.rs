//! Composite objects.
//!
//! A bean is a struct described by a [`BeanInfo`]: its properties in
//! declaration order plus the ways to construct it. `#[derive(Bean)]`
//! generates both the description and the [`Bind`](crate::Bind) impl.

mod binding;
mod constructor;
mod info;

// -----------------------------------------------------------------------------
// Exports

pub use binding::BeanBinding;
pub use constructor::{ConstructError, ConstructorArgs, ConstructorInfo, ConstructorKind, Invoke};
pub use info::{Bean, BeanInfo, PropertyInfo, ResolveNested};

pub(crate) use binding::{Instance, Registration};
pub(crate) use info::simple_name;
