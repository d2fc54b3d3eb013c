#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern Self

// The derive emits `::vc_binding` paths, which must also resolve inside
// this crate and its unit tests.
extern crate self as vc_binding;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod binding;
mod config;
mod context;
mod error;
mod filter;
mod hash;
mod key;
mod option;
mod producer;
mod serializer;
mod shared;
mod versioned;

pub mod access;
pub mod bean;
pub mod collection;
pub mod identity;
pub mod map;
pub mod polymorphic;
pub mod scalar;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use bean::{Bean, BeanBinding, BeanInfo, ConstructError, ConstructorArgs, ConstructorInfo, PropertyInfo};
pub use binding::{Bind, NestedBinding, Presence, RootBinding, RootBindingAdapter};
pub use config::{BeanConstructed, PropertyMappingResolver, ReadConfiguration, WriteConfiguration};
pub use context::{ReadContext, ReadReport, ReadSession, UnknownField, WriteContext};
pub use error::{BoxedError, ErrorKind, SerializationError};
pub use filter::{PropertyValue, SerializationFilter, SkipNullAndEmptySerializationFilter};
pub use key::{PrimitiveKind, RawType, TypeKey};
pub use option::OptionBinding;
pub use producer::{BindingInitContext, BindingProducer, CreateBinding};
pub use serializer::ObjectSerializer;
pub use shared::Shared;
pub use versioned::VersionedFile;

pub use vc_binding_derive::Bean;

/// Result alias used across the binding layer.
pub type Result<T, E = SerializationError> = core::result::Result<T, E>;

#[doc(hidden)]
pub mod __macro_exports {
    #[cfg(feature = "auto_register")]
    pub use inventory;
}
