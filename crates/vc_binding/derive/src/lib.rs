//! `#[derive(Bean)]` for `vc_binding`.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

// -----------------------------------------------------------------------------
// Modules

mod attributes;
mod bean;
mod path;

// -----------------------------------------------------------------------------
// Macros

/// Implements `Bean` and `Bind` for a struct with named fields.
///
/// Every field is a property, written under its name in declaration
/// order. Field types must implement `Bind`.
///
/// ## Construction
///
/// A bean is read through one of, in order of preference:
///
/// - `#[bean(default)]`: `Default::default()`, then every property is set.
/// - `#[bean(constructor = path, params = "a, b")]`: `path(a, b)` with the
///   named properties as arguments. Properties that are not parameters
///   are set afterwards.
/// - `#[bean(constructor = path, arity = 2)]`: as above, with the names
///   supplied at read time by `ReadConfiguration::with_property_mapping`.
/// - the struct literal over all properties, unless `#[bean(primary = false)]`.
///
/// Add `fallible` next to `constructor` when the function returns
/// `Result<Self, E>`.
///
/// ```rust, ignore
/// #[derive(Bean)]
/// #[bean(constructor = Span::new, params = "start, end", fallible)]
/// struct Span {
///     start: u32,
///     end: u32,
///     #[bean(rename = "text")]
///     label: String,
///     #[bean(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// ## Other attributes
///
/// - `#[bean(type_path = "my::Span")]` overrides the path used by open
///   polymorphism, `module_path!()::Name` by default.
/// - `#[bean(crate = "path")]` sets the path of `vc_binding`.
/// - fields: `#[bean(skip)]` (needs `Default`) and `#[bean(rename = "...")]`.
///
/// Enums, unions and tuple structs are rejected.
#[proc_macro_derive(Bean, attributes(bean))]
pub fn derive_bean(input: TokenStream) -> TokenStream {
    let ast: DeriveInput = parse_macro_input!(input as DeriveInput);

    match bean::impl_bean(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}
