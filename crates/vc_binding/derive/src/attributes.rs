//! Parsing of `#[bean(...)]` attributes.

use proc_macro2::Span;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Lit, LitStr, Meta, MetaNameValue, Path, Token};

pub(crate) const BEAN_ATTRIBUTE_NAME: &str = "bean";

const CONSTRUCTOR_KEYS: &[&str] = &["constructor", "params", "arity", "fallible"];

/// How a declared constructor learns its parameter names.
#[derive(Debug)]
pub(crate) enum Params {
    /// `params = "a, b"`
    Named(Vec<String>),
    /// `arity = 2`
    Arity(usize),
}

/// One `#[bean(constructor = path, ...)]`.
#[derive(Debug)]
pub(crate) struct ConstructorAttribute {
    pub path: Path,
    pub params: Params,
    /// The function returns `Result<Self, E>`.
    pub fallible: bool,
}

/// Type level attributes.
#[derive(Debug)]
pub(crate) struct TypeAttributes {
    /// `default`: build through `Default` and fill every property.
    pub default: Option<Span>,
    /// `primary = false` turns off the struct literal constructor.
    pub primary: bool,
    pub type_path: Option<LitStr>,
    pub crate_path: Option<Path>,
    pub constructors: Vec<ConstructorAttribute>,
}

impl Default for TypeAttributes {
    fn default() -> Self {
        Self {
            default: None,
            primary: true,
            type_path: None,
            crate_path: None,
            constructors: Vec::new(),
        }
    }
}

/// Field level attributes.
#[derive(Debug, Default)]
pub(crate) struct FieldAttributes {
    pub skip: bool,
    pub rename: Option<LitStr>,
}

// -----------------------------------------------------------------------------
// Helpers

fn bean_metas(attrs: &[Attribute]) -> impl Iterator<Item = syn::Result<Punctuated<Meta, Token![,]>>> + '_ {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident(BEAN_ATTRIBUTE_NAME))
        .map(|attr| attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated))
}

fn lit_str(pair: &MetaNameValue) -> syn::Result<LitStr> {
    match &pair.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Ok(lit.clone()),
        other => Err(syn::Error::new(other.span(), "expected a string literal")),
    }
}

fn lit_bool(pair: &MetaNameValue) -> syn::Result<bool> {
    match &pair.value {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(lit), ..
        }) => Ok(lit.value()),
        other => Err(syn::Error::new(other.span(), "expected `true` or `false`")),
    }
}

fn lit_usize(pair: &MetaNameValue) -> syn::Result<usize> {
    match &pair.value {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => lit.base10_parse(),
        other => Err(syn::Error::new(other.span(), "expected an integer literal")),
    }
}

fn expr_path(pair: &MetaNameValue) -> syn::Result<Path> {
    match &pair.value {
        Expr::Path(expr) => Ok(expr.path.clone()),
        other => Err(syn::Error::new(other.span(), "expected a function path")),
    }
}

fn key(meta: &Meta) -> String {
    meta.path()
        .get_ident()
        .map(ToString::to_string)
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// TypeAttributes

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();
        for metas in bean_metas(attrs) {
            let metas = metas?;
            if !metas.iter().any(|meta| key(meta) == "constructor") {
                for meta in &metas {
                    result.parse_meta(meta)?;
                }
                continue;
            }
            // Type level keys may share the attribute with a constructor.
            let (constructor, rest): (Punctuated<Meta, Token![,]>, Vec<Meta>) = metas
                .into_iter()
                .fold((Punctuated::new(), Vec::new()), |(mut constructor, mut rest), meta| {
                    if CONSTRUCTOR_KEYS.contains(&key(&meta).as_str()) {
                        constructor.push(meta);
                    } else {
                        rest.push(meta);
                    }
                    (constructor, rest)
                });
            result.constructors.push(ConstructorAttribute::parse(&constructor)?);
            for meta in &rest {
                result.parse_meta(meta)?;
            }
        }
        Ok(result)
    }

    fn parse_meta(&mut self, meta: &Meta) -> syn::Result<()> {
        match (key(meta).as_str(), meta) {
            ("default", Meta::Path(path)) => {
                self.default = Some(path.span());
            }
            ("primary", Meta::NameValue(pair)) => {
                self.primary = lit_bool(pair)?;
            }
            ("type_path", Meta::NameValue(pair)) => {
                self.type_path = Some(lit_str(pair)?);
            }
            ("crate", Meta::NameValue(pair)) => {
                self.crate_path = Some(lit_str(pair)?.parse()?);
            }
            ("params" | "arity" | "fallible", _) => {
                return Err(syn::Error::new(
                    meta.span(),
                    "`params`, `arity` and `fallible` belong next to `constructor = ...`",
                ));
            }
            _ => {
                return Err(syn::Error::new(meta.span(), "unknown bean attribute"));
            }
        }
        Ok(())
    }
}

impl ConstructorAttribute {
    fn parse(metas: &Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut path = None;
        let mut params = None;
        let mut fallible = false;

        for meta in metas {
            match (key(meta).as_str(), meta) {
                ("constructor", Meta::NameValue(pair)) => path = Some(expr_path(pair)?),
                ("params", Meta::NameValue(pair)) => {
                    let names = lit_str(pair)?
                        .value()
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(ToString::to_string)
                        .collect();
                    params = Some(Params::Named(names));
                }
                ("arity", Meta::NameValue(pair)) => params = Some(Params::Arity(lit_usize(pair)?)),
                ("fallible", Meta::Path(_)) => fallible = true,
                _ => {
                    return Err(syn::Error::new(
                        meta.span(),
                        "expected `params = \"...\"`, `arity = N` or `fallible` next to `constructor`",
                    ));
                }
            }
        }

        let span = metas.span();
        let path = path.ok_or_else(|| syn::Error::new(span, "expected `constructor = path`"))?;
        let params = params.ok_or_else(|| {
            syn::Error::new(span, "a constructor needs `params = \"...\"` or `arity = N`")
        })?;
        Ok(Self {
            path,
            params,
            fallible,
        })
    }

    pub fn arity(&self) -> usize {
        match &self.params {
            Params::Named(names) => names.len(),
            Params::Arity(arity) => *arity,
        }
    }
}

// -----------------------------------------------------------------------------
// FieldAttributes

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut result = Self::default();
        for metas in bean_metas(attrs) {
            for meta in &metas? {
                match (key(meta).as_str(), meta) {
                    ("skip", Meta::Path(_)) => result.skip = true,
                    ("rename", Meta::NameValue(pair)) => result.rename = Some(lit_str(pair)?),
                    _ => {
                        return Err(syn::Error::new(
                            meta.span(),
                            "expected `skip` or `rename = \"...\"`",
                        ));
                    }
                }
            }
        }
        Ok(result)
    }
}
