use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, Generics, Ident, Index, Path, Type, parse_quote};

use crate::attributes::{ConstructorAttribute, FieldAttributes, Params, TypeAttributes};

/// A named field that takes part in serialization.
struct Property<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    name: String,
}

pub(crate) fn impl_bean(ast: &DeriveInput) -> syn::Result<TokenStream> {
    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields,
            Fields::Unnamed(_) | Fields::Unit => {
                return Err(syn::Error::new(
                    ast.ident.span(),
                    "only structs with named fields can derive `Bean`",
                ));
            }
        },
        Data::Enum(data) => {
            return Err(syn::Error::new(data.enum_token.span, "enum is not supported"));
        }
        Data::Union(data) => {
            return Err(syn::Error::new(data.union_token.span, "union is not supported"));
        }
    };
    if let Some(lifetime) = ast.generics.lifetimes().next() {
        return Err(syn::Error::new(
            lifetime.span(),
            "beans must be `'static`, lifetime parameters are not supported",
        ));
    }

    let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;
    let vc_binding = attrs.crate_path.clone().unwrap_or_else(crate::path::vc_binding);

    let mut properties = Vec::new();
    let mut skipped = Vec::new();
    for field in &fields.named {
        let field_attrs = FieldAttributes::parse_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if field_attrs.skip {
            skipped.push(ident);
            continue;
        }
        let name = field_attrs
            .rename
            .map_or_else(|| ident.to_string(), |rename| rename.value());
        properties.push(Property {
            ident,
            ty: &field.ty,
            name,
        });
    }

    for constructor in &attrs.constructors {
        if let Params::Named(names) = &constructor.params
            && let Some(unknown) = names.iter().find(|name| properties.iter().all(|p| &p.name != *name))
        {
            return Err(syn::Error::new(
                constructor.path.span(),
                format!("constructor parameter `{unknown}` is not a property"),
            ));
        }
    }

    let ident = &ast.ident;
    let generics = with_bind_bounds(&ast.generics, &vc_binding);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let type_path = match &attrs.type_path {
        Some(path) => quote!(#path),
        None => {
            let name = ident.to_string();
            quote!(::core::concat!(::core::module_path!(), "::", #name))
        }
    };

    let with_properties = properties.iter().map(|Property { ident, ty, name }| {
        quote! {
            .with_property(#vc_binding::PropertyInfo::new::<Self, #ty>(
                #name,
                |host| &host.#ident,
                |host| &mut host.#ident,
            ))
        }
    });

    let with_default = attrs.default.map(|span| {
        quote_spanned! {span=>
            .with_default(|| {
                ::std::boxed::Box::new(<Self as ::core::default::Default>::default())
                    as ::std::boxed::Box<dyn ::core::any::Any>
            })
        }
    });

    let declared = attrs
        .constructors
        .iter()
        .map(|constructor| declared_constructor(constructor, &vc_binding));

    let primary = (attrs.default.is_none() && attrs.primary).then(|| {
        let constructor = primary_constructor(&properties, &skipped, &vc_binding);
        quote!(.with_constructor(#constructor))
    });

    Ok(quote! {
        impl #impl_generics #vc_binding::Bean for #ident #ty_generics #where_clause {
            const TYPE_PATH: &'static str = #type_path;

            fn bean_info() -> #vc_binding::BeanInfo {
                #vc_binding::BeanInfo::new(<Self as #vc_binding::Bean>::TYPE_PATH)
                    #(#with_properties)*
                    #with_default
                    #(.with_constructor(#declared))*
                    #primary
            }
        }

        impl #impl_generics #vc_binding::Bind for #ident #ty_generics #where_clause {
            fn type_key() -> #vc_binding::TypeKey {
                #vc_binding::TypeKey::named::<Self>()
            }

            fn create_binding() -> #vc_binding::Result<::std::sync::Arc<dyn #vc_binding::RootBinding>> {
                #vc_binding::BeanBinding::<Self>::create()
            }
        }
    })
}

/// Every type parameter must be bindable.
fn with_bind_bounds(generics: &Generics, vc_binding: &Path) -> Generics {
    let mut generics = generics.clone();
    let params: Vec<Ident> = generics.type_params().map(|param| param.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for param in params {
        where_clause.predicates.push(parse_quote!(#param: #vc_binding::Bind));
    }
    generics
}

/// `args.take(0)?, args.take(1)?, ...`
fn take_args(arity: usize) -> impl Iterator<Item = TokenStream> {
    (0..arity).map(|index| {
        let index = Index::from(index);
        quote!(args.take(#index)?)
    })
}

/// The closure parameter, unused when there is nothing to take.
fn args_ident(arity: usize) -> TokenStream {
    if arity == 0 {
        quote!(_args)
    } else {
        quote!(mut args)
    }
}

fn declared_constructor(constructor: &ConstructorAttribute, vc_binding: &Path) -> TokenStream {
    let path = &constructor.path;
    let arity = constructor.arity();
    let args = args_ident(arity);
    let take = take_args(arity);

    let call = if constructor.fallible {
        quote!(#path(#(#take),*).map_err(#vc_binding::ConstructError::custom)?)
    } else {
        quote!(#path(#(#take),*))
    };
    let invoke = quote! {
        |#args: #vc_binding::ConstructorArgs| {
            ::core::result::Result::Ok(
                ::std::boxed::Box::new(#call) as ::std::boxed::Box<dyn ::core::any::Any>
            )
        }
    };

    match &constructor.params {
        Params::Named(names) => quote! {
            #vc_binding::ConstructorInfo::declared(&[#(#names),*], #invoke)
        },
        Params::Arity(arity) => quote! {
            #vc_binding::ConstructorInfo::positional(#arity, #invoke)
        },
    }
}

/// The struct literal over every property, skipped fields defaulted.
fn primary_constructor(properties: &[Property<'_>], skipped: &[&Ident], vc_binding: &Path) -> TokenStream {
    let names = properties.iter().map(|property| &property.name);
    let args = args_ident(properties.len());
    let fields = properties
        .iter()
        .zip(take_args(properties.len()))
        .map(|(property, take)| {
            let ident = property.ident;
            quote!(#ident: #take)
        });
    let defaults = skipped.iter().map(|ident| {
        quote!(#ident: ::core::default::Default::default())
    });

    quote! {
        #vc_binding::ConstructorInfo::primary(&[#(#names),*], |#args: #vc_binding::ConstructorArgs| {
            ::core::result::Result::Ok(::std::boxed::Box::new(Self {
                #(#fields,)*
                #(#defaults,)*
            }) as ::std::boxed::Box<dyn ::core::any::Any>)
        })
    }
}
