//! Parsing for the `#[reflect(...)]` attribute.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, LitStr};

use crate::REFLECT_ATTRIBUTE_NAME;

/// Type-level knobs.
#[derive(Default)]
pub(crate) struct TypeAttrs {
    pub rename: Option<String>,
    pub crate_name: Option<String>,
    pub default_construct: bool,
}

impl TypeAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in reflect_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.rename = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("crate_name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.crate_name = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    out.default_construct = true;
                    Ok(())
                } else {
                    Err(meta.error(
                        "expected `rename = \"...\"`, `crate_name = \"...\"` or `default`",
                    ))
                }
            })?;
        }
        Ok(out)
    }
}

/// Field-level knobs.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub name: Option<String>,
    pub skip: bool,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in reflect_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    out.name = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `skip`"))
                }
            })?;
        }
        Ok(out)
    }
}

fn reflect_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident(REFLECT_ATTRIBUTE_NAME))
}

/// The (path, bare name, crate) expressions for a type's descriptor.
///
/// Without a rename the path is built from `module_path!` at the use
/// site, so the descriptor follows the module the type is declared in.
pub(crate) fn type_identity(
    input: &DeriveInput,
    attrs: &TypeAttrs,
) -> (TokenStream, TokenStream, TokenStream) {
    let ident_str = input.ident.to_string();
    let (path, name) = match &attrs.rename {
        Some(rename) => {
            let bare = rename.rsplit("::").next().unwrap_or(rename).to_owned();
            (quote!(#rename), quote!(#bare))
        }
        None => (
            quote!(concat!(module_path!(), "::", #ident_str)),
            quote!(#ident_str),
        ),
    };
    let crate_name = match &attrs.crate_name {
        Some(name) => quote!(#name),
        None => quote!(env!("CARGO_PKG_NAME")),
    };
    (path, name, crate_name)
}

/// Rejects generic items. The built-in generic impls (options,
/// collections, arrays, `Shared`) are written by hand against
/// `GenericTypeCell`; derived model types are concrete.
pub(crate) fn deny_generics(input: &DeriveInput) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            "`#[derive(Reflect)]` supports concrete types only; implement `Typed` by hand for generic types",
        ))
    }
}
