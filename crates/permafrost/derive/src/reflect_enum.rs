//! Expansion for unit-variant enums.
//!
//! Enum payloads are a single varint discriminant, so the macro only
//! needs the variant names and their discriminant values. Explicit
//! discriminants must be integer literals; unspecified ones count up
//! from the previous value, the same way Rust assigns them.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataEnum, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Ident, Lit, UnOp};

use crate::attrs::{TypeAttrs, deny_generics, type_identity};

struct Variant<'a> {
    ident: &'a Ident,
    discriminant: i64,
}

pub(crate) fn expand(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream> {
    deny_generics(input)?;
    let type_attrs = TypeAttrs::parse(&input.attrs)?;
    let variants = collect_variants(data)?;
    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Reflect)]` needs at least one variant",
        ));
    }

    let ident = &input.ident;
    let (path, name, crate_name) = type_identity(input, &type_attrs);

    let variant_descriptors = variants.iter().map(|variant| {
        let name = variant.ident.to_string();
        let discriminant = variant.discriminant;
        quote! {
            permafrost::model::EnumVariant {
                name: #name,
                discriminant: #discriminant,
            }
        }
    });

    let discriminant_arms = variants.iter().map(|variant| {
        let ident = variant.ident;
        let discriminant = variant.discriminant;
        quote!(Self::#ident => #discriminant)
    });
    let set_arms = variants.iter().map(|variant| {
        let ident = variant.ident;
        let discriminant = variant.discriminant;
        quote! {
            #discriminant => {
                *self = Self::#ident;
                true
            }
        }
    });
    let name_arms = variants.iter().map(|variant| {
        let ident = variant.ident;
        let name = ident.to_string();
        quote!(Self::#ident => #name)
    });
    let debug_arms = name_arms.clone();

    let construct = type_attrs.default_construct.then(|| {
        quote! {
            .with_construct(
                <permafrost::registry::TypeTraitConstruct
                    as permafrost::registry::FromType<Self>>::from_type(),
            )
        }
    });

    Ok(quote! {
        const _: () = {
            impl permafrost::reflection::Typed for #ident {
                fn runtime_type() -> &'static permafrost::model::RuntimeType {
                    static CELL: permafrost::model::TypeCell = permafrost::model::TypeCell::new();
                    CELL.get_or_init(|| {
                        permafrost::model::RuntimeType::enumeration::<Self>(
                            #path,
                            #name,
                            #crate_name,
                            ::std::vec![#(#variant_descriptors),*],
                        )
                    })
                }
            }

            impl permafrost::reflection::Reflect for #ident {
                fn runtime_type(&self) -> &'static permafrost::model::RuntimeType {
                    <Self as permafrost::reflection::Typed>::runtime_type()
                }

                fn as_any(&self) -> &dyn ::core::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                    self
                }

                fn into_any(
                    self: ::std::boxed::Box<Self>,
                ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                    self
                }

                fn as_reflect(&self) -> &dyn permafrost::reflection::Reflect {
                    self
                }

                fn as_reflect_mut(&mut self) -> &mut dyn permafrost::reflection::Reflect {
                    self
                }

                fn value_ref(&self) -> permafrost::reflection::ValueRef<'_> {
                    permafrost::reflection::ValueRef::Enum(self)
                }

                fn value_mut(&mut self) -> permafrost::reflection::ValueMut<'_> {
                    permafrost::reflection::ValueMut::Enum(self)
                }

                fn assign(
                    &mut self,
                    value: ::std::boxed::Box<dyn permafrost::reflection::Reflect>,
                ) -> ::core::result::Result<
                    (),
                    ::std::boxed::Box<dyn permafrost::reflection::Reflect>,
                > {
                    match value.take::<Self>() {
                        ::core::result::Result::Ok(value) => {
                            *self = value;
                            ::core::result::Result::Ok(())
                        }
                        ::core::result::Result::Err(value) => {
                            ::core::result::Result::Err(value)
                        }
                    }
                }

                fn debug_fmt(
                    &self,
                    f: &mut ::core::fmt::Formatter<'_>,
                ) -> ::core::fmt::Result {
                    f.write_str(match self {
                        #(#debug_arms,)*
                    })
                }
            }

            impl permafrost::reflection::EnumValue for #ident {
                fn discriminant(&self) -> i64 {
                    match self {
                        #(#discriminant_arms,)*
                    }
                }

                fn set_discriminant(&mut self, discriminant: i64) -> bool {
                    match discriminant {
                        #(#set_arms)*
                        _ => false,
                    }
                }

                fn variant_name(&self) -> ::core::option::Option<&'static str> {
                    ::core::option::Option::Some(match self {
                        #(#name_arms,)*
                    })
                }
            }

            impl permafrost::registry::Describe for #ident {
                fn type_meta() -> permafrost::registry::TypeMeta {
                    permafrost::registry::TypeMeta::of::<Self>() #construct
                }
            }
        };
    })
}

fn collect_variants(data: &DataEnum) -> syn::Result<Vec<Variant<'_>>> {
    let mut variants = Vec::new();
    let mut next = 0i64;
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "`#[derive(Reflect)]` supports unit variants only",
            ));
        }
        let discriminant = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant(expr)?,
            None => next,
        };
        next = discriminant + 1;
        variants.push(Variant {
            ident: &variant.ident,
            discriminant,
        });
    }
    Ok(variants)
}

fn parse_discriminant(expr: &Expr) -> syn::Result<i64> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => lit.base10_parse::<i64>(),
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => Ok(-parse_discriminant(expr)?),
        other => Err(syn::Error::new_spanned(
            other,
            "discriminants must be integer literals",
        )),
    }
}
