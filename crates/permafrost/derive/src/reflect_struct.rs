//! Expansion for named-field and unit structs.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Fields, Ident, Type};

use crate::attrs::{FieldAttrs, TypeAttrs, deny_generics, type_identity};

struct StructField<'a> {
    ident: &'a Ident,
    wire_name: String,
    ty: &'a Type,
}

pub(crate) fn expand(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream> {
    deny_generics(input)?;
    let type_attrs = TypeAttrs::parse(&input.attrs)?;

    let fields = match &data.fields {
        Fields::Named(named) => collect_fields(named)?,
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "`#[derive(Reflect)]` supports named-field and unit structs; wrap tuple fields in names",
            ));
        }
    };

    let ident = &input.ident;
    let ident_str = ident.to_string();
    let (path, name, crate_name) = type_identity(input, &type_attrs);

    let members = fields.iter().map(|field| {
        let wire = &field.wire_name;
        let ty = field.ty;
        quote! {
            permafrost::model::Member {
                name: #wire,
                ty: <#ty as permafrost::reflection::Typed>::runtime_type,
            }
        }
    });

    let member_arms = fields.iter().map(|field| {
        let wire = &field.wire_name;
        let ident = field.ident;
        quote!(#wire => ::core::option::Option::Some(
            permafrost::reflection::Reflect::as_reflect(&self.#ident)
        ))
    });
    let member_mut_arms = fields.iter().map(|field| {
        let wire = &field.wire_name;
        let ident = field.ident;
        quote!(#wire => ::core::option::Option::Some(
            permafrost::reflection::Reflect::as_reflect_mut(&mut self.#ident)
        ))
    });
    let member_at_arms = fields.iter().enumerate().map(|(index, field)| {
        let ident = field.ident;
        quote!(#index => ::core::option::Option::Some(
            permafrost::reflection::Reflect::as_reflect(&self.#ident)
        ))
    });
    let member_at_mut_arms = fields.iter().enumerate().map(|(index, field)| {
        let ident = field.ident;
        quote!(#index => ::core::option::Option::Some(
            permafrost::reflection::Reflect::as_reflect_mut(&mut self.#ident)
        ))
    });
    let name_at_arms = fields.iter().enumerate().map(|(index, field)| {
        let wire = &field.wire_name;
        quote!(#index => ::core::option::Option::Some(#wire))
    });
    let member_len = fields.len();

    let debug_fields = fields.iter().map(|field| {
        let wire = &field.wire_name;
        let ident = field.ident;
        quote!(.field(#wire, &permafrost::reflection::Reflect::as_reflect(&self.#ident)))
    });

    let construct = type_attrs.default_construct.then(|| {
        quote! {
            .with_construct(
                <permafrost::registry::TypeTraitConstruct
                    as permafrost::registry::FromType<Self>>::from_type(),
            )
        }
    });
    let dependencies = fields.iter().map(|field| {
        let ty = field.ty;
        quote!(registry.register::<#ty>();)
    });

    Ok(quote! {
        const _: () = {
            impl permafrost::reflection::Typed for #ident {
                fn runtime_type() -> &'static permafrost::model::RuntimeType {
                    static CELL: permafrost::model::TypeCell = permafrost::model::TypeCell::new();
                    CELL.get_or_init(|| {
                        permafrost::model::RuntimeType::object::<Self>(#path, #name, #crate_name)
                            .with_members(::std::vec![#(#members),*])
                            .unsealed()
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
                    permafrost::reflection::ValueRef::Struct(self)
                }

                fn value_mut(&mut self) -> permafrost::reflection::ValueMut<'_> {
                    permafrost::reflection::ValueMut::Struct(self)
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
                    f.debug_struct(#ident_str)
                        #(#debug_fields)*
                        .finish()
                }
            }

            impl permafrost::reflection::Struct for #ident {
                fn member(&self, name: &str) -> ::core::option::Option<&dyn permafrost::reflection::Reflect> {
                    match name {
                        #(#member_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_mut(&mut self, name: &str) -> ::core::option::Option<&mut dyn permafrost::reflection::Reflect> {
                    match name {
                        #(#member_mut_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_at(&self, index: usize) -> ::core::option::Option<&dyn permafrost::reflection::Reflect> {
                    match index {
                        #(#member_at_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_at_mut(&mut self, index: usize) -> ::core::option::Option<&mut dyn permafrost::reflection::Reflect> {
                    match index {
                        #(#member_at_mut_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn name_at(&self, index: usize) -> ::core::option::Option<&str> {
                    match index {
                        #(#name_at_arms,)*
                        _ => ::core::option::Option::None,
                    }
                }

                fn member_len(&self) -> usize {
                    #member_len
                }
            }

            impl permafrost::registry::Describe for #ident {
                fn type_meta() -> permafrost::registry::TypeMeta {
                    permafrost::registry::TypeMeta::of::<Self>() #construct
                }

                fn register_dependencies(registry: &mut permafrost::registry::TypeRegistry) {
                    #(#dependencies)*
                }
            }
        };
    })
}

fn collect_fields(named: &syn::FieldsNamed) -> syn::Result<Vec<StructField<'_>>> {
    let mut fields = Vec::new();
    for field in &named.named {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let wire_name = attrs.name.unwrap_or_else(|| ident.to_string());
        fields.push(StructField {
            ident,
            wire_name,
            ty: &field.ty,
        });
    }
    Ok(fields)
}
