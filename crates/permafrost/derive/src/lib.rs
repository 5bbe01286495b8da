//! `#[derive(Reflect)]` for the permafrost type model.
//!
//! The derive implements `Typed`, `Reflect`, `Struct` or `EnumValue`,
//! and `Describe` for named-field structs, unit structs and unit-variant
//! enums. Everything the macro needs to know beyond the item itself is
//! spelled out under one `#[reflect(...)]` umbrella:
//!
//! - `#[reflect(rename = "other::Path")]` overrides the wire type path,
//!   which is how a type keeps its stream identity after a move or a
//!   rename in source.
//! - `#[reflect(crate_name = "...")]` overrides the recorded crate.
//! - `#[reflect(default)]` registers a `Default`-based constructor so
//!   readers can materialize fresh instances of the type.
//! - `#[reflect(name = "WireName")]` on a field overrides the member's
//!   wire name.
//! - `#[reflect(skip)]` on a field keeps it out of the stream entirely.

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, parse_macro_input};

mod attrs;
mod reflect_enum;
mod reflect_struct;

static REFLECT_ATTRIBUTE_NAME: &str = "reflect";

#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let expanded = match &input.data {
        Data::Struct(data) => reflect_struct::expand(&input, data),
        Data::Enum(data) => reflect_enum::expand(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "`#[derive(Reflect)]` does not support unions",
        )),
    };
    match expanded {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}
