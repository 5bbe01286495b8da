//! Type registration: what the engine knows about your types beyond
//! their structure, and how streams resolve back to them.

mod traits;
mod type_meta;
mod type_registry;

pub use traits::{
    AfterRead, CustomSerialize, Describe, FromType, TypeTraitAfterRead, TypeTraitConstruct,
    TypeTraitConvert, TypeTraitCustom, TypeTraitSurrogate,
};
pub use type_meta::{Strategy, TypeMeta};
pub use type_registry::TypeRegistry;
