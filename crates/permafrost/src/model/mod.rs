//! The two halves of the type model.
//!
//! [`RuntimeType`] describes types this build knows about, built by the
//! derive macro and interned for the process lifetime. [`TypeData`]
//! describes types a stream knows about, which may or may not exist
//! locally. [`resolve`] bridges the two.

mod cell;
mod kind;
mod resolve;
mod runtime_type;
pub(crate) mod statics;
mod type_data;

pub use cell::{GenericTypeCell, TypeCell};
pub use kind::{CollectionKind, PrimitiveKind};
pub use resolve::{Resolution, TypeHandle, resolve};
pub use runtime_type::{EnumVariant, Member, RuntimeType, TypeRef};
pub use statics::{
    any_object, any_value, list_any, map_any, nullable_any, type_descriptor, unknown_object,
};
pub use type_data::{TypeData, TypeDataBody, TypeDataFlags, TypeDataMember};

pub(crate) use type_data::pack_flags;
