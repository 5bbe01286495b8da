//! The value-side traits: [`Reflect`], [`Typed`] and the payload views.

mod reflect;
mod view;

pub use reflect::{Reflect, Typed};
pub(crate) use reflect::take_boxed;
pub use view::{
    CollectionMut, CollectionRef, EnumValue, ListOps, MapOps, MemberIter, NullableValue,
    PrimitiveRef, Referential, Sequence, Struct, ValueMut, ValueRef,
};
