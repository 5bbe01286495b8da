use core::fmt;

use crate::impls::impl_reflect_plumbing;
use crate::model::{PrimitiveKind, RuntimeType, TypeCell};
use crate::reflection::{PrimitiveRef, Reflect, Typed, ValueMut, ValueRef};
use crate::registry::{Describe, FromType, TypeMeta, TypeTraitConstruct};

/// A byte-string payload.
///
/// `Vec<u8>` serializes as a list like every other `Vec`; wrap it in
/// `Blob` to get the compact bytes encoding instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

macro_rules! impl_primitive {
    ($ty:ty, $kind:ident, $path:literal, $name:literal, $crate_name:literal, $view:expr) => {
        impl Typed for $ty {
            fn runtime_type() -> &'static RuntimeType {
                static CELL: TypeCell = TypeCell::new();
                CELL.get_or_init(|| {
                    RuntimeType::primitive::<$ty>(
                        PrimitiveKind::$kind,
                        $path,
                        $name,
                        $crate_name,
                    )
                })
            }
        }

        impl Reflect for $ty {
            impl_reflect_plumbing!();

            fn runtime_type(&self) -> &'static RuntimeType {
                <Self as Typed>::runtime_type()
            }

            fn value_ref(&self) -> ValueRef<'_> {
                ValueRef::Primitive(($view)(self))
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Primitive(self)
            }

            fn assign(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
                match value.take::<Self>() {
                    Ok(value) => {
                        *self = value;
                        Ok(())
                    }
                    Err(value) => Err(value),
                }
            }

            fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }

        impl Describe for $ty {
            fn type_meta() -> TypeMeta {
                TypeMeta::of::<Self>()
                    .with_construct(<TypeTraitConstruct as FromType<Self>>::from_type())
            }
        }
    };
}

impl_primitive!((), Unit, "core::unit", "unit", "core", |_: &()| PrimitiveRef::Unit);
impl_primitive!(bool, Bool, "core::bool", "bool", "core", |v: &bool| {
    PrimitiveRef::Bool(*v)
});
impl_primitive!(char, Char, "core::char", "char", "core", |v: &char| {
    PrimitiveRef::Char(*v)
});
impl_primitive!(i8, I8, "core::i8", "i8", "core", |v: &i8| PrimitiveRef::I8(*v));
impl_primitive!(i16, I16, "core::i16", "i16", "core", |v: &i16| {
    PrimitiveRef::I16(*v)
});
impl_primitive!(i32, I32, "core::i32", "i32", "core", |v: &i32| {
    PrimitiveRef::I32(*v)
});
impl_primitive!(i64, I64, "core::i64", "i64", "core", |v: &i64| {
    PrimitiveRef::I64(*v)
});
impl_primitive!(u8, U8, "core::u8", "u8", "core", |v: &u8| PrimitiveRef::U8(*v));
impl_primitive!(u16, U16, "core::u16", "u16", "core", |v: &u16| {
    PrimitiveRef::U16(*v)
});
impl_primitive!(u32, U32, "core::u32", "u32", "core", |v: &u32| {
    PrimitiveRef::U32(*v)
});
impl_primitive!(u64, U64, "core::u64", "u64", "core", |v: &u64| {
    PrimitiveRef::U64(*v)
});
impl_primitive!(f32, F32, "core::f32", "f32", "core", |v: &f32| {
    PrimitiveRef::F32(*v)
});
impl_primitive!(f64, F64, "core::f64", "f64", "core", |v: &f64| {
    PrimitiveRef::F64(*v)
});
impl_primitive!(
    rust_decimal::Decimal,
    Decimal,
    "rust_decimal::Decimal",
    "Decimal",
    "rust_decimal",
    |v: &rust_decimal::Decimal| PrimitiveRef::Decimal(*v)
);
impl_primitive!(
    String,
    Str,
    "alloc::string::String",
    "String",
    "alloc",
    |v| PrimitiveRef::Str(v)
);
impl_primitive!(
    Blob,
    Bytes,
    "permafrost::Blob",
    "Blob",
    "permafrost",
    {
        fn view(v: &Blob) -> PrimitiveRef<'_> {
            PrimitiveRef::Bytes(&v.0)
        }
        view
    }
);
impl_primitive!(
    uuid::Uuid,
    Guid,
    "uuid::Uuid",
    "Uuid",
    "uuid",
    |v: &uuid::Uuid| PrimitiveRef::Guid(*v)
);
