use core::fmt;

use crate::impls::impl_reflect_plumbing;
use crate::model::{GenericTypeCell, RuntimeType};
use crate::reflection::{NullableValue, Reflect, Typed, ValueMut, ValueRef, take_boxed};
use crate::registry::{Describe, FromType, TypeMeta, TypeRegistry, TypeTraitConstruct};

impl<T: Typed + Reflect> Typed for Option<T> {
    fn runtime_type() -> &'static RuntimeType {
        static CELL: GenericTypeCell = GenericTypeCell::new();
        CELL.get_or_insert::<Self>(|| {
            let path: &'static str =
                Box::leak(format!("core::option::Option<{}>", <T as Typed>::runtime_type().path()).into());
            RuntimeType::nullable::<Self>(path, "Option", "core", <T as Typed>::runtime_type)
        })
    }
}

impl<T: Typed + Reflect> Reflect for Option<T> {
    impl_reflect_plumbing!();

    fn runtime_type(&self) -> &'static RuntimeType {
        <Self as Typed>::runtime_type()
    }

    fn value_ref(&self) -> ValueRef<'_> {
        ValueRef::Nullable(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Nullable(self)
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
        match self {
            Some(value) => {
                write!(f, "Some(")?;
                value.as_reflect().debug_fmt(f)?;
                write!(f, ")")
            }
            None => write!(f, "None"),
        }
    }
}

impl<T: Typed + Reflect> NullableValue for Option<T> {
    fn value(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|value| value.as_reflect())
    }

    fn value_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut().map(|value| value.as_reflect_mut())
    }

    fn clear(&mut self) {
        *self = None;
    }

    fn set_boxed(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        match take_boxed::<T>(value) {
            Ok(value) => {
                *self = Some(value);
                Ok(())
            }
            Err(value) => Err(value),
        }
    }
}

impl<T: Describe> Describe for Option<T> {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>().with_construct(<TypeTraitConstruct as FromType<Self>>::from_type())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}
