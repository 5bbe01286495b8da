use core::fmt;

use crate::impls::impl_reflect_plumbing;
use crate::model::{GenericTypeCell, RuntimeType};
use crate::reflection::{Reflect, Sequence, Typed, ValueMut, ValueRef};
use crate::registry::{Describe, TypeMeta, TypeRegistry};

impl<T: Typed + Reflect, const N: usize> Typed for [T; N] {
    fn runtime_type() -> &'static RuntimeType {
        static CELL: GenericTypeCell = GenericTypeCell::new();
        CELL.get_or_insert::<Self>(|| {
            let path: &'static str =
                Box::leak(format!("[{}; {}]", <T as Typed>::runtime_type().path(), N).into());
            RuntimeType::array::<Self>(path, "array", "core", <T as Typed>::runtime_type, N)
        })
    }
}

impl<T: Typed + Reflect, const N: usize> Reflect for [T; N] {
    impl_reflect_plumbing!();

    fn runtime_type(&self) -> &'static RuntimeType {
        <Self as Typed>::runtime_type()
    }

    fn value_ref(&self) -> ValueRef<'_> {
        ValueRef::Array(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Array(self)
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
        f.debug_list()
            .entries(self.iter().map(|item| item.as_reflect()))
            .finish()
    }
}

impl<T: Typed + Reflect, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        self.as_slice().get(index).map(|item| item.as_reflect())
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|item| item.as_reflect_mut())
    }
}

// Arrays repopulate in place, so no construct entry is needed.
impl<T: Describe, const N: usize> Describe for [T; N] {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}
