use core::any::Any;
use core::fmt;

use crate::error::Error;
use crate::model::{self, RuntimeType};
use crate::reflection::{Referential, Reflect, Typed, ValueMut, ValueRef};
use crate::registry::{Describe, TypeMeta};

/// The type-erased slot. A member declared as `Box<dyn Reflect>` can
/// hold any serializable value; streams carry the concrete type's
/// descriptor so it comes back as whatever was put in.
impl Typed for Box<dyn Reflect> {
    fn runtime_type() -> &'static RuntimeType {
        model::any_object()
    }
}

impl Reflect for Box<dyn Reflect> {
    fn runtime_type(&self) -> &'static RuntimeType {
        model::any_object()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn value_ref(&self) -> ValueRef<'_> {
        ValueRef::Reference(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Reference(self)
    }

    /// Accepts anything: the slot is type-erased by definition.
    fn assign(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        *self = value;
        Ok(())
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).debug_fmt(f)
    }
}

impl Referential for Box<dyn Reflect> {
    /// Plain boxes alias nothing, so they have no identity to track.
    fn identity(&self) -> Option<usize> {
        None
    }

    fn with_target(
        &self,
        f: &mut dyn FnMut(&dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error> {
        f((**self).as_reflect())
    }

    fn with_target_mut(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error> {
        f((**self).as_reflect_mut())
    }
}

impl Describe for Box<dyn Reflect> {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
    }
}
