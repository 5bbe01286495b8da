use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::model::{RuntimeType, TypeData};
use crate::reflection::{ValueMut, ValueRef};

/// A type with a statically known descriptor.
///
/// Implemented by `#[derive(Reflect)]` and by the built-in impls for
/// primitives, options, collections and arrays. The returned reference
/// is interned: every call for the same type yields the same pointer.
pub trait Typed: 'static {
    fn runtime_type() -> &'static RuntimeType;
}

/// The object-safe surface every serializable value exposes.
///
/// `Reflect` is what the writer walks and the reader populates. It is
/// deliberately small: structural detail lives behind [`ValueRef`] and
/// [`ValueMut`], which classify the value into one of the payload
/// shapes the engine understands.
pub trait Reflect: Any + Send + Sync {
    /// The descriptor of this value's concrete type.
    fn runtime_type(&self) -> &'static RuntimeType;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn as_reflect(&self) -> &dyn Reflect;
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    /// Classifies this value for reading.
    fn value_ref(&self) -> ValueRef<'_>;

    /// Classifies this value for mutation.
    fn value_mut(&mut self) -> ValueMut<'_>;

    /// Replaces this value with `value` if the concrete types match.
    /// On mismatch the box is handed back untouched.
    fn assign(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    /// The foreign descriptor this value was read under, if any.
    ///
    /// Placeholder values override this so that re-serializing them
    /// emits the original stream's descriptor instead of a local one.
    fn wire_descriptor(&self) -> Option<Arc<TypeData>> {
        None
    }

    /// A second handle to the same shared target, if this value is a
    /// shareable reference. Back-references resolve through this.
    fn clone_handle(&self) -> Option<Box<dyn Reflect>> {
        None
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl dyn Reflect {
    pub fn is<T: Reflect>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Takes the concrete value out of the box, or hands the box back
    /// if the type does not match.
    pub fn take<T: Reflect>(self: Box<dyn Reflect>) -> Result<T, Box<dyn Reflect>> {
        if self.is::<T>() {
            // Checked above, so the downcast cannot fail.
            match self.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                Err(_) => unreachable!(),
            }
        } else {
            Err(self)
        }
    }
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.debug_fmt(f)
    }
}

/// Like [`take`](dyn Reflect::take), but when `T` is `Box<dyn Reflect>`
/// itself the value is wrapped instead of downcast. Untyped element
/// slots accept any concrete value this way.
pub(crate) fn take_boxed<T: Reflect>(value: Box<dyn Reflect>) -> Result<T, Box<dyn Reflect>> {
    use core::any::TypeId;
    if TypeId::of::<T>() == TypeId::of::<Box<dyn Reflect>>() {
        return match (Box::new(value) as Box<dyn Any>).downcast::<T>() {
            Ok(wrapped) => Ok(*wrapped),
            // The TypeId check above makes this downcast infallible.
            Err(_) => unreachable!(),
        };
    }
    value.take::<T>()
}
