use core::any::Any;
use core::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Error;
use crate::model::{GenericTypeCell, RuntimeType};
use crate::reflection::{Referential, Reflect, Typed, ValueMut, ValueRef};
use crate::registry::{Describe, FromType, TypeMeta, TypeRegistry, TypeTraitConstruct};

/// The engine's shareable reference.
///
/// Two `Shared` handles cloned from each other point at the same
/// target, serialize as one object plus a back-reference, and come
/// back out of a stream still aliased. This is also how cyclic object
/// graphs are expressed.
///
/// ```
/// use permafrost::Shared;
///
/// let a = Shared::new(vec![1u32, 2, 3]);
/// let b = a.clone();
/// b.write().push(4);
/// assert_eq!(a.read().len(), 4);
/// ```
pub struct Shared<T: ?Sized>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether two handles share one target.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Recovers the target when this is the last handle to it.
    pub fn try_unwrap(self) -> Result<T, Self> {
        Arc::try_unwrap(self.0)
            .map(|lock| lock.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(Self)
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shared(")?;
        self.read().fmt(f)?;
        write!(f, ")")
    }
}

impl<T: Typed + Reflect> Typed for Shared<T> {
    fn runtime_type() -> &'static RuntimeType {
        static CELL: GenericTypeCell = GenericTypeCell::new();
        CELL.get_or_insert::<Self>(|| {
            let path: &'static str =
                Box::leak(format!("permafrost::shared<{}>", <T as Typed>::runtime_type().path()).into());
            RuntimeType::object::<Self>(path, "shared", "permafrost")
                .with_element(<T as Typed>::runtime_type)
                .as_reference()
        })
    }
}

impl<T: Typed + Reflect> Reflect for Shared<T> {
    fn runtime_type(&self) -> &'static RuntimeType {
        <Self as Typed>::runtime_type()
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

    fn assign(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        match value.take::<Self>() {
            Ok(handle) => {
                *self = handle;
                Ok(())
            }
            Err(value) => Err(value),
        }
    }

    fn clone_handle(&self) -> Option<Box<dyn Reflect>> {
        Some(Box::new(self.clone()))
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shared(")?;
        self.read().as_reflect().debug_fmt(f)?;
        write!(f, ")")
    }
}

impl<T: Typed + Reflect> Referential for Shared<T> {
    fn identity(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.0) as *const () as usize)
    }

    fn with_target(
        &self,
        f: &mut dyn FnMut(&dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let guard = self.read();
        f(guard.as_reflect())
    }

    fn with_target_mut(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut guard = self.write();
        f(guard.as_reflect_mut())
    }
}

impl<T: Describe + Default> Describe for Shared<T> {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>()
            .with_construct(<TypeTraitConstruct as FromType<Self>>::from_type())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}
