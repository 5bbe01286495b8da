use core::any::TypeId;
use std::collections::BTreeMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::model::RuntimeType;

/// Interns the descriptor of a single non-generic type.
///
/// A `TypeCell` is placed in a `static` by the derive macro (or by a
/// manual `Typed` impl) so that every call to
/// [`Typed::runtime_type`](crate::Typed::runtime_type) returns the same
/// `&'static` descriptor. The builder closure runs at most once.
pub struct TypeCell(OnceLock<&'static RuntimeType>);

impl TypeCell {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get_or_init(&self, f: impl FnOnce() -> RuntimeType) -> &'static RuntimeType {
        self.0.get_or_init(|| Box::leak(Box::new(f())))
    }
}

/// Interns one descriptor per monomorphization of a generic type.
///
/// Generic `Typed` impls cannot use a plain [`TypeCell`] because each
/// instantiation needs its own descriptor. This cell keys leaked
/// descriptors by [`TypeId`] instead, so `Vec<u32>` and `Vec<String>`
/// intern independently behind the same `static`.
pub struct GenericTypeCell(RwLock<BTreeMap<TypeId, &'static RuntimeType>>);

impl GenericTypeCell {
    pub const fn new() -> Self {
        Self(RwLock::new(BTreeMap::new()))
    }

    pub fn get_or_insert<T: ?Sized + 'static>(
        &self,
        f: impl FnOnce() -> RuntimeType,
    ) -> &'static RuntimeType {
        let key = TypeId::of::<T>();
        if let Some(info) = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return info;
        }
        // The builder runs outside the lock so recursive types that pass
        // through this cell again do not deadlock.
        let built = f();
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| Box::leak(Box::new(built)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveKind;

    #[test]
    fn type_cell_interns_once() {
        static CELL: TypeCell = TypeCell::new();
        let a = CELL.get_or_init(|| {
            RuntimeType::primitive::<u32>(PrimitiveKind::U32, "core::u32", "u32", "core")
        });
        let b = CELL.get_or_init(|| unreachable!("already initialized"));
        assert!(core::ptr::eq(a, b));
    }

    #[test]
    fn generic_cell_keys_by_type() {
        static CELL: GenericTypeCell = GenericTypeCell::new();
        let a = CELL.get_or_insert::<u8>(|| {
            RuntimeType::primitive::<u8>(PrimitiveKind::U8, "core::u8", "u8", "core")
        });
        let b = CELL.get_or_insert::<u16>(|| {
            RuntimeType::primitive::<u16>(PrimitiveKind::U16, "core::u16", "u16", "core")
        });
        assert!(!core::ptr::eq(a, b));
        let a2 = CELL.get_or_insert::<u8>(|| unreachable!("already interned"));
        assert!(core::ptr::eq(a, a2));
    }
}
