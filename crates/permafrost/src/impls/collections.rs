use core::fmt;
use core::hash::Hash;
use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::impls::impl_reflect_plumbing;
use crate::model::{CollectionKind, GenericTypeCell, RuntimeType};
use crate::reflection::{
    CollectionMut, CollectionRef, ListOps, MapOps, Reflect, Struct, Typed, ValueMut, ValueRef,
    take_boxed,
};
use crate::registry::{Describe, FromType, TypeMeta, TypeRegistry, TypeTraitConstruct};

// -----------------------------------------------------------------------------
// Vec

impl<T: Typed + Reflect> Typed for Vec<T> {
    fn runtime_type() -> &'static RuntimeType {
        static CELL: GenericTypeCell = GenericTypeCell::new();
        CELL.get_or_insert::<Self>(|| {
            let path: &'static str =
                Box::leak(format!("alloc::vec::Vec<{}>", <T as Typed>::runtime_type().path()).into());
            RuntimeType::object::<Self>(path, "Vec", "alloc").with_collection(
                CollectionKind::TypedList,
                None,
                Some(<T as Typed>::runtime_type),
            )
        })
    }
}

impl<T: Typed + Reflect> Reflect for Vec<T> {
    impl_reflect_plumbing!();

    fn runtime_type(&self) -> &'static RuntimeType {
        <Self as Typed>::runtime_type()
    }

    fn value_ref(&self) -> ValueRef<'_> {
        ValueRef::Struct(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Struct(self)
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

impl<T: Typed + Reflect> Struct for Vec<T> {
    fn member(&self, _name: &str) -> Option<&dyn Reflect> {
        None
    }

    fn member_mut(&mut self, _name: &str) -> Option<&mut dyn Reflect> {
        None
    }

    fn member_at(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    fn member_at_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }

    fn name_at(&self, _index: usize) -> Option<&str> {
        None
    }

    fn member_len(&self) -> usize {
        0
    }

    fn collection(&self) -> Option<CollectionRef<'_>> {
        Some(CollectionRef::List(self))
    }

    fn collection_mut(&mut self) -> Option<CollectionMut<'_>> {
        Some(CollectionMut::List(self))
    }
}

impl<T: Typed + Reflect> ListOps for Vec<T> {
    fn len(&self) -> usize {
        self.len()
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        self.as_slice().get(index).map(|item| item.as_reflect())
    }

    fn push_boxed(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        match take_boxed::<T>(value) {
            Ok(item) => {
                self.push(item);
                Ok(())
            }
            Err(value) => Err(value),
        }
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn type_meta() -> TypeMeta {
        TypeMeta::of::<Self>().with_construct(<TypeTraitConstruct as FromType<Self>>::from_type())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        registry.register::<T>();
    }
}

// -----------------------------------------------------------------------------
// Maps

macro_rules! impl_map {
    ($map:ident, $path_prefix:literal, $crate_name:literal $(, $extra_bound:path)*) => {
        impl<K, V> Typed for $map<K, V>
        where
            K: Typed + Reflect $(+ $extra_bound)*,
            V: Typed + Reflect,
        {
            fn runtime_type() -> &'static RuntimeType {
                static CELL: GenericTypeCell = GenericTypeCell::new();
                CELL.get_or_insert::<Self>(|| {
                    let path: &'static str = Box::leak(
                        format!(
                            concat!($path_prefix, "<{}, {}>"),
                            <K as Typed>::runtime_type().path(),
                            <V as Typed>::runtime_type().path()
                        )
                        .into(),
                    );
                    RuntimeType::object::<Self>(path, stringify!($map), $crate_name)
                        .with_collection(
                            CollectionKind::TypedMap,
                            Some(<K as Typed>::runtime_type),
                            Some(<V as Typed>::runtime_type),
                        )
                })
            }
        }

        impl<K, V> Reflect for $map<K, V>
        where
            K: Typed + Reflect $(+ $extra_bound)*,
            V: Typed + Reflect,
        {
            impl_reflect_plumbing!();

            fn runtime_type(&self) -> &'static RuntimeType {
                <Self as Typed>::runtime_type()
            }

            fn value_ref(&self) -> ValueRef<'_> {
                ValueRef::Struct(self)
            }

            fn value_mut(&mut self) -> ValueMut<'_> {
                ValueMut::Struct(self)
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
                let mut map = f.debug_map();
                for (key, value) in self.iter() {
                    map.entry(&key.as_reflect(), &value.as_reflect());
                }
                map.finish()
            }
        }

        impl<K, V> Struct for $map<K, V>
        where
            K: Typed + Reflect $(+ $extra_bound)*,
            V: Typed + Reflect,
        {
            fn member(&self, _name: &str) -> Option<&dyn Reflect> {
                None
            }

            fn member_mut(&mut self, _name: &str) -> Option<&mut dyn Reflect> {
                None
            }

            fn member_at(&self, _index: usize) -> Option<&dyn Reflect> {
                None
            }

            fn member_at_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
                None
            }

            fn name_at(&self, _index: usize) -> Option<&str> {
                None
            }

            fn member_len(&self) -> usize {
                0
            }

            fn collection(&self) -> Option<CollectionRef<'_>> {
                Some(CollectionRef::Map(self))
            }

            fn collection_mut(&mut self) -> Option<CollectionMut<'_>> {
                Some(CollectionMut::Map(self))
            }
        }

        impl<K, V> MapOps for $map<K, V>
        where
            K: Typed + Reflect $(+ $extra_bound)*,
            V: Typed + Reflect,
        {
            fn len(&self) -> usize {
                self.len()
            }

            fn try_for_each_entry(
                &self,
                f: &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> Result<(), Error>,
            ) -> Result<(), Error> {
                for (key, value) in self.iter() {
                    f(key.as_reflect(), value.as_reflect())?;
                }
                Ok(())
            }

            fn insert_boxed(
                &mut self,
                key: Box<dyn Reflect>,
                value: Box<dyn Reflect>,
            ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)> {
                let key = match take_boxed::<K>(key) {
                    Ok(key) => key,
                    Err(key) => return Err((key, value)),
                };
                match take_boxed::<V>(value) {
                    Ok(value) => {
                        self.insert(key, value);
                        Ok(())
                    }
                    Err(value) => Err((Box::new(key) as Box<dyn Reflect>, value)),
                }
            }

            fn clear(&mut self) {
                $map::clear(self);
            }
        }

        impl<K, V> Describe for $map<K, V>
        where
            K: Describe $(+ $extra_bound)*,
            V: Describe,
        {
            fn type_meta() -> TypeMeta {
                TypeMeta::of::<Self>()
                    .with_construct(<TypeTraitConstruct as FromType<Self>>::from_type())
            }

            fn register_dependencies(registry: &mut TypeRegistry) {
                registry.register::<K>();
                registry.register::<V>();
            }
        }
    };
}

impl_map!(HashMap, "std::collections::HashMap", "std", Eq, Hash);
impl_map!(BTreeMap, "alloc::collections::BTreeMap", "alloc", Ord);
