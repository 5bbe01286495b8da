use core::any::TypeId;
use core::fmt::Display;
use core::str::FromStr;
use std::collections::{HashMap, HashSet};

use crate::model::{PrimitiveKind, RuntimeType};
use crate::registry::{
    AfterRead, CustomSerialize, Describe, FromType, Strategy, TypeMeta, TypeTraitAfterRead,
    TypeTraitConvert, TypeTraitCustom, TypeTraitSurrogate,
};
use crate::reflection::{Reflect, Typed};

/// The set of types a writer or reader knows about.
///
/// Registration is transitive: registering a type pulls in its member
/// types, so registering the roots of a model is enough. The registry
/// also powers stream-side type resolution, by full path first and by
/// bare name as a fallback when that name is unambiguous.
pub struct TypeRegistry {
    metas: HashMap<TypeId, TypeMeta>,
    path_to_id: HashMap<&'static str, TypeId>,
    name_to_id: HashMap<&'static str, TypeId>,
    ambiguous_names: HashSet<&'static str>,
    primitives: HashMap<PrimitiveKind, &'static RuntimeType>,
}

impl TypeRegistry {
    /// An empty registry. Use [`TypeRegistry::new`] unless the
    /// built-in types really must be absent.
    pub fn empty() -> Self {
        Self {
            metas: HashMap::new(),
            path_to_id: HashMap::new(),
            name_to_id: HashMap::new(),
            ambiguous_names: HashSet::new(),
            primitives: HashMap::new(),
        }
    }

    /// A registry with every built-in type pre-registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<()>();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<rust_decimal::Decimal>();
        registry.register::<String>();
        registry.register::<crate::impls::Blob>();
        registry.register::<uuid::Uuid>();
        registry.register::<Box<dyn Reflect>>();
        registry
    }

    /// Registers `T` and, transitively, the types it depends on.
    /// Re-registering is a no-op, so cyclic models terminate.
    pub fn register<T: Describe>(&mut self) {
        if self.metas.contains_key(&TypeId::of::<T>()) {
            return;
        }
        self.add_meta(T::type_meta());
        T::register_dependencies(self);
    }

    /// Inserts a prebuilt entry. The entry goes in before anything
    /// else happens, so dependency cycles resolve against it.
    pub fn add_meta(&mut self, meta: TypeMeta) {
        let ty = meta.ty();
        let id = ty.type_id();
        if self.metas.contains_key(&id) {
            return;
        }

        self.path_to_id.insert(ty.path(), id);
        match self.name_to_id.get(ty.name()) {
            Some(existing) if *existing != id => {
                // Two types share a bare name. Neither may win a
                // name-only lookup from here on.
                self.name_to_id.remove(ty.name());
                self.ambiguous_names.insert(ty.name());
            }
            Some(_) => {}
            None => {
                if !self.ambiguous_names.contains(ty.name()) {
                    self.name_to_id.insert(ty.name(), id);
                }
            }
        }
        if ty.kind().is_primitive() {
            self.primitives.entry(ty.kind()).or_insert(ty);
        }
        self.metas.insert(id, meta);
    }

    // -------------------------------------------------------------------------
    // Customization

    /// Serializes `T` as `S`. Both conversions are total functions;
    /// fallibility belongs in the custom protocol instead.
    pub fn register_surrogate<T, S>(&mut self, to: fn(&T) -> S, from: fn(S) -> T)
    where
        T: Describe,
        S: Describe,
    {
        self.register::<T>();
        self.register::<S>();
        if let Some(meta) = self.metas.get_mut(&TypeId::of::<T>()) {
            meta.set_surrogate(TypeTraitSurrogate::new(to, from));
        }
    }

    /// Serializes `T` through its `Display`/`FromStr` forms.
    pub fn register_converter<T>(&mut self)
    where
        T: Describe + Display + FromStr,
        T::Err: Display,
    {
        self.register::<T>();
        if let Some(meta) = self.metas.get_mut(&TypeId::of::<T>()) {
            meta.set_converter(<TypeTraitConvert as FromType<T>>::from_type());
        }
    }

    /// Serializes `T` through its [`CustomSerialize`] impl.
    pub fn register_custom<T>(&mut self)
    where
        T: Describe + CustomSerialize,
    {
        self.register::<T>();
        if let Some(meta) = self.metas.get_mut(&TypeId::of::<T>()) {
            meta.set_custom(<TypeTraitCustom as FromType<T>>::from_type());
        }
    }

    /// Runs `T`'s [`AfterRead`] hook after deserialization.
    pub fn register_after_read<T>(&mut self)
    where
        T: Describe + AfterRead,
    {
        self.register::<T>();
        if let Some(meta) = self.metas.get_mut(&TypeId::of::<T>()) {
            meta.set_after_read(<TypeTraitAfterRead as FromType<T>>::from_type());
        }
    }

    // -------------------------------------------------------------------------
    // Lookup

    pub fn contains<T: Typed>(&self) -> bool {
        self.metas.contains_key(&TypeId::of::<T>())
    }

    pub fn meta(&self, id: TypeId) -> Option<&TypeMeta> {
        self.metas.get(&id)
    }

    pub fn meta_for(&self, ty: &RuntimeType) -> Option<&TypeMeta> {
        self.metas.get(&ty.type_id())
    }

    /// The serialization strategy for a type. Unregistered types
    /// serialize structurally.
    pub fn strategy_for(&self, ty: &RuntimeType) -> Strategy {
        self.meta_for(ty)
            .map_or(Strategy::Structural, TypeMeta::strategy)
    }

    pub fn type_by_path(&self, path: &str) -> Option<&'static RuntimeType> {
        let id = self.path_to_id.get(path)?;
        self.metas.get(id).map(TypeMeta::ty)
    }

    /// Bare-name lookup. Ambiguous names never match.
    pub fn type_by_name(&self, name: &str) -> Option<&'static RuntimeType> {
        let id = self.name_to_id.get(name)?;
        self.metas.get(id).map(TypeMeta::ty)
    }

    /// The local home for a primitive payload kind.
    pub fn primitive_for(&self, kind: PrimitiveKind) -> Option<&'static RuntimeType> {
        self.primitives.get(&kind).copied()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_ins_resolve_by_path() {
        let registry = TypeRegistry::new();
        let ty = registry.type_by_path("alloc::string::String").unwrap();
        assert_eq!(ty.kind(), PrimitiveKind::Str);
        assert!(registry.primitive_for(PrimitiveKind::Bool).is_some());
    }

    #[test]
    fn bare_name_lookup_finds_unique_names() {
        let registry = TypeRegistry::new();
        assert!(registry.type_by_name("String").is_some());
        assert!(registry.type_by_name("NoSuchType").is_none());
    }
}
