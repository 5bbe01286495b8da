use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::model::{self, RuntimeType, TypeHandle};
use crate::reflection::{Reflect, Typed};

/// What a stream id is bound to.
pub enum Registered {
    /// A shareable handle. Back-references clone it.
    Value(Box<dyn Reflect>),
    /// A value that was seen but cannot be aliased.
    Unique,
    /// A type descriptor.
    Type(TypeHandle),
}

/// Id 0 always means null; descriptors and objects start after the
/// well-known block.
pub const NULL_ID: u64 = 0;

/// The well-known types, in their fixed id order starting at 1.
///
/// Both sides of a stream agree on these without any descriptor bytes
/// changing hands. The order is part of the wire format.
pub fn well_known_types() -> &'static [&'static RuntimeType] {
    static TYPES: LazyLock<Vec<&'static RuntimeType>> = LazyLock::new(|| {
        vec![
            model::any_object(),
            <String as Typed>::runtime_type(),
            model::type_descriptor(),
            model::nullable_any(),
            model::list_any(),
            model::map_any(),
            <() as Typed>::runtime_type(),
            <bool as Typed>::runtime_type(),
            <char as Typed>::runtime_type(),
            <i8 as Typed>::runtime_type(),
            <i16 as Typed>::runtime_type(),
            <i32 as Typed>::runtime_type(),
            <i64 as Typed>::runtime_type(),
            <u8 as Typed>::runtime_type(),
            <u16 as Typed>::runtime_type(),
            <u32 as Typed>::runtime_type(),
            <u64 as Typed>::runtime_type(),
            <f32 as Typed>::runtime_type(),
            <f64 as Typed>::runtime_type(),
            <rust_decimal::Decimal as Typed>::runtime_type(),
            <crate::impls::Blob as Typed>::runtime_type(),
            <uuid::Uuid as Typed>::runtime_type(),
        ]
    });
    &TYPES
}

/// Tracks every id handed out or consumed during one stream session.
///
/// A context lives as long as its writer or reader, which is what makes
/// back-references and shared identity work across the whole stream.
pub struct IdentityContext {
    values: HashMap<u64, Registered>,
    ids: HashMap<usize, u64>,
    next_id: u64,
}

impl IdentityContext {
    pub fn new() -> Self {
        let well_known = well_known_types();
        let mut context = Self {
            values: HashMap::new(),
            ids: HashMap::new(),
            next_id: well_known.len() as u64 + 1,
        };
        for (index, ty) in well_known.iter().copied().enumerate() {
            let id = index as u64 + 1;
            let handle = TypeHandle::Local(ty);
            context.ids.insert(handle.identity(), id);
            context.values.insert(id, Registered::Type(handle));
        }
        context
    }

    /// Allocates the next fresh id.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Reserves ids the stream has already used, so fresh allocations
    /// never collide with them.
    pub fn observe_id(&mut self, id: u64) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    /// Binds a value's address to an id for back-reference detection.
    pub fn bind_identity(&mut self, identity: usize, id: u64) -> Result<()> {
        if self.ids.insert(identity, id).is_some() {
            return Err(Error::AlreadyRegistered { id });
        }
        Ok(())
    }

    pub fn id_for(&self, identity: usize) -> Option<u64> {
        self.ids.get(&identity).copied()
    }

    pub fn register_value(&mut self, id: u64, handle: Box<dyn Reflect>) -> Result<()> {
        eprintln!("DEBUG register_value({id}) ty={} clonable={}", handle.runtime_type().path(), handle.clone_handle().is_some());
        self.insert(id, Registered::Value(handle))
    }

    pub fn register_unique(&mut self, id: u64) -> Result<()> {
        eprintln!("DEBUG register_unique({id})");
        self.insert(id, Registered::Unique)
    }

    pub fn register_type(&mut self, id: u64, handle: TypeHandle) -> Result<()> {
        self.insert(id, Registered::Type(handle))
    }

    fn insert(&mut self, id: u64, entry: Registered) -> Result<()> {
        if self.values.insert(id, entry).is_some() {
            return Err(Error::IdInUse { id });
        }
        Ok(())
    }

    pub fn get(&self, id: u64) -> Option<&Registered> {
        self.values.get(&id)
    }

    /// Resolves a back-reference to a fresh handle on the shared value.
    pub fn clone_handle_for(&self, id: u64) -> Result<Box<dyn Reflect>> {
        eprintln!("DEBUG clone_handle_for({id}): {:?}", self.values.get(&id).map(|r| match r { Registered::Value(_) => "value", Registered::Unique => "unique", Registered::Type(_) => "type" }));
        match self.values.get(&id) {
            Some(Registered::Value(handle)) => (**handle)
                .clone_handle()
                .ok_or(Error::NotShareable { id }),
            Some(Registered::Unique) => Err(Error::NotShareable { id }),
            Some(Registered::Type(_)) | None => Err(Error::UnknownBackReference { id }),
        }
    }

    /// Resolves an id to the type it denotes.
    pub fn type_for(&self, id: u64) -> Result<TypeHandle> {
        match self.values.get(&id) {
            Some(Registered::Type(handle)) => Ok(handle.clone()),
            Some(_) | None => Err(Error::UnknownBackReference { id }),
        }
    }
}

impl Default for IdentityContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_ids_are_stable() {
        let context = IdentityContext::new();
        let any = TypeHandle::Local(model::any_object());
        assert_eq!(context.id_for(any.identity()), Some(1));
        let string = TypeHandle::Local(<String as Typed>::runtime_type());
        assert_eq!(context.id_for(string.identity()), Some(2));
        let guid = TypeHandle::Local(<uuid::Uuid as Typed>::runtime_type());
        assert_eq!(context.id_for(guid.identity()), Some(22));
    }

    #[test]
    fn fresh_ids_start_after_the_well_known_block() {
        let mut context = IdentityContext::new();
        assert_eq!(context.allocate_id(), 23);
        context.observe_id(40);
        assert_eq!(context.allocate_id(), 41);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut context = IdentityContext::new();
        let id = context.allocate_id();
        context.register_unique(id).unwrap();
        assert!(matches!(
            context.register_unique(id),
            Err(Error::IdInUse { .. })
        ));
    }
}
