use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::dynamic::PropertyBag;
use crate::error::Error;
use crate::model::{self, RuntimeType, TypeData};
use crate::reflection::{
    CollectionMut, CollectionRef, ListOps, MapOps, Reflect, Struct, Typed, ValueMut, ValueRef,
};

/// An untyped list of values. Backs the collection facade of
/// placeholder objects.
#[derive(Default)]
pub struct AnyList {
    pub items: Vec<Box<dyn Reflect>>,
    pub read_only: bool,
}

impl ListOps for AnyList {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<&dyn Reflect> {
        self.items.as_slice().get(index).map(|item| &**item)
    }

    fn push_boxed(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        self.items.push(value);
        Ok(())
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// An untyped key/value sequence. Keeps stream order.
#[derive(Default)]
pub struct AnyMap {
    pub entries: Vec<(Box<dyn Reflect>, Box<dyn Reflect>)>,
    pub read_only: bool,
}

impl MapOps for AnyMap {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn try_for_each_entry(
        &self,
        f: &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error> {
        for (key, value) in &self.entries {
            f(&**key, &**value)?;
        }
        Ok(())
    }

    fn insert_boxed(
        &mut self,
        key: Box<dyn Reflect>,
        value: Box<dyn Reflect>,
    ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)> {
        self.entries.push((key, value));
        Ok(())
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// The structurally-read payload of a placeholder: named members plus
/// whatever collection contents the stream carried.
#[derive(Default)]
pub struct StructuralPayload {
    pub members: Vec<(String, Box<dyn Reflect>)>,
    pub items: AnyList,
    pub entries: AnyMap,
    /// Set when the descriptor marks an enum type.
    pub discriminant: Option<i64>,
}

impl StructuralPayload {
    pub fn push_member(&mut self, name: impl Into<String>, value: Box<dyn Reflect>) {
        self.members.push((name.into(), value));
    }
}

/// What a placeholder holds, mirroring how its type was serialized.
pub enum UnknownPayload {
    /// Members and collection contents, read field by field.
    Structural(StructuralPayload),
    /// A converter string.
    Text(Option<String>),
    /// A custom-protocol property bag.
    Bag(PropertyBag),
    /// A surrogate value.
    Surrogate(Box<dyn Reflect>),
}

/// The stand-in for a stream type with no local counterpart.
///
/// A placeholder keeps the foreign descriptor and everything the
/// stream said about the value, so writing it out again reproduces the
/// original bytes for readers that *do* know the type. Members are
/// reachable through the [`Struct`] view like any other object.
pub struct UnknownObject {
    descriptor: Arc<TypeData>,
    payload: UnknownPayload,
}

impl UnknownObject {
    pub fn structural(descriptor: Arc<TypeData>) -> Self {
        Self {
            descriptor,
            payload: UnknownPayload::Structural(StructuralPayload::default()),
        }
    }

    pub fn text(descriptor: Arc<TypeData>, value: Option<String>) -> Self {
        Self {
            descriptor,
            payload: UnknownPayload::Text(value),
        }
    }

    pub fn bag(descriptor: Arc<TypeData>, bag: PropertyBag) -> Self {
        Self {
            descriptor,
            payload: UnknownPayload::Bag(bag),
        }
    }

    pub fn surrogate(descriptor: Arc<TypeData>, value: Box<dyn Reflect>) -> Self {
        Self {
            descriptor,
            payload: UnknownPayload::Surrogate(value),
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeData> {
        &self.descriptor
    }

    pub fn payload(&self) -> &UnknownPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut UnknownPayload {
        &mut self.payload
    }

    fn structural_payload(&self) -> Option<&StructuralPayload> {
        match &self.payload {
            UnknownPayload::Structural(payload) => Some(payload),
            _ => None,
        }
    }

    fn structural_payload_mut(&mut self) -> Option<&mut StructuralPayload> {
        match &mut self.payload {
            UnknownPayload::Structural(payload) => Some(payload),
            _ => None,
        }
    }
}

impl Typed for UnknownObject {
    fn runtime_type() -> &'static RuntimeType {
        model::unknown_object()
    }
}

impl Reflect for UnknownObject {
    fn runtime_type(&self) -> &'static RuntimeType {
        model::unknown_object()
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
        ValueRef::Struct(self)
    }

    fn value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Struct(self)
    }

    fn assign(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>> {
        match value.take::<Self>() {
            Ok(replacement) => {
                *self = replacement;
                Ok(())
            }
            Err(value) => Err(value),
        }
    }

    fn wire_descriptor(&self) -> Option<Arc<TypeData>> {
        Some(self.descriptor.clone())
    }

    fn debug_fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.descriptor.name().unwrap_or("<unsupported>");
        match &self.payload {
            UnknownPayload::Structural(payload) => {
                let mut s = f.debug_struct(name);
                for (member, value) in &payload.members {
                    s.field(member, value);
                }
                s.finish_non_exhaustive()
            }
            UnknownPayload::Text(text) => write!(f, "{name}({text:?})"),
            UnknownPayload::Bag(bag) => write!(f, "{name}({bag:?})"),
            UnknownPayload::Surrogate(value) => write!(f, "{name}({value:?})"),
        }
    }
}

impl Struct for UnknownObject {
    fn member(&self, name: &str) -> Option<&dyn Reflect> {
        let payload = self.structural_payload()?;
        payload
            .members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| &**v)
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Reflect> {
        let payload = self.structural_payload_mut()?;
        payload
            .members
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| &mut **v)
    }

    fn member_at(&self, index: usize) -> Option<&dyn Reflect> {
        self.structural_payload()?.members.get(index).map(|(_, v)| &**v)
    }

    fn member_at_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        self.structural_payload_mut()?
            .members
            .get_mut(index)
            .map(|(_, v)| &mut **v)
    }

    fn name_at(&self, index: usize) -> Option<&str> {
        self.structural_payload()?.members.get(index).map(|(n, _)| n.as_str())
    }

    fn member_len(&self) -> usize {
        self.structural_payload().map_or(0, |p| p.members.len())
    }

    fn collection(&self) -> Option<CollectionRef<'_>> {
        let payload = self.structural_payload()?;
        let kind = self.descriptor.collection();
        if !kind.is_collection() {
            return None;
        }
        if kind.is_map() {
            Some(CollectionRef::Map(&payload.entries))
        } else {
            Some(CollectionRef::List(&payload.items))
        }
    }

    fn collection_mut(&mut self) -> Option<CollectionMut<'_>> {
        let kind = self.descriptor.collection();
        let payload = self.structural_payload_mut()?;
        if !kind.is_collection() {
            return None;
        }
        if kind.is_map() {
            Some(CollectionMut::Map(&mut payload.entries))
        } else {
            Some(CollectionMut::List(&mut payload.items))
        }
    }
}
