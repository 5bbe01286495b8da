use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::context::{IdentityContext, NULL_ID};
use crate::dynamic::{PropertyBag, StructuralPayload, UnknownObject, UnknownPayload};
use crate::error::{Error, Result};
use crate::model::{
    self, CollectionKind, PrimitiveKind, Resolution, RuntimeType, TypeData, TypeDataBody,
    TypeDataFlags, TypeDataMember, TypeHandle, resolve,
};
use crate::reflection::{CollectionMut, Reflect, ValueMut, ValueRef};
use crate::registry::{Strategy, TypeRegistry};
use crate::shared::Shared;
use crate::wire::{Decoder, FORMAT_VERSION, WriteOptions};

fn any() -> TypeHandle {
    TypeHandle::Local(model::any_object())
}

fn any_value() -> TypeHandle {
    TypeHandle::Local(model::any_value())
}

fn slot_handle(slot: Option<&Arc<TypeData>>) -> TypeHandle {
    slot.map(TypeHandle::for_data).unwrap_or_else(any)
}

/// The expected element type of a nullable or array payload, preferring
/// what the stream declared over the local view.
fn element_expected(ty: &'static RuntimeType, data: Option<&Arc<TypeData>>) -> TypeHandle {
    if let Some(element) = data.and_then(|d| d.body()).and_then(|b| b.element.as_ref()) {
        return TypeHandle::for_data(element);
    }
    ty.element().map(TypeHandle::Local).unwrap_or_else(any)
}

fn collection_expected(
    ty: &'static RuntimeType,
    data: Option<&Arc<TypeData>>,
) -> (TypeHandle, TypeHandle) {
    if let Some(body) = data.and_then(|d| d.body())
        && (body.collection_key.is_some() || body.collection_value.is_some())
    {
        return (
            slot_handle(body.collection_key.as_ref()),
            slot_handle(body.collection_value.as_ref()),
        );
    }
    (
        ty.collection_key().map(TypeHandle::Local).unwrap_or_else(any),
        ty.collection_value()
            .map(TypeHandle::Local)
            .unwrap_or_else(any),
    )
}

/// Hands a finished value to its destination. `None` means delivered;
/// `Some` hands the value back because the destination refused it, or
/// because there was no destination at all.
fn deliver(value: Box<dyn Reflect>, into: Option<&mut dyn Reflect>) -> Option<Box<dyn Reflect>> {
    match into {
        Some(dest) => match dest.assign(value) {
            Ok(()) => None,
            Err(value) => Some(value),
        },
        None => Some(value),
    }
}

/// Stream data that found no home in the local model.
///
/// Nothing a stream says is silently discarded: member values without a
/// matching slot, collection entries the destination refused and enum
/// discriminants no local variant carries all land here.
pub struct LostMember {
    /// The type path of the object the data belonged to.
    pub owner: String,
    /// The member or slot name, as the stream named it.
    pub member: String,
    pub value: Box<dyn Reflect>,
}

/// Deserializes object graphs from a [`Decoder`].
///
/// The stream's own type descriptors drive the read: each value is
/// matched against the [`TypeRegistry`] and lands in its local type
/// when one exists, or in a placeholder that preserves everything for
/// re-serialization when none does.
pub struct Reader<'r, D> {
    input: D,
    registry: &'r TypeRegistry,
    context: IdentityContext,
    options: WriteOptions,
    lost: Vec<LostMember>,
    warned: HashSet<String>,
    after_read: Vec<(Box<dyn Reflect>, fn(&mut dyn Reflect))>,
}

impl<'r, D: Decoder> Reader<'r, D> {
    pub fn new(input: D, registry: &'r TypeRegistry) -> Result<Self> {
        let mut input = input;
        let found = input.read_varuint()?;
        if found != FORMAT_VERSION {
            return Err(Error::Version {
                found,
                expected: FORMAT_VERSION,
            });
        }
        Ok(Self {
            input,
            registry,
            context: IdentityContext::new(),
            options: WriteOptions::empty(),
            lost: Vec::new(),
            warned: HashSet::new(),
            after_read: Vec::new(),
        })
    }

    /// Reads one root value.
    pub fn read(&mut self) -> Result<Box<dyn Reflect>> {
        self.read_stream_options()?;
        let value = self.read_boxed(&any())?;
        self.run_after_read();
        Ok(value)
    }

    /// Reads one root value into an existing destination, repopulating
    /// it in place where the types line up.
    pub fn read_into(&mut self, destination: &mut dyn Reflect) -> Result<()> {
        self.read_stream_options()?;
        if let Some(value) = self.read_value(&any(), Some(destination))? {
            return Err(Error::Repopulate {
                type_path: value.runtime_type().path().to_owned(),
            });
        }
        self.run_after_read();
        Ok(())
    }

    /// The options the writer recorded in the stream.
    pub fn options(&self) -> WriteOptions {
        self.options
    }

    pub fn lost_members(&self) -> &[LostMember] {
        &self.lost
    }

    pub fn take_lost_members(&mut self) -> Vec<LostMember> {
        std::mem::take(&mut self.lost)
    }

    pub fn into_decoder(self) -> D {
        self.input
    }

    fn read_stream_options(&mut self) -> Result<()> {
        let bits = self.input.read_varuint()?;
        let bits = u32::try_from(bits).map_err(|_| Error::Malformed {
            what: "stream",
            detail: "options word out of range".into(),
        })?;
        self.options = WriteOptions::from_bits_truncate(bits);
        Ok(())
    }

    fn effective_strategy(&self, ty: &'static RuntimeType) -> Strategy {
        match self.registry.strategy_for(ty) {
            Strategy::Custom if self.options.contains(WriteOptions::IGNORE_CUSTOM) => {
                Strategy::Structural
            }
            Strategy::Converter if self.options.contains(WriteOptions::IGNORE_CONVERTER) => {
                Strategy::Structural
            }
            strategy => strategy,
        }
    }

    // -------------------------------------------------------------------------
    // Values

    fn read_value(
        &mut self,
        expected: &TypeHandle,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        if !expected.is_reference() {
            let actual = self.read_actual(expected)?;
            return self.read_object(None, actual, expected, into);
        }

        let id = self.input.read_varuint()?;
        if id == NULL_ID {
            return Ok(deliver(Box::new(()), into));
        }
        if self.context.get(id).is_some() {
            let handle = self.context.clone_handle_for(id)?;
            return Ok(deliver(handle, into));
        }
        self.context.observe_id(id);
        let actual = self.read_actual(expected)?;
        self.read_object(Some(id), actual, expected, into)
    }

    fn read_boxed(&mut self, expected: &TypeHandle) -> Result<Box<dyn Reflect>> {
        match self.read_value(expected, None)? {
            Some(value) => Ok(value),
            None => Err(Error::Malformed {
                what: "stream",
                detail: "value delivered to a destination that does not exist".into(),
            }),
        }
    }

    fn read_actual(&mut self, expected: &TypeHandle) -> Result<TypeHandle> {
        if expected.is_sealed() || self.options.contains(WriteOptions::SKIP_METADATA) {
            Ok(expected.clone())
        } else {
            self.read_type()
        }
    }

    fn read_object(
        &mut self,
        id: Option<u64>,
        actual: TypeHandle,
        expected: &TypeHandle,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        match actual {
            TypeHandle::Local(ty) => {
                // The writer picks the strategy from the target type, so
                // reference wrappers defer to their element here too.
                let strategy_ty = if ty.is_reference() {
                    ty.element().unwrap_or(ty)
                } else {
                    ty
                };
                match self.effective_strategy(strategy_ty) {
                    Strategy::Surrogate => self.read_surrogate(id, strategy_ty, None, into),
                    Strategy::Converter => self.read_converted(id, strategy_ty, None, into),
                    Strategy::Custom => self.read_custom(id, strategy_ty, None, into),
                    Strategy::Structural => self.read_structural(id, ty, None, into),
                }
            }
            TypeHandle::Wire(data) => {
                if !data.is_supported() {
                    // The writer itself could not describe this type.
                    // There is no payload to read.
                    let shared = Shared::new(UnknownObject::structural(data));
                    if let Some(id) = id {
                        self.context.register_value(id, Box::new(shared.clone()))?;
                    }
                    return Ok(deliver(Box::new(shared), into));
                }
                match resolve(&data, self.registry, expected) {
                    Resolution::Resolved(ty) => {
                        let flags = data.flags();
                        if flags.contains(TypeDataFlags::SURROGATE) {
                            self.read_surrogate(id, ty, Some(&data), into)
                        } else if flags.contains(TypeDataFlags::CONVERTER) {
                            self.read_converted(id, ty, Some(&data), into)
                        } else if flags.contains(TypeDataFlags::CUSTOM) {
                            self.read_custom(id, ty, Some(&data), into)
                        } else {
                            self.read_structural(id, ty, Some(&data), into)
                        }
                    }
                    Resolution::Placeholder(data) => self.read_placeholder(id, data, into),
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Payload strategies

    fn read_surrogate(
        &mut self,
        id: Option<u64>,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        let payload = self.read_boxed(&any_value())?;
        match self.registry.meta_for(ty).and_then(|m| m.surrogate()) {
            Some(entry) => {
                let value = entry.from_surrogate(payload)?;
                self.finish_value(id, value, ty, into)
            }
            None => {
                let descriptor = data.cloned().unwrap_or_else(|| TypeData::describe(ty));
                let shared = Shared::new(UnknownObject::surrogate(descriptor, payload));
                if let Some(id) = id {
                    self.context.register_value(id, Box::new(shared.clone()))?;
                }
                Ok(deliver(Box::new(shared), into))
            }
        }
    }

    fn read_converted(
        &mut self,
        id: Option<u64>,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        let text = self.input.read_str()?;
        match self.registry.meta_for(ty).and_then(|m| m.converter()) {
            Some(entry) => {
                let value = (entry.from_text)(text.as_deref().unwrap_or_default())?;
                self.finish_value(id, value, ty, into)
            }
            None => {
                let descriptor = data.cloned().unwrap_or_else(|| TypeData::describe(ty));
                let shared = Shared::new(UnknownObject::text(descriptor, text));
                if let Some(id) = id {
                    self.context.register_value(id, Box::new(shared.clone()))?;
                }
                Ok(deliver(Box::new(shared), into))
            }
        }
    }

    fn read_custom(
        &mut self,
        id: Option<u64>,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        let mut bag = self.read_bag()?;
        if let Some(entry) = self.registry.meta_for(ty).and_then(|m| m.custom()) {
            let value = (entry.load)(&mut bag)?;
            return self.finish_value(id, value, ty, into);
        }
        // The stream used the custom protocol but this side has no
        // loader. Rebuild what the bag allows, member by member.
        if let Some(construct) = self.registry.meta_for(ty).and_then(|m| m.construct()) {
            let mut value = if id.is_some() {
                (construct.create_shared)()
            } else {
                (construct.create)()
            };
            self.apply_bag(&mut *value, ty.path(), bag);
            return self.finish_value(id, value, ty, into);
        }
        let descriptor = data.cloned().unwrap_or_else(|| TypeData::describe(ty));
        let shared = Shared::new(UnknownObject::bag(descriptor, bag));
        if let Some(id) = id {
            self.context.register_value(id, Box::new(shared.clone()))?;
        }
        Ok(deliver(Box::new(shared), into))
    }

    fn read_bag(&mut self) -> Result<PropertyBag> {
        let count = self.input.read_varuint()? as usize;
        let mut bag = PropertyBag::new();
        for _ in 0..count {
            let name = self.input.read_str()?.unwrap_or_default();
            let value = self.read_boxed(&any_value())?;
            bag.set(name, value);
        }
        Ok(bag)
    }

    fn apply_bag(&mut self, target: &mut dyn Reflect, owner: &str, bag: PropertyBag) {
        let is_reference = matches!(target.value_ref(), ValueRef::Reference(_));
        if is_reference {
            if let ValueMut::Reference(handle) = target.value_mut() {
                let mut slot = Some(bag);
                let _ = handle.with_target_mut(&mut |inner| {
                    if let Some(bag) = slot.take() {
                        self.apply_bag_entries(inner, owner, bag);
                    }
                    Ok(())
                });
            }
            return;
        }
        self.apply_bag_entries(target, owner, bag);
    }

    fn apply_bag_entries(&mut self, target: &mut dyn Reflect, owner: &str, bag: PropertyBag) {
        for (name, entry) in bag.into_entries() {
            let unplaced = match target.value_mut() {
                ValueMut::Struct(value) => match value.member_mut(&name) {
                    Some(slot) => slot.assign(entry).err(),
                    None => Some(entry),
                },
                _ => Some(entry),
            };
            if let Some(entry) = unplaced {
                self.record_lost(owner, &name, entry);
            }
        }
    }

    /// Finishing steps shared by the non-structural strategies: wrap
    /// for identity where needed, register, run hooks, deliver.
    fn finish_value(
        &mut self,
        id: Option<u64>,
        value: Box<dyn Reflect>,
        ty: &'static RuntimeType,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        let mut value = value;
        if id.is_some() {
            value = self.into_shared(ty, value);
        }
        if let Some(entry) = self.registry.meta_for(ty).and_then(|m| m.after_read()) {
            match value.clone_handle() {
                Some(handle) => self.after_read.push((handle, entry.notify)),
                None => (entry.notify)(&mut *value),
            }
        }
        if let Some(id) = id {
            match value.clone_handle() {
                Some(handle) => self.context.register_value(id, handle)?,
                None => self.context.register_unique(id)?,
            }
        }
        Ok(deliver(value, into))
    }

    /// Rehouses a plain value behind a shared handle so later
    /// back-references can alias it. Values that cannot be rehoused
    /// come back unchanged and register as unique.
    fn into_shared(&self, ty: &'static RuntimeType, value: Box<dyn Reflect>) -> Box<dyn Reflect> {
        if value.clone_handle().is_some() {
            return value;
        }
        let Some(construct) = self.registry.meta_for(ty).and_then(|m| m.construct()) else {
            return value;
        };
        let mut shared = (construct.create_shared)();
        let mut slot = Some(value);
        if let ValueMut::Reference(handle) = shared.value_mut() {
            let _ = handle.with_target_mut(&mut |target| {
                if let Some(value) = slot.take()
                    && let Err(value) = target.assign(value)
                {
                    slot = Some(value);
                }
                Ok(())
            });
        }
        match slot {
            None => shared,
            Some(value) => value,
        }
    }

    // -------------------------------------------------------------------------
    // Structural payloads

    fn read_structural(
        &mut self,
        id: Option<u64>,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
        mut into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        if ty.kind().is_primitive() {
            let value = self.read_primitive(ty.kind())?;
            if let Some(id) = id {
                self.context.register_unique(id)?;
            }
            return Ok(deliver(value, into));
        }

        // A reference-typed slot carries its target's payload, so the
        // populate steps run against the element type.
        let payload_ty = if ty.is_reference() {
            ty.element().unwrap_or(ty)
        } else {
            ty
        };
        let payload_data = if ty.is_reference() {
            data.and_then(|d| d.body()).and_then(|b| b.element.as_ref())
        } else {
            data
        };

        // Try to land in the destination directly. A shareable
        // destination keeps its identity and is populated through its
        // handle; a matching plain destination repopulates in place.
        // Type-erased boxes are neither and take a constructed value.
        if let Some(dest) = into.take() {
            if let Some(handle) = dest.clone_handle() {
                if let Some(id) = id {
                    self.context.register_value(id, handle)?;
                }
                if let ValueMut::Reference(reference) = dest.value_mut() {
                    reference
                        .with_target_mut(&mut |target| self.populate(target, payload_ty, payload_data))?;
                }
                self.queue_after_read(payload_ty, &*dest);
                return Ok(None);
            }
            if dest.runtime_type().type_id() == ty.type_id() {
                if let Some(id) = id {
                    self.context.register_unique(id)?;
                }
                self.populate(dest, payload_ty, payload_data)?;
                if let Some(entry) = self.registry.meta_for(payload_ty).and_then(|m| m.after_read()) {
                    (entry.notify)(dest);
                }
                return Ok(None);
            }
            into = Some(dest);
        }

        let Some(construct) = self.registry.meta_for(ty).and_then(|m| m.construct()) else {
            self.warn_type_once(ty.path(), "no constructor registered, keeping a placeholder");
            let descriptor = data.cloned().unwrap_or_else(|| TypeData::describe(ty));
            return self.read_placeholder(id, descriptor, into);
        };
        // A reference type constructs as itself; a plain type under an
        // id gets rehoused so back-references can alias it.
        let mut value = if !ty.is_reference() && id.is_some() {
            (construct.create_shared)()
        } else {
            (construct.create)()
        };
        // Register before populating so cycles in the stream resolve
        // against this very value.
        if let Some(id) = id {
            match value.clone_handle() {
                Some(handle) => self.context.register_value(id, handle)?,
                None => self.context.register_unique(id)?,
            }
        }
        let value_is_reference = matches!(value.value_ref(), ValueRef::Reference(_));
        if value_is_reference {
            if let ValueMut::Reference(handle) = value.value_mut() {
                handle.with_target_mut(&mut |target| self.populate(target, payload_ty, payload_data))?;
            }
        } else {
            self.populate(&mut *value, payload_ty, payload_data)?;
        }
        if let Some(entry) = self.registry.meta_for(payload_ty).and_then(|m| m.after_read()) {
            match value.clone_handle() {
                Some(handle) => self.after_read.push((handle, entry.notify)),
                None => (entry.notify)(&mut *value),
            }
        }
        Ok(deliver(value, into))
    }

    fn populate(
        &mut self,
        target: &mut dyn Reflect,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
    ) -> Result<()> {
        if ty.kind().is_primitive() {
            let value = self.read_primitive(ty.kind())?;
            if target.assign(value).is_err() {
                return Err(Error::Repopulate {
                    type_path: ty.path().to_owned(),
                });
            }
            return Ok(());
        }
        match target.value_mut() {
            ValueMut::Primitive(_) => Err(Error::Malformed {
                what: "stream",
                detail: format!(
                    "`{}` declares an object payload but the value is primitive",
                    ty.path()
                ),
            }),
            ValueMut::Nullable(nullable) => {
                if !self.input.read_bool()? {
                    nullable.clear();
                    return Ok(());
                }
                let expected = element_expected(ty, data);
                let value = self.read_boxed(&expected)?;
                if let Err(value) = nullable.set_boxed(value) {
                    self.record_lost(ty.path(), "<value>", value);
                }
                Ok(())
            }
            ValueMut::Array(sequence) => {
                let count = self.input.read_varuint()? as usize;
                if count != sequence.len() {
                    return Err(Error::ArrayLength {
                        stream: count,
                        local: sequence.len(),
                    });
                }
                let expected = element_expected(ty, data);
                for index in 0..count {
                    match sequence.get_mut(index) {
                        Some(slot) => {
                            if let Some(value) = self.read_value(&expected, Some(slot))? {
                                self.record_lost(ty.path(), "<item>", value);
                            }
                        }
                        None => {
                            let value = self.read_boxed(&expected)?;
                            self.record_lost(ty.path(), "<item>", value);
                        }
                    }
                }
                Ok(())
            }
            ValueMut::Enum(value) => {
                let discriminant = self.input.read_varint()?;
                if !value.set_discriminant(discriminant) {
                    self.record_lost(ty.path(), "<discriminant>", Box::new(discriminant));
                }
                Ok(())
            }
            ValueMut::Struct(value) => self.populate_object(value, ty, data),
            ValueMut::Reference(handle) => {
                let element = if ty.is_reference() {
                    ty.element().unwrap_or(ty)
                } else {
                    ty
                };
                handle.with_target_mut(&mut |target| self.populate(target, element, data))
            }
        }
    }

    fn populate_object(
        &mut self,
        value: &mut dyn crate::reflection::Struct,
        ty: &'static RuntimeType,
        data: Option<&Arc<TypeData>>,
    ) -> Result<()> {
        let wire_members: Option<&[TypeDataMember]> = data
            .filter(|_| !self.options.contains(WriteOptions::SKIP_MEMBER_DATA))
            .and_then(|d| d.body())
            .map(|body| body.members.as_slice());

        match wire_members {
            Some(members) => {
                // The stream's member order drives the read. Matching is
                // by name, with repeats paired by position among their
                // namesakes.
                let mut seen: HashMap<&str, usize> = HashMap::new();
                for member in members {
                    let name: &str = &member.name;
                    let occurrence = {
                        let counter = seen.entry(name).or_insert(0);
                        let index = *counter;
                        *counter += 1;
                        index
                    };
                    let expected = slot_handle(member.ty.as_ref());
                    let slot_index = (0..value.member_len())
                        .filter(|&i| value.name_at(i) == Some(name))
                        .nth(occurrence);
                    match slot_index.and_then(|i| value.member_at_mut(i)) {
                        Some(slot) => {
                            if let Some(lost) = self.read_value(&expected, Some(slot))? {
                                self.record_lost(ty.path(), name, lost);
                            }
                        }
                        None => {
                            let lost = self.read_boxed(&expected)?;
                            self.record_lost(ty.path(), name, lost);
                        }
                    }
                }
            }
            None => {
                for member in ty.members() {
                    let expected = TypeHandle::Local((member.ty)());
                    match value.member_mut(member.name) {
                        Some(slot) => {
                            if let Some(lost) = self.read_value(&expected, Some(slot))? {
                                self.record_lost(ty.path(), member.name, lost);
                            }
                        }
                        None => {
                            let lost = self.read_boxed(&expected)?;
                            self.record_lost(ty.path(), member.name, lost);
                        }
                    }
                }
            }
        }

        let collection_kind = data.map_or(ty.collection(), |d| d.collection());
        if !collection_kind.is_collection() {
            return Ok(());
        }
        // A read-only stream collection carries no element payload, and
        // the destination contents stand.
        if self.input.read_bool()? {
            return Ok(());
        }
        let count = self.input.read_varuint()? as usize;
        let (key_expected, value_expected) = collection_expected(ty, data);

        if collection_kind.is_map() {
            match value.collection_mut() {
                Some(CollectionMut::Map(map)) => {
                    if map.is_read_only() {
                        for _ in 0..count {
                            let _ = self.read_boxed(&key_expected)?;
                            let _ = self.read_boxed(&value_expected)?;
                        }
                        return Ok(());
                    }
                    map.clear();
                    for _ in 0..count {
                        let key = self.read_boxed(&key_expected)?;
                        let entry = self.read_boxed(&value_expected)?;
                        if let Err((key, entry)) = map.insert_boxed(key, entry) {
                            self.record_lost(ty.path(), "<key>", key);
                            self.record_lost(ty.path(), "<entry>", entry);
                        }
                    }
                    Ok(())
                }
                _ => {
                    for _ in 0..count {
                        let key = self.read_boxed(&key_expected)?;
                        let entry = self.read_boxed(&value_expected)?;
                        self.record_lost(ty.path(), "<key>", key);
                        self.record_lost(ty.path(), "<entry>", entry);
                    }
                    Ok(())
                }
            }
        } else {
            match value.collection_mut() {
                Some(CollectionMut::List(list)) => {
                    if list.is_read_only() {
                        for _ in 0..count {
                            let _ = self.read_boxed(&value_expected)?;
                        }
                        return Ok(());
                    }
                    list.clear();
                    for _ in 0..count {
                        let item = self.read_boxed(&value_expected)?;
                        if let Err(item) = list.push_boxed(item) {
                            self.record_lost(ty.path(), "<item>", item);
                        }
                    }
                    Ok(())
                }
                _ => {
                    for _ in 0..count {
                        let item = self.read_boxed(&value_expected)?;
                        self.record_lost(ty.path(), "<item>", item);
                    }
                    Ok(())
                }
            }
        }
    }

    fn read_primitive(&mut self, kind: PrimitiveKind) -> Result<Box<dyn Reflect>> {
        let value: Box<dyn Reflect> = match kind {
            PrimitiveKind::None => {
                return Err(Error::Malformed {
                    what: "stream",
                    detail: "object kind where a primitive payload was expected".into(),
                });
            }
            PrimitiveKind::Unit => Box::new(()),
            PrimitiveKind::Bool => Box::new(self.input.read_bool()?),
            PrimitiveKind::Char => Box::new(self.input.read_char()?),
            PrimitiveKind::I8 => Box::new(self.input.read_i8()?),
            PrimitiveKind::I16 => Box::new(self.input.read_i16()?),
            PrimitiveKind::I32 => Box::new(self.input.read_i32()?),
            PrimitiveKind::I64 => Box::new(self.input.read_i64()?),
            PrimitiveKind::U8 => Box::new(self.input.read_u8()?),
            PrimitiveKind::U16 => Box::new(self.input.read_u16()?),
            PrimitiveKind::U32 => Box::new(self.input.read_u32()?),
            PrimitiveKind::U64 => Box::new(self.input.read_u64()?),
            PrimitiveKind::F32 => Box::new(self.input.read_f32()?),
            PrimitiveKind::F64 => Box::new(self.input.read_f64()?),
            PrimitiveKind::Decimal => Box::new(self.input.read_decimal()?),
            PrimitiveKind::Str => Box::new(self.input.read_str()?.unwrap_or_default()),
            PrimitiveKind::Bytes => {
                Box::new(crate::impls::Blob(self.input.read_bytes()?.unwrap_or_default()))
            }
            PrimitiveKind::Guid => Box::new(self.input.read_guid()?),
        };
        Ok(value)
    }

    // -------------------------------------------------------------------------
    // Placeholders

    fn read_placeholder(
        &mut self,
        id: Option<u64>,
        data: Arc<TypeData>,
        into: Option<&mut dyn Reflect>,
    ) -> Result<Option<Box<dyn Reflect>>> {
        self.warn_type_once(
            data.name().unwrap_or("<unsupported>"),
            "no local type, keeping a placeholder",
        );
        let shared = Shared::new(UnknownObject::structural(data.clone()));
        if let Some(id) = id {
            self.context.register_value(id, Box::new(shared.clone()))?;
        }
        let payload = self.read_unknown_payload(&data)?;
        *shared.write().payload_mut() = payload;
        Ok(deliver(Box::new(shared), into))
    }

    /// Reads a value of a type nothing local claims, guided entirely by
    /// the stream's descriptor.
    fn read_unknown_payload(&mut self, data: &Arc<TypeData>) -> Result<UnknownPayload> {
        let flags = data.flags();
        if flags.contains(TypeDataFlags::SURROGATE) {
            return Ok(UnknownPayload::Surrogate(self.read_boxed(&any_value())?));
        }
        if flags.contains(TypeDataFlags::CONVERTER) {
            return Ok(UnknownPayload::Text(self.input.read_str()?));
        }
        if flags.contains(TypeDataFlags::CUSTOM) {
            return Ok(UnknownPayload::Bag(self.read_bag()?));
        }
        if data.kind().is_primitive() {
            return Ok(UnknownPayload::Surrogate(self.read_primitive(data.kind())?));
        }

        let mut payload = StructuralPayload::default();
        if data.is_nullable() {
            if self.input.read_bool()? {
                let expected = slot_handle(data.body().and_then(|b| b.element.as_ref()));
                payload.items.items.push(self.read_boxed(&expected)?);
            }
            return Ok(UnknownPayload::Structural(payload));
        }
        if data.is_array() {
            let count = self.input.read_varuint()? as usize;
            let expected = slot_handle(data.body().and_then(|b| b.element.as_ref()));
            for _ in 0..count {
                payload.items.items.push(self.read_boxed(&expected)?);
            }
            return Ok(UnknownPayload::Structural(payload));
        }
        if data.is_enum() {
            payload.discriminant = Some(self.input.read_varint()?);
            return Ok(UnknownPayload::Structural(payload));
        }

        if self.options.contains(WriteOptions::SKIP_MEMBER_DATA) {
            return Err(Error::Malformed {
                what: "stream",
                detail: format!(
                    "cannot read unknown type `{}` without member data",
                    data.name().unwrap_or("<unsupported>")
                ),
            });
        }
        let Some(body) = data.body() else {
            return Err(Error::Malformed {
                what: "stream",
                detail: "descriptor used before its body arrived".into(),
            });
        };
        for member in &body.members {
            let expected = slot_handle(member.ty.as_ref());
            let value = self.read_boxed(&expected)?;
            payload.push_member(member.name.as_ref(), value);
        }
        if data.collection().is_collection() {
            let read_only = self.input.read_bool()?;
            if read_only {
                if data.collection().is_map() {
                    payload.entries.read_only = true;
                } else {
                    payload.items.read_only = true;
                }
                return Ok(UnknownPayload::Structural(payload));
            }
            let count = self.input.read_varuint()? as usize;
            if data.collection().is_map() {
                payload.entries.read_only = read_only;
                let key_expected = slot_handle(body.collection_key.as_ref());
                let value_expected = slot_handle(body.collection_value.as_ref());
                for _ in 0..count {
                    let key = self.read_boxed(&key_expected)?;
                    let value = self.read_boxed(&value_expected)?;
                    payload.entries.entries.push((key, value));
                }
            } else {
                payload.items.read_only = read_only;
                let expected = slot_handle(body.collection_value.as_ref());
                for _ in 0..count {
                    payload.items.items.push(self.read_boxed(&expected)?);
                }
            }
        }
        Ok(UnknownPayload::Structural(payload))
    }

    // -------------------------------------------------------------------------
    // Type descriptors

    fn read_type(&mut self) -> Result<TypeHandle> {
        let id = self.input.read_varuint()?;
        self.read_type_with_id(id)
    }

    fn read_type_with_id(&mut self, id: u64) -> Result<TypeHandle> {
        if self.context.get(id).is_some() {
            return self.context.type_for(id);
        }
        self.context.observe_id(id);

        let word = self.input.read_varuint()?;
        let (flags, kind, collection) = TypeData::unpack_flags(word)?;
        let (name, crate_name) = if flags.contains(TypeDataFlags::HAS_NAME) {
            (self.input.read_str()?, self.input.read_str()?)
        } else {
            (None, None)
        };
        let array_rank = u8::try_from(self.input.read_varuint()?).map_err(|_| Error::Malformed {
            what: "type descriptor",
            detail: "array rank out of range".into(),
        })?;
        let generic_index =
            u32::try_from(self.input.read_varuint()?).map_err(|_| Error::Malformed {
                what: "type descriptor",
                detail: "generic index out of range".into(),
            })?;

        let data = Arc::new(TypeData::new(
            flags,
            kind,
            collection,
            name.map(Into::into),
            crate_name.map(Into::into),
            array_rank,
            generic_index,
        ));
        // Register the header before the body so self-referential
        // descriptors resolve against it.
        self.context
            .register_type(id, TypeHandle::Wire(data.clone()))?;

        let mut body = TypeDataBody::default();
        let generic_count = self.input.read_varuint()? as usize;
        for _ in 0..generic_count {
            let handle = self.read_type()?;
            body.generics.push(data_of(&handle));
        }
        if flags.contains(TypeDataFlags::HAS_ELEMENT) {
            body.element = self.read_type_slot()?;
        }
        if !self.options.contains(WriteOptions::SKIP_MEMBER_DATA) {
            if flags.contains(TypeDataFlags::HAS_BASE) {
                body.base = self.read_type_slot()?;
            }
            let member_count = self.input.read_varuint()? as usize;
            for _ in 0..member_count {
                let member_name = self.input.read_str()?.ok_or_else(|| Error::Malformed {
                    what: "type descriptor",
                    detail: "member without a name".into(),
                })?;
                let ty = self.read_type_slot()?;
                body.members.push(TypeDataMember {
                    name: member_name.into(),
                    ty,
                });
            }
            match collection {
                CollectionKind::TypedList => body.collection_value = self.read_type_slot()?,
                CollectionKind::TypedMap => {
                    body.collection_key = self.read_type_slot()?;
                    body.collection_value = self.read_type_slot()?;
                }
                _ => {}
            }
        }
        data.attach_body(body)?;
        Ok(TypeHandle::Wire(data))
    }

    fn read_type_slot(&mut self) -> Result<Option<Arc<TypeData>>> {
        let id = self.input.read_varuint()?;
        if id == NULL_ID {
            return Ok(None);
        }
        let handle = self.read_type_with_id(id)?;
        Ok(Some(data_of(&handle)))
    }

    // -------------------------------------------------------------------------
    // Bookkeeping

    fn record_lost(&mut self, owner: &str, member: &str, value: Box<dyn Reflect>) {
        let key = format!("{owner}.{member}");
        if self.warned.insert(key) {
            tracing::warn!(owner, member, "dropping stream data with no local home");
        }
        self.lost.push(LostMember {
            owner: owner.to_owned(),
            member: member.to_owned(),
            value,
        });
    }

    fn warn_type_once(&mut self, path: &str, message: &'static str) {
        if self.warned.insert(path.to_owned()) {
            tracing::warn!(ty = path, "{message}");
        }
    }

    fn queue_after_read(&mut self, ty: &'static RuntimeType, value: &dyn Reflect) {
        if let Some(entry) = self.registry.meta_for(ty).and_then(|m| m.after_read())
            && let Some(handle) = value.clone_handle()
        {
            self.after_read.push((handle, entry.notify));
        }
    }

    /// Runs queued hooks once the whole graph is in memory, in the
    /// order their values were registered.
    fn run_after_read(&mut self) {
        let queued = std::mem::take(&mut self.after_read);
        for (mut handle, notify) in queued {
            if let ValueMut::Reference(target) = handle.value_mut() {
                let _ = target.with_target_mut(&mut |value| {
                    notify(value);
                    Ok(())
                });
            }
        }
    }
}

fn data_of(handle: &TypeHandle) -> Arc<TypeData> {
    match handle {
        TypeHandle::Local(ty) => TypeData::describe(ty),
        TypeHandle::Wire(data) => data.clone(),
    }
}
