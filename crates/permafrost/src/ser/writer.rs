use std::sync::Arc;

use crate::context::{IdentityContext, NULL_ID};
use crate::dynamic::{StructuralPayload, UnknownObject, UnknownPayload};
use crate::error::{Error, Result};
use crate::model::{
    self, CollectionKind, RuntimeType, TypeData, TypeDataFlags, TypeDataMember, TypeHandle,
    pack_flags,
};
use crate::reflection::{CollectionRef, PrimitiveRef, Reflect, ValueRef};
use crate::registry::{Strategy, TypeRegistry};
use crate::wire::{Encoder, FORMAT_VERSION, WriteOptions};

fn any() -> TypeHandle {
    TypeHandle::Local(model::any_object())
}

fn any_value() -> TypeHandle {
    TypeHandle::Local(model::any_value())
}

fn slot_handle(slot: Option<&Arc<TypeData>>) -> TypeHandle {
    slot.map(TypeHandle::for_data).unwrap_or_else(any)
}

/// Serializes object graphs to an [`Encoder`].
///
/// A writer owns one stream: the format version goes out at
/// construction, and every [`write`](Writer::write) call after that
/// appends one root value. Identity tracking spans the writer's whole
/// lifetime, so a value shared between two roots is written once.
pub struct Writer<'r, E> {
    out: E,
    registry: &'r TypeRegistry,
    context: IdentityContext,
    options: WriteOptions,
    surrogates_in_progress: Vec<core::any::TypeId>,
}

impl<'r, E: Encoder> Writer<'r, E> {
    pub fn new(out: E, registry: &'r TypeRegistry) -> Result<Self> {
        let mut out = out;
        out.write_varuint(FORMAT_VERSION)?;
        Ok(Self {
            out,
            registry,
            context: IdentityContext::new(),
            options: WriteOptions::empty(),
            surrogates_in_progress: Vec::new(),
        })
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn into_encoder(self) -> E {
        self.out
    }

    /// Writes one root value as an any-typed object.
    pub fn write(&mut self, value: &dyn Reflect) -> Result<()> {
        self.out.write_varuint(u64::from(self.options.bits()))?;
        self.write_value(value, &any())
    }

    // -------------------------------------------------------------------------
    // Values

    fn write_value(&mut self, value: &dyn Reflect, expected: &TypeHandle) -> Result<()> {
        if !expected.is_reference() {
            return self.write_body(value, expected);
        }

        // The unit value in an object slot is the null id.
        if let ValueRef::Primitive(PrimitiveRef::Unit) = value.value_ref() {
            return self.out.write_varuint(NULL_ID);
        }

        let identity = match value.value_ref() {
            ValueRef::Reference(handle) => handle.identity(),
            _ => None,
        };
        if let Some(identity) = identity
            && let Some(id) = self.context.id_for(identity)
        {
            return self.out.write_varuint(id);
        }

        let id = self.context.allocate_id();
        if let Some(identity) = identity {
            self.context.bind_identity(identity, id)?;
        }
        self.context.register_unique(id)?;
        self.out.write_varuint(id)?;

        if let ValueRef::Reference(handle) = value.value_ref() {
            handle.with_target(&mut |target| self.write_body(target, expected))
        } else {
            self.write_body(value, expected)
        }
    }

    fn write_body(&mut self, value: &dyn Reflect, expected: &TypeHandle) -> Result<()> {
        // Values rehoused behind a handle during a tolerant read can
        // land back in by-value slots; the body is their target's.
        if let ValueRef::Reference(handle) = value.value_ref() {
            return handle.with_target(&mut |target| self.write_body(target, expected));
        }
        if let Some(unknown) = value.as_any().downcast_ref::<UnknownObject>() {
            return self.write_unknown(unknown, expected);
        }

        let ty = value.runtime_type();
        if self.wants_metadata(expected) {
            self.write_type(&TypeHandle::Local(ty))?;
        }
        match self.effective_strategy(ty) {
            Strategy::Surrogate => self.write_surrogate(value, ty),
            Strategy::Converter => self.write_converted(value, ty),
            Strategy::Custom => self.write_custom(value, ty),
            Strategy::Structural => self.write_structural(value, ty),
        }
    }

    fn wants_metadata(&self, expected: &TypeHandle) -> bool {
        !expected.is_sealed() && !self.options.contains(WriteOptions::SKIP_METADATA)
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

    fn strategy_flags(&self, ty: &'static RuntimeType) -> TypeDataFlags {
        match self.effective_strategy(ty) {
            Strategy::Surrogate => TypeDataFlags::SURROGATE,
            Strategy::Converter => TypeDataFlags::CONVERTER,
            Strategy::Custom => TypeDataFlags::CUSTOM,
            Strategy::Structural => TypeDataFlags::empty(),
        }
    }

    // -------------------------------------------------------------------------
    // Payload strategies

    fn write_surrogate(&mut self, value: &dyn Reflect, ty: &'static RuntimeType) -> Result<()> {
        let Some(entry) = self.registry.meta_for(ty).and_then(|meta| meta.surrogate()) else {
            return self.write_structural(value, ty);
        };
        if self.surrogates_in_progress.contains(&ty.type_id()) {
            return Err(Error::SurrogateCycle {
                type_path: ty.path().to_owned(),
            });
        }
        self.surrogates_in_progress.push(ty.type_id());
        let result = entry
            .to_surrogate(value)
            .and_then(|surrogate| self.write_value(&*surrogate, &any_value()));
        self.surrogates_in_progress.pop();
        result
    }

    fn write_converted(&mut self, value: &dyn Reflect, ty: &'static RuntimeType) -> Result<()> {
        let Some(entry) = self.registry.meta_for(ty).and_then(|meta| meta.converter()) else {
            return self.write_structural(value, ty);
        };
        let text = (entry.to_text)(value)?;
        self.out.write_str(Some(&text))
    }

    fn write_custom(&mut self, value: &dyn Reflect, ty: &'static RuntimeType) -> Result<()> {
        let Some(entry) = self.registry.meta_for(ty).and_then(|meta| meta.custom()) else {
            return self.write_structural(value, ty);
        };
        let mut bag = crate::dynamic::PropertyBag::new();
        (entry.save)(value, &mut bag)?;
        self.write_bag(&bag)
    }

    fn write_bag(&mut self, bag: &crate::dynamic::PropertyBag) -> Result<()> {
        self.out.write_varuint(bag.len() as u64)?;
        for (name, value) in bag.iter() {
            self.out.write_str(Some(name))?;
            self.write_value(value, &any_value())?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Structural payloads

    fn write_structural(&mut self, value: &dyn Reflect, ty: &'static RuntimeType) -> Result<()> {
        match value.value_ref() {
            ValueRef::Primitive(primitive) => self.write_primitive(primitive),
            ValueRef::Nullable(nullable) => match nullable.value() {
                None => self.out.write_bool(false),
                Some(inner) => {
                    self.out.write_bool(true)?;
                    let expected = ty.element().map(TypeHandle::Local).unwrap_or_else(any);
                    self.write_value(inner, &expected)
                }
            },
            ValueRef::Array(sequence) => {
                let len = sequence.len();
                self.out.write_varuint(len as u64)?;
                let expected = ty.element().map(TypeHandle::Local).unwrap_or_else(any);
                for index in 0..len {
                    let item = sequence.get(index).ok_or(Error::CountMismatch {
                        reported: len,
                        actual: index,
                    })?;
                    self.write_value(item, &expected)?;
                }
                Ok(())
            }
            ValueRef::Enum(value) => self.out.write_varint(value.discriminant()),
            ValueRef::Struct(value) => {
                for member in ty.members() {
                    let member_value = value.member(member.name).ok_or_else(|| Error::Malformed {
                        what: "object",
                        detail: format!("missing member `{}` on `{}`", member.name, ty.path()),
                    })?;
                    self.write_value(member_value, &TypeHandle::Local((member.ty)()))?;
                }
                if ty.collection().is_collection() {
                    self.write_collection(value.collection(), ty)?;
                }
                Ok(())
            }
            ValueRef::Reference(handle) => {
                handle.with_target(&mut |target| self.write_structural(target, target.runtime_type()))
            }
        }
    }

    fn write_collection(
        &mut self,
        collection: Option<CollectionRef<'_>>,
        ty: &'static RuntimeType,
    ) -> Result<()> {
        match collection {
            Some(CollectionRef::List(list)) => {
                // A read-only collection has no element payload at all.
                if list.is_read_only() {
                    return self.out.write_bool(true);
                }
                self.out.write_bool(false)?;
                let len = list.len();
                self.out.write_varuint(len as u64)?;
                let expected = ty
                    .collection_value()
                    .map(TypeHandle::Local)
                    .unwrap_or_else(any);
                for index in 0..len {
                    let item = list.get(index).ok_or(Error::CountMismatch {
                        reported: len,
                        actual: index,
                    })?;
                    self.write_value(item, &expected)?;
                }
                Ok(())
            }
            Some(CollectionRef::Map(map)) => {
                if map.is_read_only() {
                    return self.out.write_bool(true);
                }
                self.out.write_bool(false)?;
                let len = map.len();
                self.out.write_varuint(len as u64)?;
                let key_expected = ty
                    .collection_key()
                    .map(TypeHandle::Local)
                    .unwrap_or_else(any);
                let value_expected = ty
                    .collection_value()
                    .map(TypeHandle::Local)
                    .unwrap_or_else(any);
                let mut written = 0usize;
                map.try_for_each_entry(&mut |key, entry| {
                    written += 1;
                    self.write_value(key, &key_expected)?;
                    self.write_value(entry, &value_expected)
                })?;
                if written != len {
                    return Err(Error::CountMismatch {
                        reported: len,
                        actual: written,
                    });
                }
                Ok(())
            }
            None => Err(Error::Malformed {
                what: "object",
                detail: format!("`{}` declares a collection but exposes none", ty.path()),
            }),
        }
    }

    fn write_primitive(&mut self, primitive: PrimitiveRef<'_>) -> Result<()> {
        match primitive {
            PrimitiveRef::Unit => Ok(()),
            PrimitiveRef::Bool(v) => self.out.write_bool(v),
            PrimitiveRef::Char(v) => self.out.write_char(v),
            PrimitiveRef::I8(v) => self.out.write_i8(v),
            PrimitiveRef::I16(v) => self.out.write_i16(v),
            PrimitiveRef::I32(v) => self.out.write_i32(v),
            PrimitiveRef::I64(v) => self.out.write_i64(v),
            PrimitiveRef::U8(v) => self.out.write_u8(v),
            PrimitiveRef::U16(v) => self.out.write_u16(v),
            PrimitiveRef::U32(v) => self.out.write_u32(v),
            PrimitiveRef::U64(v) => self.out.write_u64(v),
            PrimitiveRef::F32(v) => self.out.write_f32(v),
            PrimitiveRef::F64(v) => self.out.write_f64(v),
            PrimitiveRef::Decimal(v) => self.out.write_decimal(v),
            PrimitiveRef::Str(v) => self.out.write_str(Some(v)),
            PrimitiveRef::Bytes(v) => self.out.write_bytes(Some(v)),
            PrimitiveRef::Guid(v) => self.out.write_guid(v),
        }
    }

    // -------------------------------------------------------------------------
    // Placeholder re-emission

    fn write_unknown(&mut self, unknown: &UnknownObject, expected: &TypeHandle) -> Result<()> {
        let data = unknown.descriptor().clone();
        if self.wants_metadata(expected) {
            self.write_type(&TypeHandle::Wire(data.clone()))?;
        }
        if !data.is_supported() {
            return Ok(());
        }
        let flags = data.flags();
        match unknown.payload() {
            UnknownPayload::Surrogate(inner) if flags.contains(TypeDataFlags::SURROGATE) => {
                self.write_value(&**inner, &any_value())
            }
            UnknownPayload::Text(text) if flags.contains(TypeDataFlags::CONVERTER) => {
                self.out.write_str(text.as_deref())
            }
            UnknownPayload::Bag(bag) if flags.contains(TypeDataFlags::CUSTOM) => {
                self.write_bag(bag)
            }
            UnknownPayload::Surrogate(inner) if data.kind().is_primitive() => {
                match inner.value_ref() {
                    ValueRef::Primitive(primitive) => self.write_primitive(primitive),
                    _ => Err(Error::Malformed {
                        what: "placeholder",
                        detail: "primitive descriptor with non-primitive payload".into(),
                    }),
                }
            }
            UnknownPayload::Structural(payload) => self.write_unknown_structural(payload, &data),
            _ => Err(Error::Malformed {
                what: "placeholder",
                detail: "payload does not match its descriptor".into(),
            }),
        }
    }

    fn write_unknown_structural(
        &mut self,
        payload: &StructuralPayload,
        data: &Arc<TypeData>,
    ) -> Result<()> {
        let body = data.body();
        if data.is_nullable() {
            let element = slot_handle(body.and_then(|b| b.element.as_ref()));
            return match payload.items.items.first() {
                Some(inner) => {
                    self.out.write_bool(true)?;
                    self.write_value(&**inner, &element)
                }
                None => self.out.write_bool(false),
            };
        }
        if data.is_array() {
            let element = slot_handle(body.and_then(|b| b.element.as_ref()));
            self.out.write_varuint(payload.items.items.len() as u64)?;
            for item in &payload.items.items {
                self.write_value(&**item, &element)?;
            }
            return Ok(());
        }
        if data.is_enum() {
            return self.out.write_varint(payload.discriminant.unwrap_or(0));
        }

        let empty: &[TypeDataMember] = &[];
        let member_types = body.map_or(empty, |b| b.members.as_slice());
        for (index, (_, value)) in payload.members.iter().enumerate() {
            let expected = slot_handle(member_types.get(index).and_then(|m| m.ty.as_ref()));
            self.write_value(&**value, &expected)?;
        }
        if data.collection().is_collection() {
            if data.collection().is_map() {
                if payload.entries.read_only {
                    return self.out.write_bool(true);
                }
                let key_expected = slot_handle(body.and_then(|b| b.collection_key.as_ref()));
                let value_expected = slot_handle(body.and_then(|b| b.collection_value.as_ref()));
                self.out.write_bool(false)?;
                self.out.write_varuint(payload.entries.entries.len() as u64)?;
                for (key, value) in &payload.entries.entries {
                    self.write_value(&**key, &key_expected)?;
                    self.write_value(&**value, &value_expected)?;
                }
            } else {
                if payload.items.read_only {
                    return self.out.write_bool(true);
                }
                let expected = slot_handle(body.and_then(|b| b.collection_value.as_ref()));
                self.out.write_bool(false)?;
                self.out.write_varuint(payload.items.items.len() as u64)?;
                for item in &payload.items.items {
                    self.write_value(&**item, &expected)?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Type descriptors

    fn write_type(&mut self, handle: &TypeHandle) -> Result<()> {
        if let Some(id) = self.context.id_for(handle.identity()) {
            return self.out.write_varuint(id);
        }
        let id = self.context.allocate_id();
        self.context.bind_identity(handle.identity(), id)?;
        self.context.register_type(id, handle.clone())?;
        self.out.write_varuint(id)?;

        let data = match handle {
            TypeHandle::Local(ty) => TypeData::describe(ty),
            TypeHandle::Wire(data) => data.clone(),
        };
        let extra = match handle {
            TypeHandle::Local(ty) => self.strategy_flags(ty),
            TypeHandle::Wire(_) => TypeDataFlags::empty(),
        };

        let word = pack_flags(data.flags() | extra, data.kind(), data.collection());
        self.out.write_varuint(word)?;
        if data.flags().contains(TypeDataFlags::HAS_NAME) {
            self.out.write_str(data.name())?;
            self.out.write_str(data.crate_name())?;
        }
        self.out.write_varuint(u64::from(data.array_rank()))?;
        self.out.write_varuint(u64::from(data.generic_index()))?;

        let Some(body) = data.body() else {
            return Err(Error::Malformed {
                what: "type descriptor",
                detail: "descriptor re-emitted before its body arrived".into(),
            });
        };
        self.out.write_varuint(body.generics.len() as u64)?;
        for generic in &body.generics {
            self.write_type(&TypeHandle::for_data(generic))?;
        }
        if data.flags().contains(TypeDataFlags::HAS_ELEMENT) {
            self.write_type_slot(body.element.as_ref())?;
        }
        if !self.options.contains(WriteOptions::SKIP_MEMBER_DATA) {
            if data.flags().contains(TypeDataFlags::HAS_BASE) {
                self.write_type_slot(body.base.as_ref())?;
            }
            self.out.write_varuint(body.members.len() as u64)?;
            for member in &body.members {
                self.out.write_str(Some(&member.name))?;
                self.write_type_slot(member.ty.as_ref())?;
            }
            match data.collection() {
                CollectionKind::TypedList => self.write_type_slot(body.collection_value.as_ref())?,
                CollectionKind::TypedMap => {
                    self.write_type_slot(body.collection_key.as_ref())?;
                    self.write_type_slot(body.collection_value.as_ref())?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// An absent slot is the null id.
    fn write_type_slot(&mut self, slot: Option<&Arc<TypeData>>) -> Result<()> {
        match slot {
            Some(data) => self.write_type(&TypeHandle::for_data(data)),
            None => self.out.write_varuint(NULL_ID),
        }
    }
}
