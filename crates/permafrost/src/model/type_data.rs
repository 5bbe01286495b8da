use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, OnceLock, PoisonError, RwLock};

use bitflags::bitflags;

use crate::error::{Error, Result};
use crate::model::{CollectionKind, PrimitiveKind, RuntimeType};

bitflags! {
    /// The boolean portion of a descriptor's packed flags word.
    ///
    /// Bit positions are part of the wire format and must not move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeDataFlags: u32 {
        /// Clear on the terminal "unsupported" marker only.
        const SUPPORTED = 1 << 0;
        const SEALED = 1 << 1;
        const REFERENCE = 1 << 2;
        const ARRAY = 1 << 3;
        const ENUM = 1 << 4;
        const NULLABLE = 1 << 5;
        const ABSTRACT = 1 << 6;
        const HAS_NAME = 1 << 7;
        const HAS_ELEMENT = 1 << 8;
        const HAS_BASE = 1 << 9;
        const GENERIC = 1 << 10;
        const GENERIC_PARAM = 1 << 11;
        /// Payload was produced by the custom save/load protocol.
        const CUSTOM = 1 << 12;
        /// Payload is a converter string.
        const CONVERTER = 1 << 13;
        /// Payload is a surrogate value.
        const SURROGATE = 1 << 14;
    }
}

/// The slots of a descriptor that may refer to other descriptors.
///
/// Split out of [`TypeData`] so a descriptor's header can be registered
/// in the identity context before its body is parsed. Cyclic type
/// graphs in the stream resolve against the already-registered header.
#[derive(Default)]
pub struct TypeDataBody {
    pub generics: Vec<Arc<TypeData>>,
    pub element: Option<Arc<TypeData>>,
    pub base: Option<Arc<TypeData>>,
    pub members: Vec<TypeDataMember>,
    pub collection_key: Option<Arc<TypeData>>,
    pub collection_value: Option<Arc<TypeData>>,
}

pub struct TypeDataMember {
    pub name: Box<str>,
    pub ty: Option<Arc<TypeData>>,
}

/// The wire-side description of a type.
///
/// Where [`RuntimeType`] describes a type this build knows,
/// `TypeData` describes a type a *stream* knows. The two meet in
/// [resolution](crate::model::resolve): each `TypeData` read from a
/// stream is matched against the local registry, and each local type
/// written to a stream is projected into a `TypeData` first.
///
/// Equality and hashing are structural over the header and identity
/// slots (flags, kinds, names, rank, generics, element). Members are
/// deliberately excluded: two revisions of the same type with
/// different member sets still denote the same type.
pub struct TypeData {
    flags: TypeDataFlags,
    kind: PrimitiveKind,
    collection: CollectionKind,
    name: Option<Box<str>>,
    crate_name: Option<Box<str>>,
    array_rank: u8,
    generic_index: u32,
    body: OnceLock<TypeDataBody>,
    /// Resolution cache. `Some(None)` means "looked up, nothing local".
    target: OnceLock<Option<&'static RuntimeType>>,
}

impl TypeData {
    pub fn new(
        flags: TypeDataFlags,
        kind: PrimitiveKind,
        collection: CollectionKind,
        name: Option<Box<str>>,
        crate_name: Option<Box<str>>,
        array_rank: u8,
        generic_index: u32,
    ) -> Self {
        Self {
            flags,
            kind,
            collection,
            name,
            crate_name,
            array_rank,
            generic_index,
            body: OnceLock::new(),
            target: OnceLock::new(),
        }
    }

    /// The terminal marker for a type the writing side itself could not
    /// describe. Carries no name and no body.
    pub fn unsupported() -> Arc<TypeData> {
        static MARKER: LazyLock<Arc<TypeData>> = LazyLock::new(|| {
            let data = TypeData::new(
                TypeDataFlags::empty(),
                PrimitiveKind::None,
                CollectionKind::None,
                None,
                None,
                0,
                0,
            );
            let _ = data.body.set(TypeDataBody::default());
            Arc::new(data)
        });
        MARKER.clone()
    }

    // -------------------------------------------------------------------------
    // Packed flags word

    const KIND_MASK: u64 = (1 << PrimitiveKind::BITS) - 1;
    const COLLECTION_MASK: u64 = (1 << CollectionKind::BITS) - 1;
    const FLAGS_SHIFT: u32 = 8;

    /// Packs kind, collection shape and flags into the single varint
    /// word that opens every descriptor block.
    pub fn pack_flags(&self) -> u64 {
        pack_flags(self.flags, self.kind, self.collection)
    }

    pub fn unpack_flags(word: u64) -> Result<(TypeDataFlags, PrimitiveKind, CollectionKind)> {
        let kind = PrimitiveKind::from_bits((word & Self::KIND_MASK) as u8).ok_or_else(|| {
            Error::Malformed {
                what: "type descriptor",
                detail: format!("unknown primitive kind {}", word & Self::KIND_MASK),
            }
        })?;
        let collection = CollectionKind::from_bits(
            ((word >> PrimitiveKind::BITS) & Self::COLLECTION_MASK) as u8,
        )
        .ok_or_else(|| Error::Malformed {
            what: "type descriptor",
            detail: format!(
                "unknown collection kind {}",
                (word >> PrimitiveKind::BITS) & Self::COLLECTION_MASK
            ),
        })?;
        let raw = (word >> Self::FLAGS_SHIFT) as u32;
        let flags = TypeDataFlags::from_bits(raw).ok_or_else(|| Error::Malformed {
            what: "type descriptor",
            detail: format!("unknown flag bits {raw:#x}"),
        })?;
        Ok((flags, kind, collection))
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn flags(&self) -> TypeDataFlags {
        self.flags
    }

    #[inline]
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    #[inline]
    pub fn collection(&self) -> CollectionKind {
        self.collection
    }

    /// The fully qualified path of the type, as the writer knew it.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn crate_name(&self) -> Option<&str> {
        self.crate_name.as_deref()
    }

    #[inline]
    pub fn array_rank(&self) -> u8 {
        self.array_rank
    }

    #[inline]
    pub fn generic_index(&self) -> u32 {
        self.generic_index
    }

    #[inline]
    pub fn is_supported(&self) -> bool {
        self.flags.contains(TypeDataFlags::SUPPORTED)
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeDataFlags::SEALED)
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.flags.contains(TypeDataFlags::REFERENCE)
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags.contains(TypeDataFlags::NULLABLE)
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        self.flags.contains(TypeDataFlags::ENUM)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.flags.contains(TypeDataFlags::ARRAY)
    }

    /// The body, if it has been attached yet. During a descriptor parse
    /// the header circulates body-less until the trailing slots arrive.
    #[inline]
    pub fn body(&self) -> Option<&TypeDataBody> {
        self.body.get()
    }

    /// Attaches the parsed body. A descriptor only ever gets one body.
    pub fn attach_body(&self, body: TypeDataBody) -> Result<()> {
        self.body.set(body).map_err(|_| Error::Malformed {
            what: "type descriptor",
            detail: "descriptor body attached twice".into(),
        })
    }

    pub(crate) fn cached_target(&self) -> Option<&Option<&'static RuntimeType>> {
        self.target.get()
    }

    pub(crate) fn cache_target(&self, target: Option<&'static RuntimeType>) {
        let _ = self.target.set(target);
    }

    // -------------------------------------------------------------------------
    // Projection from local types

    /// Projects a local type into its wire descriptor.
    ///
    /// Projections are memoized globally by [`TypeId`]: a type's
    /// descriptor tree is built once and shared by every writer. The
    /// memo entry is inserted before the body is built, so recursive
    /// member types close the cycle instead of recursing forever.
    pub fn describe(ty: &'static RuntimeType) -> Arc<TypeData> {
        static MEMO: LazyLock<RwLock<HashMap<TypeId, Arc<TypeData>>>> =
            LazyLock::new(|| RwLock::new(HashMap::new()));

        if let Some(data) = MEMO
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ty.type_id())
        {
            return data.clone();
        }

        let mut flags = TypeDataFlags::SUPPORTED | TypeDataFlags::HAS_NAME;
        if ty.is_sealed() {
            flags |= TypeDataFlags::SEALED;
        }
        if ty.is_reference() {
            flags |= TypeDataFlags::REFERENCE;
        }
        if ty.is_array() {
            flags |= TypeDataFlags::ARRAY;
        }
        if ty.is_enum() {
            flags |= TypeDataFlags::ENUM;
        }
        if ty.is_nullable() {
            flags |= TypeDataFlags::NULLABLE;
        }
        if ty.is_abstract() {
            flags |= TypeDataFlags::ABSTRACT;
        }
        if ty.element().is_some() {
            flags |= TypeDataFlags::HAS_ELEMENT;
        }
        if ty.base().is_some() {
            flags |= TypeDataFlags::HAS_BASE;
        }

        let header = Arc::new(TypeData::new(
            flags,
            ty.kind(),
            ty.collection(),
            Some(ty.path().into()),
            Some(ty.crate_name().into()),
            ty.array_rank(),
            0,
        ));
        header.cache_target(Some(ty));

        {
            let mut memo = MEMO.write().unwrap_or_else(PoisonError::into_inner);
            // Another thread may have finished the same projection while
            // this one built the header.
            if let Some(data) = memo.get(&ty.type_id()) {
                return data.clone();
            }
            memo.insert(ty.type_id(), header.clone());
        }

        let body = TypeDataBody {
            generics: Vec::new(),
            element: ty.element().map(Self::describe),
            base: ty.base().map(Self::describe),
            members: ty
                .members()
                .iter()
                .map(|m| TypeDataMember {
                    name: m.name.into(),
                    ty: Some(Self::describe((m.ty)())),
                })
                .collect(),
            collection_key: ty.collection_key().map(Self::describe),
            collection_value: ty.collection_value().map(Self::describe),
        };
        let _ = header.body.set(body);
        header
    }
}

/// Packs the three descriptor header fields into one varint word.
pub(crate) fn pack_flags(
    flags: TypeDataFlags,
    kind: PrimitiveKind,
    collection: CollectionKind,
) -> u64 {
    u64::from(kind.bits())
        | (u64::from(collection.bits()) << PrimitiveKind::BITS)
        | (u64::from(flags.bits()) << TypeData::FLAGS_SHIFT)
}

impl PartialEq for TypeData {
    fn eq(&self, other: &Self) -> bool {
        if self.flags != other.flags
            || self.kind != other.kind
            || self.collection != other.collection
            || self.name != other.name
            || self.crate_name != other.crate_name
            || self.array_rank != other.array_rank
            || self.generic_index != other.generic_index
        {
            return false;
        }
        let (a, b) = (self.body.get(), other.body.get());
        match (a, b) {
            (Some(a), Some(b)) => {
                a.element == b.element && a.generics == b.generics
            }
            _ => a.is_none() == b.is_none(),
        }
    }
}

impl Eq for TypeData {}

impl PartialEq for TypeDataMember {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty
    }
}

impl Hash for TypeData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flags.bits().hash(state);
        self.kind.bits().hash(state);
        self.collection.bits().hash(state);
        self.name.hash(state);
        self.crate_name.hash(state);
        self.array_rank.hash(state);
        self.generic_index.hash(state);
        if let Some(body) = self.body.get() {
            if let Some(element) = &body.element {
                element.hash(state);
            }
            for generic in &body.generics {
                generic.hash(state);
            }
        }
    }
}

impl fmt::Debug for TypeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeData")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("collection", &self.collection)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::statics::any_object;

    #[test]
    fn flags_word_round_trips() {
        let flags = TypeDataFlags::SUPPORTED
            | TypeDataFlags::REFERENCE
            | TypeDataFlags::HAS_NAME
            | TypeDataFlags::CUSTOM;
        let word = pack_flags(flags, PrimitiveKind::Decimal, CollectionKind::TypedMap);
        let (f, k, c) = TypeData::unpack_flags(word).unwrap();
        assert_eq!(f, flags);
        assert_eq!(k, PrimitiveKind::Decimal);
        assert_eq!(c, CollectionKind::TypedMap);
    }

    #[test]
    fn unknown_flag_bits_are_rejected() {
        let word = 1u64 << (TypeData::FLAGS_SHIFT + 31);
        assert!(matches!(
            TypeData::unpack_flags(word),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn describe_is_memoized() {
        let a = TypeData::describe(any_object());
        let b = TypeData::describe(any_object());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), Some("permafrost::object"));
        assert!(!a.is_sealed());
        assert!(a.is_reference());
    }

    #[test]
    fn unsupported_marker_has_no_name() {
        let marker = TypeData::unsupported();
        assert!(!marker.is_supported());
        assert!(marker.name().is_none());
    }
}
