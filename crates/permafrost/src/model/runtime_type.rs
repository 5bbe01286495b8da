use core::any::TypeId;
use core::fmt;

use bitflags::bitflags;

use crate::model::{CollectionKind, PrimitiveKind};

/// A late-bound link to another type's descriptor.
///
/// Member and element slots store a function pointer instead of a
/// reference so that mutually recursive types can describe each other
/// without initialization-order cycles. The thunk is only invoked when
/// the link is actually followed.
pub type TypeRef = fn() -> &'static RuntimeType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TypeFlags: u8 {
        const SEALED = 1 << 0;
        const REFERENCE = 1 << 1;
        const ARRAY = 1 << 2;
        const ENUM = 1 << 3;
        const NULLABLE = 1 << 4;
        const ABSTRACT = 1 << 5;
    }
}

/// A named member of a structural type, in canonical (declaration) order.
#[derive(Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    pub ty: TypeRef,
}

/// One variant of an enumeration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: &'static str,
    pub discriminant: i64,
}

/// The static description of a local Rust type.
///
/// A `RuntimeType` is built once per type (interned through
/// [`TypeCell`](crate::model::TypeCell) or
/// [`GenericTypeCell`](crate::model::GenericTypeCell)) and handed out
/// as a `&'static` reference for the rest of the process lifetime.
/// It answers every structural question the engine asks while walking
/// a value: what kind of payload it carries, which members it has and
/// in what order, whether it is identity-tracked, and what collection
/// facade it exposes.
///
/// Its wire-side twin is [`TypeData`](crate::model::TypeData), which
/// describes types read from a stream that may not exist locally.
pub struct RuntimeType {
    type_id: TypeId,
    path: &'static str,
    name: &'static str,
    crate_name: &'static str,
    kind: PrimitiveKind,
    flags: TypeFlags,
    array_rank: u8,
    array_len: Option<usize>,
    element: Option<TypeRef>,
    collection: CollectionKind,
    collection_key: Option<TypeRef>,
    collection_value: Option<TypeRef>,
    members: Vec<Member>,
    variants: Vec<EnumVariant>,
    base: Option<TypeRef>,
}

impl RuntimeType {
    fn new<T: ?Sized + 'static>(
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
        kind: PrimitiveKind,
        flags: TypeFlags,
    ) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            path,
            name,
            crate_name,
            kind,
            flags,
            array_rank: 0,
            array_len: None,
            element: None,
            collection: CollectionKind::None,
            collection_key: None,
            collection_value: None,
            members: Vec::new(),
            variants: Vec::new(),
            base: None,
        }
    }

    /// A sealed primitive with a fixed payload encoding.
    pub fn primitive<T: ?Sized + 'static>(
        kind: PrimitiveKind,
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
    ) -> Self {
        debug_assert!(kind.is_primitive());
        Self::new::<T>(path, name, crate_name, kind, TypeFlags::SEALED)
    }

    /// A structural object type. Sealed and by-value until the builder
    /// methods say otherwise.
    pub fn object<T: ?Sized + 'static>(
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
    ) -> Self {
        Self::new::<T>(path, name, crate_name, PrimitiveKind::None, TypeFlags::SEALED)
    }

    /// An enumeration whose payload is a single varint discriminant.
    pub fn enumeration<T: ?Sized + 'static>(
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
        variants: Vec<EnumVariant>,
    ) -> Self {
        let mut ty = Self::new::<T>(
            path,
            name,
            crate_name,
            PrimitiveKind::None,
            TypeFlags::SEALED | TypeFlags::ENUM,
        );
        ty.variants = variants;
        ty
    }

    /// A nullable wrapper around `element`.
    pub fn nullable<T: ?Sized + 'static>(
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
        element: TypeRef,
    ) -> Self {
        let mut ty = Self::new::<T>(
            path,
            name,
            crate_name,
            PrimitiveKind::None,
            TypeFlags::SEALED | TypeFlags::NULLABLE,
        );
        ty.element = Some(element);
        ty
    }

    /// A fixed-length inline array of `element`.
    pub fn array<T: ?Sized + 'static>(
        path: &'static str,
        name: &'static str,
        crate_name: &'static str,
        element: TypeRef,
        len: usize,
    ) -> Self {
        let mut ty = Self::new::<T>(
            path,
            name,
            crate_name,
            PrimitiveKind::None,
            TypeFlags::SEALED | TypeFlags::ARRAY,
        );
        ty.array_rank = 1;
        ty.array_len = Some(len);
        ty.element = Some(element);
        ty
    }

    // -------------------------------------------------------------------------
    // Builder methods

    pub fn with_members(mut self, members: Vec<Member>) -> Self {
        self.members = members;
        self
    }

    pub fn with_collection(
        mut self,
        kind: CollectionKind,
        key: Option<TypeRef>,
        value: Option<TypeRef>,
    ) -> Self {
        self.collection = kind;
        self.collection_key = key;
        self.collection_value = value;
        self
    }

    /// Sets the element slot. Reference wrappers point this at their
    /// target type so expected-type checks can look through them.
    pub fn with_element(mut self, element: TypeRef) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_base(mut self, base: TypeRef) -> Self {
        self.base = Some(base);
        self
    }

    /// Marks the type as open: streams carry its full descriptor so a
    /// reader can survive schema drift.
    pub fn unsealed(mut self) -> Self {
        self.flags.remove(TypeFlags::SEALED);
        self
    }

    /// Marks the type as identity-tracked. Instances are written once
    /// and back-referenced by id afterwards.
    pub fn as_reference(mut self) -> Self {
        self.flags.insert(TypeFlags::REFERENCE);
        self
    }

    /// Marks the type as abstract: it stands for "any object of this
    /// shape" and accepts any concrete descriptor during resolution.
    pub fn as_abstract(mut self) -> Self {
        self.flags.insert(TypeFlags::ABSTRACT);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The fully qualified path, e.g. `my_game::save::Inventory`.
    #[inline]
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// The bare type name without module qualifiers.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn crate_name(&self) -> &'static str {
        self.crate_name
    }

    #[inline]
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeFlags::SEALED)
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.flags.contains(TypeFlags::REFERENCE)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.flags.contains(TypeFlags::ARRAY)
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        self.flags.contains(TypeFlags::ENUM)
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.flags.contains(TypeFlags::NULLABLE)
    }

    #[inline]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeFlags::ABSTRACT)
    }

    #[inline]
    pub fn array_rank(&self) -> u8 {
        self.array_rank
    }

    #[inline]
    pub fn array_len(&self) -> Option<usize> {
        self.array_len
    }

    /// Element descriptor of a nullable or array type.
    #[inline]
    pub fn element(&self) -> Option<&'static RuntimeType> {
        self.element.map(|thunk| thunk())
    }

    #[inline]
    pub fn collection(&self) -> CollectionKind {
        self.collection
    }

    #[inline]
    pub fn collection_key(&self) -> Option<&'static RuntimeType> {
        self.collection_key.map(|thunk| thunk())
    }

    #[inline]
    pub fn collection_value(&self) -> Option<&'static RuntimeType> {
        self.collection_value.map(|thunk| thunk())
    }

    /// Members in canonical order. This order is the write order.
    #[inline]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member_named(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    #[inline]
    pub fn variants(&self) -> &[EnumVariant] {
        &self.variants
    }

    pub fn variant_for(&self, discriminant: i64) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.discriminant == discriminant)
    }

    #[inline]
    pub fn base(&self) -> Option<&'static RuntimeType> {
        self.base.map(|thunk| thunk())
    }

    /// Whether a value of type `other` may appear where this type is
    /// expected. Abstract types accept everything, and reference
    /// wrappers accept whatever their target accepts.
    pub fn accepts(&self, other: &RuntimeType) -> bool {
        if self.is_abstract() || self.type_id == other.type_id {
            return true;
        }
        if self.is_reference()
            && let Some(element) = self.element()
        {
            return element.accepts(other);
        }
        false
    }
}

impl fmt::Debug for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeType")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("collection", &self.collection)
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("ty", &(self.ty)().path())
            .finish()
    }
}
