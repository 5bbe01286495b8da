use core::fmt;

// -----------------------------------------------------------------------------
// PrimitiveKind

/// The primitive classification of a type.
///
/// Every type the engine can describe carries exactly one `PrimitiveKind`.
/// [`None`](PrimitiveKind::None) marks non-primitive types (objects,
/// collections, references); every other variant has a fixed payload
/// encoding owned by the [codec contract](crate::wire).
///
/// The discriminant values are part of the wire format: they are packed
/// into the low five bits of the [`TypeData`](crate::model::TypeData)
/// flags word and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrimitiveKind {
    None = 0,
    Unit = 1,
    Bool = 2,
    Char = 3,
    I8 = 4,
    I16 = 5,
    I32 = 6,
    I64 = 7,
    U8 = 8,
    U16 = 9,
    U32 = 10,
    U64 = 11,
    F32 = 12,
    F64 = 13,
    Decimal = 14,
    Str = 15,
    Bytes = 16,
    Guid = 17,
}

impl PrimitiveKind {
    /// Number of bits the kind occupies in the packed flags word.
    pub const BITS: u32 = 5;

    /// Returns the wire value of this kind.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Reconstructs a kind from its wire value.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Self::None,
            1 => Self::Unit,
            2 => Self::Bool,
            3 => Self::Char,
            4 => Self::I8,
            5 => Self::I16,
            6 => Self::I32,
            7 => Self::I64,
            8 => Self::U8,
            9 => Self::U16,
            10 => Self::U32,
            11 => Self::U64,
            12 => Self::F32,
            13 => Self::F64,
            14 => Self::Decimal,
            15 => Self::Str,
            16 => Self::Bytes,
            17 => Self::Guid,
            _ => return None,
        })
    }

    /// Whether this kind denotes an actual primitive payload.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.pad("None"),
            Self::Unit => f.pad("Unit"),
            Self::Bool => f.pad("Bool"),
            Self::Char => f.pad("Char"),
            Self::I8 => f.pad("I8"),
            Self::I16 => f.pad("I16"),
            Self::I32 => f.pad("I32"),
            Self::I64 => f.pad("I64"),
            Self::U8 => f.pad("U8"),
            Self::U16 => f.pad("U16"),
            Self::U32 => f.pad("U32"),
            Self::U64 => f.pad("U64"),
            Self::F32 => f.pad("F32"),
            Self::F64 => f.pad("F64"),
            Self::Decimal => f.pad("Decimal"),
            Self::Str => f.pad("Str"),
            Self::Bytes => f.pad("Bytes"),
            Self::Guid => f.pad("Guid"),
        }
    }
}

// -----------------------------------------------------------------------------
// CollectionKind

/// The collection facade a type exposes, if any.
///
/// A type has at most one collection shape, fixed at descriptor
/// construction. The typed variants carry element descriptors in the
/// collection slots of the [`RuntimeType`](crate::model::RuntimeType);
/// the untyped variants fall back to the any-object descriptor for
/// their elements.
///
/// The discriminant values live in bits 5..8 of the packed flags word
/// and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CollectionKind {
    None = 0,
    List = 1,
    TypedList = 2,
    Map = 3,
    TypedMap = 4,
}

impl CollectionKind {
    /// Number of bits the kind occupies in the packed flags word.
    pub const BITS: u32 = 3;

    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits {
            0 => Self::None,
            1 => Self::List,
            2 => Self::TypedList,
            3 => Self::Map,
            4 => Self::TypedMap,
            _ => return None,
        })
    }

    /// Whether the type serializes collection contents after its members.
    #[inline]
    pub const fn is_collection(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Whether elements are key/value pairs rather than single items.
    #[inline]
    pub const fn is_map(self) -> bool {
        matches!(self, Self::Map | Self::TypedMap)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.pad("None"),
            Self::List => f.pad("List"),
            Self::TypedList => f.pad("TypedList"),
            Self::Map => f.pad("Map"),
            Self::TypedMap => f.pad("TypedMap"),
        }
    }
}
