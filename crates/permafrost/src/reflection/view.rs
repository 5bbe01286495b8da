use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Error;
use crate::reflection::Reflect;

/// A borrowed primitive payload.
///
/// Carries the value itself so codecs never need a downcast to write
/// primitive data.
#[derive(Debug, Clone, Copy)]
pub enum PrimitiveRef<'a> {
    Unit,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(&'a str),
    Bytes(&'a [u8]),
    Guid(Uuid),
}

/// A value classified for reading.
pub enum ValueRef<'a> {
    Primitive(PrimitiveRef<'a>),
    Nullable(&'a dyn NullableValue),
    Array(&'a dyn Sequence),
    Enum(&'a dyn EnumValue),
    Struct(&'a dyn Struct),
    Reference(&'a dyn Referential),
}

/// A value classified for mutation.
pub enum ValueMut<'a> {
    /// Primitives mutate through [`Reflect::assign`], so the mutable
    /// view only needs the value itself.
    Primitive(&'a mut dyn Reflect),
    Nullable(&'a mut dyn NullableValue),
    Array(&'a mut dyn Sequence),
    Enum(&'a mut dyn EnumValue),
    Struct(&'a mut dyn Struct),
    Reference(&'a mut dyn Referential),
}

// -----------------------------------------------------------------------------
// Struct

/// Named-member access, plus the optional collection facade.
///
/// Every object value implements this, including pure collections
/// (which expose zero members and a facade) and placeholder values.
pub trait Struct: Reflect {
    fn member(&self, name: &str) -> Option<&dyn Reflect>;
    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Reflect>;
    fn member_at(&self, index: usize) -> Option<&dyn Reflect>;
    fn member_at_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
    fn name_at(&self, index: usize) -> Option<&str>;
    fn member_len(&self) -> usize;

    /// The collection contents written after the members, if this type
    /// declares a collection shape.
    fn collection(&self) -> Option<CollectionRef<'_>> {
        None
    }

    fn collection_mut(&mut self) -> Option<CollectionMut<'_>> {
        None
    }
}

/// Iterates the members of a [`Struct`] in canonical order.
pub struct MemberIter<'a> {
    value: &'a dyn Struct,
    index: usize,
}

impl<'a> MemberIter<'a> {
    pub fn new(value: &'a dyn Struct) -> Self {
        Self { value, index: 0 }
    }
}

impl<'a> Iterator for MemberIter<'a> {
    type Item = (&'a str, &'a dyn Reflect);

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.value.name_at(self.index)?;
        let member = self.value.member_at(self.index)?;
        self.index += 1;
        Some((name, member))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.value.member_len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MemberIter<'_> {}

// -----------------------------------------------------------------------------
// Collection facades

/// Sequential collection operations.
pub trait ListOps {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<&dyn Reflect>;

    /// Appends an element. The box comes back on a type mismatch so
    /// the caller can route it to the lost-data channel.
    fn push_boxed(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;

    fn clear(&mut self);

    /// Read-only collections are skipped wholesale during repopulation.
    fn is_read_only(&self) -> bool {
        false
    }
}

/// Keyed collection operations.
pub trait MapOps {
    fn len(&self) -> usize;

    /// Visits every entry in iteration order. The callback's error
    /// aborts the walk, which lets codec errors surface through
    /// borrowed iteration.
    fn try_for_each_entry(
        &self,
        f: &mut dyn FnMut(&dyn Reflect, &dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error>;

    fn insert_boxed(
        &mut self,
        key: Box<dyn Reflect>,
        value: Box<dyn Reflect>,
    ) -> Result<(), (Box<dyn Reflect>, Box<dyn Reflect>)>;

    fn clear(&mut self);

    fn is_read_only(&self) -> bool {
        false
    }
}

pub enum CollectionRef<'a> {
    List(&'a dyn ListOps),
    Map(&'a dyn MapOps),
}

pub enum CollectionMut<'a> {
    List(&'a mut dyn ListOps),
    Map(&'a mut dyn MapOps),
}

// -----------------------------------------------------------------------------
// Other payload shapes

/// A fixed-length inline array. Length is part of the type.
pub trait Sequence: Reflect {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Option<&dyn Reflect>;
    fn get_mut(&mut self, index: usize) -> Option<&mut dyn Reflect>;
}

/// An optional slot.
pub trait NullableValue: Reflect {
    fn value(&self) -> Option<&dyn Reflect>;
    fn value_mut(&mut self) -> Option<&mut dyn Reflect>;
    fn clear(&mut self);
    fn set_boxed(&mut self, value: Box<dyn Reflect>) -> Result<(), Box<dyn Reflect>>;
}

/// An enumeration value, serialized as its discriminant.
pub trait EnumValue: Reflect {
    fn discriminant(&self) -> i64;

    /// Switches to the variant with the given discriminant. Returns
    /// `false` when no variant carries it, leaving the value untouched.
    fn set_discriminant(&mut self, discriminant: i64) -> bool;

    fn variant_name(&self) -> Option<&'static str>;
}

/// An identity-tracked handle to another value.
pub trait Referential: Reflect {
    /// A stable address for identity tracking, or `None` when the
    /// handle has no shareable identity of its own.
    fn identity(&self) -> Option<usize>;

    /// Runs `f` against the referenced value.
    fn with_target(
        &self,
        f: &mut dyn FnMut(&dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error>;

    fn with_target_mut(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Reflect) -> Result<(), Error>,
    ) -> Result<(), Error>;
}
