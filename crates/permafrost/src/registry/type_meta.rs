use core::fmt;

use crate::model::RuntimeType;
use crate::reflection::Typed;
use crate::registry::{
    TypeTraitAfterRead, TypeTraitConstruct, TypeTraitConvert, TypeTraitCustom, TypeTraitSurrogate,
};

/// How a registered type's payload goes to the stream.
///
/// Exactly one strategy applies per type. When several customizations
/// are registered the strongest wins: a surrogate overrides a
/// converter, which overrides the custom protocol, which overrides
/// plain structural serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Structural,
    Surrogate,
    Converter,
    Custom,
}

/// Everything the registry knows about one type: its descriptor plus
/// the optional trait entries that change how it serializes.
pub struct TypeMeta {
    ty: &'static RuntimeType,
    construct: Option<TypeTraitConstruct>,
    surrogate: Option<TypeTraitSurrogate>,
    converter: Option<TypeTraitConvert>,
    custom: Option<TypeTraitCustom>,
    after_read: Option<TypeTraitAfterRead>,
}

impl TypeMeta {
    pub fn of<T: Typed>() -> Self {
        Self {
            ty: T::runtime_type(),
            construct: None,
            surrogate: None,
            converter: None,
            custom: None,
            after_read: None,
        }
    }

    pub fn with_construct(mut self, construct: TypeTraitConstruct) -> Self {
        self.construct = Some(construct);
        self
    }

    pub fn with_surrogate(mut self, surrogate: TypeTraitSurrogate) -> Self {
        self.surrogate = Some(surrogate);
        self
    }

    pub fn with_converter(mut self, converter: TypeTraitConvert) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn with_custom(mut self, custom: TypeTraitCustom) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn with_after_read(mut self, after_read: TypeTraitAfterRead) -> Self {
        self.after_read = Some(after_read);
        self
    }

    pub(crate) fn set_surrogate(&mut self, surrogate: TypeTraitSurrogate) {
        self.surrogate = Some(surrogate);
    }

    pub(crate) fn set_converter(&mut self, converter: TypeTraitConvert) {
        self.converter = Some(converter);
    }

    pub(crate) fn set_custom(&mut self, custom: TypeTraitCustom) {
        self.custom = Some(custom);
    }

    pub(crate) fn set_after_read(&mut self, after_read: TypeTraitAfterRead) {
        self.after_read = Some(after_read);
    }

    #[inline]
    pub fn ty(&self) -> &'static RuntimeType {
        self.ty
    }

    pub fn strategy(&self) -> Strategy {
        if self.surrogate.is_some() {
            Strategy::Surrogate
        } else if self.converter.is_some() {
            Strategy::Converter
        } else if self.custom.is_some() {
            Strategy::Custom
        } else {
            Strategy::Structural
        }
    }

    pub fn construct(&self) -> Option<&TypeTraitConstruct> {
        self.construct.as_ref()
    }

    pub fn surrogate(&self) -> Option<&TypeTraitSurrogate> {
        self.surrogate.as_ref()
    }

    pub fn converter(&self) -> Option<&TypeTraitConvert> {
        self.converter.as_ref()
    }

    pub fn custom(&self) -> Option<&TypeTraitCustom> {
        self.custom.as_ref()
    }

    pub fn after_read(&self) -> Option<&TypeTraitAfterRead> {
        self.after_read.as_ref()
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("ty", &self.ty.path())
            .field("strategy", &self.strategy())
            .field("construct", &self.construct.is_some())
            .field("after_read", &self.after_read.is_some())
            .finish()
    }
}
