use core::fmt::Display;
use core::str::FromStr;

use crate::dynamic::PropertyBag;
use crate::error::Error;
use crate::model::TypeRef;
use crate::reflection::{Reflect, Typed};
use crate::registry::{TypeMeta, TypeRegistry};
use crate::shared::Shared;

/// Builds a registry trait entry for a concrete type.
///
/// Each `TypeTrait*` struct implements this for the types that qualify,
/// capturing monomorphized function pointers that operate through
/// `dyn Reflect`.
pub trait FromType<T> {
    fn from_type() -> Self;
}

/// A type the engine can fully describe and register.
///
/// Derived by `#[derive(Reflect)]`. [`type_meta`](Describe::type_meta)
/// produces the registry entry; overriding
/// [`register_dependencies`](Describe::register_dependencies) pulls in
/// member types so registering a root registers its whole closure.
pub trait Describe: Typed + Reflect {
    fn type_meta() -> TypeMeta;

    fn register_dependencies(_registry: &mut TypeRegistry) {}
}

// -----------------------------------------------------------------------------
// Construction

/// Creates default instances for the reader to populate.
pub struct TypeTraitConstruct {
    /// A fresh default value.
    pub create: fn() -> Box<dyn Reflect>,
    /// A fresh default value behind a [`Shared`] handle, for
    /// identity-tracked stream values landing in untyped slots.
    pub create_shared: fn() -> Box<dyn Reflect>,
}

impl<T: Reflect + Typed + Default> FromType<T> for TypeTraitConstruct {
    fn from_type() -> Self {
        Self {
            create: || Box::new(T::default()),
            create_shared: || Box::new(Shared::new(T::default())),
        }
    }
}

// -----------------------------------------------------------------------------
// Surrogates

/// Swaps a type for a stand-in at the stream boundary.
///
/// The surrogate value is serialized in place of the original; reading
/// runs the reverse conversion. Built through
/// [`TypeRegistry::register_surrogate`].
pub struct TypeTraitSurrogate {
    surrogate_type: TypeRef,
    to: Box<dyn Fn(&dyn Reflect) -> Result<Box<dyn Reflect>, Error> + Send + Sync>,
    from: Box<dyn Fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Error> + Send + Sync>,
}

impl TypeTraitSurrogate {
    pub fn new<T, S>(to: fn(&T) -> S, from: fn(S) -> T) -> Self
    where
        T: Reflect + Typed,
        S: Reflect + Typed,
    {
        Self {
            surrogate_type: <S as Typed>::runtime_type,
            to: Box::new(move |value| {
                let source = value.downcast_ref::<T>().ok_or_else(|| Error::Conversion {
                    type_path: <T as Typed>::runtime_type().path().to_owned(),
                    message: "surrogate applied to a different type".to_owned(),
                })?;
                Ok(Box::new(to(source)) as Box<dyn Reflect>)
            }),
            from: Box::new(move |value| match value.take::<S>() {
                Ok(surrogate) => Ok(Box::new(from(surrogate)) as Box<dyn Reflect>),
                Err(_) => Err(Error::Conversion {
                    type_path: <T as Typed>::runtime_type().path().to_owned(),
                    message: format!(
                        "stream did not carry a `{}` surrogate",
                        <S as Typed>::runtime_type().path()
                    ),
                }),
            }),
        }
    }

    pub fn surrogate_type(&self) -> TypeRef {
        self.surrogate_type
    }

    pub fn to_surrogate(&self, value: &dyn Reflect) -> Result<Box<dyn Reflect>, Error> {
        (self.to)(value)
    }

    pub fn from_surrogate(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>, Error> {
        (self.from)(value)
    }
}

// -----------------------------------------------------------------------------
// Converters

/// Serializes a type as its string form.
///
/// Any type that is `Display + FromStr` qualifies. The payload becomes
/// a single string, which readers without the type keep as text.
pub struct TypeTraitConvert {
    pub to_text: fn(&dyn Reflect) -> Result<String, Error>,
    pub from_text: fn(&str) -> Result<Box<dyn Reflect>, Error>,
}

impl<T> FromType<T> for TypeTraitConvert
where
    T: Reflect + Typed + Display + FromStr,
    T::Err: Display,
{
    fn from_type() -> Self {
        Self {
            to_text: |value| {
                let source = value.downcast_ref::<T>().ok_or_else(|| Error::Conversion {
                    type_path: <T as Typed>::runtime_type().path().to_owned(),
                    message: "converter applied to a different type".to_owned(),
                })?;
                Ok(source.to_string())
            },
            from_text: |text| match text.parse::<T>() {
                Ok(value) => Ok(Box::new(value) as Box<dyn Reflect>),
                Err(error) => Err(Error::Conversion {
                    type_path: <T as Typed>::runtime_type().path().to_owned(),
                    message: error.to_string(),
                }),
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Custom protocol

/// Hand-written serialization through a [`PropertyBag`].
///
/// For types whose structure should not go to the stream as-is. `save`
/// decides what the stream sees; `load` rebuilds the value from it.
/// Bags survive in readers that do not know the type.
pub trait CustomSerialize: Reflect + Sized {
    fn save(&self, bag: &mut PropertyBag) -> Result<(), Error>;
    fn load(bag: &mut PropertyBag) -> Result<Self, Error>;
}

pub struct TypeTraitCustom {
    pub save: fn(&dyn Reflect, &mut PropertyBag) -> Result<(), Error>,
    pub load: fn(&mut PropertyBag) -> Result<Box<dyn Reflect>, Error>,
}

impl<T: CustomSerialize + Typed> FromType<T> for TypeTraitCustom {
    fn from_type() -> Self {
        Self {
            save: |value, bag| {
                let source = value.downcast_ref::<T>().ok_or_else(|| Error::Conversion {
                    type_path: <T as Typed>::runtime_type().path().to_owned(),
                    message: "custom protocol applied to a different type".to_owned(),
                })?;
                source.save(bag)
            },
            load: |bag| Ok(Box::new(T::load(bag)?) as Box<dyn Reflect>),
        }
    }
}

// -----------------------------------------------------------------------------
// After-read notification

/// A hook that runs once a value and everything it references have
/// been read. Used to rebuild derived state.
pub trait AfterRead {
    fn after_read(&mut self);
}

pub struct TypeTraitAfterRead {
    pub notify: fn(&mut dyn Reflect),
}

impl<T: AfterRead + Reflect> FromType<T> for TypeTraitAfterRead {
    fn from_type() -> Self {
        Self {
            notify: |value| {
                if let Some(target) = value.downcast_mut::<T>() {
                    target.after_read();
                }
            },
        }
    }
}
