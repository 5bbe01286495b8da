use crate::dynamic::UnknownObject;
use crate::model::{CollectionKind, RuntimeType, TypeCell, TypeData};
use crate::reflection::Reflect;

mod markers {
    pub enum AnyValue {}
    pub enum AnyNullable {}
    pub enum AnyList {}
    pub enum AnyMap {}
}

/// The abstract "any object" type: the expected type of every root
/// value and of untyped member slots. Accepts any concrete descriptor
/// during resolution.
pub fn any_object() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<dyn Reflect>("permafrost::object", "object", "permafrost")
            .unsealed()
            .as_reference()
            .as_abstract()
    })
}

/// The by-value counterpart of [`any_object`]: metadata goes to the
/// stream but no identity id does. Surrogate and property-bag payloads
/// use this slot, so they come back as plain values rather than shared
/// handles.
pub fn any_value() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<markers::AnyValue>("permafrost::value", "value", "permafrost")
            .unsealed()
            .as_abstract()
    })
}

/// The type of type descriptors themselves. Descriptor blocks are
/// identity-tracked like any other reference value.
pub fn type_descriptor() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<TypeData>("permafrost::type", "type", "permafrost").as_reference()
    })
}

/// A nullable slot holding any object.
pub fn nullable_any() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::nullable::<markers::AnyNullable>(
            "permafrost::nullable",
            "nullable",
            "permafrost",
            any_object,
        )
    })
}

/// An untyped list: elements are written as any-object values.
pub fn list_any() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<markers::AnyList>("permafrost::list", "list", "permafrost")
            .with_collection(CollectionKind::List, None, None)
            .as_reference()
    })
}

/// An untyped map: keys and values are written as any-object values.
pub fn map_any() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<markers::AnyMap>("permafrost::map", "map", "permafrost")
            .with_collection(CollectionKind::Map, None, None)
            .as_reference()
    })
}

/// The local stand-in for stream types that could not be resolved.
/// Carries the foreign descriptor so the value round-trips losslessly.
pub fn unknown_object() -> &'static RuntimeType {
    static CELL: TypeCell = TypeCell::new();
    CELL.get_or_init(|| {
        RuntimeType::object::<UnknownObject>("permafrost::unknown", "unknown", "permafrost")
            .unsealed()
            .as_reference()
    })
}
