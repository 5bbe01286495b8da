//! One-call entry points over [`Writer`](crate::ser::Writer) and
//! [`Reader`](crate::de::Reader).

use crate::de::Reader;
use crate::error::{Error, Result};
use crate::reflection::{Reflect, Typed};
use crate::registry::TypeRegistry;
use crate::ser::Writer;
use crate::shared::Shared;
use crate::wire::{BinaryDecoder, BinaryEncoder, TextDecoder, TextEncoder, WriteOptions};

/// Serializes one value to the binary format.
pub fn to_bytes(value: &dyn Reflect, registry: &TypeRegistry) -> Result<Vec<u8>> {
    to_bytes_with(value, registry, WriteOptions::empty())
}

pub fn to_bytes_with(
    value: &dyn Reflect,
    registry: &TypeRegistry,
    options: WriteOptions,
) -> Result<Vec<u8>> {
    let mut writer = Writer::new(BinaryEncoder::new(Vec::new()), registry)?.with_options(options);
    writer.write(value)?;
    Ok(writer.into_encoder().into_inner())
}

/// Deserializes one value from the binary format.
///
/// The result is whatever the stream carried: the local type when it
/// resolved, a [`Shared`] handle when the value is identity-tracked, or
/// a placeholder when nothing local matched.
pub fn from_bytes(bytes: &[u8], registry: &TypeRegistry) -> Result<Box<dyn Reflect>> {
    let mut reader = Reader::new(BinaryDecoder::new(bytes), registry)?;
    reader.read()
}

/// Deserializes one value and unwraps it as `T`, accepting both plain
/// values and sole-owner [`Shared`] handles.
pub fn from_bytes_as<T: Reflect + Typed>(bytes: &[u8], registry: &TypeRegistry) -> Result<T> {
    unwrap_as(from_bytes(bytes, registry)?)
}

/// Deserializes one value into an existing instance, repopulating it in
/// place where the types line up.
pub fn read_into(bytes: &[u8], registry: &TypeRegistry, destination: &mut dyn Reflect) -> Result<()> {
    let mut reader = Reader::new(BinaryDecoder::new(bytes), registry)?;
    reader.read_into(destination)
}

/// Serializes one value to the text format. Token-for-token equivalent
/// to the binary stream, readable in diffs and test fixtures.
pub fn to_text(value: &dyn Reflect, registry: &TypeRegistry) -> Result<String> {
    to_text_with(value, registry, WriteOptions::empty())
}

pub fn to_text_with(
    value: &dyn Reflect,
    registry: &TypeRegistry,
    options: WriteOptions,
) -> Result<String> {
    let mut writer = Writer::new(TextEncoder::new(Vec::new()), registry)?.with_options(options);
    writer.write(value)?;
    String::from_utf8(writer.into_encoder().into_inner()).map_err(|_| Error::Malformed {
        what: "text stream",
        detail: "encoder produced invalid utf-8".into(),
    })
}

/// Deserializes one value from the text format.
pub fn from_text(text: &str, registry: &TypeRegistry) -> Result<Box<dyn Reflect>> {
    let mut reader = Reader::new(TextDecoder::new(text), registry)?;
    reader.read()
}

pub fn from_text_as<T: Reflect + Typed>(text: &str, registry: &TypeRegistry) -> Result<T> {
    unwrap_as(from_text(text, registry)?)
}

/// Deep-copies a value by running it through the stream machinery.
/// Aliased handles inside the value come back aliased in the copy.
pub fn clone_value(value: &dyn Reflect, registry: &TypeRegistry) -> Result<Box<dyn Reflect>> {
    clone_value_with(value, registry, WriteOptions::empty())
}

pub fn clone_value_with(
    value: &dyn Reflect,
    registry: &TypeRegistry,
    options: WriteOptions,
) -> Result<Box<dyn Reflect>> {
    let bytes = to_bytes_with(value, registry, options)?;
    from_bytes(&bytes, registry)
}

fn unwrap_as<T: Reflect + Typed>(value: Box<dyn Reflect>) -> Result<T> {
    match value.take::<T>() {
        Ok(value) => Ok(value),
        Err(value) => match value.take::<Shared<T>>() {
            Ok(shared) => shared.try_unwrap().map_err(|_| Error::Conversion {
                type_path: <T as Typed>::runtime_type().path().to_owned(),
                message: "value is still aliased by another handle".to_owned(),
            }),
            Err(value) => Err(Error::Conversion {
                type_path: <T as Typed>::runtime_type().path().to_owned(),
                message: format!("stream carried `{}` instead", value.runtime_type().path()),
            }),
        },
    }
}
