//! The codec contract and its binary and text implementations.
//!
//! Codecs own primitive payloads only. Everything structural (ids,
//! descriptors, member order) is the serializer's business and goes
//! through the varint methods.

mod binary;
mod text;

pub use binary::{BinaryDecoder, BinaryEncoder};
pub use text::{TextDecoder, TextEncoder};

use bitflags::bitflags;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;

/// The stream format version written at the head of every stream.
pub const FORMAT_VERSION: u64 = 0x0102;

bitflags! {
    /// Per-write behavior switches, recorded in the stream so readers
    /// can tell how the data was produced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WriteOptions: u32 {
        /// Serialize structurally even where a custom protocol exists.
        const IGNORE_CUSTOM = 1 << 0;
        /// Serialize structurally even where a converter exists.
        const IGNORE_CONVERTER = 1 << 1;
        /// Omit type metadata. Streams shrink, but only a reader with
        /// identical types can decode them.
        const SKIP_METADATA = 1 << 2;
        /// Write descriptor headers without member lists.
        const SKIP_MEMBER_DATA = 1 << 3;
    }
}

/// Writes primitive payloads.
pub trait Encoder {
    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_char(&mut self, value: char) -> Result<()>;
    fn write_i8(&mut self, value: i8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_u8(&mut self, value: u8) -> Result<()>;
    fn write_u16(&mut self, value: u16) -> Result<()>;
    fn write_u32(&mut self, value: u32) -> Result<()>;
    fn write_u64(&mut self, value: u64) -> Result<()>;
    fn write_f32(&mut self, value: f32) -> Result<()>;
    fn write_f64(&mut self, value: f64) -> Result<()>;
    fn write_decimal(&mut self, value: Decimal) -> Result<()>;
    fn write_guid(&mut self, value: Uuid) -> Result<()>;
    fn write_str(&mut self, value: Option<&str>) -> Result<()>;
    fn write_bytes(&mut self, value: Option<&[u8]>) -> Result<()>;
    fn write_varuint(&mut self, value: u64) -> Result<()>;
    fn write_varint(&mut self, value: i64) -> Result<()>;
    fn write_varuint_opt(&mut self, value: Option<u64>) -> Result<()>;
    fn write_varint_opt(&mut self, value: Option<i64>) -> Result<()>;
}

/// Reads primitive payloads. Each call states the expected type, so
/// codecs never need self-describing payloads.
pub trait Decoder {
    fn read_bool(&mut self) -> Result<bool>;
    fn read_char(&mut self) -> Result<char>;
    fn read_i8(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_u8(&mut self) -> Result<u8>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_u64(&mut self) -> Result<u64>;
    fn read_f32(&mut self) -> Result<f32>;
    fn read_f64(&mut self) -> Result<f64>;
    fn read_decimal(&mut self) -> Result<Decimal>;
    fn read_guid(&mut self) -> Result<Uuid>;
    fn read_str(&mut self) -> Result<Option<String>>;
    fn read_bytes(&mut self) -> Result<Option<Vec<u8>>>;
    fn read_varuint(&mut self) -> Result<u64>;
    fn read_varint(&mut self) -> Result<i64>;
    fn read_varuint_opt(&mut self) -> Result<Option<u64>>;
    fn read_varint_opt(&mut self) -> Result<Option<i64>>;
}
