use std::io::{Read, Write};

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::wire::{Decoder, Encoder};

/// The compact binary codec.
///
/// Fixed-width fields are little-endian. Variable-length integers pack
/// seven payload bits per byte with bit 7 as the continuation flag;
/// the signed and optional variants steal low bits of the first byte
/// for the sign and null flags, so small values stay at one byte.
pub struct BinaryEncoder<W> {
    out: W,
}

impl<W: Write> BinaryEncoder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// Writes the classic continuation loop for the bits above the
    /// packed first byte.
    fn continuation(&mut self, mut rest: u64) -> Result<()> {
        while rest >= 0x80 {
            self.put(&[(rest as u8) | 0x80])?;
            rest >>= 7;
        }
        self.put(&[rest as u8])
    }
}

impl<W: Write> Encoder for BinaryEncoder<W> {
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put(&[value as u8])
    }

    fn write_char(&mut self, value: char) -> Result<()> {
        self.put(&(value as u32).to_le_bytes())
    }

    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.put(&value.to_le_bytes())
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.put(&value.to_bits().to_le_bytes())
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.put(&value.to_bits().to_le_bytes())
    }

    fn write_decimal(&mut self, value: Decimal) -> Result<()> {
        self.put(&value.serialize())
    }

    fn write_guid(&mut self, value: Uuid) -> Result<()> {
        self.put(value.as_bytes())
    }

    fn write_str(&mut self, value: Option<&str>) -> Result<()> {
        self.write_bytes(value.map(str::as_bytes))
    }

    fn write_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        match value {
            Some(bytes) => {
                self.write_varuint_opt(Some(bytes.len() as u64))?;
                self.put(bytes)
            }
            None => self.write_varuint_opt(None),
        }
    }

    fn write_varuint(&mut self, value: u64) -> Result<()> {
        self.continuation(value)
    }

    fn write_varint(&mut self, value: i64) -> Result<()> {
        let magnitude = value.unsigned_abs();
        let mut first = ((magnitude as u8) & 0x3f) << 1;
        if value < 0 {
            first |= 0x01;
        }
        let rest = magnitude >> 6;
        if rest != 0 {
            self.put(&[first | 0x80])?;
            self.continuation(rest)
        } else {
            self.put(&[first])
        }
    }

    fn write_varuint_opt(&mut self, value: Option<u64>) -> Result<()> {
        let Some(value) = value else {
            return self.put(&[0x01]);
        };
        let first = ((value as u8) & 0x3f) << 1;
        let rest = value >> 6;
        if rest != 0 {
            self.put(&[first | 0x80])?;
            self.continuation(rest)
        } else {
            self.put(&[first])
        }
    }

    fn write_varint_opt(&mut self, value: Option<i64>) -> Result<()> {
        let Some(value) = value else {
            return self.put(&[0x01]);
        };
        let magnitude = value.unsigned_abs();
        let mut first = ((magnitude as u8) & 0x1f) << 2;
        if value < 0 {
            first |= 0x02;
        }
        let rest = magnitude >> 5;
        if rest != 0 {
            self.put(&[first | 0x80])?;
            self.continuation(rest)
        } else {
            self.put(&[first])
        }
    }
}

pub struct BinaryDecoder<R> {
    input: R,
}

impl<R: Read> BinaryDecoder<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0u8; N];
        self.input.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    /// Reads continuation bytes into `value`, whose low `shift` bits
    /// are already populated.
    fn continuation(&mut self, mut value: u64, mut shift: u32) -> Result<u64> {
        loop {
            if shift >= 64 {
                return Err(Error::MalformedVarint);
            }
            let byte = self.byte()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn signed(magnitude: u64, negative: bool) -> i64 {
        if negative {
            (magnitude as i64).wrapping_neg()
        } else {
            magnitude as i64
        }
    }
}

impl<R: Read> Decoder for BinaryDecoder<R> {
    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.byte()? != 0)
    }

    fn read_char(&mut self) -> Result<char> {
        let scalar = u32::from_le_bytes(self.take()?);
        char::from_u32(scalar).ok_or_else(|| Error::Malformed {
            what: "char",
            detail: format!("{scalar:#x} is not a scalar value"),
        })
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.take()?))
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take()?))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(u8::from_le_bytes(self.take()?))
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(u32::from_le_bytes(self.take()?)))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(u64::from_le_bytes(self.take()?)))
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        Ok(Decimal::deserialize(self.take()?))
    }

    fn read_guid(&mut self) -> Result<Uuid> {
        Ok(Uuid::from_bytes(self.take()?))
    }

    fn read_str(&mut self) -> Result<Option<String>> {
        match self.read_bytes()? {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|error| Error::Malformed {
                    what: "string",
                    detail: error.to_string(),
                })?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }

    fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_varuint_opt()? else {
            return Ok(None);
        };
        let mut bytes = vec![0u8; len as usize];
        self.input.read_exact(&mut bytes)?;
        Ok(Some(bytes))
    }

    fn read_varuint(&mut self) -> Result<u64> {
        let byte = self.byte()?;
        let value = u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        self.continuation(value, 7)
    }

    fn read_varint(&mut self) -> Result<i64> {
        let byte = self.byte()?;
        let negative = byte & 0x01 != 0;
        let mut magnitude = u64::from((byte >> 1) & 0x3f);
        if byte & 0x80 != 0 {
            magnitude = self.continuation(magnitude, 6)?;
        }
        Ok(Self::signed(magnitude, negative))
    }

    fn read_varuint_opt(&mut self) -> Result<Option<u64>> {
        let byte = self.byte()?;
        if byte & 0x01 != 0 {
            return Ok(None);
        }
        let mut value = u64::from((byte >> 1) & 0x3f);
        if byte & 0x80 != 0 {
            value = self.continuation(value, 6)?;
        }
        Ok(Some(value))
    }

    fn read_varint_opt(&mut self) -> Result<Option<i64>> {
        let byte = self.byte()?;
        if byte & 0x01 != 0 {
            return Ok(None);
        }
        let negative = byte & 0x02 != 0;
        let mut magnitude = u64::from((byte >> 2) & 0x1f);
        if byte & 0x80 != 0 {
            magnitude = self.continuation(magnitude, 5)?;
        }
        Ok(Some(Self::signed(magnitude, negative)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(f: impl FnOnce(&mut BinaryEncoder<&mut Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut buffer = Vec::new();
        f(&mut BinaryEncoder::new(&mut buffer)).unwrap();
        buffer
    }

    #[test]
    fn varuint_known_vectors() {
        assert_eq!(encode(|e| e.write_varuint(0)), [0x00]);
        assert_eq!(encode(|e| e.write_varuint(0x7f)), [0x7f]);
        assert_eq!(encode(|e| e.write_varuint(0x80)), [0x80, 0x01]);
        assert_eq!(encode(|e| e.write_varuint(300)), [0xac, 0x02]);
        assert_eq!(
            encode(|e| e.write_varuint(u64::MAX)),
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn varint_known_vectors() {
        assert_eq!(encode(|e| e.write_varint(0)), [0x00]);
        assert_eq!(encode(|e| e.write_varint(1)), [0x02]);
        assert_eq!(encode(|e| e.write_varint(-1)), [0x03]);
        assert_eq!(encode(|e| e.write_varint(63)), [0x7e]);
        assert_eq!(encode(|e| e.write_varint(64)), [0x80, 0x01]);
        assert_eq!(encode(|e| e.write_varint(-64)), [0x81, 0x01]);
    }

    #[test]
    fn optional_varints_spend_one_byte_on_null() {
        assert_eq!(encode(|e| e.write_varuint_opt(None)), [0x01]);
        assert_eq!(encode(|e| e.write_varint_opt(None)), [0x01]);
        assert_eq!(encode(|e| e.write_varuint_opt(Some(0))), [0x00]);
        assert_eq!(encode(|e| e.write_varuint_opt(Some(5))), [0x0a]);
        assert_eq!(encode(|e| e.write_varint_opt(Some(-2))), [0x0a]);
    }

    #[test]
    fn unterminated_varint_is_malformed() {
        let endless = [0xffu8; 16];
        let mut decoder = BinaryDecoder::new(&endless[..]);
        assert!(matches!(
            decoder.read_varuint(),
            Err(Error::MalformedVarint)
        ));
    }

    #[test]
    fn truncated_input_is_an_io_error() {
        let mut decoder = BinaryDecoder::new(&[0x80u8][..]);
        assert!(matches!(decoder.read_varuint(), Err(Error::Io(_))));
    }

    #[test]
    fn null_strings_and_bytes_round_trip() {
        let bytes = encode(|e| {
            e.write_str(None)?;
            e.write_str(Some("héllo"))?;
            e.write_bytes(None)?;
            e.write_bytes(Some(&[1, 2, 3]))
        });
        let mut decoder = BinaryDecoder::new(&bytes[..]);
        assert_eq!(decoder.read_str().unwrap(), None);
        assert_eq!(decoder.read_str().unwrap().as_deref(), Some("héllo"));
        assert_eq!(decoder.read_bytes().unwrap(), None);
        assert_eq!(decoder.read_bytes().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn char_outside_scalar_range_is_malformed() {
        let bytes = 0xd800u32.to_le_bytes();
        let mut decoder = BinaryDecoder::new(&bytes[..]);
        assert!(matches!(decoder.read_char(), Err(Error::Malformed { .. })));
    }

    proptest! {
        #[test]
        fn varuint_round_trips(value: u64) {
            let bytes = encode(|e| e.write_varuint(value));
            let mut decoder = BinaryDecoder::new(&bytes[..]);
            prop_assert_eq!(decoder.read_varuint().unwrap(), value);
        }

        #[test]
        fn varint_round_trips(value: i64) {
            let bytes = encode(|e| e.write_varint(value));
            let mut decoder = BinaryDecoder::new(&bytes[..]);
            prop_assert_eq!(decoder.read_varint().unwrap(), value);
        }

        #[test]
        fn optional_varints_round_trip(value: Option<i64>) {
            let bytes = encode(|e| e.write_varint_opt(value));
            let mut decoder = BinaryDecoder::new(&bytes[..]);
            prop_assert_eq!(decoder.read_varint_opt().unwrap(), value);
        }

        #[test]
        fn small_varuints_are_one_byte(value in 0u64..0x80) {
            let bytes = encode(|e| e.write_varuint(value));
            prop_assert_eq!(bytes.len(), 1);
        }
    }
}
