use std::io::Write;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::wire::{Decoder, Encoder};

/// The diagnostic text codec.
///
/// One token per primitive, separated by single spaces: numbers in
/// decimal, strings and chars quoted with backslash escapes, byte
/// strings as `x` plus hex, `~` for null. Floats print in shortest
/// round-trip form, with `nan:0x…` keeping the exact payload bits.
/// Token meaning depends on call order, exactly like the binary codec.
pub struct TextEncoder<W> {
    out: W,
    started: bool,
}

impl<W: Write> TextEncoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn token(&mut self, token: &str) -> Result<()> {
        if self.started {
            self.out.write_all(b" ")?;
        }
        self.started = true;
        self.out.write_all(token.as_bytes())?;
        Ok(())
    }

    fn quoted(&mut self, text: &str) -> Result<()> {
        let mut token = String::with_capacity(text.len() + 2);
        token.push('"');
        for c in text.chars() {
            match c {
                '"' => token.push_str("\\\""),
                '\\' => token.push_str("\\\\"),
                '\n' => token.push_str("\\n"),
                '\r' => token.push_str("\\r"),
                '\t' => token.push_str("\\t"),
                c if c.is_control() => {
                    token.push_str(&format!("\\u{{{:04x}}}", c as u32));
                }
                c => token.push(c),
            }
        }
        token.push('"');
        self.token(&token)
    }
}

impl<W: Write> Encoder for TextEncoder<W> {
    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.token(if value { "true" } else { "false" })
    }

    fn write_char(&mut self, value: char) -> Result<()> {
        self.quoted(&value.to_string())
    }

    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        if value.is_nan() {
            self.token(&format!("nan:{:#x}", value.to_bits()))
        } else if value == f32::INFINITY {
            self.token("inf")
        } else if value == f32::NEG_INFINITY {
            self.token("-inf")
        } else {
            self.token(&format!("{value:?}"))
        }
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        if value.is_nan() {
            self.token(&format!("nan:{:#x}", value.to_bits()))
        } else if value == f64::INFINITY {
            self.token("inf")
        } else if value == f64::NEG_INFINITY {
            self.token("-inf")
        } else {
            self.token(&format!("{value:?}"))
        }
    }

    fn write_decimal(&mut self, value: Decimal) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_guid(&mut self, value: Uuid) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_str(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(text) => self.quoted(text),
            None => self.token("~"),
        }
    }

    fn write_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        match value {
            Some(bytes) => {
                let mut token = String::with_capacity(bytes.len() * 2 + 1);
                token.push('x');
                for byte in bytes {
                    token.push_str(&format!("{byte:02x}"));
                }
                self.token(&token)
            }
            None => self.token("~"),
        }
    }

    fn write_varuint(&mut self, value: u64) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_varint(&mut self, value: i64) -> Result<()> {
        self.token(&value.to_string())
    }

    fn write_varuint_opt(&mut self, value: Option<u64>) -> Result<()> {
        match value {
            Some(value) => self.token(&value.to_string()),
            None => self.token("~"),
        }
    }

    fn write_varint_opt(&mut self, value: Option<i64>) -> Result<()> {
        match value {
            Some(value) => self.token(&value.to_string()),
            None => self.token("~"),
        }
    }
}

pub struct TextDecoder<'a> {
    input: &'a str,
}

impl<'a> TextDecoder<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    fn next_token(&mut self) -> Result<&'a str> {
        self.input = self.input.trim_start();
        if self.input.is_empty() {
            return Err(Error::Malformed {
                what: "text stream",
                detail: "unexpected end of input".into(),
            });
        }
        let end = if self.input.starts_with('"') {
            let mut escaped = false;
            let mut close = None;
            for (offset, c) in self.input.char_indices().skip(1) {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    close = Some(offset + c.len_utf8());
                    break;
                }
            }
            close.ok_or(Error::Malformed {
                what: "text stream",
                detail: "unterminated string".into(),
            })?
        } else {
            self.input
                .find(char::is_whitespace)
                .unwrap_or(self.input.len())
        };
        let (token, rest) = self.input.split_at(end);
        self.input = rest;
        Ok(token)
    }

    fn quoted(&mut self) -> Result<String> {
        let token = self.next_token()?;
        let inner = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .ok_or_else(|| Error::Malformed {
                what: "text stream",
                detail: format!("expected a quoted string, found `{token}`"),
            })?;
        let mut text = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                text.push(c);
                continue;
            }
            match chars.next() {
                Some('"') => text.push('"'),
                Some('\\') => text.push('\\'),
                Some('n') => text.push('\n'),
                Some('r') => text.push('\r'),
                Some('t') => text.push('\t'),
                Some('u') => {
                    let hex: String = chars
                        .by_ref()
                        .skip_while(|c| *c == '{')
                        .take_while(|c| *c != '}')
                        .collect();
                    let scalar =
                        u32::from_str_radix(&hex, 16).map_err(|error| Error::Malformed {
                            what: "string escape",
                            detail: error.to_string(),
                        })?;
                    text.push(char::from_u32(scalar).ok_or_else(|| Error::Malformed {
                        what: "string escape",
                        detail: format!("{scalar:#x} is not a scalar value"),
                    })?);
                }
                other => {
                    return Err(Error::Malformed {
                        what: "string escape",
                        detail: format!("unknown escape {other:?}"),
                    });
                }
            }
        }
        Ok(text)
    }

    fn parse<T: core::str::FromStr>(&mut self, what: &'static str) -> Result<T>
    where
        T::Err: core::fmt::Display,
    {
        let token = self.next_token()?;
        token.parse().map_err(|error: T::Err| Error::Malformed {
            what,
            detail: format!("`{token}`: {error}"),
        })
    }
}

impl Decoder for TextDecoder<'_> {
    fn read_bool(&mut self) -> Result<bool> {
        match self.next_token()? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(Error::Malformed {
                what: "bool",
                detail: format!("`{other}`"),
            }),
        }
    }

    fn read_char(&mut self) -> Result<char> {
        let text = self.quoted()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(Error::Malformed {
                what: "char",
                detail: format!("`{text}` is not a single character"),
            }),
        }
    }

    fn read_i8(&mut self) -> Result<i8> {
        self.parse("i8")
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.parse("i16")
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.parse("i32")
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.parse("i64")
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.parse("u8")
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.parse("u16")
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.parse("u32")
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.parse("u64")
    }

    fn read_f32(&mut self) -> Result<f32> {
        let token = self.next_token()?;
        if let Some(bits) = token.strip_prefix("nan:0x") {
            let bits = u32::from_str_radix(bits, 16).map_err(|error| Error::Malformed {
                what: "f32",
                detail: error.to_string(),
            })?;
            return Ok(f32::from_bits(bits));
        }
        match token {
            "inf" => Ok(f32::INFINITY),
            "-inf" => Ok(f32::NEG_INFINITY),
            token => token.parse().map_err(|error| Error::Malformed {
                what: "f32",
                detail: format!("`{token}`: {error}"),
            }),
        }
    }

    fn read_f64(&mut self) -> Result<f64> {
        let token = self.next_token()?;
        if let Some(bits) = token.strip_prefix("nan:0x") {
            let bits = u64::from_str_radix(bits, 16).map_err(|error| Error::Malformed {
                what: "f64",
                detail: error.to_string(),
            })?;
            return Ok(f64::from_bits(bits));
        }
        match token {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            token => token.parse().map_err(|error| Error::Malformed {
                what: "f64",
                detail: format!("`{token}`: {error}"),
            }),
        }
    }

    fn read_decimal(&mut self) -> Result<Decimal> {
        self.parse("decimal")
    }

    fn read_guid(&mut self) -> Result<Uuid> {
        self.parse("guid")
    }

    fn read_str(&mut self) -> Result<Option<String>> {
        self.input = self.input.trim_start();
        if self.input.starts_with('~') {
            self.next_token()?;
            return Ok(None);
        }
        Ok(Some(self.quoted()?))
    }

    fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let token = self.next_token()?;
        if token == "~" {
            return Ok(None);
        }
        let hex = token.strip_prefix('x').ok_or_else(|| Error::Malformed {
            what: "bytes",
            detail: format!("`{token}`"),
        })?;
        if hex.len() % 2 != 0 {
            return Err(Error::Malformed {
                what: "bytes",
                detail: "odd hex digit count".into(),
            });
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        for pair in 0..hex.len() / 2 {
            let digits = &hex[pair * 2..pair * 2 + 2];
            bytes.push(
                u8::from_str_radix(digits, 16).map_err(|error| Error::Malformed {
                    what: "bytes",
                    detail: error.to_string(),
                })?,
            );
        }
        Ok(Some(bytes))
    }

    fn read_varuint(&mut self) -> Result<u64> {
        self.parse("integer")
    }

    fn read_varint(&mut self) -> Result<i64> {
        self.parse("integer")
    }

    fn read_varuint_opt(&mut self) -> Result<Option<u64>> {
        self.input = self.input.trim_start();
        if self.input.starts_with('~') {
            self.next_token()?;
            return Ok(None);
        }
        Ok(Some(self.parse("integer")?))
    }

    fn read_varint_opt(&mut self) -> Result<Option<i64>> {
        self.input = self.input.trim_start();
        if self.input.starts_with('~') {
            self.next_token()?;
            return Ok(None);
        }
        Ok(Some(self.parse("integer")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        let mut buffer = Vec::new();
        {
            let mut encoder = TextEncoder::new(&mut buffer);
            encoder.write_bool(true).unwrap();
            encoder.write_str(Some("two words")).unwrap();
            encoder.write_str(None).unwrap();
            encoder.write_f64(f64::NAN).unwrap();
            encoder.write_bytes(Some(&[0xde, 0xad])).unwrap();
            encoder.write_varint(-12).unwrap();
        }
        let text = String::from_utf8(buffer).unwrap();
        let mut decoder = TextDecoder::new(&text);
        assert!(decoder.read_bool().unwrap());
        assert_eq!(decoder.read_str().unwrap().as_deref(), Some("two words"));
        assert_eq!(decoder.read_str().unwrap(), None);
        assert!(decoder.read_f64().unwrap().is_nan());
        assert_eq!(decoder.read_bytes().unwrap(), Some(vec![0xde, 0xad]));
        assert_eq!(decoder.read_varint().unwrap(), -12);
    }

    #[test]
    fn escapes_survive() {
        let mut buffer = Vec::new();
        TextEncoder::new(&mut buffer)
            .write_str(Some("a \"b\"\n\\c"))
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut decoder = TextDecoder::new(&text);
        assert_eq!(decoder.read_str().unwrap().as_deref(), Some("a \"b\"\n\\c"));
    }

    #[test]
    fn shortest_float_form_round_trips() {
        let mut buffer = Vec::new();
        TextEncoder::new(&mut buffer).write_f32(0.1).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "0.1");
        assert_eq!(TextDecoder::new(&text).read_f32().unwrap(), 0.1);
    }
}
