//! Serde serializer for JSON, with per-type encoder overrides.
//!
//! Values are written compactly into an internal buffer. When an
//! [`Extension`] is attached (through an [`Encoder`]), every named container
//! the serializer reaches (unit, newtype, tuple and regular structs, and all
//! enum variant forms, looked up by enum name) is checked against the
//! registry's type encoders; a registered hook receives the value's default
//! structural form and its output replaces the default serialization.
//!
//! # Example
//!
//! ```
//! use extjson::{Encoder, Extension};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Docint(i64);
//!
//! let mut ext = Extension::new();
//! ext.register_type_encoder(&Docint(0), |value| {
//!     Ok(format!(r#"{{"$docint":{value}}}"#).into_bytes())
//! })
//! .unwrap();
//!
//! let mut out = Vec::new();
//! let mut encoder = Encoder::new(&mut out);
//! encoder.attach(&ext);
//! encoder.encode(&Docint(13)).unwrap();
//! assert_eq!(out, b"{\"$docint\":13}\n");
//! ```

use std::{fmt::Display, io::Write};

use serde::{Serialize, ser};

use crate::{
    Error, Result, Value,
    extension::{EMPTY, EncodeHook, Extension},
    raw::RAW_TOKEN,
    value::{Capture, key_to_string, to_value},
};

/// JSON serializer implementing [`serde::Serializer`].
///
/// For most use cases, prefer [`Encoder`] or the convenience functions
/// [`to_vec`], [`to_string`] and [`to_writer`].
pub struct Serializer<'e> {
    vec: Vec<u8>,
    ext: &'e Extension,
    escape_html: bool,
}

impl<'e> Serializer<'e> {
    pub fn with_extension(ext: &'e Extension) -> Self {
        Self {
            vec: Vec::new(),
            ext,
            escape_html: false,
        }
    }

    /// Escape `<`, `>` and `&` inside strings.
    pub fn set_escape_html(&mut self, escape_html: bool) -> &mut Self {
        self.escape_html = escape_html;
        self
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.vec
    }

    fn write_display(&mut self, value: impl Display) -> Result<()> {
        write!(self.vec, "{value}").map_err(Error::IO)
    }

    fn write_str(&mut self, s: &str) {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        self.vec.push(b'"');
        let bytes = s.as_bytes();
        let mut flushed = 0;
        for (i, c) in s.char_indices() {
            let escape: &[u8] = match c {
                '"' => b"\\\"",
                '\\' => b"\\\\",
                '\n' => b"\\n",
                '\r' => b"\\r",
                '\t' => b"\\t",
                '\u{8}' => b"\\b",
                '\u{c}' => b"\\f",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                '<' | '>' | '&' if self.escape_html => &[],
                c if (c as u32) < 0x20 => &[],
                _ => continue,
            };
            self.vec.extend_from_slice(&bytes[flushed..i]);
            flushed = i + c.len_utf8();
            if escape.is_empty() {
                let code = c as usize;
                self.vec.extend_from_slice(b"\\u00");
                self.vec.push(HEX[code >> 4]);
                self.vec.push(HEX[code & 0xf]);
            } else {
                self.vec.extend_from_slice(escape);
            }
        }
        self.vec.extend_from_slice(&bytes[flushed..]);
        self.vec.push(b'"');
    }

    fn write_variant_open(&mut self, variant: &str) {
        self.vec.push(b'{');
        self.write_str(variant);
        self.vec.push(b':');
    }

    fn encoder(&self, name: &str) -> Option<&'e EncodeHook> {
        let ext = self.ext;
        ext.type_encoder(name)
    }

    fn write_hooked(&mut self, name: &str, hook: &EncodeHook, value: &Value) -> Result<()> {
        let bytes = hook(value).map_err(Error::Hook)?;
        log::trace!("type encoder for {name} wrote {} bytes", bytes.len());
        self.vec.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Serialize a value to a JSON byte vector.
///
/// No extension is consulted and HTML characters are left as they are.
///
/// # Errors
///
/// Returns [`Error::KeyMustBeString`] if a map has keys that cannot be written
/// as JSON object keys.
///
/// [`Error::KeyMustBeString`]: crate::Error::KeyMustBeString
#[inline]
pub fn to_vec(value: &(impl ?Sized + Serialize)) -> Result<Vec<u8>> {
    let mut serializer = Serializer::with_extension(&EMPTY);
    value.serialize(&mut serializer)?;
    Ok(serializer.vec)
}

pub fn to_string(value: &(impl ?Sized + Serialize)) -> Result<String> {
    String::from_utf8(to_vec(value)?).map_err(|error| Error::Message(error.to_string()))
}

/// Serialize a value to an [`std::io::Write`] implementation.
///
/// The value is first serialized to an internal buffer, then written in a
/// single `write_all` call.
pub fn to_writer(writer: &mut impl Write, value: &(impl ?Sized + Serialize)) -> Result<()> {
    let vec = to_vec(value)?;
    writer.write_all(&vec).map_err(Error::IO)
}

/// Writes values to a stream, one JSON document per line, with an optional
/// [`Extension`] attached.
///
/// HTML escaping is on by default.
pub struct Encoder<'e, W> {
    writer: W,
    ext: &'e Extension,
    escape_html: bool,
}

impl<'e, W: Write> Encoder<'e, W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            ext: &EMPTY,
            escape_html: true,
        }
    }

    /// Make `ext`'s type encoders active for subsequent encodes.
    pub fn attach(&mut self, ext: &'e Extension) -> &mut Self {
        self.ext = ext;
        self
    }

    pub fn set_escape_html(&mut self, escape_html: bool) -> &mut Self {
        self.escape_html = escape_html;
        self
    }

    /// Write `value` followed by a newline.
    ///
    /// Nothing is written if serialization fails.
    pub fn encode<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let mut serializer = Serializer::with_extension(self.ext);
        serializer.set_escape_html(self.escape_html);
        value.serialize(&mut serializer)?;
        serializer.vec.push(b'\n');
        self.writer.write_all(&serializer.vec).map_err(Error::IO)
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<'a, 'e> ser::Serializer for &'a mut Serializer<'e> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a, 'e>;
    type SerializeTuple = Compound<'a, 'e>;
    type SerializeTupleStruct = Compound<'a, 'e>;
    type SerializeTupleVariant = Compound<'a, 'e>;
    type SerializeMap = Compound<'a, 'e>;
    type SerializeStruct = Compound<'a, 'e>;
    type SerializeStructVariant = Compound<'a, 'e>;

    fn serialize_bool(self, v: bool) -> Result<()> {
        let text: &[u8] = if v { b"true" } else { b"false" };
        self.vec.extend_from_slice(text);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_i16(self, v: i16) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_i32(self, v: i32) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_i64(self, v: i64) -> Result<()> {
        self.write_display(v)
    }

    #[cfg(feature = "i128")]
    fn serialize_i128(self, v: i128) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_u16(self, v: u16) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_u32(self, v: u32) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_u64(self, v: u64) -> Result<()> {
        self.write_display(v)
    }

    #[cfg(feature = "i128")]
    fn serialize_u128(self, v: u128) -> Result<()> {
        self.write_display(v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        if v.is_finite() {
            write!(self.vec, "{v:?}").map_err(Error::IO)
        } else {
            self.serialize_unit()
        }
    }

    fn serialize_f64(self, v: f64) -> Result<()> {
        if v.is_finite() {
            write!(self.vec, "{v:?}").map_err(Error::IO)
        } else {
            self.serialize_unit()
        }
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.write_str(v.encode_utf8(&mut [0u8; 4]));
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.write_str(v);
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        ser::Serializer::collect_seq(self, v)
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_unit()
    }

    fn serialize_some<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        self.vec.extend_from_slice(b"null");
        Ok(())
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<()> {
        if let Some(hook) = self.encoder(name) {
            return self.write_hooked(name, hook, &Value::Null);
        }
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<()> {
        if let Some(hook) = self.encoder(name) {
            return self.write_hooked(name, hook, &Value::from(variant));
        }
        self.write_str(variant);
        Ok(())
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        if name == RAW_TOKEN {
            return match to_value(value)? {
                Value::String(raw) => {
                    self.vec.extend_from_slice(raw.as_bytes());
                    Ok(())
                }
                other => other.serialize(self),
            };
        }
        if let Some(hook) = self.encoder(name) {
            return self.write_hooked(name, hook, &to_value(value)?);
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        if let Some(hook) = self.encoder(name) {
            let structural = Value::from_iter([(variant, to_value(value)?)]);
            return self.write_hooked(name, hook, &structural);
        }
        self.write_variant_open(variant);
        value.serialize(&mut *self)?;
        self.vec.push(b'}');
        Ok(())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a, 'e>> {
        self.vec.push(b'[');
        Ok(Compound::json(self, b"]"))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a, 'e>> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, name: &'static str, len: usize) -> Result<Compound<'a, 'e>> {
        if let Some(hook) = self.encoder(name) {
            return Ok(Compound::hooked(self, name, hook, Capture::Seq(Vec::with_capacity(len))));
        }
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Compound<'a, 'e>> {
        if let Some(hook) = self.encoder(name) {
            let capture = Capture::TupleVariant {
                variant,
                items: Vec::with_capacity(len),
            };
            return Ok(Compound::hooked(self, name, hook, capture));
        }
        self.write_variant_open(variant);
        self.vec.push(b'[');
        Ok(Compound::json(self, b"]}"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a, 'e>> {
        self.vec.push(b'{');
        Ok(Compound::json(self, b"}"))
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<Compound<'a, 'e>> {
        if let Some(hook) = self.encoder(name) {
            return Ok(Compound::hooked(self, name, hook, Capture::map()));
        }
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a, 'e>> {
        if let Some(hook) = self.encoder(name) {
            let capture = Capture::StructVariant {
                variant,
                map: Default::default(),
            };
            return Ok(Compound::hooked(self, name, hook, capture));
        }
        self.write_variant_open(variant);
        self.vec.push(b'{');
        Ok(Compound::json(self, b"}}"))
    }
}

/// In-progress sequence, map or struct.
pub struct Compound<'a, 'e> {
    ser: &'a mut Serializer<'e>,
    mode: Mode<'e>,
}

enum Mode<'e> {
    /// Written directly; `close` ends the value.
    Json { first: bool, close: &'static [u8] },
    /// Collected into a [`Value`] for a type encoder.
    Hooked {
        name: &'static str,
        hook: &'e EncodeHook,
        capture: Capture,
    },
}

impl<'a, 'e> Compound<'a, 'e> {
    fn json(ser: &'a mut Serializer<'e>, close: &'static [u8]) -> Self {
        Self {
            ser,
            mode: Mode::Json { first: true, close },
        }
    }

    fn hooked(
        ser: &'a mut Serializer<'e>,
        name: &'static str,
        hook: &'e EncodeHook,
        capture: Capture,
    ) -> Self {
        Self {
            ser,
            mode: Mode::Hooked {
                name,
                hook,
                capture,
            },
        }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        match &mut self.mode {
            Mode::Json { first, .. } => {
                if !std::mem::take(first) {
                    self.ser.vec.push(b',');
                }
                value.serialize(&mut *self.ser)
            }
            Mode::Hooked { capture, .. } => capture.push(value),
        }
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        match &mut self.mode {
            Mode::Json { first, .. } => {
                if !std::mem::take(first) {
                    self.ser.vec.push(b',');
                }
                self.ser.write_str(key);
                self.ser.vec.push(b':');
                value.serialize(&mut *self.ser)
            }
            Mode::Hooked { capture, .. } => capture.field(key, value),
        }
    }

    fn finish(self) -> Result<()> {
        match self.mode {
            Mode::Json { close, .. } => {
                self.ser.vec.extend_from_slice(close);
                Ok(())
            }
            Mode::Hooked {
                name,
                hook,
                capture,
            } => self.ser.write_hooked(name, hook, &capture.finish()),
        }
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match &mut self.mode {
            Mode::Json { first, .. } => {
                if !std::mem::take(first) {
                    self.ser.vec.push(b',');
                }
                let key = key_to_string(key)?;
                self.ser.write_str(&key);
                self.ser.vec.push(b':');
                Ok(())
            }
            Mode::Hooked { capture, .. } => capture.key(key),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        match &mut self.mode {
            Mode::Json { .. } => value.serialize(&mut *self.ser),
            Mode::Hooked { capture, .. } => capture.value(value),
        }
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<()> {
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escaped(s: &str, escape_html: bool) -> String {
        let mut serializer = Serializer::with_extension(&EMPTY);
        serializer.set_escape_html(escape_html);
        serializer.write_str(s);
        String::from_utf8(serializer.into_inner()).unwrap()
    }

    #[test]
    fn string_escapes() {
        assert_eq!(escaped("a\"b\\c\n\u{1}", false), r#""a\"b\\c\n\u0001""#);
        assert_eq!(escaped("<a&b>", false), r#""<a&b>""#);
        assert_eq!(escaped("<a&b>", true), r#""\u003ca\u0026b\u003e""#);
        assert_eq!(escaped("\u{2028}é", false), "\"\\u2028é\"");
    }

    #[test]
    fn non_finite_floats_are_null() {
        assert_eq!(to_string(&f64::NAN).unwrap(), "null");
        assert_eq!(to_string(&1.5f64).unwrap(), "1.5");
    }
}
