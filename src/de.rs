//! Serde deserializer for extended JSON.
//!
//! The input is scanned and indexed once up front (see [`scanner`](crate::scanner)),
//! then decoded by a [`serde::Deserializer`] that consults the attached
//! [`Extension`] at every value boundary.
//!
//! # Quick Start
//!
//! ```
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Player {
//!     name: String,
//!     health: f32,
//!     inventory: Vec<Item>,
//! }
//!
//! #[derive(Deserialize)]
//! struct Item {
//!     id: i32,
//!     count: i32,
//! }
//!
//! let player: Player = extjson::from_str(
//!     r#"{"name": "Steve", "health": 20, "inventory": [{"id": 1, "count": 64}]}"#,
//! )
//! .unwrap();
//! assert_eq!(player.inventory[0].count, 64);
//! ```
//!
//! # Extensions
//!
//! With a registry attached through a [`Decoder`], call expressions expand into
//! their reserved-key objects and keyed decoders intercept the values they are
//! registered for:
//!
//! ```
//! use extjson::{Decoder, Extension, Value};
//!
//! let mut ext = Extension::new();
//! ext.register_function("Point", "$point", &["x", "y"]);
//!
//! let mut decoder = Decoder::new();
//! decoder.attach(&ext);
//! let value: Value = decoder.decode_str("[Point(1, 2), Point(3)]").unwrap();
//! assert_eq!(
//!     value.to_string(),
//!     r#"[{"$point":{"x":1,"y":2}},{"$point":{"x":3}}]"#
//! );
//! ```
//!
//! # JSON to Rust Type Mapping
//!
//! | JSON | Rust Types |
//! |------|------------|
//! | `true` / `false` | `bool` |
//! | number | integers (when integral and in range), `f32`, `f64` |
//! | string | `&str` (escape-free only), `String`, `char`, unit enum variants |
//! | `null` | `()`, unit structs, `None` |
//! | array | `Vec<T>`, `[T; N]`, tuples |
//! | object | structs, maps, `{"Variant": ..}` enum variants |
//! | call `F(a, b)` | whatever `{"$f": {"p0": a, "p1": b}}` maps to |
//!
//! # Error Handling
//!
//! - [`Error::Syntax`] - Malformed input, reported at the offending byte
//! - [`Error::UnknownFunction`] / [`Error::TooManyArguments`] - Bad call expressions
//! - [`Error::Hook`] - A keyed decoder failed
//! - [`Error::TypeMismatch`] - A value's kind does not fit the destination
//!
//! [`Error::Syntax`]: crate::Error::Syntax
//! [`Error::UnknownFunction`]: crate::Error::UnknownFunction
//! [`Error::TooManyArguments`]: crate::Error::TooManyArguments
//! [`Error::Hook`]: crate::Error::Hook
//! [`Error::TypeMismatch`]: crate::Error::TypeMismatch

use std::{borrow::Cow, io::Read};

use serde::{
    Deserialize,
    de::{
        self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess,
        SeqAccess, Unexpected, VariantAccess, Visitor,
    },
};

use crate::{
    Error, Number, Result, Value, cold_path,
    dispatch::{self, Call, Decision, Shape},
    extension::{EMPTY, Extension},
    raw::RAW_TOKEN,
    scanner::{self, ScanIndex, Site, SiteKind, Span},
    util::is_whitespace,
};

/// Extended JSON deserializer implementing [`serde::Deserializer`].
///
/// For most use cases, prefer [`Decoder`] or the convenience functions
/// [`from_slice`], [`from_str`] and [`from_reader`].
pub struct Deserializer<'de, 'e> {
    input: &'de str,
    pos: usize,
    index: ScanIndex,
    ext: &'e Extension,
}

impl<'de> Deserializer<'de, 'static> {
    /// A deserializer with no extensions.
    pub fn from_slice(input: &'de [u8]) -> Result<Self> {
        Self::with_extension(input, &EMPTY)
    }

    pub fn from_str(input: &'de str) -> Result<Self> {
        Self::from_slice(input.as_bytes())
    }
}

impl<'de, 'e> Deserializer<'de, 'e> {
    /// Scan `input` and prepare to decode it against `ext`.
    ///
    /// # Errors
    ///
    /// Syntax errors anywhere in the document are reported here, before any
    /// value is decoded.
    pub fn with_extension(input: &'de [u8], ext: &'e Extension) -> Result<Self> {
        let index = scanner::scan(input)?;
        let input = std::str::from_utf8(input)
            .map_err(|error| Error::syntax(error.valid_up_to(), "invalid UTF-8 in input"))?;
        Ok(Self {
            input,
            pos: 0,
            index,
            ext,
        })
    }

    /// Check that only whitespace follows the decoded value.
    pub fn end(&mut self) -> Result<()> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            Ok(())
        } else {
            cold_path();
            Err(Error::syntax(self.pos, "invalid character after top-level value"))
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, context: &str) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            cold_path();
            Err(Error::syntax(
                self.pos,
                format!("expected {:?} {context}", byte as char),
            ))
        }
    }

    // `null` as a literal, not the name of a call.
    fn at_null(&self) -> bool {
        self.input[self.pos..].starts_with("null")
            && !matches!(
                self.input.as_bytes().get(self.pos + 4),
                Some(c) if c.is_ascii_alphanumeric() || *c == b'('
            )
    }

    fn parse_string(&mut self) -> Result<Cow<'de, str>> {
        let input = self.input;
        let start = self.pos;
        if self.peek() != Some(b'"') {
            cold_path();
            return Err(Error::syntax(start, "expected string literal"));
        }
        let end = scanner::string_end(input.as_bytes(), start)?;
        self.pos = end;
        scanner::unescape(&input[start..end], start)
    }

    fn parse_number(&mut self) -> Result<Number> {
        let input = self.input;
        let start = self.pos;
        let mut integral = true;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' | b'-' | b'+' => {}
                b'.' | b'e' | b'E' => integral = false,
                _ => break,
            }
            self.pos += 1;
        }
        let text = &input[start..self.pos];
        if integral {
            if let Ok(n) = text.parse::<u64>() {
                return Ok(Number::PosInt(n));
            }
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Number::from(n));
            }
        }
        text.parse::<f64>()
            .map(Number::Float)
            .map_err(|_| Error::syntax(start, "invalid number literal"))
    }

    fn parse_word(&mut self) -> &'de str {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    fn skip_scalar(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"') => {
                self.pos = scanner::string_end(self.input.as_bytes(), self.pos)?;
            }
            Some(b'-' | b'0'..=b'9') => {
                self.parse_number()?;
            }
            Some(c) if c.is_ascii_alphabetic() => {
                self.parse_word();
            }
            _ => {
                cold_path();
                return Err(Error::syntax(self.pos, "expected value"));
            }
        }
        Ok(())
    }

    fn check_calls(&self, site: &Site) -> Result<()> {
        dispatch::check_calls(self.input, &self.index, site.span, self.ext)
    }

    /// Elements a visitor left unread before `end` are skipped, but calls in
    /// them must still resolve.
    fn check_unread(&self, end: usize) -> Result<()> {
        if self.pos >= end {
            return Ok(());
        }
        dispatch::check_calls(self.input, &self.index, Span::new(self.pos, end), self.ext)
    }

    /// Decode the next value into a destination of the given shape, letting
    /// the registry intercept it first.
    fn deserialize_shaped<V>(&mut self, shape: Shape, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.skip_whitespace();
        let start = self.pos;
        self.route(start, shape, visitor)
            .map_err(|error| error.at(start))
    }

    fn route<V>(&mut self, start: usize, shape: Shape, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let site = self.index.site_at(start).copied();
        match dispatch::decide(self.input, &self.index, site.as_ref(), self.ext, shape)? {
            Decision::Keyed { value, end } => {
                self.pos = end;
                deliver(value, shape, visitor)
            }
            Decision::Expand(call) => self.expand(call, shape, visitor),
            Decision::Baseline => match shape {
                Shape::Raw => self.deliver_raw(start, site, visitor),
                Shape::Ignored => {
                    self.skip_value(site)?;
                    visitor.visit_unit()
                }
                Shape::Enum => self.baseline_enum(site, visitor),
                _ => self.baseline(site, visitor),
            },
        }
    }

    fn expand<V>(&mut self, call: Call<'de, 'e>, shape: Shape, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let value = match shape {
            Shape::Raw => {
                dispatch::check_calls(self.input, &self.index, call.span, self.ext)?;
                log::trace!("raw capture of call {} at {}", call.name, call.span.start);
                let input = self.input;
                visitor.visit_borrowed_str(&input[call.span.range()])
            }
            Shape::Ignored => {
                dispatch::check_calls(self.input, &self.index, call.span, self.ext)?;
                visitor.visit_unit()
            }
            Shape::Enum => visitor.visit_enum(CallAccess::new(&mut *self, call)),
            _ => visitor.visit_map(CallAccess::new(&mut *self, call)),
        }?;
        if self.pos > call.args_start() {
            self.check_unread(call.span.end)?;
        }
        self.pos = call.span.end;
        Ok(value)
    }

    fn deliver_raw<V>(&mut self, start: usize, site: Option<Site>, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.skip_value(site)?;
        log::trace!("raw capture of {} bytes at {start}", self.pos - start);
        let input = self.input;
        visitor.visit_borrowed_str(&input[start..self.pos])
    }

    fn skip_value(&mut self, site: Option<Site>) -> Result<()> {
        match site {
            Some(site) => {
                self.check_calls(&site)?;
                self.pos = site.span.end;
                Ok(())
            }
            None => self.skip_scalar(),
        }
    }

    fn baseline<V>(&mut self, site: Option<Site>, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match (self.peek(), site) {
            (Some(b'{'), Some(site)) => {
                self.pos += 1;
                let value = visitor.visit_map(ObjectAccess {
                    de: &mut *self,
                    first: true,
                })?;
                self.check_unread(site.span.end)?;
                self.pos = site.span.end;
                Ok(value)
            }
            (Some(b'['), Some(site)) => {
                let len = match site.kind {
                    SiteKind::Array { len } => len,
                    _ => 0,
                };
                self.pos += 1;
                let value = visitor.visit_seq(ArrayAccess {
                    de: &mut *self,
                    remaining: len,
                })?;
                self.check_unread(site.span.end)?;
                self.pos = site.span.end;
                Ok(value)
            }
            (Some(b'"'), _) => match self.parse_string()? {
                Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
                Cow::Owned(s) => visitor.visit_string(s),
            },
            (Some(b'-' | b'0'..=b'9'), _) => visit_number(self.parse_number()?, visitor),
            (Some(c), _) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                match self.parse_word() {
                    "true" => visitor.visit_bool(true),
                    "false" => visitor.visit_bool(false),
                    "null" => visitor.visit_unit(),
                    _ => {
                        cold_path();
                        Err(Error::syntax(start, "unexpected call expression"))
                    }
                }
            }
            _ => {
                cold_path();
                Err(Error::syntax(self.pos, "expected value"))
            }
        }
    }

    fn baseline_enum<V>(&mut self, site: Option<Site>, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match (self.peek(), site) {
            (Some(b'"'), _) => {
                let variant: de::value::CowStrDeserializer<'de, Error> =
                    self.parse_string()?.into_deserializer();
                visitor.visit_enum(variant)
            }
            (
                Some(b'{'),
                Some(Site {
                    span,
                    kind: SiteKind::Object { members, .. },
                }),
            ) => {
                if members != 1 {
                    cold_path();
                    return Err(de::Error::invalid_type(Unexpected::Map, &"single-key object"));
                }
                self.pos += 1;
                let value = visitor.visit_enum(VariantObject { de: &mut *self })?;
                self.pos = span.end;
                Ok(value)
            }
            _ => self.baseline(site, visitor),
        }
    }
}

fn visit_number<'de, V>(number: Number, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
{
    match number {
        Number::PosInt(n) => visitor.visit_u64(n),
        Number::NegInt(n) => visitor.visit_i64(n),
        Number::Float(n) => visitor.visit_f64(n),
    }
}

/// Hand a keyed decoder's result to the destination.
fn deliver<'de, V>(value: Value, shape: Shape, visitor: V) -> Result<V::Value>
where
    V: Visitor<'de>,
{
    match shape {
        Shape::Raw => visitor.visit_string(value.to_string()),
        Shape::Enum => de::Deserializer::deserialize_enum(value, "", &[], visitor),
        _ => de::Deserializer::deserialize_any(value, visitor),
    }
}

/// Deserialize an instance of `T` from extended JSON bytes, without extensions.
///
/// Call expressions are syntactically valid but fail with
/// [`Error::UnknownFunction`] since no function is registered.
///
/// # Example
///
/// ```
/// let point: (i32, i32) = extjson::from_slice(b"[1, 2]").unwrap();
/// assert_eq!(point, (1, 2));
/// ```
pub fn from_slice<'a, T>(input: &'a [u8]) -> Result<T>
where
    T: Deserialize<'a>,
{
    Decoder::new().decode_slice(input)
}

#[inline]
pub fn from_str<'a, T>(input: &'a str) -> Result<T>
where
    T: Deserialize<'a>,
{
    from_slice(input.as_bytes())
}

/// Deserialize from any `std::io::Read` implementation.
///
/// This reads all data into a buffer first, then deserializes.
pub fn from_reader<T, R: Read>(reader: R) -> Result<T>
where
    T: DeserializeOwned,
{
    Decoder::new().decode_reader(reader)
}

/// Decodes documents against an attached [`Extension`].
///
/// A decoder with nothing attached behaves like [`from_slice`].
#[derive(Clone, Copy, Debug)]
pub struct Decoder<'e> {
    ext: &'e Extension,
}

impl Default for Decoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'e> Decoder<'e> {
    pub fn new() -> Self {
        Self { ext: &EMPTY }
    }

    /// Make `ext`'s functions and keyed decoders active for subsequent
    /// decodes. The registry stays borrowed for as long as the decoder lives.
    pub fn attach(&mut self, ext: &'e Extension) -> &mut Self {
        self.ext = ext;
        self
    }

    pub fn extension(&self) -> &'e Extension {
        self.ext
    }

    pub fn decode_slice<'de, T>(&self, input: &'de [u8]) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        let mut deserializer = Deserializer::with_extension(input, self.ext)?;
        let value = T::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(value)
    }

    #[inline]
    pub fn decode_str<'de, T>(&self, input: &'de str) -> Result<T>
    where
        T: Deserialize<'de>,
    {
        self.decode_slice(input.as_bytes())
    }

    pub fn decode_reader<T, R: Read>(&self, mut reader: R) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).map_err(Error::IO)?;
        self.decode_slice(&buf)
    }
}

macro_rules! shaped {
    ($($method:ident => $shape:ident),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: Visitor<'de>,
            {
                self.deserialize_shaped(Shape::$shape, visitor)
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de, '_> {
    type Error = Error;

    shaped! {
        deserialize_any => Any,
        deserialize_bool => Bool,
        deserialize_i8 => Number,
        deserialize_i16 => Number,
        deserialize_i32 => Number,
        deserialize_i64 => Number,
        deserialize_i128 => Number,
        deserialize_u8 => Number,
        deserialize_u16 => Number,
        deserialize_u32 => Number,
        deserialize_u64 => Number,
        deserialize_u128 => Number,
        deserialize_f32 => Number,
        deserialize_f64 => Number,
        deserialize_char => String,
        deserialize_str => String,
        deserialize_string => String,
        deserialize_identifier => String,
        deserialize_bytes => Bytes,
        deserialize_byte_buf => Bytes,
        deserialize_unit => Unit,
        deserialize_seq => Seq,
        deserialize_map => Map,
        deserialize_ignored_any => Ignored,
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.skip_whitespace();
        if self.at_null() {
            self.pos += 4;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_shaped(Shape::Unit, visitor)
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if name == RAW_TOKEN {
            return self.deserialize_shaped(Shape::Raw, visitor);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_shaped(Shape::Seq, visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_shaped(Shape::Seq, visitor)
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_shaped(Shape::Map, visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_shaped(Shape::Enum, visitor)
    }
}

struct ObjectAccess<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
    first: bool,
}

impl<'de> MapAccess<'de> for ObjectAccess<'_, 'de, '_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        self.de.skip_whitespace();
        match self.de.peek() {
            Some(b'}') => {
                self.de.pos += 1;
                return Ok(None);
            }
            Some(b',') if !self.first => {
                self.de.pos += 1;
                self.de.skip_whitespace();
            }
            Some(_) if self.first => {}
            _ => {
                cold_path();
                return Err(Error::syntax(
                    self.de.pos,
                    "expected ',' or '}' after object member",
                ));
            }
        }
        self.first = false;
        let key = seed.deserialize(MapKey { de: &mut *self.de })?;
        self.de.expect(b':', "after object key")?;
        Ok(Some(key))
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

struct ArrayAccess<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
    remaining: usize,
}

impl<'de> SeqAccess<'de> for ArrayAccess<'_, 'de, '_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            self.de.expect(b']', "after array element")?;
            return Ok(None);
        }
        self.de.skip_whitespace();
        if self.de.peek() == Some(b',') {
            self.de.pos += 1;
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Object keys. Integer-keyed maps parse the key text.
struct MapKey<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
}

macro_rules! integer_key {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: Visitor<'de>,
            {
                let start = self.de.pos;
                let key = self.de.parse_string()?;
                match key.parse::<$ty>() {
                    Ok(n) => visitor.$visit(n),
                    Err(_) => {
                        cold_path();
                        Err(Error::TypeMismatch {
                            kind: "string".into(),
                            expected: stringify!($ty).into(),
                            offset: Some(start),
                        })
                    }
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for MapKey<'_, 'de, '_> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.de.parse_string()? {
            Cow::Borrowed(s) => visitor.visit_borrowed_str(s),
            Cow::Owned(s) => visitor.visit_string(s),
        }
    }

    integer_key! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let variant: de::value::CowStrDeserializer<'de, Error> =
            self.de.parse_string()?.into_deserializer();
        visitor.visit_enum(variant)
    }

    serde::forward_to_deserialize_any! {
        bool i128 u128 f32 f64 char str string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// `{"Variant": value}` in the input.
struct VariantObject<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
}

impl<'de> EnumAccess<'de> for VariantObject<'_, 'de, '_> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: DeserializeSeed<'de>,
    {
        self.de.skip_whitespace();
        let variant = seed.deserialize(MapKey { de: &mut *self.de })?;
        self.de.expect(b':', "after object key")?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for VariantObject<'_, 'de, '_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        <()>::deserialize(self.de)
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.de, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(self.de, visitor)
    }
}

/// A call expression seen as `{reserved_key: args}`, or as an enum whose
/// variant is the reserved key.
struct CallAccess<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
    call: Call<'de, 'e>,
    key_taken: bool,
}

impl<'a, 'de, 'e> CallAccess<'a, 'de, 'e> {
    fn new(de: &'a mut Deserializer<'de, 'e>, call: Call<'de, 'e>) -> Self {
        Self {
            de,
            call,
            key_taken: false,
        }
    }
}

fn reserved_key<'e>(call: &Call<'_, 'e>) -> de::value::StrDeserializer<'e, Error> {
    let spec = call.spec;
    spec.reserved_key().into_deserializer()
}

impl<'de> MapAccess<'de> for CallAccess<'_, 'de, '_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if self.key_taken {
            return Ok(None);
        }
        self.key_taken = true;
        seed.deserialize(reserved_key(&self.call)).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(Args {
            de: &mut *self.de,
            call: self.call,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(usize::from(!self.key_taken))
    }
}

impl<'a, 'de, 'e> EnumAccess<'de> for CallAccess<'a, 'de, 'e> {
    type Error = Error;
    type Variant = Args<'a, 'de, 'e>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(reserved_key(&self.call))?;
        Ok((
            variant,
            Args {
                de: self.de,
                call: self.call,
            },
        ))
    }
}

/// The arguments of a call, as an object keyed by parameter name. Sequence
/// destinations get the arguments positionally; raw-capture destinations get
/// the whole call expression.
struct Args<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
    call: Call<'de, 'e>,
}

impl<'a, 'de, 'e> Args<'a, 'de, 'e> {
    fn list(self) -> ArgList<'a, 'de, 'e> {
        self.de.pos = self.call.args_start();
        ArgList {
            de: self.de,
            call: self.call,
            index: 0,
        }
    }
}

impl<'de> de::Deserializer<'de> for Args<'_, 'de, '_> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_map(self.list())
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(self.list())
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(self.list())
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_seq(self.list())
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        if name == RAW_TOKEN {
            let input = self.de.input;
            return visitor.visit_borrowed_str(&input[self.call.span.range()]);
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        dispatch::check_calls(self.de.input, &self.de.index, self.call.span, self.de.ext)?;
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct map struct enum identifier
    }
}

impl<'de> VariantAccess<'de> for Args<'_, 'de, '_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        cold_path();
        Err(de::Error::invalid_type(Unexpected::Map, &"unit variant"))
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_any(self, visitor)
    }
}

struct ArgList<'a, 'de, 'e> {
    de: &'a mut Deserializer<'de, 'e>,
    call: Call<'de, 'e>,
    index: usize,
}

impl ArgList<'_, '_, '_> {
    fn advance(&mut self) -> Result<bool> {
        if self.index >= self.call.args {
            return Ok(false);
        }
        if self.index > 0 {
            self.de.expect(b',', "after function argument")?;
        }
        Ok(true)
    }
}

impl<'de> MapAccess<'de> for ArgList<'_, 'de, '_> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        if !self.advance()? {
            return Ok(None);
        }
        let spec = self.call.spec;
        let param = spec
            .params()
            .get(self.index)
            .ok_or_else(|| Error::TooManyArguments(self.call.name.to_owned()))?;
        self.index += 1;
        let key: de::value::StrDeserializer<'_, Error> = param.as_str().into_deserializer();
        seed.deserialize(key).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.call.args - self.index)
    }
}

impl<'de> SeqAccess<'de> for ArgList<'_, 'de, '_> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if !self.advance()? {
            return Ok(None);
        }
        self.index += 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.call.args - self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_literal_is_not_a_call_name() {
        let de = Deserializer::from_str("nullx()").unwrap();
        assert!(!de.at_null());
        let mut de = Deserializer::from_str(" null").unwrap();
        de.skip_whitespace();
        assert!(de.at_null());
    }

    #[test]
    fn numbers_keep_integer_exactness() {
        let mut de = Deserializer::from_str("[18446744073709551615, -3, 1.5, 1e2]").unwrap();
        de.pos = 1;
        assert_eq!(de.parse_number().unwrap(), Number::PosInt(u64::MAX));
        de.pos = 23;
        assert_eq!(de.parse_number().unwrap(), Number::NegInt(-3));
        de.pos = 27;
        assert_eq!(de.parse_number().unwrap(), Number::Float(1.5));
        de.pos = 32;
        assert_eq!(de.parse_number().unwrap(), Number::Float(100.0));
    }
}
