use serde::{Serialize, ser};

use crate::{Error, Map, Number, Result, Value, raw::RAW_TOKEN};

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::PosInt(n)) => serializer.serialize_u64(*n),
            Value::Number(Number::NegInt(n)) => serializer.serialize_i64(*n),
            Value::Number(Number::Float(n)) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Object(map) => serializer.collect_map(map),
        }
    }
}

/// Convert any serializable value into a [`Value`].
///
/// # Example
///
/// ```
/// use extjson::{to_value, Value};
///
/// let value = to_value(&vec![1, 2]).unwrap();
/// assert_eq!(value, Value::Array(vec![Value::from(1), Value::from(2)]));
/// ```
pub fn to_value<T: ?Sized + Serialize>(value: &T) -> Result<Value> {
    value.serialize(ValueSerializer)
}

/// Render a map key the way JSON object keys are written.
pub(crate) fn key_to_string<T: ?Sized + Serialize>(key: &T) -> Result<String> {
    key.serialize(KeySerializer)
}

struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = Error;

    type SerializeSeq = Capture;
    type SerializeTuple = Capture;
    type SerializeTupleStruct = Capture;
    type SerializeTupleVariant = Capture;
    type SerializeMap = Capture;
    type SerializeStruct = Capture;
    type SerializeStructVariant = Capture;

    fn serialize_bool(self, v: bool) -> Result<Value> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<Value> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<Value> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<Value> {
        Ok(Value::Number(Number::from(v)))
    }

    #[cfg(feature = "i128")]
    fn serialize_i128(self, v: i128) -> Result<Value> {
        if let Ok(v) = i64::try_from(v) {
            self.serialize_i64(v)
        } else if let Ok(v) = u64::try_from(v) {
            self.serialize_u64(v)
        } else {
            Ok(Value::Number(Number::Float(v as f64)))
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u16(self, v: u16) -> Result<Value> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u32(self, v: u32) -> Result<Value> {
        self.serialize_u64(v as u64)
    }

    fn serialize_u64(self, v: u64) -> Result<Value> {
        Ok(Value::Number(Number::PosInt(v)))
    }

    #[cfg(feature = "i128")]
    fn serialize_u128(self, v: u128) -> Result<Value> {
        match u64::try_from(v) {
            Ok(v) => self.serialize_u64(v),
            Err(_) => Ok(Value::Number(Number::Float(v as f64))),
        }
    }

    fn serialize_f32(self, v: f32) -> Result<Value> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<Value> {
        if v.is_finite() {
            Ok(Value::Number(Number::Float(v)))
        } else {
            Ok(Value::Null)
        }
    }

    fn serialize_char(self, v: char) -> Result<Value> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value> {
        Ok(Value::Array(v.iter().map(|b| Value::from(*b)).collect()))
    }

    fn serialize_none(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        if name == RAW_TOKEN {
            // Captured text is re-read so the value holds its structure.
            return match value.serialize(self)? {
                Value::String(raw) => crate::from_str(&raw),
                other => Ok(other),
            };
        }
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value>
    where
        T: ?Sized + Serialize,
    {
        let mut map = Map::new();
        map.insert(variant.to_owned(), to_value(value)?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Capture> {
        Ok(Capture::Seq(Vec::with_capacity(len.unwrap_or(0))))
    }

    fn serialize_tuple(self, len: usize) -> Result<Capture> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<Capture> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Capture> {
        Ok(Capture::TupleVariant {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Capture> {
        Ok(Capture::Map {
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Capture> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Capture> {
        Ok(Capture::StructVariant {
            variant,
            map: Map::new(),
        })
    }
}

/// A compound value under construction. Also used by the JSON serializer to
/// collect the structural form of a value whose type has an encoder hook.
pub(crate) enum Capture {
    Seq(Vec<Value>),
    Map {
        map: Map,
        next_key: Option<String>,
    },
    TupleVariant {
        variant: &'static str,
        items: Vec<Value>,
    },
    StructVariant {
        variant: &'static str,
        map: Map,
    },
}

impl Capture {
    pub(crate) fn map() -> Self {
        Capture::Map {
            map: Map::new(),
            next_key: None,
        }
    }

    pub(crate) fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        match self {
            Capture::Seq(items) | Capture::TupleVariant { items, .. } => {
                items.push(to_value(value)?);
                Ok(())
            }
            _ => Err(Error::Message("element pushed to a map".into())),
        }
    }

    pub(crate) fn key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        match self {
            Capture::Map { next_key, .. } => {
                *next_key = Some(key_to_string(key)?);
                Ok(())
            }
            _ => Err(Error::Message("key pushed to a sequence".into())),
        }
    }

    pub(crate) fn value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        match self {
            Capture::Map { map, next_key } => {
                let key = next_key
                    .take()
                    .ok_or_else(|| Error::Message("map value without a key".into()))?;
                map.insert(key, to_value(value)?);
                Ok(())
            }
            _ => Err(Error::Message("value pushed to a sequence".into())),
        }
    }

    pub(crate) fn field<T: ?Sized + Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        match self {
            Capture::Map { map, .. } | Capture::StructVariant { map, .. } => {
                map.insert(key.to_owned(), to_value(value)?);
                Ok(())
            }
            _ => Err(Error::Message("field pushed to a sequence".into())),
        }
    }

    pub(crate) fn finish(self) -> Value {
        match self {
            Capture::Seq(items) => Value::Array(items),
            Capture::Map { map, .. } => Value::Object(map),
            Capture::TupleVariant { variant, items } => {
                Value::from_iter([(variant, Value::Array(items))])
            }
            Capture::StructVariant { variant, map } => {
                Value::from_iter([(variant, Value::Object(map))])
            }
        }
    }
}

impl ser::SerializeSeq for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeMap for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.key(key)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.value(value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for Capture {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Value> {
        Ok(self.finish())
    }
}

/// Object keys are strings; integers, chars and unit variants are accepted and
/// written in their string form.
struct KeySerializer;

macro_rules! key_via_display {
    ($($method:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<String> {
                Ok(v.to_string())
            }
        )*
    };
}

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;

    type SerializeSeq = ser::Impossible<String, Error>;
    type SerializeTuple = ser::Impossible<String, Error>;
    type SerializeTupleStruct = ser::Impossible<String, Error>;
    type SerializeTupleVariant = ser::Impossible<String, Error>;
    type SerializeMap = ser::Impossible<String, Error>;
    type SerializeStruct = ser::Impossible<String, Error>;
    type SerializeStructVariant = ser::Impossible<String, Error>;

    key_via_display! {
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_char(char),
        serialize_str(&str),
    }

    fn serialize_bool(self, _v: bool) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_f32(self, _v: f32) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_f64(self, _v: f64) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_none(self) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(Error::KeyMustBeString)
    }

    fn serialize_unit(self) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<String> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String>
    where
        T: ?Sized + Serialize,
    {
        Err(Error::KeyMustBeString)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(Error::KeyMustBeString)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(Error::KeyMustBeString)
    }
}
