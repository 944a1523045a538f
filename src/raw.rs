//! Raw-capture destinations.
//!
//! A destination that wants the original bytes of its value instead of a
//! structurally decoded result implements [`RawCapture`] and routes its
//! `Deserialize` impl through [`capture`]. The decoder then hands it the exact
//! source span, call-expression spelling included:
//!
//! ```
//! use extjson::{Decoder, Extension, RawJson};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Doc {
//!     call: RawJson,
//! }
//!
//! let mut ext = Extension::new();
//! ext.register_function("Func2", "$func2", &["arg1", "arg2"]);
//!
//! let mut decoder = Decoder::new();
//! decoder.attach(&ext);
//! let doc: Doc = decoder.decode_str(r#"{"call": Func2(1,  2)}"#).unwrap();
//! assert_eq!(doc.call.get(), "Func2(1,  2)");
//! ```
//!
//! If a keyed decoder claims the value first, the capture receives the compact
//! JSON text of the hook's result instead.

use std::{fmt, marker::PhantomData};

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Visitor},
};

use crate::{HookError, Value};

/// Newtype-struct name that marks a raw-capture request.
pub(crate) const RAW_TOKEN: &str = "$extjson::private::RawCapture";

/// A destination that accepts the verbatim bytes of its value.
pub trait RawCapture: Default {
    fn accept(&mut self, raw: &[u8]) -> Result<(), HookError>;
}

/// `deserialize_with` adapter declaring a [`RawCapture`] destination.
///
/// ```
/// use extjson::raw;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Doc {
///     #[serde(deserialize_with = "raw::capture")]
///     bytes: Vec<u8>,
/// }
///
/// let doc: Doc = extjson::from_str(r#"{"bytes": [1, 2]}"#).unwrap();
/// assert_eq!(doc.bytes, b"[1, 2]");
/// ```
pub fn capture<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: RawCapture,
{
    deserializer.deserialize_newtype_struct(RAW_TOKEN, CaptureVisitor(PhantomData))
}

struct CaptureVisitor<T>(PhantomData<T>);

impl<T: RawCapture> CaptureVisitor<T> {
    fn fill<E: de::Error>(raw: &[u8]) -> Result<T, E> {
        let mut target = T::default();
        target.accept(raw).map_err(E::custom)?;
        Ok(target)
    }
}

impl<'de, T: RawCapture> Visitor<'de> for CaptureVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("raw JSON text")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        Self::fill(v.as_bytes())
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<T, E> {
        Self::fill(v)
    }

    // Formats without the capability: re-encode whatever they produce.
    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::fill(value.to_string().as_bytes())
    }
}

/// Verbatim JSON text of a value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawJson(String);

impl RawJson {
    pub fn get(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<RawJson> for String {
    fn from(raw: RawJson) -> Self {
        raw.0
    }
}

impl fmt::Display for RawJson {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl RawCapture for RawJson {
    fn accept(&mut self, raw: &[u8]) -> Result<(), HookError> {
        self.0 = String::from_utf8(raw.to_vec())?;
        Ok(())
    }
}

impl RawCapture for Vec<u8> {
    fn accept(&mut self, raw: &[u8]) -> Result<(), HookError> {
        self.clear();
        self.extend_from_slice(raw);
        Ok(())
    }
}

impl RawCapture for String {
    fn accept(&mut self, raw: &[u8]) -> Result<(), HookError> {
        *self = String::from_utf8(raw.to_vec())?;
        Ok(())
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        capture(deserializer)
    }
}

/// Written back verbatim.
impl Serialize for RawJson {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(RAW_TOKEN, &self.0)
    }
}
