//! The extension registry.
//!
//! An [`Extension`] holds three independent tables:
//!
//! - functions, mapping a call-expression name to a [`FunctionSpec`]
//!   (reserved key plus ordered parameter names),
//! - keyed decoders, mapping a reserved key to a [`DecodeHook`] that receives
//!   the verbatim bytes of any value whose implied key is that reserved key,
//! - type encoders, mapping a serde container name to an [`EncodeHook`] whose
//!   output replaces the default serialization of that type.
//!
//! A registry is built once, then attached to a [`Decoder`](crate::Decoder)
//! or [`Encoder`](crate::Encoder). Attaching borrows it immutably, so a
//! registry cannot change while a decode or encode is using it, and one
//! registry can be shared by any number of decoders and encoders.
//!
//! # Example
//!
//! ```
//! use extjson::{Decoder, Extension, Value};
//!
//! let mut ext = Extension::new();
//! ext.register_function("Func2", "$func2", &["arg1", "arg2"]);
//! ext.register_keyed_decoder("$key1", |raw: &[u8]| {
//!     Ok(Value::String(String::from_utf8(raw.to_vec())?))
//! });
//!
//! let mut decoder = Decoder::new();
//! decoder.attach(&ext);
//! let value: Value = decoder.decode_str("Func2(1, 2)").unwrap();
//! assert_eq!(value.to_string(), r#"{"$func2":{"arg1":1,"arg2":2}}"#);
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Serialize, ser};

use crate::{Error, HookError, Result, Value};

/// Decodes the verbatim bytes of a keyed value.
pub type DecodeHook = Arc<dyn Fn(&[u8]) -> std::result::Result<Value, HookError> + Send + Sync>;

/// Produces the complete JSON text for a value of a registered type. The
/// hook receives the value's default structural form.
pub type EncodeHook =
    Arc<dyn Fn(&Value) -> std::result::Result<Vec<u8>, HookError> + Send + Sync>;

/// Signature of a registered function.
///
/// Positional arguments bind to [`params`](FunctionSpec::params) in order; the
/// number of parameters is the maximum arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionSpec {
    reserved_key: String,
    params: Vec<String>,
}

impl FunctionSpec {
    pub fn reserved_key(&self) -> &str {
        &self.reserved_key
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Registry of functions, keyed decoders and type encoders.
#[derive(Clone, Default)]
pub struct Extension {
    functions: BTreeMap<String, FunctionSpec>,
    keyed: BTreeMap<String, DecodeHook>,
    encoders: BTreeMap<String, EncodeHook>,
}

/// The registry used by decoders and encoders nothing was attached to.
pub(crate) static EMPTY: Extension = Extension::new();

impl Extension {
    pub const fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
            keyed: BTreeMap::new(),
            encoders: BTreeMap::new(),
        }
    }

    /// Register `name(p0, p1, ...)` as shorthand for
    /// `{reserved_key: {p0: .., p1: ..}}`.
    ///
    /// A later registration under the same name replaces the earlier one. The
    /// reserved key may also carry a keyed decoder, which then takes priority
    /// over expansion wherever its result fits the destination.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        reserved_key: impl Into<String>,
        params: &[&str],
    ) -> &mut Self {
        let name = name.into();
        let spec = FunctionSpec {
            reserved_key: reserved_key.into(),
            params: params.iter().map(|param| (*param).to_owned()).collect(),
        };
        log::debug!(
            "registered function {name}/{} for key {}",
            spec.arity(),
            spec.reserved_key
        );
        self.functions.insert(name, spec);
        self
    }

    /// Register a decoder for values whose implied key is `reserved_key`: a
    /// single-member object with that key, or a call to a function registered
    /// for it. The hook gets the original bytes of the whole value.
    pub fn register_keyed_decoder<F>(&mut self, reserved_key: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&[u8]) -> std::result::Result<Value, HookError> + Send + Sync + 'static,
    {
        let reserved_key = reserved_key.into();
        log::debug!("registered keyed decoder for {reserved_key}");
        self.keyed.insert(reserved_key, Arc::new(hook));
        self
    }

    /// Register an encoder for the type of `exemplar`.
    ///
    /// Types are identified by their serde container name, so the exemplar
    /// must be a struct, tuple struct, unit struct or enum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnnamedType`] if the exemplar serializes without a
    /// container name (primitives, strings, sequences, maps, options).
    pub fn register_type_encoder<T, F>(&mut self, exemplar: &T, hook: F) -> Result<&mut Self>
    where
        T: ?Sized + Serialize,
        F: Fn(&Value) -> std::result::Result<Vec<u8>, HookError> + Send + Sync + 'static,
    {
        let name = container_name(exemplar)?;
        Ok(self.register_type_encoder_named(name, hook))
    }

    /// Register an encoder for the serde container called `name`.
    pub fn register_type_encoder_named<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&Value) -> std::result::Result<Vec<u8>, HookError> + Send + Sync + 'static,
    {
        let name = name.into();
        log::debug!("registered type encoder for {name}");
        self.encoders.insert(name, Arc::new(hook));
        self
    }

    /// Copy every entry of `other` into this registry, replacing entries with
    /// the same name, key or type.
    pub fn extend(&mut self, other: &Extension) -> &mut Self {
        self.functions.extend(
            other
                .functions
                .iter()
                .map(|(name, spec)| (name.clone(), spec.clone())),
        );
        self.keyed.extend(
            other
                .keyed
                .iter()
                .map(|(key, hook)| (key.clone(), Arc::clone(hook))),
        );
        self.encoders.extend(
            other
                .encoders
                .iter()
                .map(|(name, hook)| (name.clone(), Arc::clone(hook))),
        );
        self
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    pub fn keyed_decoder(&self, reserved_key: &str) -> Option<&DecodeHook> {
        self.keyed.get(reserved_key)
    }

    pub fn type_encoder(&self, name: &str) -> Option<&EncodeHook> {
        self.encoders.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.keyed.is_empty() && self.encoders.is_empty()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Extension")
            .field("functions", &self.functions)
            .field("keyed", &self.keyed.keys().collect::<Vec<_>>())
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Returns the serde container name `value` serializes under.
pub fn container_name<T: ?Sized + Serialize>(value: &T) -> Result<&'static str> {
    match value.serialize(NameProbe) {
        Err(Probe::Named(name)) => Ok(name),
        _ => Err(Error::UnnamedType),
    }
}

// The probe stops at the first serializer call; the "error" carries the answer.
#[derive(Debug)]
enum Probe {
    Named(&'static str),
    Unnamed,
}

impl fmt::Display for Probe {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Probe::Named(name) => formatter.write_str(name),
            Probe::Unnamed => formatter.write_str("unnamed"),
        }
    }
}

impl std::error::Error for Probe {}

impl ser::Error for Probe {
    fn custom<T: fmt::Display>(_msg: T) -> Self {
        Probe::Unnamed
    }
}

struct NameProbe;

macro_rules! unnamed {
    ($($method:ident($($arg:ty),*)),* $(,)?) => {
        $(
            fn $method(self, $(_: $arg),*) -> std::result::Result<Self::Ok, Self::Error> {
                Err(Probe::Unnamed)
            }
        )*
    };
}

impl ser::Serializer for NameProbe {
    type Ok = ();
    type Error = Probe;

    type SerializeSeq = ser::Impossible<(), Probe>;
    type SerializeTuple = ser::Impossible<(), Probe>;
    type SerializeTupleStruct = ser::Impossible<(), Probe>;
    type SerializeTupleVariant = ser::Impossible<(), Probe>;
    type SerializeMap = ser::Impossible<(), Probe>;
    type SerializeStruct = ser::Impossible<(), Probe>;
    type SerializeStructVariant = ser::Impossible<(), Probe>;

    unnamed! {
        serialize_bool(bool),
        serialize_i8(i8),
        serialize_i16(i16),
        serialize_i32(i32),
        serialize_i64(i64),
        serialize_u8(u8),
        serialize_u16(u16),
        serialize_u32(u32),
        serialize_u64(u64),
        serialize_f32(f32),
        serialize_f64(f64),
        serialize_char(char),
        serialize_str(&str),
        serialize_bytes(&[u8]),
        serialize_none(),
        serialize_unit(),
    }

    fn serialize_some<T>(self, _value: &T) -> std::result::Result<(), Probe>
    where
        T: ?Sized + Serialize,
    {
        Err(Probe::Unnamed)
    }

    fn serialize_unit_struct(self, name: &'static str) -> std::result::Result<(), Probe> {
        Err(Probe::Named(name))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> std::result::Result<(), Probe> {
        Err(Probe::Named(name))
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        _value: &T,
    ) -> std::result::Result<(), Probe>
    where
        T: ?Sized + Serialize,
    {
        Err(Probe::Named(name))
    }

    fn serialize_newtype_variant<T>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> std::result::Result<(), Probe>
    where
        T: ?Sized + Serialize,
    {
        Err(Probe::Named(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> std::result::Result<Self::SerializeSeq, Probe> {
        Err(Probe::Unnamed)
    }

    fn serialize_tuple(self, _len: usize) -> std::result::Result<Self::SerializeTuple, Probe> {
        Err(Probe::Unnamed)
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleStruct, Probe> {
        Err(Probe::Named(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeTupleVariant, Probe> {
        Err(Probe::Named(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> std::result::Result<Self::SerializeMap, Probe> {
        Err(Probe::Unnamed)
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStruct, Probe> {
        Err(Probe::Named(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> std::result::Result<Self::SerializeStructVariant, Probe> {
        Err(Probe::Named(name))
    }
}
