//! JSON with extensions.
//!
//! On top of a serde JSON codec, an [`Extension`] registry adds three things:
//!
//! - call-expression syntax: `Func2(1, 2)` decodes as `{"$func2": {"arg1": 1, "arg2": 2}}`
//!   once `Func2` is registered with that reserved key and parameter list,
//! - keyed decoders: a hook that receives the verbatim bytes of any value whose
//!   implied key (the single key of an object, or a call's reserved key) it
//!   is registered for,
//! - type encoders: a hook whose output replaces the default serialization of
//!   a type.
//!
//! Registries are attached explicitly to a [`Decoder`] or [`Encoder`]; there is
//! no global state.
//!
//! ```
//! use extjson::{Decoder, Extension, Value};
//!
//! let mut ext = Extension::new();
//! ext.register_function("Func2", "$func2", &["arg1", "arg2"]);
//!
//! let mut decoder = Decoder::new();
//! decoder.attach(&ext);
//! let value: Value = decoder.decode_str("Func2(1, 2)").unwrap();
//! assert_eq!(value.to_string(), r#"{"$func2":{"arg1":1,"arg2":2}}"#);
//! ```

pub mod de;
mod dispatch;
pub mod error;
pub mod extension;
pub mod raw;
pub mod scanner;
pub mod ser;
mod util;
pub mod value;

pub use de::{Decoder, Deserializer, from_reader, from_slice, from_str};
pub use error::{Error, HookError, Result};
pub use extension::{DecodeHook, EncodeHook, Extension, FunctionSpec};
pub use raw::{RawCapture, RawJson};
pub use scanner::{Span, scan, valid};
pub use ser::{Encoder, Serializer, to_string, to_vec, to_writer};
pub use value::{Map, Number, Value, from_value, to_value};

pub(crate) use util::cold_path;
