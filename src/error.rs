//! Error types for extended JSON scanning, decoding and encoding.
//!
//! This module contains the [`Error`] type which represents all possible errors
//! that can occur when reading or writing extended JSON.
//!
//! # Example
//!
//! ```
//! use extjson::{Decoder, Error, Extension, Value};
//!
//! let mut ext = Extension::new();
//! ext.register_function("Func2", "$func2", &["arg1", "arg2"]);
//!
//! let mut decoder = Decoder::new();
//! decoder.attach(&ext);
//!
//! match decoder.decode_str::<Value>("Func2(1, 2, 3)") {
//!     Err(Error::TooManyArguments(name)) => assert_eq!(name, "Func2"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::fmt::{self, Display};

use serde::{de, ser};

/// Alias for a `Result` with the error type [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Opaque error returned by a caller-supplied decode or encode hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// This type represents all possible errors that can occur when reading or
/// writing extended JSON.
///
/// # Variants
///
/// - [`Syntax`](Error::Syntax) - Malformed input, baseline or extended grammar
/// - [`UnknownFunction`](Error::UnknownFunction) - A call to an unregistered name
/// - [`TooManyArguments`](Error::TooManyArguments) - A call exceeded its arity
/// - [`Hook`](Error::Hook) - A registered hook failed
/// - [`TypeMismatch`](Error::TypeMismatch) - A value cannot be stored in its destination
#[derive(Debug)]
pub enum Error {
    Message(String),

    /// An I/O error occurred.
    ///
    /// This typically happens when writing to a [`std::io::Write`] implementation
    /// or reading from a [`std::io::Read`] implementation that encounters an error.
    IO(std::io::Error),

    /// The input is not valid extended JSON.
    ///
    /// `offset` is the byte index of the character where the failure was
    /// detected, or the input length when the input ended prematurely.
    Syntax { offset: usize, message: String },

    /// A call expression names a function that is not registered.
    UnknownFunction(String),

    /// A call expression supplies more arguments than its function declares.
    TooManyArguments(String),

    /// A decode or encode hook returned an error. The hook's error is kept as-is
    /// and is available through [`std::error::Error::source`].
    Hook(HookError),

    /// A value's kind cannot be stored into the destination type.
    ///
    /// `kind` is the syntactic kind of the value (`"object"`, `"array"`,
    /// `"string"`, `"number"`, `"bool"` or `"null"`), `expected` describes the
    /// destination, and `offset` is the start of the value in the input. The
    /// offset is absent when the mismatch was raised while decoding from a
    /// [`Value`](crate::Value) rather than from text.
    TypeMismatch {
        kind: String,
        expected: String,
        offset: Option<usize>,
    },

    /// Map key must be a string type.
    ///
    /// JSON objects require string keys. Integer keys are written as quoted
    /// decimals; anything else returns this error.
    KeyMustBeString,

    /// A type encoder was registered for an exemplar that has no serde
    /// container name, so there is nothing to match it against.
    UnnamedType,

    /// Values nest deeper than the scanner accepts.
    RecursionLimitExceeded(usize),
}

impl Error {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Fills in the offset of a positionless type mismatch. Errors that already
    /// carry a position were raised by an inner value and are kept unchanged.
    pub(crate) fn at(self, start: usize) -> Self {
        match self {
            Error::TypeMismatch {
                kind,
                expected,
                offset: None,
            } => Error::TypeMismatch {
                kind,
                expected,
                offset: Some(start),
            },
            other => other,
        }
    }

    /// Byte offset associated with this error, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax { offset, .. } => Some(*offset),
            Error::TypeMismatch { offset, .. } => *offset,
            _ => None,
        }
    }
}

fn unexpected_kind(unexp: &de::Unexpected) -> String {
    match unexp {
        de::Unexpected::Bool(_) => "bool".into(),
        de::Unexpected::Unsigned(_) | de::Unexpected::Signed(_) | de::Unexpected::Float(_) => {
            "number".into()
        }
        de::Unexpected::Char(_) | de::Unexpected::Str(_) => "string".into(),
        de::Unexpected::Unit | de::Unexpected::Option => "null".into(),
        de::Unexpected::Seq => "array".into(),
        de::Unexpected::Map => "object".into(),
        other => other.to_string(),
    }
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }

    fn invalid_type(unexp: de::Unexpected, exp: &dyn de::Expected) -> Self {
        Error::TypeMismatch {
            kind: unexpected_kind(&unexp),
            expected: exp.to_string(),
            offset: None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(message) => formatter.write_str(message),
            Error::IO(error) => formatter.write_str(&error.to_string()),
            Error::Syntax { offset, message } => {
                write!(formatter, "json: {message} at offset {offset}")
            }
            Error::UnknownFunction(name) => write!(formatter, "json: unknown function {name}"),
            Error::TooManyArguments(name) => {
                write!(formatter, "json: too many arguments for function {name}")
            }
            Error::Hook(error) => Display::fmt(error, formatter),
            Error::TypeMismatch {
                kind,
                expected,
                offset: Some(offset),
            } => write!(
                formatter,
                "json: cannot unmarshal {kind} into {expected} at offset {offset}"
            ),
            Error::TypeMismatch { kind, expected, .. } => {
                write!(formatter, "json: cannot unmarshal {kind} into {expected}")
            }
            Error::KeyMustBeString => formatter.write_str("map key must be a string"),
            Error::UnnamedType => {
                formatter.write_str("type encoder exemplar has no serde container name")
            }
            Error::RecursionLimitExceeded(depth) => {
                write!(formatter, "json: nesting deeper than {depth} levels")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IO(error) => Some(error),
            Error::Hook(error) => Some(&**error),
            _ => None,
        }
    }
}
