//! Tests for the Error type

use extjson::{Decoder, Error, Extension, Value, from_str};
use std::error::Error as _;
use std::io;

#[test]
fn test_error_display_syntax() {
    let error = from_str::<Value>("[1,]").unwrap_err();
    assert_eq!(
        error.to_string(),
        "json: invalid character ']' looking for beginning of value at offset 3"
    );
    assert_eq!(error.offset(), Some(3));
}

#[test]
fn test_error_display_unexpected_end() {
    let error = from_str::<Value>(r#"{"a": "#).unwrap_err();
    assert_eq!(
        error.to_string(),
        "json: unexpected end of JSON input at offset 6"
    );
}

#[test]
fn test_error_display_functions() {
    assert_eq!(
        Error::UnknownFunction("Foo".into()).to_string(),
        "json: unknown function Foo"
    );
    assert_eq!(
        Error::TooManyArguments("Foo".into()).to_string(),
        "json: too many arguments for function Foo"
    );
}

#[test]
fn test_error_display_type_mismatch() {
    let error = from_str::<bool>(" {}").unwrap_err();
    assert_eq!(
        error.to_string(),
        "json: cannot unmarshal object into a boolean at offset 1"
    );

    let error = Error::TypeMismatch {
        kind: "array".into(),
        expected: "u8".into(),
        offset: None,
    };
    assert_eq!(error.to_string(), "json: cannot unmarshal array into u8");
    assert_eq!(error.offset(), None);
}

#[test]
fn test_error_display_misc() {
    assert_eq!(Error::KeyMustBeString.to_string(), "map key must be a string");
    assert_eq!(
        Error::RecursionLimitExceeded(128).to_string(),
        "json: nesting deeper than 128 levels"
    );
    assert_eq!(Error::Message("custom".into()).to_string(), "custom");
    assert!(Error::UnnamedType.to_string().contains("container name"));
}

#[test]
fn test_error_io() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let error = Error::IO(io_error);
    assert!(error.to_string().contains("file not found"));
    assert!(error.source().is_some());
}

#[test]
fn test_hook_error_source() {
    let mut ext = Extension::new();
    ext.register_keyed_decoder("$k", |_: &[u8]| Err("hook failed".into()));
    let mut decoder = Decoder::new();
    decoder.attach(&ext);
    let error = decoder.decode_str::<Value>(r#"{"$k": 1}"#).unwrap_err();
    assert_eq!(error.to_string(), "hook failed");
    assert_eq!(error.source().unwrap().to_string(), "hook failed");
    assert_eq!(error.offset(), None);
}

#[test]
fn test_error_debug() {
    let error = Error::UnknownFunction("Foo".into());
    assert!(format!("{error:?}").contains("UnknownFunction"));
}

#[test]
fn test_errors_are_send_and_sync() {
    fn check<T: Send + Sync + 'static>() {}
    check::<Error>();
}
