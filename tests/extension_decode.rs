//! Decoding with call expressions and keyed decoders.

use extjson::{Decoder, Error, Extension, RawJson, Value};
use serde::Deserialize;

fn keyed(raw: &[u8]) -> Result<Value, extjson::HookError> {
    Ok(Value::String(String::from_utf8(raw.to_vec())?))
}

fn registry() -> Extension {
    let mut ext = Extension::new();
    ext.register_function("Func1", "$func1", &[])
        .register_function("Func2", "$func2", &["arg1", "arg2"])
        .register_function("Func3", "$func3", &["arg1"])
        .register_keyed_decoder("$key1", keyed)
        .register_keyed_decoder("$func3", keyed);
    ext
}

fn decode<T: for<'de> Deserialize<'de>>(input: &str) -> extjson::Result<T> {
    let ext = registry();
    let mut decoder = Decoder::new();
    decoder.attach(&ext);
    decoder.decode_str(input)
}

fn json(text: &str) -> Value {
    extjson::from_str(text).unwrap()
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct FuncN {
    arg1: i64,
    arg2: i64,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct Funcs {
    #[serde(rename = "$func2")]
    func2: Option<FuncN>,
    #[serde(rename = "$func1")]
    func1: Option<FuncN>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct FuncsText {
    #[serde(rename = "$func1")]
    func1: RawJson,
    #[serde(rename = "$func2")]
    func2: RawJson,
}

#[derive(Debug, PartialEq, Deserialize)]
struct NestedText {
    f: RawJson,
    b: bool,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
struct Keyed(String);

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
struct KeyedType {
    k: Keyed,
    i: i64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct Empty {}

#[test]
fn test_call_into_generic_value() {
    assert_eq!(decode::<Value>("Func1()").unwrap(), json(r#"{"$func1": {}}"#));
    assert_eq!(
        decode::<Value>(r#"{"v": Func1()}"#).unwrap(),
        json(r#"{"v": {"$func1": {}}}"#)
    );
    assert_eq!(
        decode::<Value>("Func2(1)").unwrap(),
        json(r#"{"$func2": {"arg1": 1}}"#)
    );
    assert_eq!(
        decode::<Value>("Func2(1, 2)").unwrap(),
        json(r#"{"$func2": {"arg1": 1, "arg2": 2}}"#)
    );
    assert_eq!(
        decode::<Value>("Func2(Func1())").unwrap(),
        json(r#"{"$func2": {"arg1": {"$func1": {}}}}"#)
    );
}

#[test]
fn test_call_arguments_of_every_kind() {
    assert_eq!(
        decode::<Value>(r#"Func2( [1, "two"] , {"x": null} )"#).unwrap(),
        json(r#"{"$func2": {"arg1": [1, "two"], "arg2": {"x": null}}}"#)
    );
}

#[test]
fn test_too_many_arguments() {
    match decode::<Value>("Func2(1, 2, 3)") {
        Err(Error::TooManyArguments(name)) => assert_eq!(name, "Func2"),
        other => panic!("unexpected: {other:?}"),
    }
    match decode::<Funcs>("Func2(1, 2, 3)") {
        Err(Error::TooManyArguments(name)) => assert_eq!(name, "Func2"),
        other => panic!("unexpected: {other:?}"),
    }
    let error = decode::<Value>("Func2(1, 2, 3)").unwrap_err();
    assert_eq!(error.to_string(), "json: too many arguments for function Func2");
}

#[test]
fn test_unknown_function() {
    for input in ["BadFunc()", "Func2(1, BadFunc())", r#"{"a": [BadFunc(1)]}"#] {
        match decode::<Value>(input) {
            Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
            other => panic!("{input}: unexpected {other:?}"),
        }
    }
    match decode::<Funcs>("BadFunc()") {
        Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
        other => panic!("unexpected: {other:?}"),
    }
    let error = decode::<Value>("BadFunc()").unwrap_err();
    assert_eq!(error.to_string(), "json: unknown function BadFunc");
}

#[test]
fn test_unknown_function_in_ignored_and_raw_destinations() {
    assert!(matches!(
        decode::<Empty>(r#"{"skipped": BadFunc()}"#),
        Err(Error::UnknownFunction(_))
    ));
    assert!(matches!(
        decode::<RawJson>("[BadFunc()]"),
        Err(Error::UnknownFunction(_))
    ));
    assert!(matches!(
        decode::<RawJson>("Func2(1, 2, 3)"),
        Err(Error::TooManyArguments(_))
    ));
}

#[test]
fn test_call_into_struct() {
    assert_eq!(
        decode::<Funcs>("Func1()").unwrap(),
        Funcs {
            func1: Some(FuncN::default()),
            func2: None,
        }
    );
    assert_eq!(
        decode::<Funcs>("Func2(1)").unwrap(),
        Funcs {
            func2: Some(FuncN { arg1: 1, arg2: 0 }),
            func1: None,
        }
    );
    assert_eq!(
        decode::<Funcs>("Func2(1, 2)").unwrap(),
        Funcs {
            func2: Some(FuncN { arg1: 1, arg2: 2 }),
            func1: None,
        }
    );
}

#[test]
fn test_call_into_raw_capture() {
    assert_eq!(decode::<RawJson>("Func2(1)").unwrap().get(), "Func2(1)");
    assert_eq!(
        decode::<FuncsText>("Func2(1, 2)").unwrap().func2.get(),
        "Func2(1, 2)"
    );
    let nested: NestedText = decode(r#"{"f": Func2(1, 2), "b": true}"#).unwrap();
    assert_eq!(nested.f.get(), "Func2(1, 2)");
    assert!(nested.b);
}

#[test]
fn test_call_into_struct_without_fields() {
    assert_eq!(decode::<Empty>("Func1()").unwrap(), Empty {});
}

#[test]
fn test_call_into_positional_args() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Positional {
        #[serde(rename = "$func2")]
        args: Vec<i64>,
    }
    assert_eq!(
        decode::<Positional>("Func2(4, 5)").unwrap(),
        Positional { args: vec![4, 5] }
    );
}

#[test]
fn test_call_into_enum() {
    #[derive(Debug, PartialEq, Deserialize)]
    enum Call {
        #[serde(rename = "$func2")]
        Func2 { arg1: i64, arg2: Option<i64> },
    }
    assert_eq!(
        decode::<Call>("Func2(7)").unwrap(),
        Call::Func2 {
            arg1: 7,
            arg2: None
        }
    );
}

#[test]
fn test_keyed_object() {
    assert_eq!(
        decode::<Value>(r#"{"v": {"$key1": 1}}"#).unwrap(),
        Value::from_iter([("v", Value::from(r#"{"$key1": 1}"#))])
    );
    assert_eq!(
        decode::<KeyedType>(r#"{"k": {"$key1": 1}}"#).unwrap(),
        KeyedType {
            k: Keyed(r#"{"$key1": 1}"#.into()),
            i: 0,
        }
    );
}

#[test]
fn test_keyed_object_into_integer_field() {
    match decode::<KeyedType>(r#"{"i": {"$key1": 1}}"#) {
        Err(Error::TypeMismatch { kind, offset, .. }) => {
            assert_eq!(kind, "object");
            assert_eq!(offset, Some(6));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_keyed_function() {
    assert_eq!(
        decode::<Value>(r#"{"v": Func3()}"#).unwrap(),
        Value::from_iter([("v", Value::from("Func3()"))])
    );
    assert_eq!(
        decode::<KeyedType>(r#"{"k": Func3()}"#).unwrap(),
        KeyedType {
            k: Keyed("Func3()".into()),
            i: 0,
        }
    );
    match decode::<KeyedType>(r#"{"i": Func3()}"#) {
        Err(Error::TypeMismatch { kind, offset, .. }) => {
            assert_eq!(kind, "object");
            assert_eq!(offset, Some(6));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_keyed_hook_receives_exact_bytes() {
    assert_eq!(
        decode::<Value>("Func3(  [1 ,2] )").unwrap(),
        Value::from("Func3(  [1 ,2] )")
    );
    assert_eq!(
        decode::<Value>("[ {\"$key1\"  :\n 1} ]").unwrap(),
        Value::Array(vec![Value::from("{\"$key1\"  :\n 1}")])
    );
}

#[test]
fn test_keyed_needs_single_member() {
    assert_eq!(
        decode::<Value>(r#"{"$key1": 1, "other": 2}"#).unwrap(),
        json(r#"{"$key1": 1, "other": 2}"#)
    );
}

#[test]
fn test_keyed_result_into_raw_capture() {
    let raw: RawJson = decode(r#"{"$key1": 1}"#).unwrap();
    assert_eq!(raw.get(), r#""{\"$key1\": 1}""#);
}

#[test]
fn test_hook_error_propagates() {
    #[derive(Debug)]
    struct Refused;

    impl std::fmt::Display for Refused {
        fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            f.write_str("refused")
        }
    }

    impl std::error::Error for Refused {}

    let mut ext = Extension::new();
    ext.register_keyed_decoder("$bad", |_: &[u8]| Err(Refused.into()));
    let mut decoder = Decoder::new();
    decoder.attach(&ext);
    match decoder.decode_str::<Value>(r#"[{"$bad": 0}]"#) {
        Err(Error::Hook(error)) => {
            assert!(error.downcast_ref::<Refused>().is_some());
            assert_eq!(error.to_string(), "refused");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_calls_rejected_without_registry() {
    assert!(matches!(
        extjson::from_str::<Value>("Func1()"),
        Err(Error::UnknownFunction(_))
    ));
}

#[test]
fn test_decoder_state_survives_errors() {
    let ext = registry();
    let mut decoder = Decoder::new();
    decoder.attach(&ext);
    assert!(decoder.decode_str::<Value>("Func2(1, 2, 3)").is_err());
    assert_eq!(
        decoder.decode_str::<Value>("Func2(1)").unwrap(),
        json(r#"{"$func2": {"arg1": 1}}"#)
    );
}

#[test]
fn test_shared_registry_across_threads() {
    let ext = registry();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let mut decoder = Decoder::new();
                decoder.attach(&ext);
                let value: Value = decoder.decode_str("Func2(1, 2)").unwrap();
                assert_eq!(value, json(r#"{"$func2": {"arg1": 1, "arg2": 2}}"#));
            });
        }
    });
}

#[test]
fn test_calls_in_unread_elements_are_checked() {
    match decode::<(i64, i64)>("[1, 2, BadFunc()]") {
        Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
        other => panic!("unexpected: {other:?}"),
    }
    match decode::<[i64; 1]>("[1, [Func2(1, 2, 3)]]") {
        Err(Error::TooManyArguments(name)) => assert_eq!(name, "Func2"),
        other => panic!("unexpected: {other:?}"),
    }
    #[derive(Debug, Deserialize)]
    struct FirstArg {
        #[serde(rename = "$func2")]
        _args: (i64,),
    }
    match decode::<FirstArg>("Func2(1, BadFunc())") {
        Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
        other => panic!("unexpected: {other:?}"),
    }
    // Extra elements without calls are dropped.
    assert_eq!(decode::<(i64, i64)>("[1, 2, 3, Func1()]").unwrap(), (1, 2));
}

#[test]
fn test_calls_inside_keyed_values_are_checked() {
    match decode::<Value>(r#"{"$key1": BadFunc()}"#) {
        Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
        other => panic!("unexpected: {other:?}"),
    }
    match decode::<Value>("Func3(BadFunc())") {
        Err(Error::UnknownFunction(name)) => assert_eq!(name, "BadFunc"),
        other => panic!("unexpected: {other:?}"),
    }
    match decode::<Value>(r#"{"$key1": Func2(1, 2, 3)}"#) {
        Err(Error::TooManyArguments(name)) => assert_eq!(name, "Func2"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(
        decode::<Value>(r#"{"$key1": Func2(1, 2)}"#).unwrap(),
        Value::from(r#"{"$key1": Func2(1, 2)}"#)
    );
}
