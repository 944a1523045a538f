use extjson::{Error, Map, Number, Value, from_str, from_value, to_value};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Config {
    name: String,
    level: u8,
    ratio: f64,
    flags: Vec<bool>,
    mode: Mode,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
enum Mode {
    Fast,
    Limited(u32),
    Custom { depth: i16 },
}

#[test]
fn test_parse_and_access() {
    let value: Value = from_str(r#"{"a": [1, -2, 3.5], "b": {"c": null}, "d": "x", "e": true}"#)
        .unwrap();
    let items = value.get("a").and_then(Value::as_array).unwrap();
    assert_eq!(items[0].as_i64(), Some(1));
    assert_eq!(items[1], Value::Number(Number::NegInt(-2)));
    assert_eq!(items[2].as_f64(), Some(3.5));
    assert!(value.get("b").and_then(|b| b.get("c")).unwrap().is_null());
    assert_eq!(value.get("d").and_then(Value::as_str), Some("x"));
    assert_eq!(value.get("e").and_then(Value::as_bool), Some(true));
    assert_eq!(value.get("missing"), None);
    assert_eq!(value.as_object().map(Map::len), Some(4));
}

#[test]
fn test_kind_names() {
    let kinds: Vec<&str> = [
        Value::Null,
        Value::from(false),
        Value::from(1),
        Value::from("s"),
        Value::from(Vec::new()),
        Value::from(Map::new()),
    ]
    .iter()
    .map(Value::kind)
    .collect();
    assert_eq!(kinds, ["null", "bool", "number", "string", "array", "object"]);
}

#[test]
fn test_numbers() {
    assert_eq!(Number::from(-1i64), Number::NegInt(-1));
    assert_eq!(Number::from(5i64), Number::PosInt(5));
    assert_eq!(Number::PosInt(u64::MAX).as_i64(), None);
    assert_eq!(Number::PosInt(u64::MAX).as_u64(), Some(u64::MAX));
    assert!(!Number::Float(1.0).is_integer());
    assert_eq!(
        from_str::<Value>("18446744073709551615").unwrap(),
        Value::Number(Number::PosInt(u64::MAX))
    );
}

#[test]
fn test_single_key() {
    assert_eq!(from_str::<Value>(r#"{"$k": 1}"#).unwrap().single_key(), Some("$k"));
    assert_eq!(from_str::<Value>(r#"{"a": 1, "b": 2}"#).unwrap().single_key(), None);
    assert_eq!(Value::from("$k").single_key(), None);
}

#[test]
fn test_display_is_compact_json() {
    let value: Value = from_str(r#" { "b" : [ 1 , "q\"" ] , "a" : null } "#).unwrap();
    assert_eq!(value.to_string(), r#"{"a":null,"b":[1,"q\""]}"#);
}

#[test]
fn test_to_value() {
    let config = Config {
        name: "c".into(),
        level: 3,
        ratio: 0.5,
        flags: vec![true],
        mode: Mode::Custom { depth: -2 },
    };
    let value = to_value(&config).unwrap();
    assert_eq!(
        value.to_string(),
        r#"{"flags":[true],"level":3,"mode":{"Custom":{"depth":-2}},"name":"c","ratio":0.5}"#
    );
    assert_eq!(to_value(&Mode::Fast).unwrap(), Value::from("Fast"));
    assert_eq!(
        to_value(&Mode::Limited(9)).unwrap(),
        Value::from_iter([("Limited", 9)])
    );
}

#[test]
fn test_from_value() {
    let value: Value = from_str(
        r#"{"name": "c", "level": 3, "ratio": 1, "flags": [], "mode": {"Limited": 4}}"#,
    )
    .unwrap();
    let config: Config = from_value(value).unwrap();
    assert_eq!(
        config,
        Config {
            name: "c".into(),
            level: 3,
            ratio: 1.0,
            flags: vec![],
            mode: Mode::Limited(4),
        }
    );
    assert_eq!(from_value::<Mode>(Value::from("Fast")).unwrap(), Mode::Fast);
    assert_eq!(from_value::<Option<u8>>(Value::Null).unwrap(), None);
}

#[test]
fn test_from_value_mismatch_has_no_offset() {
    match from_value::<i32>(Value::from("x")) {
        Err(Error::TypeMismatch { kind, offset, .. }) => {
            assert_eq!(kind, "string");
            assert_eq!(offset, None);
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(from_value::<Mode>(Value::from(3)).is_err());
}

#[test]
fn test_value_round_trip_through_text() {
    let text = r#"{"list":[1,2.5,"three",null,[],{}],"nested":{"deep":{"deeper":[true]}}}"#;
    let value: Value = from_str(text).unwrap();
    assert_eq!(extjson::to_string(&value).unwrap(), text);
}
