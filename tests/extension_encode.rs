//! Encoding with type encoders.

use extjson::{Encoder, Error, Extension, Value};
use serde::Serialize;

#[derive(Serialize)]
struct Docint(i64);

#[derive(Serialize)]
struct Wrapper {
    id: Docint,
    name: &'static str,
}

#[derive(Serialize)]
struct Point {
    x: i32,
    y: i32,
}

#[derive(Serialize)]
enum Shape {
    Empty,
    Circle(u32),
    Line(Point, Point),
    Rect { w: u32, h: u32 },
}

fn registry() -> Extension {
    let mut ext = Extension::new();
    ext.register_type_encoder(&Docint(0), |value| {
        Ok(format!(r#"{{"$docint":{value}}}"#).into_bytes())
    })
    .unwrap();
    ext
}

fn encode<T: Serialize>(ext: &Extension, value: &T) -> extjson::Result<String> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.attach(ext);
    encoder.encode(value)?;
    Ok(String::from_utf8(encoder.into_inner()).unwrap())
}

#[test]
fn test_type_encoder_output_is_verbatim() {
    let ext = registry();
    assert_eq!(encode(&ext, &Docint(13)).unwrap(), "{\"$docint\":13}\n");
}

#[test]
fn test_type_encoder_nested() {
    let ext = registry();
    let out = encode(
        &ext,
        &Wrapper {
            id: Docint(7),
            name: "w",
        },
    )
    .unwrap();
    assert_eq!(out, "{\"id\":{\"$docint\":7},\"name\":\"w\"}\n");

    let out = encode(&ext, &vec![Docint(1), Docint(2)]).unwrap();
    assert_eq!(out, "[{\"$docint\":1},{\"$docint\":2}]\n");
}

#[test]
fn test_without_registry_uses_default_encoding() {
    let out = encode(&Extension::new(), &Docint(13)).unwrap();
    assert_eq!(out, "13\n");
    assert_eq!(extjson::to_string(&Docint(13)).unwrap(), "13");
}

#[test]
fn test_hook_receives_structural_form() {
    let mut ext = Extension::new();
    ext.register_type_encoder(&Point { x: 0, y: 0 }, |value| {
        let x = value.get("x").and_then(Value::as_i64).unwrap_or_default();
        let y = value.get("y").and_then(Value::as_i64).unwrap_or_default();
        Ok(format!("[{x},{y}]").into_bytes())
    })
    .unwrap();
    assert_eq!(encode(&ext, &Point { x: 3, y: -4 }).unwrap(), "[3,-4]\n");
}

#[test]
fn test_enum_encoder_covers_every_variant() {
    let mut ext = Extension::new();
    ext.register_type_encoder(&Shape::Empty, |value| {
        Ok(format!(r#"{{"shape":{value}}}"#).into_bytes())
    })
    .unwrap();
    assert_eq!(
        encode(&ext, &Shape::Empty).unwrap(),
        "{\"shape\":\"Empty\"}\n"
    );
    assert_eq!(
        encode(&ext, &Shape::Circle(2)).unwrap(),
        "{\"shape\":{\"Circle\":2}}\n"
    );
    assert_eq!(
        encode(&ext, &Shape::Rect { w: 1, h: 2 }).unwrap(),
        "{\"shape\":{\"Rect\":{\"h\":2,\"w\":1}}}\n"
    );
    assert_eq!(
        encode(
            &ext,
            &Shape::Line(Point { x: 0, y: 1 }, Point { x: 2, y: 3 })
        )
        .unwrap(),
        "{\"shape\":{\"Line\":[{\"x\":0,\"y\":1},{\"x\":2,\"y\":3}]}}\n"
    );
}

#[test]
fn test_default_enum_encoding() {
    let ext = Extension::new();
    assert_eq!(encode(&ext, &Shape::Empty).unwrap(), "\"Empty\"\n");
    assert_eq!(encode(&ext, &Shape::Circle(2)).unwrap(), "{\"Circle\":2}\n");
    assert_eq!(
        encode(&ext, &Shape::Rect { w: 1, h: 2 }).unwrap(),
        "{\"Rect\":{\"w\":1,\"h\":2}}\n"
    );
}

#[test]
fn test_named_registration() {
    let mut ext = Extension::new();
    ext.register_type_encoder_named("Docint", |_| Ok(b"0".to_vec()));
    assert_eq!(encode(&ext, &Docint(99)).unwrap(), "0\n");
}

#[test]
fn test_unnamed_exemplar_is_rejected() {
    let mut ext = Extension::new();
    assert!(matches!(
        ext.register_type_encoder(&42u8, |_| Ok(Vec::new())),
        Err(Error::UnnamedType)
    ));
    assert!(ext.is_empty());
}

#[test]
fn test_hook_error_aborts_encode() {
    let mut ext = Extension::new();
    ext.register_type_encoder(&Docint(0), |_| Err("no docints today".into()))
        .unwrap();
    let mut encoder = Encoder::new(Vec::new());
    encoder.attach(&ext);
    match encoder.encode(&vec![Docint(1)]) {
        Err(Error::Hook(error)) => assert_eq!(error.to_string(), "no docints today"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(encoder.get_ref().is_empty());
}

#[test]
fn test_encoder_escapes_html_by_default() {
    let ext = Extension::new();
    assert_eq!(encode(&ext, &"<a&b>").unwrap(), "\"\\u003ca\\u0026b\\u003e\"\n");

    let mut encoder = Encoder::new(Vec::new());
    encoder.set_escape_html(false);
    encoder.encode(&"<a&b>").unwrap();
    assert_eq!(encoder.into_inner(), b"\"<a&b>\"\n");
}
