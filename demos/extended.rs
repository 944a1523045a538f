//! Decoding call expressions and keyed values, then encoding with a type
//! encoder.
//!
//! Run with `cargo run --example extended`.

use extjson::{Decoder, Encoder, Extension, RawJson, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Point {
    x: i64,
    #[serde(default)]
    y: i64,
}

#[derive(Debug, Deserialize)]
struct Shape {
    #[serde(rename = "$point")]
    origin: Point,
}

#[derive(Debug, Deserialize)]
struct Document {
    shape: Shape,
    source: RawJson,
    stamp: Value,
}

#[derive(Serialize)]
struct Docint(i64);

#[derive(Serialize)]
struct Report {
    id: Docint,
    label: &'static str,
}

fn main() -> extjson::Result<()> {
    let mut ext = Extension::new();
    ext.register_function("Point", "$point", &["x", "y"])
        .register_function("Now", "$now", &[])
        .register_keyed_decoder("$now", |raw: &[u8]| {
            Ok(Value::from(format!("stamp:{}", String::from_utf8_lossy(raw))))
        });
    ext.register_type_encoder(&Docint(0), |value| {
        Ok(format!(r#"{{"$docint":{value}}}"#).into_bytes())
    })?;

    let input = r#"{
        "shape": Point(3),
        "source": Point(1,   2),
        "stamp": Now()
    }"#;

    let mut decoder = Decoder::new();
    decoder.attach(&ext);
    let document: Document = decoder.decode_str(input)?;
    println!("origin = ({}, {})", document.shape.origin.x, document.shape.origin.y);
    println!("source = {}", document.source);
    println!("stamp  = {}", document.stamp);

    let generic: Value = decoder.decode_str("[Point(1, 2), Point(5)]")?;
    println!("generic = {generic}");

    match decoder.decode_str::<Value>("Point(1, 2, 3)") {
        Err(error) => println!("error  = {error}"),
        Ok(value) => println!("unexpected = {value}"),
    }

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out);
    encoder.attach(&ext);
    encoder.encode(&Report {
        id: Docint(13),
        label: "<b>",
    })?;
    print!("encoded = {}", String::from_utf8_lossy(&out));
    Ok(())
}
