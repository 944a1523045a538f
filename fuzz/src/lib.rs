use extjson::{Decoder, Encoder, Extension, RawJson, Value, scan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestCompound {
    int_val: i32,
    long_val: i64,
    double_val: f64,
    string_val: String,
    #[serde(default)]
    list_ints: Vec<i32>,
    #[serde(default)]
    nested: Option<Box<TestCompound>>,
    #[serde(default)]
    map_vals: HashMap<String, i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TestEnum {
    Unit,
    Newtype(i32),
    Tuple(i32, String),
    Struct { x: i32, y: i32 },
}

#[derive(Debug, Deserialize)]
struct WithRaw {
    #[serde(default)]
    raw: RawJson,
    #[serde(default, rename = "$func2")]
    func2: Option<HashMap<String, Value>>,
}

fn registry() -> Extension {
    let mut ext = Extension::new();
    ext.register_function("Func1", "$func1", &[])
        .register_function("Func2", "$func2", &["arg1", "arg2"])
        .register_function("Func3", "$func3", &["arg1"])
        .register_keyed_decoder("$key1", |raw: &[u8]| {
            Ok(Value::String(String::from_utf8(raw.to_vec())?))
        })
        .register_keyed_decoder("$func3", |raw: &[u8]| Ok(Value::from(raw.len())));
    ext.register_type_encoder_named("TestEnum", |value| Ok(value.to_string().into_bytes()));
    ext
}

fn reencode<T: Serialize>(ext: &Extension, value: &T) {
    let mut encoder = Encoder::new(Vec::new());
    encoder.attach(ext);
    let _ = encoder.encode(value);
    let _ = extjson::to_vec(value);
}

pub fn test_serde(data: &[u8]) {
    let ext = registry();
    let mut decoder = Decoder::new();
    decoder.attach(&ext);

    if let Ok(val) = decoder.decode_slice::<TestCompound>(data) {
        reencode(&ext, &val);
    }
    if let Ok(val) = decoder.decode_slice::<TestEnum>(data) {
        reencode(&ext, &val);
    }
    if let Ok(val) = decoder.decode_slice::<WithRaw>(data) {
        let _ = extjson::scan(val.raw.get().as_bytes());
    }
    if let Ok(val) = decoder.decode_slice::<Vec<RawJson>>(data) {
        for raw in &val {
            assert!(extjson::valid(raw.get().as_bytes()));
        }
    }
    if let Ok(val) = decoder.decode_slice::<HashMap<String, i32>>(data) {
        reencode(&ext, &val);
    }
}

pub fn test_value(data: &[u8]) {
    let ext = registry();
    let mut decoder = Decoder::new();
    decoder.attach(&ext);

    let scanned = scan(data);
    let decoded = decoder.decode_slice::<Value>(data);
    if scanned.is_err() {
        assert!(decoded.is_err());
    }
    if let Ok(value) = decoded {
        // Expanded documents contain no call expressions.
        let text = value.to_string();
        assert!(extjson::from_str::<Value>(&text).is_ok());
    }
}

pub fn test(data: &[u8]) {
    test_serde(data);
    test_value(data);
}
