use extjson::raw::{self, RawCapture};
use extjson::{HookError, RawJson, Value, from_str, from_value};
use serde::Deserialize;

#[test]
fn test_raw_json_keeps_original_text() {
    let raw: RawJson = from_str(r#"  {"b" : 1,  "a": [ ]}  "#).unwrap();
    assert_eq!(raw.get(), r#"{"b" : 1,  "a": [ ]}"#);

    let raw: RawJson = from_str(r#""esc\"aped""#).unwrap();
    assert_eq!(raw.to_string(), r#""esc\"aped""#);
    assert_eq!(raw.into_string(), r#""esc\"aped""#);

    let raw: RawJson = from_str("-1.5e3").unwrap();
    assert_eq!(String::from(raw), "-1.5e3");
}

#[test]
fn test_raw_fields_in_struct() {
    #[derive(Deserialize)]
    struct Envelope {
        kind: String,
        body: RawJson,
        tail: Vec<RawJson>,
    }
    let envelope: Envelope =
        from_str(r#"{"kind": "k", "body": {"x": [1, 2]}, "tail": [true, null, "s"]}"#).unwrap();
    assert_eq!(envelope.kind, "k");
    assert_eq!(envelope.body.get(), r#"{"x": [1, 2]}"#);
    let tail: Vec<&str> = envelope.tail.iter().map(RawJson::get).collect();
    assert_eq!(tail, ["true", "null", "\"s\""]);
}

#[test]
fn test_capture_adapter() {
    #[derive(Deserialize)]
    struct Doc {
        #[serde(deserialize_with = "raw::capture")]
        text: String,
        #[serde(deserialize_with = "raw::capture")]
        bytes: Vec<u8>,
    }
    let doc: Doc = from_str(r#"{"text": [1,2], "bytes": {"a": 1}}"#).unwrap();
    assert_eq!(doc.text, "[1,2]");
    assert_eq!(doc.bytes, br#"{"a": 1}"#);
}

#[derive(Debug, Default)]
struct Digest {
    len: usize,
    braces: usize,
}

impl RawCapture for Digest {
    fn accept(&mut self, raw: &[u8]) -> Result<(), HookError> {
        if raw.is_empty() {
            return Err("empty".into());
        }
        self.len = raw.len();
        self.braces = raw.iter().filter(|&&b| b == b'{').count();
        Ok(())
    }
}

#[test]
fn test_custom_capture() {
    #[derive(Deserialize)]
    struct Doc {
        #[serde(deserialize_with = "raw::capture")]
        digest: Digest,
    }
    let doc: Doc = from_str(r#"{"digest": {"a": {"b": {}}}}"#).unwrap();
    assert_eq!(doc.digest.len, 16);
    assert_eq!(doc.digest.braces, 3);
}

#[test]
fn test_capture_from_value_re_encodes() {
    let value: Value = from_str(r#"{"b": [1, 2],  "a": "x"}"#).unwrap();
    let raw: RawJson = from_value(value).unwrap();
    assert_eq!(raw.get(), r#"{"a":"x","b":[1,2]}"#);
}

#[test]
fn test_raw_json_equality() {
    let a: RawJson = from_str("[1,2]").unwrap();
    let b: RawJson = from_str("[1,2]").unwrap();
    let c: RawJson = from_str("[1, 2]").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(RawJson::default().get(), "");
}
