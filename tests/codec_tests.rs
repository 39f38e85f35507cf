//! Tests for the codec facade.

use std::sync::Arc;
use std::thread;

use avrolite::{Codec, CodecOptions, DecodeError, EncodeError, Error, SchemaError, Value};

const LOG_DATA: &str = r#"{
    "type": "record",
    "name": "LogData",
    "fields": [
        {"name": "timestamp", "type": "long"},
        {"name": "logtype", "type": "string"},
        {"name": "version", "type": "string"},
        {"name": "issuer", "type": "string"},
        {"name": "metadata", "type": ["null", {"type": "map", "values": "string"}], "default": null},
        {"name": "domainData", "type": ["null", {"type": "map", "values": "string"}], "default": null}
    ]
}"#;

fn entry(i: i64) -> Value {
    Value::record([
        ("timestamp", Value::Long(i)),
        ("logtype", Value::from("audit")),
        ("version", Value::from("1")),
        ("issuer", Value::from(format!("node-{}", i))),
        ("metadata", Value::Null),
        (
            "domainData",
            Value::map([("order", Value::from(i.to_string()))]),
        ),
    ])
}

#[test]
fn test_codec_binary_and_textual_round_trip() {
    let codec = Codec::new(LOG_DATA).unwrap();
    let value = entry(42);

    let bytes = codec.encode_binary(&value).unwrap();
    assert_eq!(codec.decode_binary_exact(&bytes).unwrap(), value);

    let text = codec.encode_textual(&value).unwrap();
    assert_eq!(codec.decode_textual(&text).unwrap(), value);

    // Binary is the compact form
    assert!(bytes.len() < text.len());
}

#[test]
fn test_codec_defaults_for_optional_fields() {
    let codec = Codec::new(LOG_DATA).unwrap();
    let sparse = Value::record([
        ("timestamp", Value::Long(1)),
        ("logtype", Value::from("t")),
        ("version", Value::from("v")),
        ("issuer", Value::from("i")),
    ]);
    let decoded = codec
        .decode_binary_exact(&codec.encode_binary(&sparse).unwrap())
        .unwrap();
    assert_eq!(decoded.field("metadata"), Some(&Value::Null));
    assert_eq!(decoded.field("domainData"), Some(&Value::Null));
}

#[test]
fn test_validate() {
    let codec = Codec::new(LOG_DATA).unwrap();
    assert!(codec.validate(&entry(1)).is_ok());
    assert!(matches!(
        codec.validate(&Value::Long(1)),
        Err(EncodeError::TypeMismatch { .. })
    ));
}

#[test]
fn test_canonical_schema_rebuilds_equal_codec() {
    let codec = Codec::new(LOG_DATA).unwrap();
    let again = Codec::new(&codec.canonical_schema()).unwrap();
    assert_eq!(codec.schema(), again.schema());
}

#[test]
fn test_invalid_schema_is_reported() {
    assert!(matches!(
        Codec::new(r#"{"type": "record", "name": "R"}"#),
        Err(SchemaError::Malformed(_))
    ));
}

#[test]
fn test_errors_convert_to_top_level() {
    fn run() -> Result<Value, Error> {
        let codec = Codec::with_options(r#"["null", "long"]"#, CodecOptions::default())?;
        let bytes = codec.encode_binary(&Value::Long(9))?;
        Ok(codec.decode_binary_exact(&bytes)?)
    }
    assert_eq!(run().unwrap(), Value::Long(9));

    let err: Error = Codec::new(r#""nope""#).unwrap_err().into();
    assert!(matches!(err, Error::Schema(SchemaError::UnknownType(_))));
}

#[test]
fn test_shared_codec_across_threads() {
    let codec = Arc::new(Codec::new(LOG_DATA).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let codec = Arc::clone(&codec);
            thread::spawn(move || {
                for i in 0..100 {
                    let value = entry(t * 1000 + i);
                    let bytes = codec.encode_binary(&value).unwrap();
                    assert_eq!(codec.decode_binary_exact(&bytes).unwrap(), value);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_max_depth_governs_every_operation() {
    let cons = r#"{
        "type": "record", "name": "Cons",
        "fields": [{"name": "tail", "type": ["null", "Cons"]}]
    }"#;
    let list = |len: usize| {
        (0..len).fold(Value::Null, |tail, _| Value::record([("tail", tail)]))
    };
    let codec = Codec::with_options(cons, CodecOptions::new().with_max_depth(8)).unwrap();

    let bytes = codec.encode_binary(&list(8)).unwrap();
    assert_eq!(codec.decode_binary_exact(&bytes).unwrap(), list(8));
    let text = codec.encode_textual(&list(8)).unwrap();
    assert_eq!(codec.decode_textual(&text).unwrap(), list(8));

    assert_eq!(codec.validate(&list(9)), Err(EncodeError::DepthExceeded(8)));
    assert_eq!(codec.encode_binary(&list(9)), Err(EncodeError::DepthExceeded(8)));
    assert_eq!(codec.encode_textual(&list(9)), Err(EncodeError::DepthExceeded(8)));

    let roomy = Codec::new(cons).unwrap();
    let text = roomy.encode_textual(&list(9)).unwrap();
    assert_eq!(
        codec.decode_textual(&text),
        Err(DecodeError::DepthExceeded(8))
    );
}
