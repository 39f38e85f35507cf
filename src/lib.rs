//! Schema-driven Avro binary and JSON codec
//!
//! Parse a schema once, then convert [`Value`] trees to and from the compact
//! Avro binary encoding or the Avro JSON encoding. Parsed schemas and
//! [`Codec`] instances are immutable and can be shared across threads.
//!
//! ```
//! use avrolite::{Codec, Value};
//!
//! let codec = Codec::new(r#"["null", "string"]"#).unwrap();
//! assert_eq!(codec.encode_binary(&Value::from("x")).unwrap(), vec![0x02, 0x02, b'x']);
//! assert_eq!(codec.encode_textual(&Value::from("x")).unwrap(), r#"{"string":"x"}"#);
//! ```

pub mod binary;
pub mod codec;
pub mod error;
pub mod schema;
pub mod textual;
pub mod union;
pub mod value;

// Re-export main types
pub use binary::{
    decode_binary, decode_binary_exact, encode_binary, encode_binary_into, BinaryDecoder,
    BinaryEncoder,
};
pub use codec::{Codec, CodecOptions};
pub use error::{DecodeError, EncodeError, Error, SchemaError};
pub use schema::{
    parse_schema, parse_schema_with_options, EnumSchema, FieldSchema, FixedSchema, NameRegistry,
    RecordSchema, Schema, SchemaNode, SchemaParser,
};
pub use textual::{
    decode_textual, decode_textual_with_options, encode_textual, encode_textual_with_options,
};
pub use value::Value;
