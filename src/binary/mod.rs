//! Avro binary encoding.

pub mod decode;
pub mod encode;
pub mod varint;

pub use decode::{decode_binary, decode_binary_exact, BinaryDecoder};
pub use encode::{encode_binary, encode_binary_into, validate_value, BinaryEncoder};
