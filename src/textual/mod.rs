//! Avro JSON (textual) encoding.
//!
//! Non-null union values are wrapped as `{"<type name>": value}`; bytes and
//! fixed values are strings of code points 0-255; doubles always print with
//! a decimal point or exponent, and non-finite doubles as `"NaN"`,
//! `"Infinity"` or `"-Infinity"`.

pub mod decode;
pub mod encode;

pub use decode::{
    decode_json, decode_json_with_options, decode_textual, decode_textual_with_options,
};
pub use encode::{
    encode_json, encode_json_with_options, encode_textual, encode_textual_with_options,
};
