//! Codec facade.
//!
//! A [`Codec`] binds one parsed schema to the binary and textual encoders.
//! It holds no mutable state, so one instance can be shared across threads
//! (wrap it in an `Arc`) and called concurrently.

use tracing::{debug, trace};

use crate::binary::{BinaryDecoder, BinaryEncoder};
use crate::error::{DecodeError, EncodeError, SchemaError};
use crate::schema::{parse_schema_with_options, Schema};
use crate::textual::{decode_textual_with_options, encode_textual_with_options};
use crate::value::Value;

/// Codec configuration.
///
/// # Example
/// ```
/// use avrolite::CodecOptions;
///
/// let opts = CodecOptions::new()
///     .with_strict_names(true)
///     .with_max_depth(64);
/// assert_eq!(opts.max_zero_width_items, 1 << 20);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecOptions {
    /// Reject names that break Avro naming rules instead of warning (default: false).
    pub strict_names: bool,

    /// Maximum nesting depth for encoding and decoding, in both forms
    /// (default: 256).
    ///
    /// Records, arrays and maps each add one level; unions do not.
    /// Recursive schemas can describe unbounded nesting; this keeps hostile
    /// input from exhausting the stack, and the encoders refuse values their
    /// decoders would reject.
    pub max_depth: usize,

    /// Largest total number of zero-byte items (such as `null`) one binary
    /// decode call may produce (default: 1M).
    ///
    /// Such items consume no input, so the remaining buffer length cannot
    /// bound them.
    pub max_zero_width_items: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            strict_names: false,
            max_depth: 256,
            max_zero_width_items: 1 << 20,
        }
    }
}

impl CodecOptions {
    /// Create a new `CodecOptions` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict name validation.
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the zero-width item limit.
    pub fn with_max_zero_width_items(mut self, limit: usize) -> Self {
        self.max_zero_width_items = limit;
        self
    }
}

/// A parsed schema bound to the encode and decode operations.
///
/// # Example
/// ```
/// use avrolite::{Codec, Value};
///
/// let codec = Codec::new(r#"{
///     "type": "record", "name": "User",
///     "fields": [
///         {"name": "id", "type": "long"},
///         {"name": "active", "type": "boolean", "default": true}
///     ]
/// }"#).unwrap();
///
/// let user = Value::record([("id", Value::Long(7))]);
/// let bytes = codec.encode_binary(&user).unwrap();
/// assert_eq!(bytes, vec![0x0E, 0x01]);
///
/// let decoded = codec.decode_binary_exact(&bytes).unwrap();
/// assert_eq!(decoded.field("active"), Some(&Value::Bool(true)));
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
    options: CodecOptions,
}

impl Codec {
    /// Parse schema text with default options.
    pub fn new(schema_text: &str) -> Result<Self, SchemaError> {
        Self::with_options(schema_text, CodecOptions::default())
    }

    /// Parse schema text with the given options.
    pub fn with_options(schema_text: &str, options: CodecOptions) -> Result<Self, SchemaError> {
        let schema = parse_schema_with_options(schema_text, options.strict_names)?;
        Ok(Self::from_schema(schema, options))
    }

    /// Wrap an already parsed schema.
    pub fn from_schema(schema: Schema, options: CodecOptions) -> Self {
        debug!(
            root = %schema.root().type_name(),
            named_types = schema.names().len(),
            "built codec"
        );
        Self { schema, options }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Canonical JSON text of the bound schema.
    pub fn canonical_schema(&self) -> String {
        self.schema.to_json()
    }

    /// Encode a value to a new buffer.
    pub fn encode_binary(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_binary_into(&mut out, value)?;
        Ok(out)
    }

    /// Append the encoding of a value to `out`.
    ///
    /// On failure `out` keeps its original contents.
    pub fn encode_binary_into(&self, out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
        let start = out.len();
        BinaryEncoder::new(&self.schema, &self.options).encode_into(out, value)?;
        trace!(bytes = out.len() - start, "encoded binary");
        Ok(())
    }

    /// Decode one value from the front of `bytes`, returning it with the
    /// number of bytes consumed.
    pub fn decode_binary(&self, bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
        let (value, consumed) = BinaryDecoder::new(&self.schema, &self.options).decode(bytes)?;
        trace!(bytes = consumed, "decoded binary");
        Ok((value, consumed))
    }

    /// Decode exactly one value spanning all of `bytes`.
    pub fn decode_binary_exact(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let value = BinaryDecoder::new(&self.schema, &self.options).decode_exact(bytes)?;
        trace!(bytes = bytes.len(), "decoded binary");
        Ok(value)
    }

    /// Encode a value as JSON text.
    pub fn encode_textual(&self, value: &Value) -> Result<String, EncodeError> {
        let text = encode_textual_with_options(&self.schema, value, &self.options)?;
        trace!(bytes = text.len(), "encoded textual");
        Ok(text)
    }

    /// Decode JSON text into a value.
    pub fn decode_textual(&self, text: &str) -> Result<Value, DecodeError> {
        trace!(bytes = text.len(), "decoding textual");
        decode_textual_with_options(&self.schema, text, &self.options)
    }

    /// Run the encoder's checks without keeping any output.
    pub fn validate(&self, value: &Value) -> Result<(), EncodeError> {
        BinaryEncoder::new(&self.schema, &self.options).validate(value)
    }
}
