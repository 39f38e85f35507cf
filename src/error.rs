//! Error types for schema parsing, encoding and decoding

use std::str::Utf8Error;

use thiserror::Error;

/// Errors that can occur while building a schema model
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Schema text is not valid JSON or does not describe a type
    #[error("Malformed schema: {0}")]
    Malformed(String),
    /// A type reference names nothing known to the parser
    #[error("Unknown type: {0}")]
    UnknownType(String),
    /// A field, enum symbol or named type was declared twice in one scope
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    /// Union nests a union or repeats a branch kind
    #[error("Invalid union: {0}")]
    InvalidUnion(String),
    /// Name breaks Avro naming rules (strict mode only)
    #[error("Invalid name: {0}")]
    InvalidName(String),
    /// Field default does not fit the field type
    #[error("Invalid default for field '{field}': {message}")]
    InvalidDefault { field: String, message: String },
}

/// Errors that can occur while encoding a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// Value kind does not fit the schema node
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// Record value lacks a field that has no default
    #[error("Record '{record}' is missing required field '{field}'")]
    MissingField { record: String, field: String },
    /// No union branch accepts the value
    #[error("No union branch accepts value of kind {0}")]
    NoMatchingBranch(String),
    /// Bytes supplied for a string field are not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    /// Fixed value has the wrong length
    #[error("Fixed size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    /// Enum value names no symbol of the enum
    #[error("Unknown symbol '{symbol}' for enum '{name}'")]
    UnknownSymbol { name: String, symbol: String },
    /// Integer does not fit the target width
    #[error("Value {value} out of range for {expected}")]
    OutOfRange { expected: &'static str, value: i64 },
    /// Named reference missing from the schema registry
    #[error("Unresolved named type: {0}")]
    UnresolvedName(String),
    /// Value nests deeper than the configured maximum depth
    #[error("Nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

/// Errors that can occur while decoding binary or textual input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Input ended before the current value was complete
    #[error("Unexpected end of input")]
    Truncated,
    /// Varint did not terminate within the maximum width
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// Union branch index outside the branch list
    #[error("Union index {index} out of range (0..{branches})")]
    InvalidUnionIndex { index: i64, branches: usize },
    /// String bytes are not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),
    /// Input violates the encoding in some other way
    #[error("Malformed input: {0}")]
    Malformed(String),
    /// Bytes remained after a whole-buffer decode
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    /// Union wrapper key matches no branch
    #[error("Unknown union tag '{0}'")]
    UnknownUnionTag(String),
    /// JSON shape does not fit the schema node
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// Nesting exceeded the configured maximum depth
    #[error("Nesting exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Encode error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}
