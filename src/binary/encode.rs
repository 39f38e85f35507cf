//! Binary encoder.
//!
//! Writes values in the Avro binary layout:
//! - `null` takes no bytes, booleans one byte
//! - ints and longs are zigzag varints
//! - floats and doubles are little-endian IEEE 754
//! - bytes and strings are length-prefixed
//! - arrays and maps are written as one counted block plus a zero block
//! - unions write the branch index, then the value
//! - records write their fields in declaration order

use crate::codec::CodecOptions;
use crate::error::EncodeError;
use crate::schema::{NameRegistry, RecordSchema, Schema, SchemaNode};
use crate::union::candidates;
use crate::value::Value;

use super::varint::write_zigzag;

/// Encode a value against a schema into a new buffer.
pub fn encode_binary(schema: &Schema, value: &Value) -> Result<Vec<u8>, EncodeError> {
    BinaryEncoder::new(schema, &CodecOptions::default()).encode(value)
}

/// Append the encoding of a value to `out`.
///
/// On failure `out` is truncated back to its original length.
pub fn encode_binary_into(
    out: &mut Vec<u8>,
    schema: &Schema,
    value: &Value,
) -> Result<(), EncodeError> {
    BinaryEncoder::new(schema, &CodecOptions::default()).encode_into(out, value)
}

/// Check that a value encodes under a schema, discarding the output.
pub fn validate_value(schema: &Schema, value: &Value) -> Result<(), EncodeError> {
    BinaryEncoder::new(schema, &CodecOptions::default()).validate(value)
}

#[inline]
pub fn write_boolean(out: &mut Vec<u8>, value: bool) {
    out.push(value as u8);
}

#[inline]
pub fn write_long(out: &mut Vec<u8>, value: i64) {
    write_zigzag(out, value);
}

#[inline]
pub fn write_float(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[inline]
pub fn write_double(out: &mut Vec<u8>, value: f64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write a length-prefixed byte sequence.
#[inline]
pub fn write_bytes(out: &mut Vec<u8>, value: &[u8]) {
    write_zigzag(out, value.len() as i64);
    out.extend_from_slice(value);
}

#[inline]
pub fn write_string(out: &mut Vec<u8>, value: &str) {
    write_bytes(out, value.as_bytes());
}

fn mismatch(schema: &SchemaNode, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: schema.type_name().into_owned(),
        found: value.kind(),
    }
}

/// Encoder bound to one schema and a depth limit.
///
/// Depth counts records, arrays and maps; unions and named references do
/// not add a level. [`BinaryDecoder`](super::BinaryDecoder) counts the same
/// way, so anything this encoder accepts decodes under the same options.
#[derive(Debug, Clone, Copy)]
pub struct BinaryEncoder<'a> {
    root: &'a SchemaNode,
    names: &'a NameRegistry,
    max_depth: usize,
}

impl<'a> BinaryEncoder<'a> {
    pub fn new(schema: &'a Schema, options: &CodecOptions) -> Self {
        Self {
            root: schema.root(),
            names: schema.names(),
            max_depth: options.max_depth,
        }
    }

    /// Encode a value into a new buffer.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_value(&mut out, self.root, value, 0)?;
        Ok(out)
    }

    /// Append the encoding of a value to `out`, restoring `out` on failure.
    pub fn encode_into(&self, out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
        let start = out.len();
        self.encode_value(out, self.root, value, 0)
            .inspect_err(|_| out.truncate(start))
    }

    /// Run every encoder check without keeping the output.
    pub fn validate(&self, value: &Value) -> Result<(), EncodeError> {
        self.encode(value).map(drop)
    }

    /// Encode any value based on its schema node.
    ///
    /// Dispatches on the schema node and checks the value kind against it.
    fn encode_value(
        &self,
        out: &mut Vec<u8>,
        schema: &SchemaNode,
        value: &Value,
        depth: usize,
    ) -> Result<(), EncodeError> {
        if depth > self.max_depth {
            return Err(EncodeError::DepthExceeded(self.max_depth));
        }

        match (schema, value) {
            (SchemaNode::Null, Value::Null) => Ok(()),
            (SchemaNode::Boolean, Value::Bool(b)) => {
                write_boolean(out, *b);
                Ok(())
            }
            (SchemaNode::Int, Value::Long(l)) => {
                let v = i32::try_from(*l).map_err(|_| EncodeError::OutOfRange {
                    expected: "int",
                    value: *l,
                })?;
                write_long(out, v as i64);
                Ok(())
            }
            (SchemaNode::Long, Value::Long(l)) => {
                write_long(out, *l);
                Ok(())
            }
            (SchemaNode::Float, Value::Float(f)) => {
                write_float(out, *f);
                Ok(())
            }
            (SchemaNode::Double, Value::Double(d)) => {
                write_double(out, *d);
                Ok(())
            }
            (SchemaNode::Bytes, Value::Bytes(b)) => {
                write_bytes(out, b);
                Ok(())
            }
            (SchemaNode::String, Value::String(s)) => {
                write_string(out, s);
                Ok(())
            }
            (SchemaNode::String, Value::Bytes(b)) => {
                let s = std::str::from_utf8(b)?;
                write_string(out, s);
                Ok(())
            }
            (SchemaNode::Fixed(fixed), Value::Bytes(b)) => {
                if b.len() != fixed.size {
                    return Err(EncodeError::SizeMismatch {
                        expected: fixed.size,
                        found: b.len(),
                    });
                }
                out.extend_from_slice(b);
                Ok(())
            }
            (SchemaNode::Enum(e), Value::String(symbol)) => {
                let index = e
                    .symbol_index(symbol)
                    .ok_or_else(|| EncodeError::UnknownSymbol {
                        name: e.fullname(),
                        symbol: symbol.clone(),
                    })?;
                write_long(out, index as i64);
                Ok(())
            }
            (SchemaNode::Array(items_schema), Value::Array(items)) => {
                if !items.is_empty() {
                    write_long(out, items.len() as i64);
                    for item in items {
                        self.encode_value(out, items_schema, item, depth + 1)?;
                    }
                }
                write_long(out, 0);
                Ok(())
            }
            (SchemaNode::Map(values_schema), Value::Map(entries)) => {
                if !entries.is_empty() {
                    write_long(out, entries.len() as i64);
                    for (key, item) in entries {
                        write_string(out, key);
                        self.encode_value(out, values_schema, item, depth + 1)?;
                    }
                }
                write_long(out, 0);
                Ok(())
            }
            (SchemaNode::Union(branches), _) => self.encode_union(out, branches, value, depth),
            (SchemaNode::Record(record), Value::Record(_)) => {
                self.encode_record(out, record, value, depth)
            }
            (SchemaNode::Named(name), _) => {
                let resolved = self
                    .names
                    .resolve(schema)
                    .ok_or_else(|| EncodeError::UnresolvedName(name.clone()))?;
                self.encode_value(out, resolved, value, depth)
            }
            _ => Err(mismatch(schema, value)),
        }
    }

    /// Write the first candidate branch that encodes the value.
    ///
    /// When every candidate fails, the first candidate's error is returned.
    fn encode_union(
        &self,
        out: &mut Vec<u8>,
        branches: &[SchemaNode],
        value: &Value,
        depth: usize,
    ) -> Result<(), EncodeError> {
        let mut first_error = None;
        for (index, branch) in candidates(branches, value, self.names) {
            let mark = out.len();
            write_long(out, index as i64);
            match self.encode_value(out, branch, value, depth) {
                Ok(()) => return Ok(()),
                Err(err @ EncodeError::DepthExceeded(_)) => return Err(err),
                Err(err) => {
                    out.truncate(mark);
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| EncodeError::NoMatchingBranch(value.kind().to_string())))
    }

    /// Encode record fields in declaration order, filling gaps from defaults.
    fn encode_record(
        &self,
        out: &mut Vec<u8>,
        record: &RecordSchema,
        value: &Value,
        depth: usize,
    ) -> Result<(), EncodeError> {
        for field in &record.fields {
            let field_value = value
                .field(&field.name)
                .or(field.default.as_ref())
                .ok_or_else(|| EncodeError::MissingField {
                    record: record.fullname(),
                    field: field.name.clone(),
                })?;
            self.encode_value(out, &field.schema, field_value, depth + 1)?;
        }
        Ok(())
    }
}
