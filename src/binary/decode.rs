//! Binary decoder.
//!
//! Decoding walks a single forward cursor (`&mut &[u8]`) over the input.
//! Every step advances the cursor by exactly what it consumed and never
//! reads past the end of the slice; running out of input is reported as
//! [`DecodeError::Truncated`].

use std::collections::BTreeMap;

use crate::codec::CodecOptions;
use crate::error::DecodeError;
use crate::schema::{NameRegistry, RecordSchema, Schema, SchemaNode};
use crate::value::Value;

use super::varint::{decode_zigzag, decode_zigzag_i32};

/// Decode one value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed, so several values
/// concatenated in one buffer can be decoded in sequence.
pub fn decode_binary(schema: &Schema, bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
    BinaryDecoder::new(schema, &CodecOptions::default()).decode(bytes)
}

/// Decode exactly one value spanning the whole of `bytes`.
///
/// # Errors
/// `DecodeError::TrailingBytes` if input remains after the value.
pub fn decode_binary_exact(schema: &Schema, bytes: &[u8]) -> Result<Value, DecodeError> {
    BinaryDecoder::new(schema, &CodecOptions::default()).decode_exact(bytes)
}

// ============================================================================
// Primitive Decoders
// ============================================================================

/// Decode a boolean: one byte, 0x00 or 0x01.
#[inline]
pub fn decode_boolean(data: &mut &[u8]) -> Result<bool, DecodeError> {
    let Some((&byte, rest)) = data.split_first() else {
        return Err(DecodeError::Truncated);
    };
    *data = rest;
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DecodeError::Malformed(format!(
            "Invalid boolean value: {}, expected 0 or 1",
            byte
        ))),
    }
}

/// Decode a 32-bit signed integer (zigzag varint, at most 5 bytes).
#[inline]
pub fn decode_int(data: &mut &[u8]) -> Result<i32, DecodeError> {
    decode_zigzag_i32(data)
}

/// Decode a 64-bit signed integer (zigzag varint, at most 10 bytes).
#[inline]
pub fn decode_long(data: &mut &[u8]) -> Result<i64, DecodeError> {
    decode_zigzag(data)
}

/// Take exactly `len` bytes off the front of the cursor.
#[inline]
fn take<'a>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if data.len() < len {
        return Err(DecodeError::Truncated);
    }
    let (head, rest) = data.split_at(len);
    *data = rest;
    Ok(head)
}

/// Decode a 32-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_float(data: &mut &[u8]) -> Result<f32, DecodeError> {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(take(data, 4)?);
    Ok(f32::from_le_bytes(bytes))
}

/// Decode a 64-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_double(data: &mut &[u8]) -> Result<f64, DecodeError> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(take(data, 8)?);
    Ok(f64::from_le_bytes(bytes))
}

/// Decode a length-prefixed byte sequence without copying.
#[inline]
pub fn decode_bytes_ref<'a>(data: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let len = decode_long(data)?;
    if len < 0 {
        return Err(DecodeError::Malformed(format!(
            "Negative bytes length: {}",
            len
        )));
    }
    let len = usize::try_from(len).map_err(|_| DecodeError::Truncated)?;
    take(data, len)
}

/// Decode a length-prefixed byte sequence.
#[inline]
pub fn decode_bytes(data: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    decode_bytes_ref(data).map(<[u8]>::to_vec)
}

/// Decode a length-prefixed UTF-8 string.
#[inline]
pub fn decode_string(data: &mut &[u8]) -> Result<String, DecodeError> {
    let bytes = decode_bytes_ref(data)?;
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// Decode exactly `size` raw bytes.
#[inline]
pub fn decode_fixed(data: &mut &[u8], size: usize) -> Result<Vec<u8>, DecodeError> {
    take(data, size).map(<[u8]>::to_vec)
}

// ============================================================================
// Schema-driven Decoder
// ============================================================================

/// Decoder bound to one schema and a set of limits.
///
/// Holds no per-call state, so one instance can serve many calls.
///
/// Depth counts records, arrays and maps; unions and named references do
/// not add a level. The zero-width item limit applies to the total over
/// one call, across every array and map block in the value.
#[derive(Debug, Clone, Copy)]
pub struct BinaryDecoder<'a> {
    root: &'a SchemaNode,
    names: &'a NameRegistry,
    options: &'a CodecOptions,
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(schema: &'a Schema, options: &'a CodecOptions) -> Self {
        Self {
            root: schema.root(),
            names: schema.names(),
            options,
        }
    }

    /// Decode one value from the front of `bytes`, returning bytes consumed.
    pub fn decode(&self, bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
        let mut cursor = bytes;
        let mut zero_width_items = 0;
        let value = self.decode_value(&mut cursor, self.root, 0, &mut zero_width_items)?;
        Ok((value, bytes.len() - cursor.len()))
    }

    /// Decode one value that must span the whole of `bytes`.
    pub fn decode_exact(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        let (value, consumed) = self.decode(bytes)?;
        match bytes.len() - consumed {
            0 => Ok(value),
            trailing => Err(DecodeError::TrailingBytes(trailing)),
        }
    }

    /// Decode any value based on its schema node.
    fn decode_value(
        &self,
        data: &mut &[u8],
        schema: &SchemaNode,
        depth: usize,
        zero_width_items: &mut usize,
    ) -> Result<Value, DecodeError> {
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthExceeded(self.options.max_depth));
        }

        match schema {
            // Primitive types
            SchemaNode::Null => Ok(Value::Null),
            SchemaNode::Boolean => decode_boolean(data).map(Value::Bool),
            SchemaNode::Int => decode_int(data).map(|i| Value::Long(i as i64)),
            SchemaNode::Long => decode_long(data).map(Value::Long),
            SchemaNode::Float => decode_float(data).map(Value::Float),
            SchemaNode::Double => decode_double(data).map(Value::Double),
            SchemaNode::Bytes => decode_bytes(data).map(Value::Bytes),
            SchemaNode::String => decode_string(data).map(Value::String),

            // Complex types
            SchemaNode::Fixed(fixed) => decode_fixed(data, fixed.size).map(Value::Bytes),
            SchemaNode::Enum(e) => {
                let index = decode_int(data)?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| e.symbols.get(i))
                    .map(|symbol| Value::String(symbol.clone()))
                    .ok_or_else(|| {
                        DecodeError::Malformed(format!(
                            "Enum index {} out of range for enum '{}' with {} symbols",
                            index,
                            e.fullname(),
                            e.symbols.len()
                        ))
                    })
            }
            SchemaNode::Array(item_schema) => {
                let mut items = Vec::new();
                self.decode_blocks(data, item_schema, zero_width_items, |decoder, data, seen| {
                    items.push(decoder.decode_value(data, item_schema, depth + 1, seen)?);
                    Ok(())
                })?;
                Ok(Value::Array(items))
            }
            SchemaNode::Map(value_schema) => {
                let mut entries = BTreeMap::new();
                self.decode_blocks(data, &SchemaNode::String, zero_width_items, |decoder, data, seen| {
                    let key = decode_string(data)?;
                    let value = decoder.decode_value(data, value_schema, depth + 1, seen)?;
                    entries.insert(key, value);
                    Ok(())
                })?;
                Ok(Value::Map(entries))
            }
            SchemaNode::Union(branches) => {
                let index = decode_long(data)?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(DecodeError::InvalidUnionIndex {
                        index,
                        branches: branches.len(),
                    })?;
                self.decode_value(data, branch, depth, zero_width_items)
            }
            SchemaNode::Record(record) => self.decode_record(data, record, depth, zero_width_items),
            SchemaNode::Named(name) => {
                let resolved = self.names.resolve(schema).ok_or_else(|| {
                    DecodeError::Malformed(format!("Unresolved named type '{}'", name))
                })?;
                self.decode_value(data, resolved, depth, zero_width_items)
            }
        }
    }

    /// Decode record fields in declaration order.
    fn decode_record(
        &self,
        data: &mut &[u8],
        record: &RecordSchema,
        depth: usize,
        zero_width_items: &mut usize,
    ) -> Result<Value, DecodeError> {
        let mut fields = BTreeMap::new();
        for field in &record.fields {
            let value = self.decode_value(data, &field.schema, depth + 1, zero_width_items)?;
            fields.insert(field.name.clone(), value);
        }
        Ok(Value::Record(fields))
    }

    /// Walk array/map blocks, calling `item` once per entry.
    ///
    /// Each block is a positive count followed by that many entries; a zero
    /// count ends the sequence. Negative counts (the sized-block form) are
    /// rejected as malformed.
    fn decode_blocks<F>(
        &self,
        data: &mut &[u8],
        entry_schema: &SchemaNode,
        zero_width_items: &mut usize,
        mut item: F,
    ) -> Result<(), DecodeError>
    where
        F: FnMut(&Self, &mut &[u8], &mut usize) -> Result<(), DecodeError>,
    {
        let zero_width = self.is_zero_width(entry_schema, &mut Vec::new());
        loop {
            let count = decode_long(data)?;
            if count == 0 {
                return Ok(());
            }
            if count < 0 {
                return Err(DecodeError::Malformed(format!(
                    "Negative block count {} is not supported",
                    count
                )));
            }
            let count = usize::try_from(count).map_err(|_| DecodeError::Truncated)?;

            if zero_width {
                let total = zero_width_items.saturating_add(count);
                if total > self.options.max_zero_width_items {
                    return Err(DecodeError::Malformed(format!(
                        "{} zero-width items exceed limit of {}",
                        total, self.options.max_zero_width_items
                    )));
                }
                *zero_width_items = total;
            } else if count > data.len() {
                // Every entry needs at least one byte
                return Err(DecodeError::Truncated);
            }

            for _ in 0..count {
                item(self, data, zero_width_items)?;
            }
        }
    }

    /// Whether values of this schema can encode to zero bytes.
    fn is_zero_width<'s>(&'s self, schema: &'s SchemaNode, visiting: &mut Vec<&'s str>) -> bool {
        match schema {
            SchemaNode::Null => true,
            SchemaNode::Fixed(fixed) => fixed.size == 0,
            SchemaNode::Record(record) => record
                .fields
                .iter()
                .all(|f| self.is_zero_width(&f.schema, visiting)),
            SchemaNode::Named(name) => {
                if visiting.contains(&name.as_str()) {
                    return false;
                }
                visiting.push(name);
                let zero = self
                    .names
                    .resolve(schema)
                    .is_some_and(|resolved| self.is_zero_width(resolved, visiting));
                visiting.pop();
                zero
            }
            _ => false,
        }
    }
}
