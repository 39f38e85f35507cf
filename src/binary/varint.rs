//! Varint encoding and decoding.
//!
//! Variable-length integers as used in the Avro binary format:
//! - Each byte has 7 bits of data and 1 continuation bit (MSB)
//! - The continuation bit indicates if more bytes follow
//! - Least-significant group first
//!
//! Signed integers are zigzag mapped to unsigned first:
//! - 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
//! - Encoding formula: (n << 1) ^ (n >> 63)
//! - Decoding formula: (n >> 1) ^ -(n & 1)

use crate::error::DecodeError;

/// Maximum encoded width of a 64-bit varint.
pub const MAX_VARINT_LEN_64: usize = 10;

/// Maximum encoded width of a 32-bit varint.
pub const MAX_VARINT_LEN_32: usize = 5;

// ============================================================================
// Decoding Functions
// ============================================================================

/// Decode an unsigned varint of at most `max_len` bytes.
///
/// # Errors
/// - `DecodeError::Truncated` if the input ends while the continuation bit
///   is still set
/// - `DecodeError::InvalidVarint` if no terminating byte appears within
///   `max_len` bytes
#[inline]
pub fn decode_varint_bounded(data: &mut &[u8], max_len: usize) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;

    for i in 0..max_len {
        let Some((&byte, rest)) = data.split_first() else {
            return Err(DecodeError::Truncated);
        };
        *data = rest;

        // Bits past 64 in the tenth byte are dropped
        result |= ((byte & 0x7F) as u64) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(DecodeError::InvalidVarint)
}

/// Decode an unsigned 64-bit varint.
#[inline]
pub fn decode_varint(data: &mut &[u8]) -> Result<u64, DecodeError> {
    decode_varint_bounded(data, MAX_VARINT_LEN_64)
}

/// Decode a zigzag-encoded signed 64-bit integer.
#[inline]
pub fn decode_zigzag(data: &mut &[u8]) -> Result<i64, DecodeError> {
    let unsigned = decode_varint(data)?;
    Ok(unzigzag(unsigned))
}

/// Decode a zigzag-encoded signed 32-bit integer.
///
/// # Errors
/// Besides the varint errors, `DecodeError::Malformed` if the value does
/// not fit in 32 bits.
#[inline]
pub fn decode_zigzag_i32(data: &mut &[u8]) -> Result<i32, DecodeError> {
    let unsigned = decode_varint_bounded(data, MAX_VARINT_LEN_32)?;
    let value = unzigzag(unsigned);
    i32::try_from(value)
        .map_err(|_| DecodeError::Malformed(format!("Integer overflow: {} does not fit in i32", value)))
}

#[inline]
fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

// ============================================================================
// Encoding Functions
// ============================================================================

/// Append an unsigned varint to `out`.
#[inline]
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80; // Set continuation bit
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Append a zigzag-encoded signed integer to `out`.
#[inline]
pub fn write_zigzag(out: &mut Vec<u8>, value: i64) {
    write_varint(out, ((value << 1) ^ (value >> 63)) as u64);
}

/// Encode an unsigned integer as a varint.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN_64);
    write_varint(&mut out, value);
    out
}

/// Encode a signed integer as a zigzag varint.
pub fn encode_zigzag(value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN_64);
    write_zigzag(&mut out, value);
    out
}
