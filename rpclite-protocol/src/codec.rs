//! Self-framed value codec.
//!
//! Every value is written as an envelope:
//!
//! ```text
//! +--------+-------------+---------------------+
//! | type   | length      | payload             |
//! | 1 byte | 4 bytes, BE | length bytes        |
//! +--------+-------------+---------------------+
//! ```
//!
//! `length` counts payload bytes, not elements. Int and Float payloads are
//! 8 bytes big-endian (Float is the bit pattern of the f64). String and Blob
//! payloads are the raw bytes. A List payload is the concatenation of each
//! element's own envelope, in order.

use crate::error::ProtocolError;
use crate::value::{validate_format, TypedValue, ValueType};
use crate::{MAX_NESTING_DEPTH, VALUE_HEADER_SIZE};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const SCALAR_WIDTH: usize = 8;

/// Returns the payload size of `value`, excluding its envelope.
pub fn payload_size(value: &TypedValue) -> usize {
    match value {
        TypedValue::Int(_) | TypedValue::Float(_) => SCALAR_WIDTH,
        TypedValue::String(b) | TypedValue::Blob(b) => b.len(),
        TypedValue::List(items) => items.iter().map(packed_size).sum(),
    }
}

/// Returns the encoded size of `value` including its envelope.
pub fn packed_size(value: &TypedValue) -> usize {
    VALUE_HEADER_SIZE + payload_size(value)
}

/// Returns the wire size of `values` described by `format`.
///
/// Fails if `format` contains an unknown character or does not name the
/// values' types in order.
pub fn args_len(format: &str, values: &[TypedValue]) -> Result<usize, ProtocolError> {
    validate_format(format, values)?;
    Ok(values.iter().map(packed_size).sum())
}

/// Encodes `value` with its envelope.
pub fn encode(value: &TypedValue) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(packed_size(value));
    encode_into(value, &mut buf)?;
    Ok(buf.freeze())
}

/// Appends the enveloped encoding of `value` to `buf`.
pub fn encode_into(value: &TypedValue, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    encode_value(value, buf, 0)
}

/// Encodes only the payload of `value`; the caller supplies the envelope.
pub fn encode_payload(value: &TypedValue) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(payload_size(value));
    write_payload(value, &mut buf, 0)?;
    Ok(buf.freeze())
}

/// Encodes a sequence of values back to back, as in a list payload.
pub fn encode_all(values: &[TypedValue]) -> Result<Bytes, ProtocolError> {
    let total = values.iter().map(packed_size).sum();
    let mut buf = BytesMut::with_capacity(total);
    for value in values {
        encode_value(value, &mut buf, 0)?;
    }
    Ok(buf.freeze())
}

pub(crate) fn encode_value(
    value: &TypedValue,
    buf: &mut BytesMut,
    depth: usize,
) -> Result<(), ProtocolError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ProtocolError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    let len = payload_size(value);
    if len > i32::MAX as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: i32::MAX as usize,
        });
    }

    buf.put_u8(value.value_type().tag());
    buf.put_i32(len as i32);
    write_payload(value, buf, depth)
}

fn write_payload(
    value: &TypedValue,
    buf: &mut BytesMut,
    depth: usize,
) -> Result<(), ProtocolError> {
    match value {
        TypedValue::Int(v) => buf.put_i64(*v),
        // Same path as Int: the bit pattern goes out big-endian.
        TypedValue::Float(v) => buf.put_u64(v.to_bits()),
        TypedValue::String(b) | TypedValue::Blob(b) => buf.put_slice(b),
        TypedValue::List(items) => {
            for item in items {
                encode_value(item, buf, depth + 1)?;
            }
        }
    }
    Ok(())
}

/// Reads the envelope at the front of `buf` without consuming it.
///
/// Returns the value type and payload length once the whole value is
/// available.
pub fn peek_header(buf: &[u8]) -> Result<(ValueType, usize), ProtocolError> {
    if buf.len() < VALUE_HEADER_SIZE {
        return Err(ProtocolError::TruncatedFrame {
            needed: VALUE_HEADER_SIZE,
            available: buf.len(),
        });
    }

    let ty = ValueType::try_from(buf[0])?;
    let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len));
    }

    let len = len as usize;
    let remaining = buf.len() - VALUE_HEADER_SIZE;
    if len > remaining {
        return Err(ProtocolError::TruncatedFrame {
            needed: VALUE_HEADER_SIZE + len,
            available: buf.len(),
        });
    }

    Ok((ty, len))
}

/// Decodes one enveloped value from the front of `buf`.
///
/// On success exactly the value's bytes are consumed. On failure `buf` is
/// left where the failing value started.
pub fn decode(buf: &mut Bytes) -> Result<TypedValue, ProtocolError> {
    decode_value(buf, 0)
}

/// Decodes back-to-back enveloped values until `payload` is exhausted.
///
/// A short trailing value is an error, never silently dropped.
pub fn decode_all(payload: Bytes) -> Result<Vec<TypedValue>, ProtocolError> {
    decode_sequence(payload, 0)
}

/// Decodes a payload whose envelope has already been read.
pub fn decode_payload(ty: ValueType, payload: Bytes) -> Result<TypedValue, ProtocolError> {
    decode_typed(ty, payload, 0)
}

fn decode_value(buf: &mut Bytes, depth: usize) -> Result<TypedValue, ProtocolError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(ProtocolError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        });
    }

    let (ty, len) = peek_header(buf.as_ref())?;
    buf.advance(VALUE_HEADER_SIZE);
    let payload = buf.split_to(len);
    decode_typed(ty, payload, depth)
}

pub(crate) fn decode_sequence(
    mut payload: Bytes,
    depth: usize,
) -> Result<Vec<TypedValue>, ProtocolError> {
    let mut values = Vec::new();
    while !payload.is_empty() {
        values.push(decode_value(&mut payload, depth)?);
    }
    Ok(values)
}

fn decode_typed(ty: ValueType, payload: Bytes, depth: usize) -> Result<TypedValue, ProtocolError> {
    match ty {
        ValueType::Int => Ok(TypedValue::Int(read_scalar(ty, &payload)? as i64)),
        ValueType::Float => Ok(TypedValue::Float(f64::from_bits(read_scalar(ty, &payload)?))),
        ValueType::String => Ok(TypedValue::String(payload)),
        ValueType::Blob => Ok(TypedValue::Blob(payload)),
        ValueType::List => Ok(TypedValue::List(decode_sequence(payload, depth + 1)?)),
    }
}

fn read_scalar(ty: ValueType, payload: &[u8]) -> Result<u64, ProtocolError> {
    let bytes: [u8; SCALAR_WIDTH] = payload.try_into().map_err(|_| ProtocolError::WrongWidth {
        kind: ty.name(),
        expected: SCALAR_WIDTH,
        actual: payload.len(),
    })?;
    Ok(u64::from_be_bytes(bytes))
}
