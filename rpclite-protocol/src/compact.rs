//! Compact format-driven packing.
//!
//! The format string describes the payload, so arguments carry no type tags:
//!
//! | fmt | layout |
//! |-----|--------|
//! | `i` | 8 bytes, big-endian i64 |
//! | `f` | 8 bytes, big-endian f64 bit pattern |
//! | `s` | content bytes, then one NUL |
//! | `b` | 4-byte big-endian length, then bytes |
//! | `l` | 4-byte big-endian byte length, then self-framed elements |
//!
//! List elements keep their own envelopes because the format string says
//! nothing about them. This layout is not compatible with the self-framed
//! argument encoding.

use crate::codec::{self, decode_sequence, encode_value};
use crate::error::ProtocolError;
use crate::value::{parse_signature, validate_format, TypedValue, ValueType};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const SCALAR_WIDTH: usize = 8;
const LENGTH_WIDTH: usize = 4;

fn compact_size(value: &TypedValue) -> usize {
    match value {
        TypedValue::Int(_) | TypedValue::Float(_) => SCALAR_WIDTH,
        TypedValue::String(b) => b.len() + 1,
        TypedValue::Blob(b) => LENGTH_WIDTH + b.len(),
        TypedValue::List(items) => {
            LENGTH_WIDTH + items.iter().map(codec::packed_size).sum::<usize>()
        }
    }
}

/// Returns the packed size of `values` described by `format`.
pub fn fmt_len(format: &str, values: &[TypedValue]) -> Result<usize, ProtocolError> {
    validate_format(format, values)?;
    Ok(values.iter().map(compact_size).sum())
}

/// Packs `values` as described by `format`.
pub fn pack(format: &str, values: &[TypedValue]) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(fmt_len(format, values)?);
    for value in values {
        pack_value(value, &mut buf)?;
    }
    Ok(buf.freeze())
}

fn put_length(buf: &mut BytesMut, len: usize) -> Result<(), ProtocolError> {
    if len > i32::MAX as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: i32::MAX as usize,
        });
    }
    buf.put_i32(len as i32);
    Ok(())
}

fn pack_value(value: &TypedValue, buf: &mut BytesMut) -> Result<(), ProtocolError> {
    match value {
        TypedValue::Int(v) => buf.put_i64(*v),
        TypedValue::Float(v) => buf.put_u64(v.to_bits()),
        TypedValue::String(b) => {
            if b.contains(&0) {
                return Err(ProtocolError::EmbeddedNul);
            }
            buf.put_slice(b);
            buf.put_u8(0);
        }
        TypedValue::Blob(b) => {
            put_length(buf, b.len())?;
            buf.put_slice(b);
        }
        TypedValue::List(items) => {
            put_length(buf, items.iter().map(codec::packed_size).sum())?;
            for item in items {
                encode_value(item, buf, 1)?;
            }
        }
    }
    Ok(())
}

/// Unpacks `payload` as described by `format`.
///
/// The whole payload must be consumed.
pub fn unpack(payload: Bytes, format: &str) -> Result<Vec<TypedValue>, ProtocolError> {
    let types = parse_signature(format)?;
    let mut buf = payload;
    let mut values = Vec::with_capacity(types.len());
    for ty in types {
        values.push(unpack_value(ty, &mut buf)?);
    }
    if !buf.is_empty() {
        return Err(ProtocolError::TrailingBytes(buf.len()));
    }
    Ok(values)
}

fn ensure(buf: &Bytes, needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        return Err(ProtocolError::TruncatedFrame {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn take_sized(buf: &mut Bytes) -> Result<Bytes, ProtocolError> {
    ensure(buf, LENGTH_WIDTH)?;
    let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len < 0 {
        return Err(ProtocolError::InvalidLength(len));
    }
    ensure(buf, LENGTH_WIDTH + len as usize)?;
    buf.advance(LENGTH_WIDTH);
    Ok(buf.split_to(len as usize))
}

fn unpack_value(ty: ValueType, buf: &mut Bytes) -> Result<TypedValue, ProtocolError> {
    match ty {
        ValueType::Int => {
            ensure(buf, SCALAR_WIDTH)?;
            Ok(TypedValue::Int(buf.get_i64()))
        }
        ValueType::Float => {
            ensure(buf, SCALAR_WIDTH)?;
            Ok(TypedValue::Float(f64::from_bits(buf.get_u64())))
        }
        ValueType::String => {
            // An empty remainder is truncation; bytes without a NUL are malformed.
            ensure(buf, 1)?;
            let end = buf
                .iter()
                .position(|&b| b == 0)
                .ok_or(ProtocolError::MissingTerminator)?;
            let content = buf.split_to(end);
            buf.advance(1);
            Ok(TypedValue::String(content))
        }
        ValueType::Blob => Ok(TypedValue::Blob(take_sized(buf)?)),
        ValueType::List => Ok(TypedValue::List(decode_sequence(take_sized(buf)?, 1)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn say_args() -> Vec<TypedValue> {
        vec![
            TypedValue::Int(23395),
            TypedValue::string("gANGSTA!"),
            TypedValue::Float(4.0),
        ]
    }

    #[test]
    fn test_pack_layout() {
        let packed = pack("isf", &say_args()).unwrap();
        assert_eq!(packed.len(), 8 + 9 + 8);
        assert_eq!(packed.len(), fmt_len("isf", &say_args()).unwrap());

        assert_eq!(&packed[..8], &23395i64.to_be_bytes()[..]);
        assert_eq!(&packed[8..17], b"gANGSTA!\0");
        assert_eq!(&packed[17..], &4.0f64.to_bits().to_be_bytes()[..]);
    }

    #[test]
    fn test_unpack_recovers_values() {
        let packed = pack("isf", &say_args()).unwrap();
        assert_eq!(unpack(packed, "isf").unwrap(), say_args());
    }

    #[test]
    fn test_blob_and_list() {
        let values = vec![
            TypedValue::blob(vec![0u8, 1, 0]),
            TypedValue::list([TypedValue::Int(5), TypedValue::string("x")]),
        ];
        let packed = pack("bl", &values).unwrap();

        assert_eq!(&packed[..7], &[0, 0, 0, 3, 0, 1, 0][..]);
        // The list body keeps element envelopes: 13 + 6 bytes.
        assert_eq!(&packed[7..11], &[0, 0, 0, 19][..]);
        assert_eq!(packed.len(), 7 + 4 + 19);

        assert_eq!(unpack(packed, "bl").unwrap(), values);
    }

    #[test]
    fn test_empty_string_is_single_nul() {
        let packed = pack("s", &[TypedValue::string("")]).unwrap();
        assert_eq!(packed.as_ref(), &[0][..]);
        assert_eq!(
            unpack(packed, "s").unwrap(),
            vec![TypedValue::string("")]
        );
    }

    #[test]
    fn test_embedded_nul_rejected() {
        assert_eq!(
            pack("s", &[TypedValue::string(b"a\0b")]),
            Err(ProtocolError::EmbeddedNul)
        );
    }

    #[test]
    fn test_format_mismatch() {
        assert!(matches!(
            pack("is", &say_args()),
            Err(ProtocolError::FormatMismatch { .. })
        ));
        assert_eq!(
            fmt_len("isx", &say_args()),
            Err(ProtocolError::UnknownFormat('x'))
        );
    }

    #[test]
    fn test_unpack_truncated() {
        let packed = pack("isf", &say_args()).unwrap();
        let short = packed.slice(..20);
        assert_eq!(
            unpack(short, "isf"),
            Err(ProtocolError::TruncatedFrame {
                needed: 8,
                available: 3
            })
        );

        // Payload ends exactly where the string should start.
        let only_int = packed.slice(..8);
        assert!(matches!(
            unpack(only_int, "is"),
            Err(ProtocolError::TruncatedFrame { .. })
        ));
    }

    #[test]
    fn test_unpack_missing_terminator() {
        assert_eq!(
            unpack(Bytes::from_static(b"abc"), "s"),
            Err(ProtocolError::MissingTerminator)
        );
    }

    #[test]
    fn test_unpack_trailing_bytes() {
        let packed = pack("isf", &say_args()).unwrap();
        assert_eq!(
            unpack(packed, "is"),
            Err(ProtocolError::TrailingBytes(8))
        );
    }

    #[test]
    fn test_unpack_blob_overrun() {
        assert_eq!(
            unpack(Bytes::from_static(&[0, 0, 0, 9, 1, 2]), "b"),
            Err(ProtocolError::TruncatedFrame {
                needed: 13,
                available: 6
            })
        );
        assert_eq!(
            unpack(Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]), "b"),
            Err(ProtocolError::InvalidLength(-1))
        );
    }

    #[test]
    fn test_empty_format() {
        assert_eq!(pack("", &[]).unwrap().len(), 0);
        assert!(unpack(Bytes::new(), "").unwrap().is_empty());
    }
}
