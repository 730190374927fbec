//! Call frame header and argument encoding.
//!
//! ```text
//! +-------------------+-------------------+----------------------+
//! | method_hash       | args_length       | args_payload         |
//! | 8 bytes, BE       | 4 bytes, BE, i32  | args_length bytes    |
//! +-------------------+-------------------+----------------------+
//! ```

use crate::codec;
use crate::compact;
use crate::error::ProtocolError;
use crate::value::{signature_of, TypedValue};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the fixed call header.
pub const CALL_HEADER_SIZE: usize = 12;

/// Encoding used for the argument payload of a call.
///
/// The two modes are not wire-compatible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMode {
    /// Each argument carries its own `[type][length]` envelope.
    #[default]
    SelfFramed,
    /// Arguments are packed according to the method signature, untagged.
    Compact,
}

impl WireMode {
    /// Encodes an argument list in this mode.
    pub fn encode_args(&self, values: &[TypedValue]) -> Result<Bytes, ProtocolError> {
        match self {
            WireMode::SelfFramed => codec::encode_all(values),
            WireMode::Compact => compact::pack(&signature_of(values), values),
        }
    }

    /// Decodes an argument payload.
    ///
    /// `signature` is only consulted in compact mode, where the payload
    /// cannot describe itself.
    pub fn decode_args(
        &self,
        payload: Bytes,
        signature: &str,
    ) -> Result<Vec<TypedValue>, ProtocolError> {
        match self {
            WireMode::SelfFramed => codec::decode_all(payload),
            WireMode::Compact => compact::unpack(payload, signature),
        }
    }

    /// Returns whether the receiver can derive a signature from the payload.
    pub fn is_self_describing(&self) -> bool {
        matches!(self, WireMode::SelfFramed)
    }
}

impl fmt::Display for WireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireMode::SelfFramed => write!(f, "self_framed"),
            WireMode::Compact => write!(f, "compact"),
        }
    }
}

impl std::str::FromStr for WireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "self_framed" | "self-framed" => Ok(WireMode::SelfFramed),
            "compact" => Ok(WireMode::Compact),
            other => Err(format!("unknown wire mode: {}", other)),
        }
    }
}

/// Fixed-size header preceding every call payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallHeader {
    pub method_hash: u64,
    pub args_length: i32,
}

impl CallHeader {
    pub fn new(method_hash: u64, args_length: i32) -> Self {
        Self {
            method_hash,
            args_length,
        }
    }

    pub fn encode(&self) -> [u8; CALL_HEADER_SIZE] {
        let mut out = [0u8; CALL_HEADER_SIZE];
        out[..8].copy_from_slice(&self.method_hash.to_be_bytes());
        out[8..].copy_from_slice(&self.args_length.to_be_bytes());
        out
    }

    pub fn decode(bytes: &[u8; CALL_HEADER_SIZE]) -> Self {
        let mut hash = [0u8; 8];
        hash.copy_from_slice(&bytes[..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[8..]);
        Self {
            method_hash: u64::from_be_bytes(hash),
            args_length: i32::from_be_bytes(len),
        }
    }
}

/// A complete call: header fields plus the encoded argument payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub method_hash: u64,
    pub args: Bytes,
}

impl CallFrame {
    pub fn new(method_hash: u64, args: Bytes) -> Self {
        Self { method_hash, args }
    }

    /// Returns the header describing this frame.
    pub fn header(&self) -> Result<CallHeader, ProtocolError> {
        let len = i32::try_from(self.args.len()).map_err(|_| ProtocolError::FrameTooLarge {
            size: self.args.len(),
            max: i32::MAX as usize,
        })?;
        Ok(CallHeader::new(self.method_hash, len))
    }

    /// Total size on the wire.
    pub fn encoded_len(&self) -> usize {
        CALL_HEADER_SIZE + self.args.len()
    }

    /// Encodes header and payload into one contiguous buffer.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(&header.encode());
        buf.put_slice(&self.args);
        Ok(buf)
    }
}
