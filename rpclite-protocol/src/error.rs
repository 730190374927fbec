//! Protocol error types and status codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding or decoding values and frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("truncated frame: need {needed} bytes, {available} available")]
    TruncatedFrame { needed: usize, available: usize },

    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    #[error("wrong payload width for {kind}: expected {expected} bytes, got {actual}")]
    WrongWidth {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown value type tag: {0}")]
    UnknownType(u8),

    #[error("unknown format character: {0:?}")]
    UnknownFormat(char),

    #[error("expected {expected} value, got {actual}")]
    UnexpectedType { expected: char, actual: char },

    #[error("format mismatch: format {format:?} does not describe arguments {actual:?}")]
    FormatMismatch { format: String, actual: String },

    #[error("list nesting deeper than {max} levels")]
    NestingTooDeep { max: usize },

    #[error("payload too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("string is missing its NUL terminator")]
    MissingTerminator,

    #[error("string contains an embedded NUL byte")]
    EmbeddedNul,

    #[error("{0} unconsumed bytes after the last argument")]
    TrailingBytes(usize),
}

impl ProtocolError {
    /// Returns whether the error means the input ended early or ran long,
    /// as opposed to being malformed.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::TruncatedFrame { .. } | ProtocolError::TrailingBytes(_)
        )
    }
}

/// Status code returned by every call and receive.
///
/// The numeric values are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum RpcCode {
    Ok = 0,
    /// Local misuse at the call site (bad format string, argument mismatch).
    BadCall = 1,
    /// The peer sent a frame that decodes but cannot be dispatched.
    BadRemoteCall = 2,
    /// The transport did not complete a read or write.
    BadConnection = 3,
    /// Failure unrelated to peer input.
    InternalError = 4,
}

impl RpcCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, RpcCode::Ok)
    }

    /// Returns whether a receiver should close or reset the connection.
    pub fn should_close_connection(&self) -> bool {
        matches!(self, RpcCode::BadConnection | RpcCode::BadRemoteCall)
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }
}

impl TryFrom<i32> for RpcCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RpcCode::Ok),
            1 => Ok(RpcCode::BadCall),
            2 => Ok(RpcCode::BadRemoteCall),
            3 => Ok(RpcCode::BadConnection),
            4 => Ok(RpcCode::InternalError),
            other => Err(other),
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcCode::Ok => write!(f, "OK"),
            RpcCode::BadCall => write!(f, "BAD_CALL"),
            RpcCode::BadRemoteCall => write!(f, "BAD_REMOTE_CALL"),
            RpcCode::BadConnection => write!(f, "BAD_CONNECTION"),
            RpcCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}
