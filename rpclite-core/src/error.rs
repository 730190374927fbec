//! Core error types.

use rpclite_protocol::{ProtocolError, RpcCode};
use thiserror::Error;

/// Failure reported by a registered callback.
///
/// The detail stays local: the receiving session reports every callback
/// failure as `BadRemoteCall`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    #[error("{0}")]
    User(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl MethodError {
    pub fn user(msg: impl Into<String>) -> Self {
        MethodError::User(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        MethodError::Internal(msg.into())
    }
}

impl From<ProtocolError> for MethodError {
    fn from(e: ProtocolError) -> Self {
        MethodError::User(e.to_string())
    }
}

/// Errors raised while building a method registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid signature for method '{name}': {source}")]
    InvalidSignature {
        name: String,
        #[source]
        source: ProtocolError,
    },

    #[error("method '{name}' has an empty signature and could never be called")]
    EmptySignature { name: String },
}

/// Errors from a call or receive.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("connection closed by peer")]
    Closed,

    #[error("connection idle: {0}")]
    Idle(#[source] std::io::Error),

    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("bad call: {0}")]
    BadCall(#[source] ProtocolError),

    #[error("call has no arguments")]
    EmptyArguments,

    #[error("invalid args_length in call header: {0}")]
    InvalidArgsLength(i32),

    #[error("call payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("unknown method hash {hash:#018x}")]
    UnknownMethod { hash: u64 },

    #[error("undecodable arguments for '{method}': {source}")]
    Decode {
        method: String,
        #[source]
        source: ProtocolError,
    },

    #[error("bad argument count for '{method}': expected \"{expected}\", {detail}")]
    BadArgsCount {
        method: String,
        expected: String,
        detail: String,
    },

    #[error("bad argument type for '{method}': expected \"{expected}\", {detail}")]
    BadArgsType {
        method: String,
        expected: String,
        detail: String,
    },

    #[error("method '{method}' failed: {source}")]
    Callback {
        method: String,
        #[source]
        source: MethodError,
    },

    #[error("method '{method}' panicked")]
    CallbackPanicked { method: String },
}

impl SessionError {
    /// Returns the status code this error is reported as.
    pub fn code(&self) -> RpcCode {
        match self {
            SessionError::Connection(_) => RpcCode::BadConnection,
            SessionError::Closed => RpcCode::BadConnection,
            SessionError::Idle(_) => RpcCode::BadConnection,
            SessionError::ShortWrite { .. } => RpcCode::BadConnection,
            SessionError::BadCall(_) => RpcCode::BadCall,
            SessionError::EmptyArguments => RpcCode::BadCall,
            SessionError::InvalidArgsLength(_) => RpcCode::BadRemoteCall,
            SessionError::PayloadTooLarge { .. } => RpcCode::BadRemoteCall,
            SessionError::UnknownMethod { .. } => RpcCode::BadRemoteCall,
            SessionError::Decode { .. } => RpcCode::BadRemoteCall,
            SessionError::BadArgsCount { .. } => RpcCode::BadRemoteCall,
            SessionError::BadArgsType { .. } => RpcCode::BadRemoteCall,
            SessionError::Callback { .. } => RpcCode::BadRemoteCall,
            SessionError::CallbackPanicked { .. } => RpcCode::InternalError,
        }
    }

    /// Returns whether the connection should be closed after this error.
    pub fn should_close_connection(&self) -> bool {
        self.code().should_close_connection()
    }

    /// Returns whether the stream ended or went quiet between calls.
    ///
    /// Losing the stream part way through a frame is a `Connection` error.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionError::Closed | SessionError::Idle(_))
    }
}

impl From<&SessionError> for RpcCode {
    fn from(e: &SessionError) -> Self {
        e.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_codes() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "closed");
        assert_eq!(SessionError::Connection(eof).code(), RpcCode::BadConnection);
        assert_eq!(
            SessionError::ShortWrite {
                written: 3,
                expected: 12
            }
            .code(),
            RpcCode::BadConnection
        );
        assert_eq!(
            SessionError::BadCall(ProtocolError::UnknownFormat('x')).code(),
            RpcCode::BadCall
        );
        assert_eq!(SessionError::EmptyArguments.code(), RpcCode::BadCall);
        assert_eq!(
            SessionError::UnknownMethod { hash: 1 }.code(),
            RpcCode::BadRemoteCall
        );
        assert_eq!(
            SessionError::Callback {
                method: "m".into(),
                source: MethodError::internal("db down"),
            }
            .code(),
            RpcCode::BadRemoteCall
        );
        assert_eq!(
            SessionError::CallbackPanicked { method: "m".into() }.code(),
            RpcCode::InternalError
        );
    }

    #[test]
    fn test_close_policy() {
        assert!(SessionError::InvalidArgsLength(0).should_close_connection());
        assert!(!SessionError::EmptyArguments.should_close_connection());
        assert!(!SessionError::CallbackPanicked { method: "m".into() }.should_close_connection());
    }

    #[test]
    fn test_disconnect_detection() {
        assert!(SessionError::Closed.is_disconnect());
        assert_eq!(SessionError::Closed.code(), RpcCode::BadConnection);

        let idle = SessionError::Idle(io::Error::new(io::ErrorKind::WouldBlock, "timed out"));
        assert!(idle.is_disconnect());

        let eof = SessionError::Connection(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(!eof.is_disconnect());
        assert!(eof.should_close_connection());

        let reset = SessionError::Connection(io::Error::new(io::ErrorKind::ConnectionReset, "rst"));
        assert!(!reset.is_disconnect());
    }

    #[test]
    fn test_unknown_method_display() {
        let msg = SessionError::UnknownMethod { hash: 0xab }.to_string();
        assert!(msg.contains("0x00000000000000ab"));
    }
}
