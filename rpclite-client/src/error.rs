//! Client error types.

use rpclite_core::SessionError;
use rpclite_protocol::RpcCode;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("connect to {addr} timed out")]
    ConnectTimeout { addr: std::net::SocketAddr },
}

impl ClientError {
    /// Returns the status code for this error.
    pub fn code(&self) -> RpcCode {
        match self {
            ClientError::Io(_) => RpcCode::BadConnection,
            ClientError::Session(e) => e.code(),
            ClientError::ConnectTimeout { .. } => RpcCode::BadConnection,
        }
    }

    /// Returns whether reconnecting and retrying could succeed.
    pub fn is_retryable(&self) -> bool {
        self.code() == RpcCode::BadConnection
    }
}
