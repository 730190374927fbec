//! Server error types.

use rpclite_core::SessionError;
use rpclite_protocol::RpcCode;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("connection task failed: {0}")]
    Task(String),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Converts to the protocol status code.
    pub fn code(&self) -> RpcCode {
        match self {
            ServerError::Io(_) => RpcCode::BadConnection,
            ServerError::Session(e) => e.code(),
            ServerError::Task(_) => RpcCode::InternalError,
            ServerError::ShuttingDown => RpcCode::InternalError,
        }
    }
}
