//! # rpclite-core
//!
//! RPC dispatch for rpclite.
//!
//! This crate provides:
//! - The method registry (name hash, signature, callback)
//! - The blocking transport contract and an adapter over `Read + Write`
//! - The call/receive session state machine
//! - Session error types mapped onto `RpcCode`

pub mod error;
pub mod registry;
pub mod session;
pub mod transport;

pub use error::{MethodError, RegistryError, SessionError};
pub use registry::{Callback, MethodRegistry, RemoteMethod};
pub use session::{Dispatched, Session, SessionConfig, SessionState, SessionStats};
pub use transport::{IoTransport, MemoryTransport, Transport};
