//! # rpclite-protocol
//!
//! Wire protocol implementation for rpclite.
//!
//! This crate provides:
//! - The typed value model (`Int`, `Float`, `String`, `Blob`, `List`)
//! - Self-framed value encoding (`[type][length][payload]`, recursive for lists)
//! - Compact format-string driven packing (no per-argument type tags)
//! - The call frame header (`[method_hash][args_length]`)
//! - FNV-1a method name hashing
//! - Error types and the `RpcCode` status taxonomy

pub mod codec;
pub mod compact;
pub mod error;
pub mod frame;
pub mod hash;
pub mod value;

pub use error::{ProtocolError, RpcCode};
pub use frame::{CallFrame, CallHeader, WireMode, CALL_HEADER_SIZE};
pub use hash::fnv1a64;
pub use value::{
    parse_signature, signature_of, validate_format, Args, IntoArgs, TypedValue, ValueType,
};

/// Size of the `[type:1][length:4]` envelope around every self-framed value.
pub const VALUE_HEADER_SIZE: usize = 5;

/// Maximum call payload size accepted by default (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Maximum list nesting depth accepted by the decoders.
pub const MAX_NESTING_DEPTH: usize = 64;
