//! # rpclite-client
//!
//! Client library for rpclite.
//!
//! This crate provides:
//! - TCP connection setup with connect, read and write timeouts
//! - A blocking call API over one session
//! - Receiving calls from the peer on the same connection

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::ConnectionConfig;
pub use error::ClientError;
