//! # rpclite-server
//!
//! TCP server for rpclite.
//!
//! This crate provides:
//! - An async accept loop with a connection limit and graceful shutdown
//! - One blocking session per connection, run on the blocking thread pool
//! - YAML and environment based configuration

pub mod config;
pub mod error;
pub mod server;

pub use config::{Config, ConfigError, NetworkConfig, ProtocolConfig};
pub use error::ServerError;
pub use server::{Server, ServerConfig, ServerStats};
