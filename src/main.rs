//! rpclite - one-way RPC server
//!
//! Serves the demo methods `Say_IntString(isf)` and `wazzap(sf)` over TCP.

use rpclite_core::{MethodError, MethodRegistry};
use rpclite_protocol::TypedValue;
use rpclite_server::{Config, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn build_registry() -> Result<MethodRegistry, Box<dyn std::error::Error>> {
    let mut registry = MethodRegistry::new();

    registry
        .register("Say_IntString", "isf", |args| {
            let number: i64 = (&args[0]).try_into()?;
            let text = string_arg(&args[1])?;
            let ratio: f64 = (&args[2]).try_into()?;
            tracing::info!("Say_IntString({}, {:?}, {})", number, text, ratio);
            Ok(())
        })?
        .register("wazzap", "sf", |args| {
            let who = string_arg(&args[0])?;
            let how: f64 = (&args[1]).try_into()?;
            tracing::info!("wazzap({:?}, {})", who, how);
            Ok(())
        })?;

    Ok(registry)
}

fn string_arg(value: &TypedValue) -> Result<String, MethodError> {
    value
        .as_bytes()
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .ok_or_else(|| MethodError::internal("expected a string argument"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if RPCLITE_CONFIG is set, then env overrides)
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    let registry = Arc::new(build_registry()?);

    tracing::info!("Starting rpclite server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Wire mode: {}", config.protocol.wire_mode);
    tracing::info!("  Methods: {}", registry.names().join(", "));

    let server = Arc::new(Server::new(ServerConfig::from(&config), registry));

    // Spawn shutdown signal handler
    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Run server (blocks until shutdown)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
