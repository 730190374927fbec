//! TCP server implementation.
//!
//! Connections are accepted on the async runtime and each one is handed to
//! the blocking pool, where a `Session` loops on `receive()` until the peer
//! disconnects or sends something that cannot be dispatched.

use crate::config::{Config, DEFAULT_PORT};
use crate::error::ServerError;
use parking_lot::Mutex;
use rpclite_core::{IoTransport, MethodRegistry, Session, SessionConfig, SessionError};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Shutdown, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use uuid::Uuid;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Read timeout applied to each connection.
    pub idle_timeout: Option<Duration>,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Wire mode and payload limit for every session.
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            idle_timeout: Some(Duration::from_secs(300)),
            max_connections: 1000,
            session: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

impl From<&Config> for ServerConfig {
    fn from(config: &Config) -> Self {
        Self {
            bind_addr: config.network.bind_addr,
            idle_timeout: config.network.idle_timeout(),
            max_connections: config.network.max_connections,
            session: config.protocol.session_config(),
        }
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub calls_dispatched: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Blocking handles to live connections, used to unblock them on shutdown.
type ConnectionTable = Mutex<HashMap<Uuid, std::net::TcpStream>>;

/// TCP server for rpclite.
pub struct Server {
    config: ServerConfig,
    registry: Arc<MethodRegistry>,
    stats: Arc<ServerStats>,
    shutdown: watch::Sender<bool>,
    running: AtomicBool,
    connections: Arc<ConnectionTable>,
}

impl Server {
    /// Creates a new server serving the methods in `registry`.
    pub fn new(config: ServerConfig, registry: Arc<MethodRegistry>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            registry,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow() {
            return Err(ServerError::ShuttingDown);
        }
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            "Server listening on {} ({}, {} methods)",
            local_addr,
            self.config.session.wire_mode,
            self.registry.len()
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.accept(stream, addr),
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.close_connections();
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn accept(&self, stream: TcpStream, addr: SocketAddr) {
        let active = self.stats.connections_active.load(Ordering::Relaxed);
        if active >= self.config.max_connections as u64 {
            tracing::warn!("Connection limit reached, rejecting {}", addr);
            self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let stream = match into_blocking(stream) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("[{}] Failed to prepare connection: {}", addr, e);
                self.stats.errors_total.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let id = Uuid::new_v4();
        match stream.try_clone() {
            Ok(handle) => {
                self.connections.lock().insert(id, handle);
            }
            Err(e) => tracing::debug!("[{}] No shutdown handle: {}", addr, e),
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

        let registry = self.registry.clone();
        let stats = self.stats.clone();
        let config = self.config.clone();
        let connections = self.connections.clone();

        tokio::spawn(async move {
            let task_stats = stats.clone();
            let result = tokio::task::spawn_blocking(move || {
                Self::handle_connection(stream, addr, registry, &config, &task_stats)
            })
            .await
            .map_err(|e| ServerError::Task(e.to_string()));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!("Connection {} error: {}", addr, e),
                Err(e) => {
                    tracing::error!("[{}] {}", addr, e);
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                }
            }

            connections.lock().remove(&id);
            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            tracing::info!("Client disconnected: {}", addr);
        });
    }

    /// Runs one connection to completion on the calling (blocking) thread.
    fn handle_connection(
        stream: std::net::TcpStream,
        addr: SocketAddr,
        registry: Arc<MethodRegistry>,
        config: &ServerConfig,
        stats: &ServerStats,
    ) -> Result<(), ServerError> {
        stream.set_read_timeout(config.idle_timeout)?;
        stream.set_nodelay(true)?;
        tracing::info!("Client connected: {}", addr);

        let mut session = Session::with_config(IoTransport::new(stream), registry, config.session);
        let result = loop {
            match session.receive() {
                Ok(dispatched) => {
                    stats.calls_dispatched.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("[{}] {} -> OK", addr, dispatched.method);
                }
                Err(SessionError::Closed) => {
                    tracing::debug!("[{}] Connection closed by client", addr);
                    break Ok(());
                }
                Err(SessionError::Idle(_)) => {
                    tracing::debug!("[{}] Idle timeout", addr);
                    break Ok(());
                }
                Err(e) if !e.should_close_connection() => {
                    // The whole frame was consumed, so the stream is still aligned.
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("[{}] {}: {}", addr, e.code(), e);
                }
                Err(e) => {
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("[{}] {}: {}", addr, e.code(), e);
                    break Err(ServerError::Session(e));
                }
            }
        };

        let stream = session.into_inner().into_inner();
        let _ = stream.shutdown(Shutdown::Both);
        result
    }

    fn close_connections(&self) {
        let connections: Vec<_> = self.connections.lock().drain().collect();
        for (_, stream) in connections {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

fn into_blocking(stream: TcpStream) -> io::Result<std::net::TcpStream> {
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    Ok(stream)
}
