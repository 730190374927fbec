//! Connection configuration and setup.

use crate::error::ClientError;
use rpclite_core::SessionConfig;
use std::io;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Socket read timeout (`None` blocks indefinitely).
    pub read_timeout: Option<Duration>,
    /// Socket write timeout.
    pub write_timeout: Option<Duration>,
    /// Wire mode and payload limit; must match the server.
    pub session: SessionConfig,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            write_timeout: Some(Duration::from_secs(30)),
            session: SessionConfig::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

/// Opens a blocking TCP stream configured per `config`.
pub(crate) fn open(config: &ConnectionConfig) -> Result<TcpStream, ClientError> {
    let stream = TcpStream::connect_timeout(&config.addr, config.connect_timeout).map_err(|e| {
        if e.kind() == io::ErrorKind::TimedOut {
            ClientError::ConnectTimeout { addr: config.addr }
        } else {
            ClientError::Io(e)
        }
    })?;
    stream.set_read_timeout(config.read_timeout)?;
    stream.set_write_timeout(config.write_timeout)?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
