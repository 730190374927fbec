//! Blocking RPC client.

use crate::connection::{open, ConnectionConfig};
use crate::error::ClientError;
use rpclite_core::{Dispatched, IoTransport, MethodRegistry, Session, SessionStats};
use rpclite_protocol::{IntoArgs, TypedValue};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

/// One connection to an rpclite peer.
///
/// Calls are one-way. The peer may also call back into methods registered
/// in this client's registry, which are served by [`receive`](Self::receive).
pub struct Client {
    session: Session<IoTransport<TcpStream>>,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl Client {
    /// Connects using `config`, serving `registry` for incoming calls.
    pub fn connect(
        config: ConnectionConfig,
        registry: Arc<MethodRegistry>,
    ) -> Result<Self, ClientError> {
        let stream = open(&config)?;
        let peer_addr = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        tracing::debug!("Connected to {} from {}", peer_addr, local_addr);

        Ok(Self {
            session: Session::with_config(IoTransport::new(stream), registry, config.session),
            peer_addr,
            local_addr,
        })
    }

    /// Connects with default settings and no methods of its own.
    pub fn connect_addr(addr: SocketAddr) -> Result<Self, ClientError> {
        Self::connect(ConnectionConfig::new(addr), Arc::new(MethodRegistry::new()))
    }

    /// Calls `method` with arguments built from values, tuples or an `Args`.
    pub fn call(&mut self, method: &str, args: impl IntoArgs) -> Result<(), ClientError> {
        self.session.call(method, args)?;
        Ok(())
    }

    /// Calls `method` after checking `args` against the format string.
    pub fn call_fmt(
        &mut self,
        method: &str,
        format: &str,
        args: &[TypedValue],
    ) -> Result<(), ClientError> {
        self.session.call_fmt(method, format, args)?;
        Ok(())
    }

    /// Waits for one call from the peer and dispatches it.
    pub fn receive(&mut self) -> Result<Dispatched, ClientError> {
        Ok(self.session.receive()?)
    }

    pub fn session_mut(&mut self) -> &mut Session<IoTransport<TcpStream>> {
        &mut self.session
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpclite_core::{MethodError, SessionConfig};
    use rpclite_protocol::{RpcCode, WireMode};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    fn wazzap_registry(tx: mpsc::Sender<(String, f64)>) -> Arc<MethodRegistry> {
        let tx = Mutex::new(tx);
        let mut registry = MethodRegistry::new();
        registry
            .register("wazzap", "sf", move |args| {
                let who: &str = (&args[0]).try_into()?;
                let how: f64 = (&args[1]).try_into()?;
                tx.lock()
                    .map_err(|e| MethodError::internal(e.to_string()))?
                    .send((who.to_string(), how))
                    .map_err(|e| MethodError::internal(e.to_string()))
            })
            .unwrap();
        Arc::new(registry)
    }

    /// Accepts one connection and serves `count` calls on it.
    fn serve(
        listener: TcpListener,
        registry: Arc<MethodRegistry>,
        config: SessionConfig,
        count: usize,
    ) -> thread::JoinHandle<Vec<RpcCode>> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut session = Session::with_config(IoTransport::new(stream), registry, config);
            (0..count)
                .map(|_| match session.receive() {
                    Ok(_) => RpcCode::Ok,
                    Err(e) => e.code(),
                })
                .collect()
        })
    }

    #[test]
    fn test_call_reaches_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let server = serve(listener, wazzap_registry(tx), SessionConfig::default(), 2);

        let mut client = Client::connect_addr(addr).unwrap();
        assert_eq!(client.peer_addr(), addr);
        client.call("wazzap", ("homie", 4.5f64)).unwrap();
        client.call("wazzap", (1i64, 2i64)).unwrap();
        assert_eq!(client.stats().calls_sent, 2);

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first, ("homie".to_string(), 4.5));
        assert_eq!(server.join().unwrap(), vec![RpcCode::Ok, RpcCode::BadRemoteCall]);
    }

    #[test]
    fn test_compact_mode_client() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        let session = SessionConfig::new().with_wire_mode(WireMode::Compact);
        let server = serve(listener, wazzap_registry(tx), session, 1);

        let config = ConnectionConfig::new(addr).with_session(session);
        let mut client = Client::connect(config, Arc::new(MethodRegistry::new())).unwrap();
        client
            .call_fmt("wazzap", "sf", &[TypedValue::string("yo"), TypedValue::Float(1.0)])
            .unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            ("yo".to_string(), 1.0)
        );
        assert_eq!(server.join().unwrap(), vec![RpcCode::Ok]);
    }

    #[test]
    fn test_client_receives_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let caller = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let registry = Arc::new(MethodRegistry::new());
            let mut session = Session::new(IoTransport::new(stream), registry);
            session.call("wazzap", ("server", 0.25f64)).unwrap();
        });

        let (tx, rx) = mpsc::channel();
        let config = ConnectionConfig::new(addr).with_read_timeout(Some(Duration::from_secs(5)));
        let mut client = Client::connect(config, wazzap_registry(tx)).unwrap();

        let dispatched = client.receive().unwrap();
        assert_eq!(dispatched.method, "wazzap");
        assert_eq!(rx.recv().unwrap(), ("server".to_string(), 0.25));

        caller.join().unwrap();
        // The caller hung up after one call.
        let err = client.receive().unwrap_err();
        assert_eq!(err.code(), RpcCode::BadConnection);
    }

    #[test]
    fn test_bad_call_is_local() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = Client::connect_addr(addr).unwrap();
        let err = client
            .call_fmt("wazzap", "s", &[TypedValue::Int(1)])
            .unwrap_err();
        assert_eq!(err.code(), RpcCode::BadCall);
        assert_eq!(client.stats().calls_sent, 0);
        drop(listener);
    }
}
