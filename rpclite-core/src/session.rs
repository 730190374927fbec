//! Call/receive session.
//!
//! A session binds one transport to a shared, read-only method registry and
//! performs one operation at a time:
//!
//! ```text
//! call:    Idle -> Sending -> Idle
//! receive: Idle -> ReceivingHeader -> ReceivingBody -> Dispatching -> Idle
//! ```
//!
//! Every operation returns to `Idle`, whether it succeeds or fails.

use crate::error::SessionError;
use crate::registry::{MethodRegistry, RemoteMethod};
use crate::transport::Transport;
use bytes::{Bytes, BytesMut};
use rpclite_protocol::hash::method_hash;
use rpclite_protocol::{
    signature_of, validate_format, CallFrame, CallHeader, IntoArgs, ProtocolError, TypedValue,
    WireMode, CALL_HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Argument encoding. Both peers must agree.
    pub wire_mode: WireMode,
    /// Largest args payload accepted or sent.
    pub max_payload: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wire_mode: WireMode::SelfFramed,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wire_mode(mut self, wire_mode: WireMode) -> Self {
        self.wire_mode = wire_mode;
        self
    }

    pub fn with_max_payload(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }
}

/// Where a session is in its current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    ReceivingHeader,
    ReceivingBody,
    Dispatching,
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Calls fully written to the transport.
    pub calls_sent: u64,
    /// Call frames fully read from the transport.
    pub calls_received: u64,
    /// Received frames that were not dispatched successfully.
    pub calls_rejected: u64,
}

/// A call that was received and handled by its callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub method: String,
    pub hash: u64,
    pub argc: usize,
}

/// One RPC endpoint over one transport.
pub struct Session<T: Transport> {
    transport: T,
    registry: Arc<MethodRegistry>,
    config: SessionConfig,
    state: SessionState,
    stats: SessionStats,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, registry: Arc<MethodRegistry>) -> Self {
        Self::with_config(transport, registry, SessionConfig::default())
    }

    pub fn with_config(transport: T, registry: Arc<MethodRegistry>, config: SessionConfig) -> Self {
        Self {
            transport,
            registry,
            config,
            state: SessionState::Idle,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Calls `method` on the peer with the given arguments.
    ///
    /// The call is fire-and-forget: nothing is read back.
    pub fn call(&mut self, method: &str, args: impl IntoArgs) -> Result<(), SessionError> {
        let args = args.into_args();
        self.send(method, &args)
    }

    /// Calls `method` after checking that `format` describes `args`.
    pub fn call_fmt(
        &mut self,
        method: &str,
        format: &str,
        args: &[TypedValue],
    ) -> Result<(), SessionError> {
        validate_format(format, args).map_err(SessionError::BadCall)?;
        self.send(method, args)
    }

    fn send(&mut self, method: &str, args: &[TypedValue]) -> Result<(), SessionError> {
        let frame = self.build_frame(method, args)?;

        self.state = SessionState::Sending;
        let result = self.write_frame(&frame);
        self.state = SessionState::Idle;
        result?;

        self.stats.calls_sent += 1;
        debug!(
            "Sent {}({}) {} bytes",
            method,
            signature_of(args),
            frame.len()
        );
        Ok(())
    }

    fn build_frame(&self, method: &str, args: &[TypedValue]) -> Result<BytesMut, SessionError> {
        if args.is_empty() {
            return Err(SessionError::EmptyArguments);
        }

        let payload = self
            .config
            .wire_mode
            .encode_args(args)
            .map_err(SessionError::BadCall)?;
        let max = self.config.max_payload as usize;
        if payload.len() > max {
            return Err(SessionError::BadCall(ProtocolError::FrameTooLarge {
                size: payload.len(),
                max,
            }));
        }

        CallFrame::new(method_hash(method), payload)
            .encode()
            .map_err(SessionError::BadCall)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), SessionError> {
        let written = self.transport.write_all(frame)?;
        if written != frame.len() {
            return Err(SessionError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }
        self.transport.flush()?;
        Ok(())
    }

    /// Reads one call frame and dispatches it to its registered callback.
    pub fn receive(&mut self) -> Result<Dispatched, SessionError> {
        let result = self.receive_frame();
        self.state = SessionState::Idle;

        if let Err(e) = &result {
            let stream_failed = matches!(
                e,
                SessionError::Connection(_) | SessionError::Closed | SessionError::Idle(_)
            );
            if !stream_failed {
                self.stats.calls_rejected += 1;
                warn!("Rejected call: {} ({})", e, e.code());
            }
        }
        result
    }

    fn receive_frame(&mut self) -> Result<Dispatched, SessionError> {
        self.state = SessionState::ReceivingHeader;
        let mut header = [0u8; CALL_HEADER_SIZE];
        // Only a stream that ends before the first header byte closed cleanly.
        self.transport
            .read_exact(&mut header[..1])
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => SessionError::Closed,
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => SessionError::Idle(e),
                _ => SessionError::Connection(e),
            })?;
        self.transport.read_exact(&mut header[1..])?;
        let header = CallHeader::decode(&header);

        if header.args_length <= 0 {
            return Err(SessionError::InvalidArgsLength(header.args_length));
        }
        let len = header.args_length as usize;
        let max = self.config.max_payload as usize;
        if len > max {
            return Err(SessionError::PayloadTooLarge { size: len, max });
        }

        // The body is read before the method is resolved so that a rejected
        // call still leaves the stream at a frame boundary.
        self.state = SessionState::ReceivingBody;
        let mut body = BytesMut::zeroed(len);
        self.transport.read_exact(&mut body)?;
        self.stats.calls_received += 1;

        self.state = SessionState::Dispatching;
        let registry = Arc::clone(&self.registry);
        let method = registry
            .resolve(header.method_hash)
            .ok_or(SessionError::UnknownMethod {
                hash: header.method_hash,
            })?;

        let args = self.decode_args(method, body.freeze())?;
        debug!("Dispatching {}({})", method.name(), method.signature());

        match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(&args))) {
            Ok(Ok(())) => Ok(Dispatched {
                method: method.name().to_string(),
                hash: method.hash(),
                argc: args.len(),
            }),
            Ok(Err(source)) => Err(SessionError::Callback {
                method: method.name().to_string(),
                source,
            }),
            Err(_) => Err(SessionError::CallbackPanicked {
                method: method.name().to_string(),
            }),
        }
    }

    fn decode_args(
        &self,
        method: &RemoteMethod,
        body: Bytes,
    ) -> Result<Vec<TypedValue>, SessionError> {
        let expected = method.signature();

        if !self.config.wire_mode.is_self_describing() {
            // The layout comes from the declared signature, so a mismatch
            // only shows up as the payload failing to fit it.
            return self
                .config
                .wire_mode
                .decode_args(body, expected)
                .map_err(|e| {
                    let detail = e.to_string();
                    if e.is_shape_error() {
                        SessionError::BadArgsCount {
                            method: method.name().to_string(),
                            expected: expected.to_string(),
                            detail,
                        }
                    } else {
                        SessionError::BadArgsType {
                            method: method.name().to_string(),
                            expected: expected.to_string(),
                            detail,
                        }
                    }
                });
        }

        let args = self
            .config
            .wire_mode
            .decode_args(body, expected)
            .map_err(|source| SessionError::Decode {
                method: method.name().to_string(),
                source,
            })?;

        let actual = signature_of(&args);
        if actual.len() != expected.len() {
            return Err(SessionError::BadArgsCount {
                method: method.name().to_string(),
                expected: expected.to_string(),
                detail: format!("got \"{}\"", actual),
            });
        }
        if actual != expected {
            return Err(SessionError::BadArgsType {
                method: method.name().to_string(),
                expected: expected.to_string(),
                detail: format!("got \"{}\"", actual),
            });
        }
        Ok(args)
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("methods", &self.registry.len())
            .finish()
    }
}
