//! Blocking transport contract.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// The two blocking primitives a session needs from its byte stream.
///
/// Timeouts and reconnects belong to the implementation, not to the session.
pub trait Transport {
    /// Fills `buf` completely, or fails if the stream closes or errors first.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Writes `buf`, returning how many bytes were actually written.
    ///
    /// A count below `buf.len()` is a failed write.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Adapter from any `Read + Write` stream, such as a `TcpStream`.
#[derive(Debug)]
pub struct IoTransport<S> {
    inner: S,
}

impl<S> IoTransport<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> Transport for IoTransport<S> {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.inner.read_exact(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            match self.inner.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// In-memory transport: reads drain a queue of input, writes are captured.
///
/// Useful for loopback scenarios and tests: feed one session's `written()`
/// output into another session's input.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose reads will return `input`.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Appends bytes for subsequent reads.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Takes everything written so far, leaving the output empty.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Transport for MemoryTransport {
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        if self.input.len() < buf.len() {
            // Partial data is consumed, like a stream that closed mid-read.
            self.input.clear();
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream closed before read completed",
            ));
        }
        let n = buf.len();
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..n)) {
            *slot = byte;
        }
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }
}
