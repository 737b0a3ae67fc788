//! Byte-stream transport abstraction.
//!
//! The engine owns its transport exclusively: single reader, single writer,
//! strictly sequential blocking calls. Every blocking read is bounded by the
//! configured read timeout and surfaces expiry as [`TransportError::TimedOut`]
//! rather than hanging.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use thiserror::Error;

/// Read timeout applied to freshly opened transports. Matches the reply
/// latency of 9600-baud modem firmware with some slack.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured read timeout elapsed with no byte available.
    #[error("read timed out")]
    TimedOut,

    /// The peer closed the byte channel.
    #[error("transport closed by peer")]
    Closed,

    /// Any other I/O failure.
    #[error("i/o failure: {0}")]
    Io(#[from] io::Error),
}

/// An ordered byte channel to the modem.
pub trait Transport {
    /// Read one byte, blocking up to the configured read timeout.
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Write the whole slice.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Whether at least one byte can be read without blocking.
    fn bytes_available(&mut self) -> bool;

    /// The currently configured read timeout.
    fn read_timeout(&self) -> Option<Duration>;

    /// Reconfigure the read timeout. `None` removes the bound.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;

    /// Read exactly `buf.len()` bytes, blocking for each one.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        for slot in buf.iter_mut() {
            *slot = self.read_byte()?;
        }
        Ok(())
    }
}

/// Transport over a TCP connection to a serial bridge.
///
/// Modem UARTs are commonly exposed as TCP ports by a bridge process; this
/// transport speaks to such a port with `std::net::TcpStream`.
pub struct TcpTransport {
    stream: TcpStream,
    timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connect to a serial bridge at `addr` (`host:port`).
    pub fn connect(addr: &str) -> Result<TcpTransport, TransportError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(DEFAULT_READ_TIMEOUT))?;
        Ok(TcpTransport {
            stream,
            timeout: Some(DEFAULT_READ_TIMEOUT),
        })
    }
}

impl Transport for TcpTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(byte[0]),
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Err(TransportError::TimedOut)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    fn bytes_available(&mut self) -> bool {
        if self.stream.set_nonblocking(true).is_err() {
            return false;
        }
        let mut probe = [0u8; 1];
        let available = matches!(self.stream.peek(&mut probe), Ok(n) if n > 0);
        let _ = self.stream.set_nonblocking(false);
        available
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.stream.set_read_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }
}

/// Scripted in-memory transport for tests and development.
///
/// Input is served from a queue; an empty queue behaves like a read timeout,
/// which is also how a silent modem presents itself on a real link.
#[derive(Debug, Default)]
pub struct MockTransport {
    input: VecDeque<u8>,
    written: Vec<u8>,
    timeout: Option<Duration>,
}

impl MockTransport {
    /// Create an empty mock.
    pub fn new() -> MockTransport {
        MockTransport {
            input: VecDeque::new(),
            written: Vec::new(),
            timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Queue bytes for the engine to read.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Everything the engine has written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Drain and return everything written so far.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of queued input bytes not yet consumed.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Transport for MockTransport {
    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.input.pop_front().ok_or(TransportError::TimedOut)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn bytes_available(&mut self) -> bool {
        !self.input.is_empty()
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.timeout = timeout;
        Ok(())
    }
}
