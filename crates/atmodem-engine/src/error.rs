//! Engine error types.

use atmodem_protocol::{ProtocolError, ResponseToken};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while driving the modem.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The accumulated response would exceed the shared buffer capacity.
    /// Accumulation halts immediately to avoid worsening the desync.
    #[error("response buffer overflow (capacity {capacity} bytes)")]
    Overflow {
        /// Buffer capacity in bytes.
        capacity: usize,
    },

    /// The expected command echo line did not arrive.
    #[error("echo mismatch for `{command}`")]
    EchoMismatch {
        /// The command whose echo was expected.
        command: String,
    },

    /// The modem ended the exchange with the wrong terminal token.
    #[error("modem answered {got} where {want} was expected")]
    CommandRejected {
        /// The token required for success.
        want: ResponseToken,
        /// The token actually received.
        got: ResponseToken,
    },

    /// No terminal token arrived within the configured read timeout.
    #[error("timed out waiting for modem output")]
    Timeout,

    /// The modem named a session slot outside the connection table.
    #[error("channel byte {0:?} does not name a session slot")]
    ChannelOutOfRange(char),

    /// An accumulated reply was missing its fixed literal marker.
    #[error("marker not found in {context}")]
    MissingMarker {
        /// Which reply was being searched.
        context: &'static str,
    },

    /// Modem output failed to parse.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The byte channel itself failed.
    #[error("transport failure: {0}")]
    Transport(TransportError),

    /// The watchdog's reinitialize-rejoin-reserve sequence failed. There is
    /// no further in-process recovery; the host decides the reset policy.
    #[error("recovery failed; the modem requires an external reset")]
    Fatal,
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TimedOut => EngineError::Timeout,
            other => EngineError::Transport(other),
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
