//! Error types for the wire protocol.

use thiserror::Error;

/// Errors that can occur when parsing modem output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A `+IPD` data announcement did not have the expected shape.
    #[error("malformed data announcement: {0}")]
    MalformedAnnouncement(String),

    /// A `STATUS:` reply carried a digit outside the known set.
    #[error("unknown link status digit {0:?}")]
    UnknownStatus(char),
}

/// Result type alias for protocol parsing.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
