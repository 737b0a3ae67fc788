//! HTTP layer error types.

use atmodem_engine::EngineError;
use thiserror::Error;

/// Errors raised by the HTTP layer.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The payload does not look like an HTTP request at all.
    #[error("payload is not an HTTP request")]
    NotHttp,

    /// The request line was recognizably HTTP but could not be parsed.
    #[error("malformed request line: {0}")]
    BadRequest(String),

    /// Modem bring-up failed at the initialization step.
    #[error("could not initialize the modem")]
    Init(#[source] EngineError),

    /// Modem bring-up failed joining the access point.
    #[error("could not join the access point")]
    Join(#[source] EngineError),

    /// Modem bring-up failed starting the TCP server.
    #[error("could not start the TCP server")]
    Serve(#[source] EngineError),

    /// Any engine failure outside bring-up.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type alias for HTTP layer operations.
pub type HttpResult<T> = Result<T, HttpError>;
