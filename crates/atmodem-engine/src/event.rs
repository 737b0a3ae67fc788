//! Classified network events produced by `poll`.

use crate::connection::Channel;

/// One inbound data frame.
///
/// The payload borrows the engine's shared buffer and is invalidated by the
/// next engine call; consume it before polling again.
#[derive(Debug, PartialEq, Eq)]
pub struct DataFrame<'a> {
    /// Session slot the data arrived on.
    pub channel: Channel,
    /// Payload bytes, contiguous in the shared buffer.
    pub payload: &'a [u8],
    /// True when the announced frame did not fit the buffer and the excess
    /// was drained from the transport.
    pub truncated: bool,
}

/// Result of one `poll` call.
#[derive(Debug, PartialEq, Eq)]
pub enum InboundEvent<'a> {
    /// No data pending.
    Nothing,
    /// A client connected to a session slot.
    ClientConnected {
        /// The slot that connected.
        channel: Channel,
    },
    /// A client disconnected from a session slot.
    ClientDisconnected {
        /// The slot that disconnected.
        channel: Channel,
    },
    /// An inbound application data frame.
    Data(DataFrame<'a>),
    /// A line that matches no expected framing; the watchdog decides whether
    /// it indicates malfunction.
    ReplyPending,
}
