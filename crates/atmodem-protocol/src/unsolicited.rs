//! Classification of unsolicited lines.
//!
//! The modem pushes session lifecycle and inbound-data notifications without
//! them being a reply to the last issued command. Because the protocol has no
//! out-of-band framing, a line that matches none of the known shapes may
//! still be a stray command reply and must be kept for re-examination rather
//! than dropped.

use log::warn;

use crate::error::{ProtocolError, ProtocolResult};
use crate::responses::find;

/// Suffix of a `<channel>,CONNECT` notification.
pub const CONNECT_MARKER: &[u8] = b"CONNECT";

/// Suffix of a `<channel>,CLOSED` notification.
pub const CLOSED_MARKER: &[u8] = b"CLOSED";

/// Prefix of a `+IPD,<channel>,<length>:<payload>` data announcement.
pub const DATA_MARKER: &[u8] = b"+IPD,";

/// Literal the modem emits when it loses the access point.
pub const DISCONNECT_LITERAL: &[u8] = b"WIFI DISCONNECT";

/// Shape of one unsolicited line. Channels are carried as the raw ASCII byte
/// sent by the modem; validation against the session table is the engine's
/// job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsolicited {
    /// Blank line, nothing to do.
    Empty,
    /// A client connected to a session slot.
    Connect {
        /// Raw ASCII channel byte.
        channel: u8,
    },
    /// A client disconnected from a session slot.
    Closed {
        /// Raw ASCII channel byte.
        channel: u8,
    },
    /// A data announcement; parse it with [`DataHeader::parse`].
    Data,
    /// None of the known shapes; may be a stray command reply.
    Other,
}

/// Classify one line, first match wins.
///
/// The connect/disconnect comparisons skip the leading channel byte and
/// separator, so only single-digit channels can match; the data marker is
/// matched anywhere in the line because the modem occasionally prefixes it
/// with leftovers of a previous exchange.
pub fn classify_line(line: &[u8]) -> Unsolicited {
    if line.is_empty() {
        return Unsolicited::Empty;
    }
    if line.len() > 2 {
        if &line[2..] == CONNECT_MARKER {
            return Unsolicited::Connect { channel: line[0] };
        }
        if &line[2..] == CLOSED_MARKER {
            return Unsolicited::Closed { channel: line[0] };
        }
    }
    if find(line, DATA_MARKER).is_some() {
        return Unsolicited::Data;
    }
    Unsolicited::Other
}

/// Parsed `+IPD,<channel>,<length>:` announcement header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    /// Raw ASCII channel byte.
    pub channel: u8,
    /// Announced payload length in bytes.
    pub declared_len: usize,
    /// Index of the first payload byte within the announcement line.
    pub payload_start: usize,
}

impl DataHeader {
    /// Parse an announcement line.
    ///
    /// Offsets are fixed relative to the marker: the channel byte sits right
    /// after `+IPD,`, the length digits follow the next comma and run up to
    /// the first `:`.
    pub fn parse(line: &[u8]) -> ProtocolResult<DataHeader> {
        let at = find(line, DATA_MARKER).ok_or_else(|| {
            ProtocolError::MalformedAnnouncement("missing +IPD marker".to_string())
        })?;
        let channel_at = at + DATA_MARKER.len();
        let channel = *line.get(channel_at).ok_or_else(|| {
            ProtocolError::MalformedAnnouncement("announcement ends before channel".to_string())
        })?;
        if line.get(channel_at + 1) != Some(&b',') {
            return Err(ProtocolError::MalformedAnnouncement(
                "missing separator after channel".to_string(),
            ));
        }
        let len_at = channel_at + 2;
        let colon = line[len_at..]
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| {
                ProtocolError::MalformedAnnouncement("missing ':' after length".to_string())
            })?;
        let digits = &line[len_at..len_at + colon];
        let declared_len = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                warn!(
                    "unparseable length field in data announcement: {:?}",
                    String::from_utf8_lossy(digits)
                );
                ProtocolError::MalformedAnnouncement("bad length field".to_string())
            })?;

        Ok(DataHeader {
            channel,
            declared_len,
            payload_start: len_at + colon + 1,
        })
    }
}
