//! Inbound frame reassembly.
//!
//! A data announcement line carries the declared payload length, but the line
//! reader stops at the first CR, so a frame can span the current line's end.
//! The reassembler reads exactly the announced remainder raw from the
//! transport, appending it directly after the captured part so the payload is
//! one contiguous region of the shared buffer.

use std::ops::Range;

use atmodem_protocol::DataHeader;

use crate::buffer::ResponseBuffer;
use crate::connection::Channel;
use crate::error::EngineResult;
use crate::transport::Transport;

/// Location of one reassembled frame inside the shared buffer.
pub(crate) struct FrameInfo {
    pub channel: Channel,
    pub payload: Range<usize>,
    pub truncated: bool,
}

/// Reassemble the frame announced by the line currently in `buffer`.
///
/// Bytes already captured after the announcement's `:` count toward the
/// declared length. A frame larger than the remaining buffer capacity is
/// stored truncated and the excess drained from the transport, so the stream
/// stays synchronized.
pub(crate) fn reassemble<T: Transport>(
    transport: &mut T,
    buffer: &mut ResponseBuffer,
) -> EngineResult<FrameInfo> {
    let header = DataHeader::parse(buffer.as_slice())?;
    let channel = Channel::from_ascii(header.channel)?;

    let captured = buffer.len() - header.payload_start;
    let mut truncated = false;
    if captured < header.declared_len {
        let mut remaining = header.declared_len - captured;
        let store = remaining.min(buffer.spare_len());
        transport.read_exact(&mut buffer.spare_mut()[..store])?;
        buffer.commit(store);
        remaining -= store;
        if remaining > 0 {
            truncated = true;
            drain(transport, remaining)?;
        }
    }

    let end = (header.payload_start + header.declared_len).min(buffer.len());
    Ok(FrameInfo {
        channel,
        payload: header.payload_start..end,
        truncated,
    })
}

/// Consume and discard `count` bytes from the transport.
fn drain<T: Transport>(transport: &mut T, mut count: usize) -> EngineResult<()> {
    let mut sink = [0u8; 64];
    while count > 0 {
        let n = count.min(sink.len());
        transport.read_exact(&mut sink[..n])?;
        count -= n;
    }
    Ok(())
}
