//! CR/LF line discipline over the transport.

use crate::error::EngineResult;
use crate::transport::Transport;

/// Read one CR-terminated record into `buf`.
///
/// Consumes bytes until a CR is seen or `buf.len() - 1` bytes have been
/// stored, whichever comes first, then unconditionally discards bytes until
/// an LF goes by. The discard step tolerates the modem's occasional doubled
/// CR before the LF and eats the tail of over-long lines so the stream stays
/// line-aligned.
///
/// Returns the number of bytes stored. Blocking is bounded by the transport's
/// read timeout.
pub(crate) fn read_line<T: Transport>(transport: &mut T, buf: &mut [u8]) -> EngineResult<usize> {
    let limit = buf.len().saturating_sub(1);
    let mut stored = 0;
    while stored < limit {
        let byte = transport.read_byte()?;
        if byte == b'\r' {
            break;
        }
        buf[stored] = byte;
        stored += 1;
    }
    while transport.read_byte()? != b'\n' {}
    Ok(stored)
}
