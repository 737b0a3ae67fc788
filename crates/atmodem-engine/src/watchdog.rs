//! Protocol-level watchdog and recovery.
//!
//! Two observations mean the modem is no longer in the state the driver
//! believes it is: the access point dropped the link (`WIFI DISCONNECT`), or
//! the boot banner's `ready` shows up outside any command exchange (the
//! modem reset behind our back). Both are answered with a full
//! reinitialize-rejoin-reserve sequence; if that sequence fails the engine
//! reports `Fatal` and the host decides the reset policy.

use std::time::Duration;

use log::{error, warn};

use atmodem_protocol::{ResponseToken, DISCONNECT_LITERAL};

use crate::error::{EngineError, EngineResult};
use crate::modem::{Modem, ResetControl};
use crate::transport::Transport;

/// Extended read timeout while listening for a stray boot banner.
pub const WATCHDOG_WAIT: Duration = Duration::from_secs(10);

impl<T: Transport, R: ResetControl> Modem<T, R> {
    /// Decide whether an unclassified line indicates malfunction, and
    /// recover if it does.
    ///
    /// Returns `Ok(true)` when the modem looks healthy, `Ok(false)` when a
    /// malfunction was recognized and service was re-established, and
    /// [`EngineError::Fatal`] when recovery itself failed.
    pub fn diagnose(&mut self) -> EngineResult<bool> {
        if self.buffer_starts_with(DISCONNECT_LITERAL) {
            warn!("access point dropped the link, restarting");
            self.clear_pending();
            self.restart()?;
            return Ok(false);
        }

        // A rebooting modem prints its banner slowly; listen with a wider
        // window than the normal per-command timeout.
        let normal = self.transport_mut().read_timeout();
        self.transport_mut()
            .set_read_timeout(Some(WATCHDOG_WAIT))
            .map_err(EngineError::from)?;
        let outcome = self.check_response();
        self.transport_mut()
            .set_read_timeout(normal)
            .map_err(EngineError::from)?;

        match outcome {
            Ok(ResponseToken::Ready) => {
                warn!("modem reset behind our back, restarting");
                self.restart()?;
                Ok(false)
            }
            Ok(_) | Err(EngineError::Timeout) => Ok(true),
            Err(err) => Err(err),
        }
    }

    /// Re-run init, rejoin the stored access point and re-reserve the TCP
    /// server. Failure here is unrecoverable in-process.
    fn restart(&mut self) -> EngineResult<()> {
        if let Err(err) = self.restart_sequence() {
            error!("recovery failed: {}", err);
            return Err(EngineError::Fatal);
        }
        Ok(())
    }

    fn restart_sequence(&mut self) -> EngineResult<()> {
        self.init()?;
        self.join_stored()?;
        self.start_server_stored()
    }
}
