//! The modem lifecycle manager and event demultiplexer.
//!
//! Every operation here is a small state machine over the byte stream:
//! command out, echo and terminal token back, with multi-line payloads
//! accumulated into the shared buffer. A line that matches no expected
//! framing is never dropped; it is flagged pending and re-examined by the
//! next `poll`, which is what keeps an interleaved connect/disconnect
//! notification from being lost mid-exchange.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use atmodem_protocol::{
    classify_line, extract_quoted, status_digit, Command, LinkStatus, ResponseToken, Unsolicited,
    STATION_IP_MARKER, STATION_MAC_MARKER,
};

use crate::buffer::{ResponseBuffer, BUFFER_CAPACITY};
use crate::connection::{Channel, ConnectionTable};
use crate::error::{EngineError, EngineResult};
use crate::event::{DataFrame, InboundEvent};
use crate::frame::reassemble;
use crate::line::read_line;
use crate::transport::Transport;

/// How long the reset line is held asserted during a hardware reset.
const RESET_HOLD: Duration = Duration::from_millis(500);

/// Opaque control over the modem's hardware reset line.
///
/// Pin-level sequencing lives with the board bring-up code; the engine only
/// asserts and releases.
pub trait ResetControl {
    /// Pull the reset line active.
    fn assert_reset(&mut self);
    /// Release the reset line.
    fn release_reset(&mut self);
}

/// Placeholder for deployments without a wired reset line; `init` falls back
/// to a software reset command.
#[derive(Debug, Default)]
pub struct NullReset;

impl ResetControl for NullReset {
    fn assert_reset(&mut self) {}
    fn release_reset(&mut self) {}
}

/// Modem lifecycle state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModemFlags {
    /// Bring-up sequence completed.
    pub initialized: bool,
    /// Joined to an access point.
    pub joined: bool,
    /// TCP server accepted the start command.
    pub server_running: bool,
    /// A buffered send is being accumulated.
    pub sending: bool,
    /// The shared buffer holds a line that must be re-examined by `poll`
    /// instead of being discarded.
    pub pending_line: bool,
}

/// Driver for one AT-command WiFi modem.
///
/// Owns the transport and the shared response buffer exclusively. All calls
/// are strictly sequential; views returned by one call are invalidated by the
/// next.
pub struct Modem<T: Transport, R: ResetControl = NullReset> {
    transport: T,
    reset: Option<R>,
    buffer: ResponseBuffer,
    flags: ModemFlags,
    connections: ConnectionTable,
    ssid: String,
    pass: String,
    port: u16,
    ip: String,
    mac: String,
}

impl<T: Transport> Modem<T, NullReset> {
    /// Create a driver without a wired reset line.
    pub fn new(transport: T) -> Modem<T, NullReset> {
        Modem::build(transport, None)
    }
}

impl<T: Transport, R: ResetControl> Modem<T, R> {
    /// Create a driver with a wired reset line.
    pub fn with_reset(transport: T, reset: R) -> Modem<T, R> {
        Modem::build(transport, Some(reset))
    }

    fn build(transport: T, reset: Option<R>) -> Modem<T, R> {
        Modem {
            transport,
            reset,
            buffer: ResponseBuffer::new(),
            flags: ModemFlags::default(),
            connections: ConnectionTable::new(),
            ssid: String::new(),
            pass: String::new(),
            port: 0,
            ip: String::new(),
            mac: String::new(),
        }
    }

    /// Current lifecycle flags.
    pub fn flags(&self) -> ModemFlags {
        self.flags
    }

    /// Per-channel connection state.
    pub fn connections(&self) -> &ConnectionTable {
        &self.connections
    }

    /// Direct access to the transport, e.g. to adjust the read timeout.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Whether the shared buffer currently begins with `literal`. The
    /// watchdog uses this to spot fatal protocol strings left behind by a
    /// misclassified exchange.
    pub(crate) fn buffer_starts_with(&self, literal: &[u8]) -> bool {
        self.buffer.as_slice().starts_with(literal)
    }

    pub(crate) fn clear_pending(&mut self) {
        self.flags.pending_line = false;
    }

    // ========================================================================
    // Command plumbing
    // ========================================================================

    pub(crate) fn write_command(&mut self, command: &Command) -> EngineResult<()> {
        debug!("-> {}", command.to_command_string());
        self.transport.write_all(&command.encode())?;
        Ok(())
    }

    /// Read lines until a terminal token arrives, discarding their content.
    ///
    /// Token lines are short; longer lines cannot match and are safe to
    /// truncate into the scratch space.
    pub(crate) fn check_response(&mut self) -> EngineResult<ResponseToken> {
        let mut scratch = [0u8; 20];
        loop {
            let n = read_line(&mut self.transport, &mut scratch)?;
            if let Some(token) = ResponseToken::classify(&scratch[..n]) {
                debug!("<- {}", token);
                return Ok(token);
            }
        }
    }

    /// Issue a command and require a specific terminal token.
    fn exchange(&mut self, command: Command, want: ResponseToken) -> EngineResult<()> {
        self.write_command(&command)?;
        let got = self.check_response()?;
        if got == want {
            Ok(())
        } else {
            warn!("{} answered {}", command.to_command_string(), got);
            Err(EngineError::CommandRejected { want, got })
        }
    }

    /// Read the next non-empty line into the buffer and compare it with the
    /// expected command echo. On mismatch the line is left in the buffer.
    fn await_echo(&mut self, command: &Command) -> EngineResult<bool> {
        loop {
            self.buffer.truncate(0);
            let n = read_line(&mut self.transport, self.buffer.spare_mut())?;
            if n == 0 {
                continue;
            }
            self.buffer.commit(n);
            break;
        }
        Ok(self.buffer.as_slice() == command.to_command_string().as_bytes())
    }

    /// Accumulate reply lines into the buffer starting at `origin` until a
    /// terminal token arrives.
    ///
    /// Lines are re-joined with CRLF; the token line itself is excluded, so
    /// the returned range ends with the CRLF after the last payload line. If
    /// the next line plus its separator cannot fit, `Overflow` is returned
    /// before any further transport read.
    pub(crate) fn read_terminated(
        &mut self,
        origin: usize,
    ) -> EngineResult<(ResponseToken, std::ops::Range<usize>)> {
        self.buffer.truncate(origin);
        loop {
            let start = self.buffer.len();
            let n = read_line(&mut self.transport, self.buffer.spare_mut())?;
            if start + n + 2 > BUFFER_CAPACITY {
                return Err(EngineError::Overflow {
                    capacity: BUFFER_CAPACITY,
                });
            }
            self.buffer.commit(n);
            if let Some(token) = ResponseToken::classify(self.buffer.slice(start..start + n)) {
                debug!("<- {}", token);
                self.buffer.truncate(start);
                return Ok((token, origin..start));
            }
            self.buffer.push_crlf()?;
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Liveness probe: `AT` must answer `OK`.
    pub fn probe(&mut self) -> EngineResult<()> {
        self.exchange(Command::Probe, ResponseToken::Ok)
    }

    /// Reset the modem and run the configuration sequence: echo on, station
    /// mode, multiplexed sessions. Any deviation aborts the whole sequence
    /// and leaves the modem uninitialized.
    pub fn init(&mut self) -> EngineResult<()> {
        self.flags = ModemFlags::default();
        self.restart_hardware()?;
        self.exchange(Command::EchoOn, ResponseToken::Ok)?;
        self.exchange(Command::StationMode, ResponseToken::Ok)?;
        self.exchange(Command::MultiplexOn, ResponseToken::Ok)?;
        self.flags.initialized = true;
        info!("modem initialized");
        Ok(())
    }

    /// Reset via the reset line when one is fitted, else via `AT+RST`, then
    /// wait for the boot banner's `ready`.
    fn restart_hardware(&mut self) -> EngineResult<()> {
        match &mut self.reset {
            Some(line) => {
                line.assert_reset();
                thread::sleep(RESET_HOLD);
                line.release_reset();
            }
            None => self.write_command(&Command::Reset)?,
        }
        let got = self.check_response()?;
        if got == ResponseToken::Ready {
            Ok(())
        } else {
            Err(EngineError::CommandRejected {
                want: ResponseToken::Ready,
                got,
            })
        }
    }

    /// Join an access point. The credentials are copied and retained for the
    /// watchdog's recovery sequence.
    pub fn join(&mut self, ssid: &str, pass: &str) -> EngineResult<()> {
        self.ssid = ssid.to_string();
        self.pass = pass.to_string();
        self.join_stored()
    }

    pub(crate) fn join_stored(&mut self) -> EngineResult<()> {
        let command = Command::JoinAp {
            ssid: self.ssid.clone(),
            pass: self.pass.clone(),
        };
        self.exchange(command, ResponseToken::Ok)?;
        self.flags.joined = true;
        info!("joined access point {}", self.ssid);
        Ok(())
    }

    /// Leave the current access point.
    pub fn leave(&mut self) -> EngineResult<()> {
        self.exchange(Command::QuitAp, ResponseToken::Ok)?;
        self.flags.joined = false;
        Ok(())
    }

    /// Start the single TCP server instance. The port is retained for the
    /// watchdog's recovery sequence.
    pub fn start_server(&mut self, port: u16) -> EngineResult<()> {
        self.port = port;
        self.start_server_stored()
    }

    pub(crate) fn start_server_stored(&mut self) -> EngineResult<()> {
        self.exchange(Command::ServerStart { port: self.port }, ResponseToken::Ok)?;
        self.flags.server_running = true;
        info!("TCP server listening on port {}", self.port);
        Ok(())
    }

    /// Stop the TCP server. When the stop command is rejected the server is
    /// assumed to still be running and the flag stays set; that is the
    /// contract, not an oversight.
    pub fn stop_server(&mut self) -> EngineResult<()> {
        match self.exchange(Command::ServerStop, ResponseToken::Ok) {
            Ok(()) => {
                self.flags.server_running = false;
                Ok(())
            }
            Err(err) => {
                self.flags.server_running = true;
                Err(err)
            }
        }
    }

    /// Query the link status digit.
    ///
    /// An unexpected first line is kept for the next `poll` instead of being
    /// discarded.
    pub fn link_status(&mut self) -> EngineResult<LinkStatus> {
        let command = Command::QueryLinkStatus;
        self.write_command(&command)?;
        if !self.await_echo(&command)? {
            self.flags.pending_line = true;
            return Err(EngineError::EchoMismatch {
                command: command.to_command_string(),
            });
        }
        let (token, range) = self.read_terminated(0)?;
        if token != ResponseToken::Ok {
            return Err(EngineError::CommandRejected {
                want: ResponseToken::Ok,
                got: token,
            });
        }
        let digit = status_digit(self.buffer.slice(range)).ok_or(EngineError::MissingMarker {
            context: "status reply",
        })?;
        Ok(LinkStatus::from_digit(digit)?)
    }

    /// The station IP address, queried from the modem and cached.
    pub fn station_ip(&mut self) -> EngineResult<&str> {
        self.refresh_addresses()?;
        Ok(&self.ip)
    }

    /// The station MAC address, queried from the modem and cached.
    pub fn station_mac(&mut self) -> EngineResult<&str> {
        self.refresh_addresses()?;
        Ok(&self.mac)
    }

    fn refresh_addresses(&mut self) -> EngineResult<()> {
        let command = Command::QueryAddresses;
        self.write_command(&command)?;
        if !self.await_echo(&command)? {
            return Err(EngineError::EchoMismatch {
                command: command.to_command_string(),
            });
        }
        let (token, range) = self.read_terminated(0)?;
        if token != ResponseToken::Ok {
            return Err(EngineError::CommandRejected {
                want: ResponseToken::Ok,
                got: token,
            });
        }
        let (ip, mac) = {
            let reply = self.buffer.slice(range);
            let ip = extract_quoted(reply, STATION_IP_MARKER).ok_or(EngineError::MissingMarker {
                context: "address reply",
            })?;
            let mac =
                extract_quoted(reply, STATION_MAC_MARKER).ok_or(EngineError::MissingMarker {
                    context: "address reply",
                })?;
            (
                String::from_utf8_lossy(ip).into_owned(),
                String::from_utf8_lossy(mac).into_owned(),
            )
        };
        self.ip = ip;
        self.mac = mac;
        Ok(())
    }

    /// Close one session slot.
    ///
    /// The modem answers with the command echo, a `<channel>,CLOSED` line and
    /// `OK`. The buffer is cut down to the `CLOSED` remnant and flagged
    /// pending, so the next `poll` observes the disconnect and releases the
    /// table entry; the table is never mutated here.
    pub fn close(&mut self, channel: Channel) -> EngineResult<()> {
        let command = Command::Close {
            channel: channel.index() as u8,
        };
        self.write_command(&command)?;

        self.buffer.truncate(0);
        let n = read_line(&mut self.transport, self.buffer.spare_mut())?;
        self.buffer.commit(n);
        if atmodem_protocol::find(self.buffer.as_slice(), b"AT+CIPCLOSE").is_none() {
            self.flags.pending_line = true;
            return Err(EngineError::EchoMismatch {
                command: command.to_command_string(),
            });
        }

        let (token, _) = self.read_terminated(0)?;
        if token != ResponseToken::Ok {
            return Err(EngineError::CommandRejected {
                want: ResponseToken::Ok,
                got: token,
            });
        }
        if let Some(at) = atmodem_protocol::find(self.buffer.as_slice(), b"CLOSED") {
            self.buffer.truncate(at + b"CLOSED".len());
        }
        self.flags.pending_line = true;
        Ok(())
    }

    // ========================================================================
    // Outbound data
    // ========================================================================

    /// Send payload bytes on a session slot.
    ///
    /// With `flush_now` false the payload is only accumulated; repeated calls
    /// keep appending until one flushes. The flush announces the total length
    /// with `AT+CIPSEND`, writes the raw bytes once the modem acknowledges
    /// the announcement, and requires `SEND OK`. Whatever the outcome of a
    /// flush, the send-in-progress state is reset; a failed send must be
    /// resubmitted in full. An `Overflow` during accumulation leaves the
    /// already-accumulated content untouched.
    pub fn send(
        &mut self,
        channel: Channel,
        payload: &[u8],
        append_eol: bool,
        flush_now: bool,
    ) -> EngineResult<()> {
        if !self.flags.sending {
            self.flags.sending = true;
            self.buffer.truncate(0);
        }
        self.buffer.append(payload)?;
        if append_eol {
            self.buffer.append(b"\r\n")?;
        }
        if !flush_now {
            return Ok(());
        }
        let result = self.flush_send(channel);
        self.flags.sending = false;
        result
    }

    /// Send a payload that already carries its line endings, bypassing
    /// accumulation.
    pub fn send_preformatted(&mut self, channel: Channel, payload: &[u8]) -> EngineResult<()> {
        self.flags.sending = true;
        self.buffer.truncate(0);
        let result = self
            .buffer
            .append(payload)
            .and_then(|()| self.flush_send(channel));
        self.flags.sending = false;
        result
    }

    fn flush_send(&mut self, channel: Channel) -> EngineResult<()> {
        let length = self.buffer.len();
        self.write_command(&Command::StartSend {
            channel: channel.index() as u8,
            length,
        })?;
        let got = self.check_response()?;
        if got != ResponseToken::Ok {
            return Err(EngineError::CommandRejected {
                want: ResponseToken::Ok,
                got,
            });
        }
        self.transport.write_all(self.buffer.as_slice())?;
        let got = self.check_response()?;
        if got != ResponseToken::SendOk {
            return Err(EngineError::CommandRejected {
                want: ResponseToken::SendOk,
                got,
            });
        }
        debug!("sent {} bytes on channel {}", length, channel);
        Ok(())
    }

    // ========================================================================
    // Event demultiplexer
    // ========================================================================

    /// Classify the next available line into one inbound event.
    ///
    /// Non-blocking when nothing is pending and the transport reports no
    /// data. A line left over from a previous misclassification is
    /// re-examined before any new read. The returned event borrows the
    /// shared buffer and must be consumed before the next engine call.
    pub fn poll(&mut self) -> EngineResult<InboundEvent<'_>> {
        if !self.flags.pending_line {
            if !self.transport.bytes_available() {
                return Ok(InboundEvent::Nothing);
            }
            self.buffer.truncate(0);
            let n = read_line(&mut self.transport, self.buffer.spare_mut())?;
            self.buffer.commit(n);
        }

        match classify_line(self.buffer.as_slice()) {
            Unsolicited::Empty => Ok(InboundEvent::Nothing),
            Unsolicited::Connect { channel } => {
                let channel = self.decode_channel(channel)?;
                self.connections.mark(channel, true);
                self.flags.pending_line = false;
                info!("client connected on channel {}", channel);
                Ok(InboundEvent::ClientConnected { channel })
            }
            Unsolicited::Closed { channel } => {
                let channel = self.decode_channel(channel)?;
                self.connections.mark(channel, false);
                self.flags.pending_line = false;
                info!("client disconnected from channel {}", channel);
                Ok(InboundEvent::ClientDisconnected { channel })
            }
            Unsolicited::Data => {
                let frame = match reassemble(&mut self.transport, &mut self.buffer) {
                    Ok(frame) => frame,
                    Err(err) => {
                        self.flags.pending_line = false;
                        return Err(err);
                    }
                };
                self.flags.pending_line = false;
                Ok(InboundEvent::Data(DataFrame {
                    channel: frame.channel,
                    payload: self.buffer.slice(frame.payload),
                    truncated: frame.truncated,
                }))
            }
            Unsolicited::Other => {
                self.flags.pending_line = false;
                Ok(InboundEvent::ReplyPending)
            }
        }
    }

    /// Validate a raw channel byte; bogus input from the modem drops the
    /// pending line so `poll` cannot loop on it.
    fn decode_channel(&mut self, raw: u8) -> EngineResult<Channel> {
        match Channel::from_ascii(raw) {
            Ok(channel) => Ok(channel),
            Err(err) => {
                warn!("modem sent unusable channel byte {:?}", raw as char);
                self.flags.pending_line = false;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn modem_with(script: &[u8]) -> Modem<MockTransport> {
        let mut mock = MockTransport::new();
        mock.push_input(script);
        Modem::new(mock)
    }

    // ---- accumulator ----

    #[test]
    fn test_read_terminated_joins_lines_excluding_token() {
        let mut modem = modem_with(b"L1\r\nL2\r\nOK\r\n");
        let (token, range) = modem.read_terminated(0).unwrap();
        assert_eq!(token, ResponseToken::Ok);
        assert_eq!(modem.buffer.slice(range), b"L1\r\nL2\r\n");
    }

    #[test]
    fn test_read_terminated_from_origin() {
        let mut modem = modem_with(b"tail\r\nOK\r\n");
        modem.buffer.append(b"head----").unwrap();
        let (token, range) = modem.read_terminated(8).unwrap();
        assert_eq!(token, ResponseToken::Ok);
        assert_eq!(range, 8..14);
        assert_eq!(modem.buffer.as_slice(), b"head----tail\r\n");
    }

    #[test]
    fn test_read_terminated_overflow_stops_reading() {
        let mut mock = MockTransport::new();
        // Three lines of 200 bytes cannot fit 512 with separators; the third
        // line triggers the overflow.
        let long = [b'x'; 200];
        for _ in 0..3 {
            mock.push_input(&long);
            mock.push_input(b"\r\n");
        }
        mock.push_input(b"OK\r\n");
        let mut modem = Modem::new(mock);

        let err = modem.read_terminated(0).unwrap_err();
        assert!(matches!(err, EngineError::Overflow { .. }));
        // The terminating token was never read: no transport reads past the
        // line that overflowed.
        assert_eq!(modem.transport.remaining_input(), 4);
    }

    // ---- lifecycle ----

    #[test]
    fn test_init_soft_resets_and_configures() {
        let mut modem = modem_with(b"ready\r\nOK\r\nOK\r\nOK\r\n");
        modem.init().unwrap();
        assert!(modem.flags().initialized);
        assert_eq!(
            modem.transport.written(),
            b"AT+RST\r\nATE1\r\nAT+CWMODE=1\r\nAT+CIPMUX=1\r\n"
        );
    }

    #[test]
    fn test_init_aborts_on_third_config_command() {
        let mut modem = modem_with(b"ready\r\nOK\r\nOK\r\nERROR\r\n");
        let err = modem.init().unwrap_err();
        assert!(matches!(err, EngineError::CommandRejected { .. }));
        assert!(!modem.flags().initialized);
    }

    #[test]
    fn test_init_requires_ready_banner() {
        let mut modem = modem_with(b"ERROR\r\n");
        assert!(modem.init().is_err());
        assert!(!modem.flags().initialized);
    }

    #[test]
    fn test_join_success_and_failure() {
        let mut modem = modem_with(b"OK\r\n");
        modem.join("lab-net", "hunter2").unwrap();
        assert!(modem.flags().joined);
        assert_eq!(modem.transport.written(), b"AT+CWJAP=\"lab-net\",\"hunter2\"\r\n");

        let mut modem = modem_with(b"FAIL\r\n");
        assert!(modem.join("lab-net", "wrong").is_err());
        assert!(!modem.flags().joined);
    }

    #[test]
    fn test_leave_clears_joined() {
        let mut modem = modem_with(b"OK\r\nOK\r\n");
        modem.join("lab-net", "hunter2").unwrap();
        modem.leave().unwrap();
        assert!(!modem.flags().joined);
    }

    #[test]
    fn test_stop_server_failure_keeps_flag() {
        let mut modem = modem_with(b"OK\r\nERROR\r\n");
        modem.start_server(80).unwrap();
        assert!(modem.flags().server_running);

        assert!(modem.stop_server().is_err());
        // Stop was rejected: the server is assumed to still be running.
        assert!(modem.flags().server_running);
    }

    #[test]
    fn test_probe() {
        let mut modem = modem_with(b"OK\r\n");
        modem.probe().unwrap();
        assert_eq!(modem.transport.written(), b"AT\r\n");
    }

    // ---- queries ----

    const STATUS_REPLY: &[u8] =
        b"AT+CIPSTATUS\r\r\nSTATUS:3\r\n+CIPSTATUS:0,\"TCP\",\"10.0.0.2\",49152,1\r\nOK\r\n";

    #[test]
    fn test_link_status() {
        let mut modem = modem_with(STATUS_REPLY);
        assert_eq!(modem.link_status().unwrap(), LinkStatus::Connected);
    }

    #[test]
    fn test_link_status_idempotent() {
        let mut modem = modem_with(STATUS_REPLY);
        assert_eq!(modem.link_status().unwrap(), LinkStatus::Connected);
        modem.transport.push_input(STATUS_REPLY);
        assert_eq!(modem.link_status().unwrap(), LinkStatus::Connected);
    }

    #[test]
    fn test_link_status_echo_mismatch_keeps_line_pending() {
        let mut modem = modem_with(b"0,CONNECT\r\n");
        let err = modem.link_status().unwrap_err();
        assert!(matches!(err, EngineError::EchoMismatch { .. }));
        assert!(modem.flags().pending_line);

        // The interleaved notification is recovered by the next poll.
        match modem.poll().unwrap() {
            InboundEvent::ClientConnected { channel } => assert_eq!(channel.index(), 0),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_station_addresses() {
        let reply = b"AT+CIFSR\r\r\n+CIFSR:STAIP,\"192.168.1.42\"\r\n\
+CIFSR:STAMAC,\"5c:cf:7f:01:02:03\"\r\nOK\r\n";
        let mut modem = modem_with(reply);
        assert_eq!(modem.station_ip().unwrap(), "192.168.1.42");

        modem.transport.push_input(reply);
        assert_eq!(modem.station_mac().unwrap(), "5c:cf:7f:01:02:03");
    }

    // ---- close ----

    #[test]
    fn test_close_leaves_disconnect_for_poll() {
        let mut modem = modem_with(b"1,CONNECT\r\n");
        assert!(matches!(
            modem.poll().unwrap(),
            InboundEvent::ClientConnected { .. }
        ));
        let channel = Channel::new(1).unwrap();
        assert!(modem.connections().is_connected(channel));

        modem
            .transport
            .push_input(b"AT+CIPCLOSE=1\r\r\n1,CLOSED\r\nOK\r\n");
        modem.close(channel).unwrap();
        assert!(modem.flags().pending_line);
        // The table entry is released by the demultiplexer, not by close.
        assert!(modem.connections().is_connected(channel));

        match modem.poll().unwrap() {
            InboundEvent::ClientDisconnected { channel: ch } => assert_eq!(ch, channel),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!modem.connections().is_connected(channel));
    }

    #[test]
    fn test_close_echo_mismatch() {
        let mut modem = modem_with(b"garbage\r\n");
        let err = modem.close(Channel::new(0).unwrap()).unwrap_err();
        assert!(matches!(err, EngineError::EchoMismatch { .. }));
        assert!(modem.flags().pending_line);
    }

    // ---- send ----

    #[test]
    fn test_send_flush_success() {
        let mut modem = modem_with(b"OK\r\nSEND OK\r\n");
        let channel = Channel::new(0).unwrap();
        modem.send(channel, b"abc", true, true).unwrap();
        assert!(!modem.flags().sending);
        assert_eq!(modem.transport.written(), b"AT+CIPSEND=0,5\r\nabc\r\n");
    }

    #[test]
    fn test_send_accumulates_until_flush() {
        let mut modem = modem_with(b"OK\r\nSEND OK\r\n");
        let channel = Channel::new(2).unwrap();
        modem.send(channel, b"first", true, false).unwrap();
        assert!(modem.flags().sending);
        assert!(modem.transport.written().is_empty());

        modem.send(channel, b"second", true, true).unwrap();
        assert!(!modem.flags().sending);
        assert_eq!(
            modem.transport.written(),
            b"AT+CIPSEND=2,15\r\nfirst\r\nsecond\r\n"
        );
    }

    #[test]
    fn test_send_without_send_ok_fails_and_resets() {
        let mut modem = modem_with(b"OK\r\nERROR\r\n");
        let channel = Channel::new(0).unwrap();
        let err = modem.send(channel, b"abc", true, true).unwrap_err();
        assert!(matches!(err, EngineError::CommandRejected { .. }));
        assert!(!modem.flags().sending);
    }

    #[test]
    fn test_send_rejected_announcement_skips_payload() {
        let mut modem = modem_with(b"ERROR\r\n");
        let channel = Channel::new(0).unwrap();
        assert!(modem.send(channel, b"abc", false, true).is_err());
        assert!(!modem.flags().sending);
        // Only the announcement went out, never the payload bytes.
        assert_eq!(modem.transport.written(), b"AT+CIPSEND=0,3\r\n");
    }

    #[test]
    fn test_send_preformatted() {
        let mut modem = modem_with(b"OK\r\nSEND OK\r\n");
        let channel = Channel::new(1).unwrap();
        modem
            .send_preformatted(channel, b"HTTP/1.1 200 OK\r\n\r\n")
            .unwrap();
        assert!(!modem.flags().sending);
        let written = modem.transport.written();
        assert!(written.starts_with(b"AT+CIPSEND=1,19\r\n"));
    }

    // ---- poll ----

    #[test]
    fn test_poll_nothing_without_data() {
        let mut modem = modem_with(b"");
        assert_eq!(modem.poll().unwrap(), InboundEvent::Nothing);
    }

    #[test]
    fn test_poll_connect_then_closed() {
        let mut modem = modem_with(b"0,CONNECT\r\n");
        match modem.poll().unwrap() {
            InboundEvent::ClientConnected { channel } => {
                assert_eq!(channel.index(), 0);
                assert!(modem.connections().is_connected(channel));
            }
            other => panic!("unexpected event: {:?}", other),
        }

        modem.transport.push_input(b"0,CLOSED\r\n");
        match modem.poll().unwrap() {
            InboundEvent::ClientDisconnected { channel } => {
                assert!(!modem.connections().is_connected(channel));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_poll_data_frame() {
        let mut modem = modem_with(b"+IPD,1,5:hello\r\n");
        match modem.poll().unwrap() {
            InboundEvent::Data(frame) => {
                assert_eq!(frame.channel.index(), 1);
                assert_eq!(frame.payload, b"hello");
                assert!(!frame.truncated);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(modem.transport.remaining_input(), 0);
    }

    #[test]
    fn test_poll_empty_line_is_nothing() {
        let mut modem = modem_with(b"\r\n");
        assert_eq!(modem.poll().unwrap(), InboundEvent::Nothing);
    }

    #[test]
    fn test_poll_unknown_line_is_reply_pending() {
        let mut modem = modem_with(b"WIFI GOT IP\r\n");
        assert_eq!(modem.poll().unwrap(), InboundEvent::ReplyPending);
        assert!(!modem.flags().pending_line);
    }

    #[test]
    fn test_poll_rejects_out_of_table_channel() {
        let mut modem = modem_with(b"9,CONNECT\r\n");
        let err = modem.poll().unwrap_err();
        assert!(matches!(err, EngineError::ChannelOutOfRange('9')));
        // The bogus line was dropped, not left to loop forever.
        assert!(!modem.flags().pending_line);
        assert_eq!(modem.poll().unwrap(), InboundEvent::Nothing);
    }
}
