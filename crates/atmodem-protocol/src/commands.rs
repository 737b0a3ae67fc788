//! Commands that can be sent to the modem.
//!
//! Commands are plain ASCII lines. Credentials and numeric parameters are
//! formatted inline; the modem echoes the command line back when echo is
//! enabled, so the unterminated command string is also what the engine
//! compares echo lines against.

use crate::tokens::LINE_TERMINATOR;

/// Commands understood by the modem's AT interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========== Lifecycle ==========
    /// Liveness probe (`AT`).
    Probe,

    /// Enable command echo (`ATE1`).
    EchoOn,

    /// Software reset (`AT+RST`); the modem answers `ready` once rebooted.
    Reset,

    /// Station-only mode, no soft access point (`AT+CWMODE=1`).
    StationMode,

    /// Allow multiple TCP sessions (`AT+CIPMUX=1`).
    MultiplexOn,

    // ========== Access point ==========
    /// Join an access point with inline-quoted credentials.
    JoinAp {
        /// Access point identifier.
        ssid: String,
        /// Passphrase.
        pass: String,
    },

    /// Leave the current access point (`AT+CWQAP`).
    QuitAp,

    // ========== Queries ==========
    /// Query station IP and MAC addresses (`AT+CIFSR`).
    QueryAddresses,

    /// Query the link status (`AT+CIPSTATUS`).
    QueryLinkStatus,

    // ========== TCP server and sessions ==========
    /// Start the TCP server on a port.
    ServerStart {
        /// Listening port.
        port: u16,
    },

    /// Stop the TCP server (`AT+CIPSERVER=0`).
    ServerStop,

    /// Close one multiplexed session.
    Close {
        /// Session slot index assigned by the modem.
        channel: u8,
    },

    /// Announce a length-prefixed payload transmission.
    StartSend {
        /// Session slot index assigned by the modem.
        channel: u8,
        /// Total payload length in bytes.
        length: usize,
    },
}

impl Command {
    /// Encode the command as a line to send to the modem.
    /// Returns the bytes to send (including the CRLF terminator).
    pub fn encode(&self) -> Vec<u8> {
        let mut line = self.to_command_string();
        line.push_str(LINE_TERMINATOR);
        line.into_bytes()
    }

    /// Get the command string without the terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::Probe => "AT".to_string(),
            Command::EchoOn => "ATE1".to_string(),
            Command::Reset => "AT+RST".to_string(),
            Command::StationMode => "AT+CWMODE=1".to_string(),
            Command::MultiplexOn => "AT+CIPMUX=1".to_string(),
            Command::JoinAp { ssid, pass } => format!("AT+CWJAP=\"{}\",\"{}\"", ssid, pass),
            Command::QuitAp => "AT+CWQAP".to_string(),
            Command::QueryAddresses => "AT+CIFSR".to_string(),
            Command::QueryLinkStatus => "AT+CIPSTATUS".to_string(),
            Command::ServerStart { port } => format!("AT+CIPSERVER=1,{}", port),
            Command::ServerStop => "AT+CIPSERVER=0".to_string(),
            Command::Close { channel } => format!("AT+CIPCLOSE={}", channel),
            Command::StartSend { channel, length } => {
                format!("AT+CIPSEND={},{}", channel, length)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_probe() {
        assert_eq!(Command::Probe.encode(), b"AT\r\n");
    }

    #[test]
    fn test_encode_join_ap() {
        let cmd = Command::JoinAp {
            ssid: "lab-net".to_string(),
            pass: "hunter2".to_string(),
        };
        assert_eq!(cmd.encode(), b"AT+CWJAP=\"lab-net\",\"hunter2\"\r\n");
    }

    #[test]
    fn test_encode_server_start() {
        let cmd = Command::ServerStart { port: 80 };
        assert_eq!(cmd.encode(), b"AT+CIPSERVER=1,80\r\n");
    }

    #[test]
    fn test_encode_start_send() {
        let cmd = Command::StartSend { channel: 2, length: 145 };
        assert_eq!(cmd.encode(), b"AT+CIPSEND=2,145\r\n");
    }

    #[test]
    fn test_command_string_has_no_terminator() {
        assert_eq!(Command::QueryLinkStatus.to_command_string(), "AT+CIPSTATUS");
    }
}
