//! AT Modem Wire Protocol
//!
//! This crate provides types and utilities for the line-oriented text protocol
//! spoken by ESP8266-class WiFi modems over a serial link. There is no
//! out-of-band framing: message boundaries are inferred from CR/LF line
//! endings and a small set of textual markers.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → modem): ASCII command lines terminated with `\r\n`
//! - **Replies** (modem → host): CR/LF-terminated lines; multi-line replies
//!   end with one of the terminal tokens `OK` / `FAIL` / `ERROR` / `SEND OK`
//!   / `ready`
//! - **Unsolicited lines** (modem → host): `<channel>,CONNECT`,
//!   `<channel>,CLOSED` and `+IPD,<channel>,<length>:<payload>` arrive at any
//!   time between command exchanges
//!
//! Query replies embed fixed literal markers (`STATUS:<digit>`,
//! `STAIP,"<addr>"`, `STAMAC,"<addr>"`) that are extracted from the
//! accumulated reply text.
//!
//! # Example
//!
//! ```rust,ignore
//! use atmodem_protocol::{Command, ResponseToken};
//!
//! // Build a command line
//! let line = Command::ServerStart { port: 80 }.encode();
//!
//! // Classify a reply line
//! let token = ResponseToken::classify(b"SEND OK");
//! ```

mod commands;
mod error;
mod responses;
mod tokens;
mod unsolicited;

pub use commands::*;
pub use error::*;
pub use responses::*;
pub use tokens::*;
pub use unsolicited::*;
