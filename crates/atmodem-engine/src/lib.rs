//! AT Modem Engine
//!
//! This crate turns the unreliable, partially-buffered text stream of an
//! ESP8266-class WiFi modem into synchronous command/response exchanges and a
//! stream of classified network events, inside one fixed-size buffer.
//!
//! The engine owns the transport and a single bounded response buffer.
//! Replies, query payloads and inbound data frames are all assembled in that
//! buffer; every event or reply view handed out borrows from the engine, so
//! the borrow checker rejects use of a view after the next engine call.
//!
//! # Layering
//!
//! ```text
//! +---------------------------+
//! | consumer (routing layer)  |  poll / send / close / status
//! +---------------------------+
//! | Modem                     |  lifecycle, accumulation, demux, watchdog
//! +---------------------------+
//! | Transport                 |  blocking byte reads with timeout, writes
//! +---------------------------+
//! ```
//!
//! The consumer never sees transport bytes; the engine never parses consumer
//! payloads.
//!
//! # Example
//!
//! ```rust,ignore
//! use atmodem_engine::{InboundEvent, Modem, TcpTransport};
//!
//! let transport = TcpTransport::connect("127.0.0.1:5331")?;
//! let mut modem = Modem::new(transport);
//! modem.init()?;
//! modem.join("lab-net", "hunter2")?;
//! modem.start_server(80)?;
//!
//! loop {
//!     match modem.poll()? {
//!         InboundEvent::Data(frame) => handle(frame.channel, frame.payload),
//!         InboundEvent::Nothing => {}
//!         _ => {}
//!     }
//! }
//! ```

mod buffer;
mod connection;
mod error;
mod event;
mod frame;
mod line;
mod modem;
mod transport;
mod watchdog;

pub use buffer::*;
pub use connection::*;
pub use error::*;
pub use event::*;
pub use modem::*;
pub use transport::*;
pub use watchdog::*;
