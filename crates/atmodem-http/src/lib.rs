//! Minimal HTTP layer for the modem engine.
//!
//! Just enough request-line parsing to dispatch to a small static route
//! table, plus canned HTML responses. The layer consumes the engine through
//! its narrow interface (`poll` / `send` / `close`) and never touches the
//! transport; generalized HTTP compliance is explicitly out of scope.

mod error;
mod request;
mod response;
mod router;
mod service;

pub use error::*;
pub use request::*;
pub use response::*;
pub use router::*;
pub use service::*;
