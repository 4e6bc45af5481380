//! # RTS Net
//!
//! Everything that crosses the wire between the authoritative server and
//! its clients.
//!
//! - [`protocol`] - In-game lines: replicated deltas one way, requests the other
//! - [`lobby`] - Pre-game roster and start/terminate lines
//! - [`connection`] - Tokio connections, the acceptor and the inbound queue
//! - [`error`] - Network error taxonomy
//!
//! Every message is a single space-delimited line terminated by `\n`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod connection;
pub mod error;
pub mod lobby;
pub mod protocol;

pub use connection::{
    connect, Acceptor, Connection, ConnectionId, Inbound, InboundEvent, DEFAULT_PORT,
    MAX_LINE_BYTES,
};
pub use error::{NetError, ProtocolError, Result};
