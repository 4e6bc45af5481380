//! Network error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Result type for network operations.
pub type Result<T> = std::result::Result<T, NetError>;

/// Failures of a single connection.
///
/// None of these touch the simulation; the owner of a failed connection
/// drops it and carries on.
#[derive(Debug, Error)]
pub enum NetError {
    /// The peer refused or could not be reached.
    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailure {
        /// Address we dialled.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The peer did not answer in time.
    #[error("Timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout {
        /// Address we dialled.
        addr: String,
        /// How long we waited.
        timeout: Duration,
    },

    /// The connection was closed by either side.
    #[error("Stream closed")]
    StreamClosed,

    /// Socket error after the connection was established.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The peer sent a line we could not parse.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// A line that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Blank line.
    #[error("Empty line")]
    Empty,

    /// First word is not a known verb.
    #[error("Unknown verb: {0}")]
    UnknownVerb(String),

    /// The line ended before a required field.
    #[error("Missing field `{field}` in `{verb}`")]
    MissingField {
        /// Verb being parsed.
        verb: &'static str,
        /// Field that was absent.
        field: &'static str,
    },

    /// A field did not parse as its type.
    #[error("Invalid {field} `{value}` in `{verb}`")]
    InvalidField {
        /// Verb being parsed.
        verb: &'static str,
        /// Field that failed.
        field: &'static str,
        /// Offending text.
        value: String,
    },

    /// Extra words after the last field.
    #[error("Trailing fields after `{0}`")]
    TrailingFields(&'static str),
}
