//! # RTS Dedicated Server
//!
//! Headless authoritative server for multiplayer games.
//!
//! Runs the lobby until the host starts the game, then drives the
//! simulation on a fixed wall-clock interval and broadcasts every tick's
//! deltas to the connected clients.
//!
//! - [`lobby`] - Roster, admission and the start hand-off
//! - [`game`] - Tick loop owning the [`rts_core::simulation::Simulation`]
//! - [`scenario`] - Starting map layout

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::net::{Ipv4Addr, SocketAddr};

use rts_core::config::SimConfig;
use rts_core::error::GameError;
use rts_net::{NetError, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod game;
pub mod lobby;
pub mod scenario;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad command line.
    #[error("Usage: rts_server <types.ron> [server.ron] [scenario.ron]")]
    Usage,

    /// A data file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A RON file did not parse.
    #[error("Failed to parse config: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// Type tables or scenario were rejected by the simulation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Listening socket failure.
    #[error(transparent)]
    Net(#[from] NetError),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Maximum players per game.
    pub max_players: u8,
    /// Simulation timing.
    pub sim: SimConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_players: 8,
            sim: SimConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse from RON. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ServerError> {
        Ok(ron::from_str(source)?)
    }

    /// Address the acceptor binds.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

/// Read a whole file, naming it in the error.
pub fn read_file(path: &str) -> Result<String, ServerError> {
    std::fs::read_to_string(path).map_err(|source| ServerError::Read {
        path: path.to_string(),
        source,
    })
}
