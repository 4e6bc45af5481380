//! # RTS Client
//!
//! The client side of a networked game, without rendering or input.
//!
//! - [`lobby`] - Join a lobby, edit the roster entry, wait for the start
//! - [`game`] - Send requests and follow the server's tick stream
//! - [`mirror`] - Read-only shadow of the server's world built from deltas

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod game;
pub mod lobby;
pub mod mirror;

pub use game::GameClient;
pub use lobby::LobbyClient;
pub use mirror::{Mirror, MirroredEntity};
