//! Lobby participant.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use rts_core::entity::PlayerId;
use rts_core::types::TypeRegistry;
use rts_net::lobby::{Color, LobbyNotice, LobbyRequest, RosterEntry};
use rts_net::{connect, Connection, ConnectionId, Inbound, InboundEvent, NetError, Result};
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::game::GameClient;

/// What one host line changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyUpdate {
    /// A roster entry was added or changed.
    Roster(ConnectionId),
    /// Someone left.
    Left(ConnectionId),
    /// The host is starting the game.
    Started,
    /// The lobby was closed.
    Terminated,
    /// No free slot for us.
    Full,
}

/// Client side of the lobby.
///
/// `connected` becomes true once the host has sent our own roster entry,
/// which is always the first line a seated client receives.
#[derive(Debug)]
pub struct LobbyClient {
    connection: Connection,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    own: Option<ConnectionId>,
    roster: BTreeMap<ConnectionId, RosterEntry>,
    connected: bool,
}

impl LobbyClient {
    /// Dial the host.
    pub async fn connect<A>(addr: A, timeout: Duration) -> Result<Self>
    where
        A: ToSocketAddrs + fmt::Display,
    {
        let stream = connect(addr, timeout).await?;
        let (tx, inbound) = mpsc::unbounded_channel();
        let connection = Connection::spawn(0, stream, tx)?;
        Ok(Self {
            connection,
            inbound,
            own: None,
            roster: BTreeMap::new(),
            connected: false,
        })
    }

    /// Whether the host has seated us and the lobby is still open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Our roster entry, once seated.
    #[must_use]
    pub fn own_entry(&self) -> Option<&RosterEntry> {
        self.own.and_then(|id| self.roster.get(&id))
    }

    /// Our player slot, once seated.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        self.own_entry().map(|entry| entry.player)
    }

    /// Everyone seated, ours included, by connection id.
    pub fn roster(&self) -> impl Iterator<Item = &RosterEntry> {
        self.roster.values()
    }

    /// Process the next host line.
    pub async fn next_update(&mut self) -> Result<LobbyUpdate> {
        loop {
            let event = match self.inbound.recv().await {
                Some(Inbound { event, .. }) => event,
                None => InboundEvent::Closed,
            };
            let line = match event {
                InboundEvent::Line(line) => line,
                InboundEvent::Closed => {
                    self.connected = false;
                    return Err(NetError::StreamClosed);
                }
            };
            match line.parse::<LobbyNotice>() {
                Ok(notice) => return Ok(self.apply(notice)),
                Err(error) => debug!(%error, "skipping lobby line"),
            }
        }
    }

    fn apply(&mut self, notice: LobbyNotice) -> LobbyUpdate {
        match notice {
            LobbyNotice::Update(entry) => {
                let id = entry.id;
                if self.own.is_none() {
                    info!(connection = id, player = entry.player, "seated in lobby");
                    self.own = Some(id);
                    self.connected = true;
                }
                self.roster.insert(id, entry);
                LobbyUpdate::Roster(id)
            }
            LobbyNotice::Left(id) => {
                self.roster.remove(&id);
                if self.own == Some(id) {
                    self.connected = false;
                }
                LobbyUpdate::Left(id)
            }
            LobbyNotice::Start => LobbyUpdate::Started,
            LobbyNotice::Terminate => {
                self.connected = false;
                LobbyUpdate::Terminated
            }
            LobbyNotice::Full => {
                info!("lobby full");
                self.connected = false;
                self.connection.close();
                LobbyUpdate::Full
            }
        }
    }

    /// Wait until we are seated (`true`) or turned away (`false`).
    pub async fn join(&mut self) -> Result<bool> {
        loop {
            match self.next_update().await {
                Ok(LobbyUpdate::Roster(_)) if self.connected => return Ok(true),
                Ok(LobbyUpdate::Full | LobbyUpdate::Terminated) => return Ok(false),
                Ok(_) => {}
                Err(NetError::StreamClosed) => return Ok(false),
                Err(error) => return Err(error),
            }
        }
    }

    /// Wait for the game to start (`true`) or the lobby to close (`false`).
    pub async fn wait_for_start(&mut self) -> Result<bool> {
        loop {
            match self.next_update().await? {
                LobbyUpdate::Started => return Ok(true),
                LobbyUpdate::Terminated | LobbyUpdate::Full => return Ok(false),
                LobbyUpdate::Roster(_) | LobbyUpdate::Left(_) => {}
            }
        }
    }

    /// Change our display name.
    pub fn set_username(&self, name: &str) -> Result<()> {
        self.connection.send(LobbyRequest::Username(name.to_string()))
    }

    /// Change our colour.
    pub fn set_color(&self, color: Color) -> Result<()> {
        self.connection.send(LobbyRequest::Color(color))
    }

    /// Change our faction.
    pub fn set_faction(&self, faction: &str) -> Result<()> {
        self.connection.send(LobbyRequest::Faction(faction.to_string()))
    }

    /// Ask the host to start. Only honoured from player slot 1.
    pub fn request_start(&self) -> Result<()> {
        self.connection.send(LobbyRequest::Start)
    }

    /// Leave the lobby.
    pub fn leave(self) {
        let _ = self.connection.send(LobbyRequest::Terminate);
        self.connection.close();
    }

    /// Switch to the game protocol on the same connection.
    ///
    /// Returns the lobby back if we were never seated.
    pub fn into_game(self, registry: TypeRegistry) -> std::result::Result<GameClient, Self> {
        match self.player() {
            Some(player) => Ok(GameClient::new(self.connection, self.inbound, registry, player)),
            None => Err(self),
        }
    }
}
