//! Lobby host.
//!
//! Seats connecting clients until the game starts. Each seat gets the lowest
//! free player slot; the client in slot 1 is the host's own and may start
//! the game. On start the open connections and their inbound queue are
//! handed to the game server as a [`Session`], still on the same sockets.

use std::ops::ControlFlow;

use rts_core::entity::PlayerId;
use rts_net::lobby::{Color, LobbyNotice, LobbyRequest, RosterEntry};
use rts_net::{Acceptor, Connection, ConnectionId, Inbound, InboundEvent, Result};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Colours handed out by slot.
const PALETTE: [Color; 8] = [
    Color::rgb(0x1f, 0x4e, 0xd8),
    Color::rgb(0xd8, 0x2a, 0x1f),
    Color::rgb(0x2e, 0xa0, 0x43),
    Color::rgb(0xe0, 0xc0, 0x1c),
    Color::rgb(0x8e, 0x3c, 0xc8),
    Color::rgb(0x1c, 0xb8, 0xc0),
    Color::rgb(0xe8, 0x7a, 0x1a),
    Color::rgb(0x80, 0x80, 0x80),
];

const DEFAULT_FACTION: &str = "default";

/// A seated client.
#[derive(Debug)]
pub struct Seat {
    /// Its connection.
    pub connection: Connection,
    /// Its roster entry.
    pub entry: RosterEntry,
}

impl Seat {
    /// Player slot.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.entry.player
    }
}

/// Everything the game server takes over at start.
#[derive(Debug)]
pub struct Session {
    /// Seated clients in join order.
    pub seats: Vec<Seat>,
    /// Lines and closures from every seat.
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
}

impl Session {
    /// Player slots of every seat, in join order.
    #[must_use]
    pub fn players(&self) -> Vec<PlayerId> {
        self.seats.iter().map(Seat::player).collect()
    }
}

/// Result of handling one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyEvent {
    /// Keep waiting.
    Continue,
    /// The host asked to start.
    Start,
}

/// The host side of the lobby.
#[derive(Debug)]
pub struct LobbyHost {
    capacity: u8,
    next_id: ConnectionId,
    seats: Vec<Seat>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

impl LobbyHost {
    /// Empty lobby with `capacity` player slots.
    #[must_use]
    pub fn new(capacity: u8) -> Self {
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        Self {
            capacity,
            next_id: 1,
            seats: Vec::new(),
            inbound_tx,
            inbound,
        }
    }

    /// Current roster in join order.
    pub fn roster(&self) -> impl Iterator<Item = &RosterEntry> {
        self.seats.iter().map(|seat| &seat.entry)
    }

    /// Number of seated clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether nobody is seated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    fn free_slot(&self) -> Option<PlayerId> {
        (1..=self.capacity).find(|slot| self.seats.iter().all(|seat| seat.player() != *slot))
    }

    fn broadcast(&self, notice: &LobbyNotice) {
        for seat in &self.seats {
            if let Err(error) = seat.connection.send(notice) {
                debug!(connection = seat.entry.id, %error, "lobby send failed");
            }
        }
    }

    /// Seat a new client, or tell it the lobby is full and close it.
    ///
    /// The newcomer first receives its own entry, then everyone else's;
    /// the others receive the newcomer's entry. Returns the new
    /// connection id, or `None` when turned away.
    pub fn admit(&mut self, stream: TcpStream) -> Result<Option<ConnectionId>> {
        let id = self.next_id;
        self.next_id += 1;
        let connection = Connection::spawn(id, stream, self.inbound_tx.clone())?;

        let Some(player) = self.free_slot() else {
            info!(connection = id, peer = %connection.peer(), "lobby full");
            connection.send(LobbyNotice::Full)?;
            connection.close();
            return Ok(None);
        };

        let entry = RosterEntry {
            id,
            player,
            username: format!("Player {player}"),
            color: PALETTE[usize::from(player - 1) % PALETTE.len()],
            faction: DEFAULT_FACTION.to_string(),
        };
        connection.send(LobbyNotice::Update(entry.clone()))?;
        for seat in &self.seats {
            connection.send(LobbyNotice::Update(seat.entry.clone()))?;
        }
        self.broadcast(&LobbyNotice::Update(entry.clone()));

        info!(connection = id, player, peer = %connection.peer(), "joined lobby");
        self.seats.push(Seat { connection, entry });
        Ok(Some(id))
    }

    /// Apply one line or closure from a seated client.
    pub fn handle(&mut self, inbound: Inbound) -> LobbyEvent {
        let id = inbound.connection;
        let line = match inbound.event {
            InboundEvent::Line(line) => line,
            InboundEvent::Closed => {
                self.remove(id);
                return LobbyEvent::Continue;
            }
        };
        let Some(index) = self.seats.iter().position(|seat| seat.entry.id == id) else {
            return LobbyEvent::Continue;
        };
        let request = match line.parse::<LobbyRequest>() {
            Ok(request) => request,
            Err(error) => {
                debug!(connection = id, %error, "ignoring lobby line");
                return LobbyEvent::Continue;
            }
        };

        let entry = &mut self.seats[index].entry;
        match request {
            LobbyRequest::Username(name) => entry.username = name,
            LobbyRequest::Color(color) => entry.color = color,
            LobbyRequest::Faction(faction) => entry.faction = faction,
            LobbyRequest::Start => {
                if entry.player == 1 {
                    return LobbyEvent::Start;
                }
                debug!(connection = id, player = entry.player, "only slot 1 may start");
                return LobbyEvent::Continue;
            }
            LobbyRequest::Terminate => {
                self.remove(id);
                return LobbyEvent::Continue;
            }
        }
        let update = LobbyNotice::Update(entry.clone());
        self.broadcast(&update);
        LobbyEvent::Continue
    }

    fn remove(&mut self, id: ConnectionId) {
        let Some(index) = self.seats.iter().position(|seat| seat.entry.id == id) else {
            return;
        };
        let seat = self.seats.remove(index);
        seat.connection.close();
        info!(connection = id, player = seat.player(), "left lobby");
        self.broadcast(&LobbyNotice::Left(id));
    }

    /// Announce the start and hand the seats over.
    #[must_use]
    pub fn start(self) -> Session {
        self.broadcast(&LobbyNotice::Start);
        info!(players = self.seats.len(), "game starting");
        Session {
            seats: self.seats,
            inbound: self.inbound,
        }
    }

    /// Close the lobby for everyone.
    pub fn terminate(self) {
        self.broadcast(&LobbyNotice::Terminate);
        for seat in &self.seats {
            seat.connection.close();
        }
        info!("lobby closed");
    }

    /// Seat clients from `acceptor` until slot 1 asks to start.
    ///
    /// Returns `None` if the acceptor stops first.
    pub async fn run(mut self, acceptor: Acceptor) -> Result<Option<Session>> {
        let (streams_tx, mut streams) = mpsc::unbounded_channel();
        let accepting = tokio::spawn(acceptor.run(move |stream, _peer| {
            match streams_tx.send(stream) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        }));

        loop {
            tokio::select! {
                stream = streams.recv() => {
                    let Some(stream) = stream else { break };
                    if let Err(error) = self.admit(stream) {
                        warn!(%error, "failed to admit client");
                    }
                }
                Some(inbound) = self.inbound.recv() => {
                    if self.handle(inbound) == LobbyEvent::Start {
                        accepting.abort();
                        return Ok(Some(self.start()));
                    }
                }
            }
        }
        self.terminate();
        Ok(None)
    }
}
