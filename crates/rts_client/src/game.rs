//! In-game client.

use rts_core::entity::{EntityId, PlayerId};
use rts_core::math::Vec2Fixed;
use rts_core::request::Request;
use rts_core::types::TypeRegistry;
use rts_net::protocol::{ClientMessage, ServerMessage};
use rts_net::{Connection, Inbound, InboundEvent, NetError, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::mirror::Mirror;

/// A player's connection to a running game.
///
/// Requests go out immediately; the effects come back as deltas with a
/// later tick and land in the [`Mirror`].
#[derive(Debug)]
pub struct GameClient {
    connection: Connection,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    mirror: Mirror,
    player: PlayerId,
}

impl GameClient {
    /// Wrap a connection that has already switched to the game protocol.
    #[must_use]
    pub fn new(
        connection: Connection,
        inbound: mpsc::UnboundedReceiver<Inbound>,
        registry: TypeRegistry,
        player: PlayerId,
    ) -> Self {
        Self {
            connection,
            inbound,
            mirror: Mirror::new(registry),
            player,
        }
    }

    /// Our player number.
    #[must_use]
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// The mirrored world.
    #[must_use]
    pub const fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Whether the server connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_active()
    }

    /// Send any request.
    pub fn request(&self, request: Request) -> Result<()> {
        self.connection.send(ClientMessage(request))
    }

    /// Walk `entity` to `target`.
    pub fn move_to(&self, entity: EntityId, target: Vec2Fixed) -> Result<()> {
        self.request(Request::Move { entity, target })
    }

    /// Attack `target` with `entity`.
    pub fn attack(&self, entity: EntityId, target: EntityId) -> Result<()> {
        self.request(Request::Attack { entity, target })
    }

    /// Work on construction site `site`.
    pub fn build(&self, entity: EntityId, site: EntityId) -> Result<()> {
        self.request(Request::Build {
            entity,
            target: site,
        })
    }

    /// Gather from `deposit`.
    pub fn gather(&self, entity: EntityId, deposit: EntityId) -> Result<()> {
        self.request(Request::Gather {
            entity,
            target: deposit,
        })
    }

    /// Place a construction site.
    pub fn place(&self, building_type: &str, position: Vec2Fixed) -> Result<()> {
        self.request(Request::PlaceBuilding {
            building_type: building_type.to_string(),
            position,
        })
    }

    /// Queue a unit at a trainer.
    pub fn train(&self, building: EntityId, unit_type: &str) -> Result<()> {
        self.request(Request::Train {
            building,
            unit_type: unit_type.to_string(),
        })
    }

    /// Research a technology.
    pub fn research(&self, tech: &str) -> Result<()> {
        self.request(Request::Research {
            tech: tech.to_string(),
        })
    }

    /// Delete one of our entities.
    pub fn delete(&self, entity: EntityId) -> Result<()> {
        self.request(Request::Delete { entity })
    }

    /// Apply lines until the next `tick` marker and return the number of
    /// ticks seen so far.
    ///
    /// Lines that do not parse are skipped.
    pub async fn next_tick(&mut self) -> Result<u64> {
        loop {
            let Some(Inbound { event, .. }) = self.inbound.recv().await else {
                return Err(NetError::StreamClosed);
            };
            let line = match event {
                InboundEvent::Line(line) => line,
                InboundEvent::Closed => return Err(NetError::StreamClosed),
            };
            match line.parse::<ServerMessage>() {
                Ok(message) => {
                    self.mirror.apply(&message);
                    if message == ServerMessage::Tick {
                        return Ok(self.mirror.ticks());
                    }
                }
                Err(error) => debug!(player = self.player, %error, "skipping line"),
            }
        }
    }

    /// Leave the game.
    pub fn close(&self) {
        self.connection.close();
    }
}
