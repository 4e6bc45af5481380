//! Player requests.
//!
//! A request is what a player asks for; the simulation validates it against
//! ownership, capabilities and stockpiles before anything changes.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::Vec2Fixed;

/// A player's request to the authoritative simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Walk to a point, abandoning any current action.
    Move {
        /// Unit to move.
        entity: EntityId,
        /// Destination (top-left corner).
        target: Vec2Fixed,
    },
    /// Attack an entity until it dies.
    Attack {
        /// Attacker.
        entity: EntityId,
        /// Defender.
        target: EntityId,
    },
    /// Work on a construction site.
    Build {
        /// Builder.
        entity: EntityId,
        /// Site.
        target: EntityId,
    },
    /// Gather from a deposit.
    Gather {
        /// Gatherer.
        entity: EntityId,
        /// Deposit.
        target: EntityId,
    },
    /// Pay for and place a construction site.
    PlaceBuilding {
        /// Building type name.
        building_type: String,
        /// Top-left corner.
        position: Vec2Fixed,
    },
    /// Pay for and queue a unit at a trainer.
    Train {
        /// Trainer building.
        building: EntityId,
        /// Unit type name.
        unit_type: String,
    },
    /// Pay for and research a technology.
    Research {
        /// Technology name.
        tech: String,
    },
    /// Remove one of the player's own entities.
    Delete {
        /// Entity to delete.
        entity: EntityId,
    },
}

impl Request {
    /// The entity the request acts through, if any.
    #[must_use]
    pub const fn actor(&self) -> Option<EntityId> {
        match self {
            Self::Move { entity, .. }
            | Self::Attack { entity, .. }
            | Self::Build { entity, .. }
            | Self::Gather { entity, .. }
            | Self::Delete { entity } => Some(*entity),
            Self::Train { building, .. } => Some(*building),
            Self::PlaceBuilding { .. } | Self::Research { .. } => None,
        }
    }
}
