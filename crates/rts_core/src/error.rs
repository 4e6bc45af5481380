//! Error types for the game simulation.

use thiserror::Error;

use crate::entity::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
///
/// Errors at the request boundary never leave the world half-updated: every
/// request is validated before its first mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Type table could not be parsed or is inconsistent.
    #[error("Failed to parse type data: {0}")]
    DataParse(String),

    /// Referenced entity does not exist (or no longer exists).
    #[error("Entity not found: {0}")]
    UnknownEntity(EntityId),

    /// Referenced type or technology name is not registered.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Entity exists but cannot perform the requested action.
    #[error("Entity {entity} cannot {action}")]
    InvalidCapability {
        /// The entity asked to act.
        entity: EntityId,
        /// What it was asked to do.
        action: &'static str,
    },

    /// Request came from a player who does not own the entity.
    #[error("Player {player} does not own entity {entity}")]
    NotOwner {
        /// Requesting player.
        player: u8,
        /// Entity they tried to command.
        entity: EntityId,
    },

    /// Footprint would leave the map.
    #[error("Footprint at ({x}, {y}) size {size} is out of bounds")]
    OutOfBounds {
        /// Requested x.
        x: String,
        /// Requested y.
        y: String,
        /// Footprint side.
        size: u32,
    },

    /// Building footprint collides with entities or impassable terrain.
    #[error("Cannot place building: {0}")]
    PlacementBlocked(String),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource kind.
        resource: String,
        /// Amount required.
        required: i64,
        /// Amount available.
        available: i64,
    },

    /// Trainer cannot accept another item.
    #[error("Production queue of entity {0} is full")]
    QueueFull(EntityId),

    /// World snapshot could not be written or read.
    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    /// Technology was already researched by this player.
    #[error("Player {player} already researched {tech}")]
    AlreadyResearched {
        /// Player number.
        player: u8,
        /// Technology name.
        tech: String,
    },
}

impl GameError {
    /// Whether this error names state that is absent (unknown id or type).
    ///
    /// Such errors are expected when a lagging client references state that
    /// changed on the server, and are absorbed without logging above debug.
    #[must_use]
    pub const fn is_invalid_reference(&self) -> bool {
        matches!(self, Self::UnknownEntity(_) | Self::UnknownType(_))
    }
}
