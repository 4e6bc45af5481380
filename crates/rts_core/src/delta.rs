//! Replicated state changes.
//!
//! The world records one [`Delta`] per observable change as it happens. The
//! simulation drains them at the end of each tick and the server broadcasts
//! them in order, so a client replaying the stream reconstructs the same
//! tables.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityCategory, EntityId, PlayerId};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// `(category, id)` pair as carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity kind.
    pub category: EntityCategory,
    /// Entity id.
    pub id: EntityId,
}

impl EntityRef {
    /// Reference to an existing entity.
    #[must_use]
    pub fn of(entity: &Entity) -> Self {
        Self {
            category: entity.category(),
            id: entity.id(),
        }
    }
}

/// Replicated entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// Hitpoints (additive).
    Hitpoints,
    /// X coordinate (additive).
    X,
    /// Y coordinate (additive).
    Y,
    /// Working animation flag (set).
    AttackAnimation,
    /// Walking animation flag (set).
    MoveAnimation,
    /// Construction finished flag (set).
    Built,
    /// Deposit quantity (additive).
    ResourceAmount,
}

impl Property {
    /// Numeric id used on the wire.
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::Hitpoints => 0,
            Self::X => 1,
            Self::Y => 2,
            Self::AttackAnimation => 3,
            Self::MoveAnimation => 4,
            Self::Built => 5,
            Self::ResourceAmount => 6,
        }
    }

    /// Inverse of [`id`](Self::id).
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Hitpoints),
            1 => Some(Self::X),
            2 => Some(Self::Y),
            3 => Some(Self::AttackAnimation),
            4 => Some(Self::MoveAnimation),
            5 => Some(Self::Built),
            6 => Some(Self::ResourceAmount),
            _ => None,
        }
    }
}

/// A property change with its typed value.
///
/// Numeric variants are deltas; flag variants carry the new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyChange {
    /// Hitpoint delta.
    Hitpoints(i32),
    /// X delta.
    X(#[serde(with = "fixed_serde")] Fixed),
    /// Y delta.
    Y(#[serde(with = "fixed_serde")] Fixed),
    /// Working animation on/off.
    AttackAnimation(bool),
    /// Walking animation on/off.
    MoveAnimation(bool),
    /// Construction finished on/off.
    Built(bool),
    /// Deposit quantity delta.
    ResourceAmount(i32),
}

impl PropertyChange {
    /// The property this change affects.
    #[must_use]
    pub const fn property(&self) -> Property {
        match self {
            Self::Hitpoints(_) => Property::Hitpoints,
            Self::X(_) => Property::X,
            Self::Y(_) => Property::Y,
            Self::AttackAnimation(_) => Property::AttackAnimation,
            Self::MoveAnimation(_) => Property::MoveAnimation,
            Self::Built(_) => Property::Built,
            Self::ResourceAmount(_) => Property::ResourceAmount,
        }
    }
}

/// One replicated change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delta {
    /// An entity appeared.
    EntityAdded {
        /// Which entity.
        entity: EntityRef,
        /// Type name.
        name: String,
        /// Top-left corner.
        position: Vec2Fixed,
        /// Owning player.
        owner: PlayerId,
    },
    /// An entity was removed.
    EntityRemoved {
        /// Which entity.
        entity: EntityRef,
    },
    /// A property changed.
    PropertyChanged {
        /// Which entity.
        entity: EntityRef,
        /// What changed.
        change: PropertyChange,
    },
    /// An attacker started or stopped hitting a defender.
    AttackState {
        /// Attacking entity.
        attacker: EntityRef,
        /// Defending entity.
        defender: EntityRef,
        /// Started (`true`) or stopped.
        active: bool,
    },
    /// A player finished researching a technology.
    TechnologyResearched {
        /// Player number.
        player: PlayerId,
        /// Technology name.
        tech: String,
    },
    /// A player's stockpile changed.
    StockChanged {
        /// Player number.
        player: PlayerId,
        /// Resource kind.
        resource: String,
        /// Amount added (negative when spent).
        delta: i64,
    },
}
