//! Entity model.
//!
//! Every entity is exactly one of three kinds. Capabilities are derived from
//! the kind and its type descriptor by exhaustive matching, so adding a kind
//! or a capability is a compile error everywhere it matters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::commands::PendingCommands;
use crate::math::{Fixed, RectFixed, Vec2Fixed};
use crate::production::ProductionQueue;
use crate::types::{AttackProfile, BuildingType, GatherProfile, ResourceType, Resistances, UnitType};

/// Unique identifier for entities. Never reused within a world.
pub type EntityId = u64;

/// Player number. Player 0 is nature (resource deposits).
pub type PlayerId = u8;

/// Owner of resource deposits and other unowned entities.
pub const NEUTRAL_PLAYER: PlayerId = 0;

/// Wire-level entity kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    /// Mobile unit.
    Unit,
    /// Stationary building.
    Building,
    /// Resource deposit.
    Resource,
}

impl EntityCategory {
    /// Numeric code used on the wire.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unit => 0,
            Self::Building => 1,
            Self::Resource => 2,
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unit),
            1 => Some(Self::Building),
            2 => Some(Self::Resource),
            _ => None,
        }
    }
}

/// Behavioural traits an entity may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Has hitpoints and can die.
    Attackable,
    /// Can deal damage.
    Attacker,
    /// Can be commanded to a point.
    Mover,
    /// Can raise construction sites.
    Builder,
    /// Can extract from deposits.
    Gatherer,
    /// Can produce units.
    Trainer,
    /// Can be extracted from.
    Gatherable,
}

/// Hitpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current hitpoints.
    pub current: i32,
    /// Maximum hitpoints.
    pub max: i32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Health at a specific value.
    #[must_use]
    pub fn at(current: i32, max: i32) -> Self {
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Dead at zero or below.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Whether at maximum.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply damage, returning the (non-positive) change.
    pub fn apply_damage(&mut self, amount: u32) -> i32 {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        let actual = amount.min(self.current.max(0));
        self.current -= actual;
        -actual
    }

    /// Heal, returning the (non-negative) change.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let headroom = (self.max - self.current).max(0);
        let actual = amount.clamp(0, headroom);
        self.current += actual;
        actual
    }
}

/// Whether a newly created building is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    /// Placed by map setup: full hitpoints, built.
    Complete,
    /// Placed by a player: one hitpoint, waits for builders.
    Site,
}

/// Unit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Type descriptor.
    pub ty: Arc<UnitType>,
    /// Hitpoints.
    pub health: Health,
    /// Pending commands.
    pub commands: PendingCommands,
}

/// Building state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Type descriptor.
    pub ty: Arc<BuildingType>,
    /// Hitpoints. Construction progress is measured in hitpoints.
    pub health: Health,
    /// Whether construction has completed.
    pub built: bool,
    /// Deposit this building stands on.
    pub resource_under: Option<EntityId>,
    /// Unit production, for trainers.
    pub production: ProductionQueue,
    /// Pending attack, for towers.
    pub commands: PendingCommands,
}

/// Resource deposit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Type descriptor.
    pub ty: Arc<ResourceType>,
    /// Remaining quantity, never negative.
    pub amount: i32,
}

impl Resource {
    /// Remove up to `requested`, returning what was actually removed.
    pub fn extract(&mut self, requested: i32) -> i32 {
        let extracted = requested.clamp(0, self.amount);
        self.amount -= extracted;
        extracted
    }

    /// Whether nothing is left.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.amount <= 0
    }
}

/// Kind-specific entity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A unit.
    Unit(Unit),
    /// A building.
    Building(Building),
    /// A resource deposit.
    Resource(Resource),
}

/// Animation state mirrored to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationFlags {
    /// Walking.
    pub moving: bool,
    /// Attacking, building or gathering in range.
    pub working: bool,
}

/// A simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    position: Vec2Fixed,
    owner: PlayerId,
    kind: EntityKind,
    pub(crate) flags: AnimationFlags,
}

impl Entity {
    /// A unit at full health.
    #[must_use]
    pub fn new_unit(ty: Arc<UnitType>, position: Vec2Fixed, owner: PlayerId) -> Self {
        let health = Health::new(ty.hitpoints);
        Self::with_kind(
            position,
            owner,
            EntityKind::Unit(Unit {
                ty,
                health,
                commands: PendingCommands::default(),
            }),
        )
    }

    /// A building, either finished or as a fresh construction site.
    #[must_use]
    pub fn new_building(
        ty: Arc<BuildingType>,
        position: Vec2Fixed,
        owner: PlayerId,
        construction: Construction,
    ) -> Self {
        let (health, built) = match construction {
            Construction::Complete => (Health::new(ty.hitpoints), true),
            Construction::Site => (Health::at(1, ty.hitpoints), false),
        };
        Self::with_kind(
            position,
            owner,
            EntityKind::Building(Building {
                ty,
                health,
                built,
                resource_under: None,
                production: ProductionQueue::default(),
                commands: PendingCommands::default(),
            }),
        )
    }

    /// A full resource deposit owned by nature.
    #[must_use]
    pub fn new_resource(ty: Arc<ResourceType>, position: Vec2Fixed) -> Self {
        let amount = ty.amount;
        Self::with_kind(
            position,
            NEUTRAL_PLAYER,
            EntityKind::Resource(Resource { ty, amount }),
        )
    }

    fn with_kind(position: Vec2Fixed, owner: PlayerId, kind: EntityKind) -> Self {
        Self {
            id: 0,
            position,
            owner,
            kind,
            flags: AnimationFlags::default(),
        }
    }

    /// Entity id (0 until placed in a world).
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// Top-left corner of the footprint.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vec2Fixed) {
        self.position = position;
    }

    /// Owning player.
    #[must_use]
    pub const fn owner(&self) -> PlayerId {
        self.owner
    }

    /// Kind-specific data.
    #[must_use]
    pub const fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut EntityKind {
        &mut self.kind
    }

    /// Animation flags.
    #[must_use]
    pub const fn flags(&self) -> AnimationFlags {
        self.flags
    }

    /// Wire category.
    #[must_use]
    pub const fn category(&self) -> EntityCategory {
        match self.kind {
            EntityKind::Unit(_) => EntityCategory::Unit,
            EntityKind::Building(_) => EntityCategory::Building,
            EntityKind::Resource(_) => EntityCategory::Resource,
        }
    }

    /// Type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match &self.kind {
            EntityKind::Unit(unit) => &unit.ty.name,
            EntityKind::Building(building) => &building.ty.name,
            EntityKind::Resource(resource) => &resource.ty.name,
        }
    }

    /// Footprint side in tiles.
    #[must_use]
    pub fn size(&self) -> u32 {
        match &self.kind {
            EntityKind::Unit(unit) => unit.ty.size,
            EntityKind::Building(building) => building.ty.size,
            EntityKind::Resource(resource) => resource.ty.size,
        }
    }

    /// Footprint rectangle.
    #[must_use]
    pub fn footprint(&self) -> RectFixed {
        RectFixed::square(self.position, self.size())
    }

    /// Whether this entity has `capability`.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match (&self.kind, capability) {
            (EntityKind::Unit(_), Capability::Attackable | Capability::Mover) => true,
            (EntityKind::Unit(unit), Capability::Attacker) => unit.ty.attack.is_some(),
            (EntityKind::Unit(unit), Capability::Builder) => unit.ty.build_speed.is_some(),
            (EntityKind::Unit(unit), Capability::Gatherer) => unit.ty.gather.is_some(),
            (EntityKind::Unit(_), Capability::Trainer | Capability::Gatherable) => false,
            (EntityKind::Building(_), Capability::Attackable) => true,
            (EntityKind::Building(building), Capability::Attacker) => building.ty.attack.is_some(),
            (EntityKind::Building(building), Capability::Trainer) => !building.ty.trains.is_empty(),
            (
                EntityKind::Building(_),
                Capability::Mover | Capability::Builder | Capability::Gatherer | Capability::Gatherable,
            ) => false,
            (EntityKind::Resource(_), Capability::Gatherable) => true,
            (EntityKind::Resource(_), _) => false,
        }
    }

    /// Hitpoints, for attackable entities.
    #[must_use]
    pub fn health(&self) -> Option<Health> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit.health),
            EntityKind::Building(building) => Some(building.health),
            EntityKind::Resource(_) => None,
        }
    }

    pub(crate) fn health_mut(&mut self) -> Option<&mut Health> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(&mut unit.health),
            EntityKind::Building(building) => Some(&mut building.health),
            EntityKind::Resource(_) => None,
        }
    }

    /// Whether the entity is attackable and at zero hitpoints.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health().is_some_and(|health| health.is_dead())
    }

    /// Resistances against incoming damage.
    #[must_use]
    pub fn resistances(&self) -> Option<&Resistances> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(&unit.ty.resistances),
            EntityKind::Building(building) => Some(&building.ty.resistances),
            EntityKind::Resource(_) => None,
        }
    }

    /// Attack stats. Unfinished buildings cannot attack.
    #[must_use]
    pub fn attack_profile(&self) -> Option<&AttackProfile> {
        match &self.kind {
            EntityKind::Unit(unit) => unit.ty.attack.as_ref(),
            EntityKind::Building(building) if building.built => building.ty.attack.as_ref(),
            EntityKind::Building(_) | EntityKind::Resource(_) => None,
        }
    }

    /// Movement speed in tiles per second.
    #[must_use]
    pub fn speed(&self) -> Option<Fixed> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit.ty.speed),
            EntityKind::Building(_) | EntityKind::Resource(_) => None,
        }
    }

    /// Construction speed.
    #[must_use]
    pub fn build_speed(&self) -> Option<u32> {
        match &self.kind {
            EntityKind::Unit(unit) => unit.ty.build_speed,
            EntityKind::Building(_) | EntityKind::Resource(_) => None,
        }
    }

    /// Gathering stats.
    #[must_use]
    pub fn gather_profile(&self) -> Option<&GatherProfile> {
        match &self.kind {
            EntityKind::Unit(unit) => unit.ty.gather.as_ref(),
            EntityKind::Building(_) | EntityKind::Resource(_) => None,
        }
    }

    /// Pending commands, for entities that can hold any.
    #[must_use]
    pub fn commands(&self) -> Option<&PendingCommands> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(&unit.commands),
            EntityKind::Building(building) => Some(&building.commands),
            EntityKind::Resource(_) => None,
        }
    }

    pub(crate) fn commands_mut(&mut self) -> Option<&mut PendingCommands> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(&mut unit.commands),
            EntityKind::Building(building) => Some(&mut building.commands),
            EntityKind::Resource(_) => None,
        }
    }

    /// Building data.
    #[must_use]
    pub const fn as_building(&self) -> Option<&Building> {
        match &self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) | EntityKind::Resource(_) => None,
        }
    }

    pub(crate) fn as_building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) | EntityKind::Resource(_) => None,
        }
    }

    /// Resource data.
    #[must_use]
    pub const fn as_resource(&self) -> Option<&Resource> {
        match &self.kind {
            EntityKind::Resource(resource) => Some(resource),
            EntityKind::Unit(_) | EntityKind::Building(_) => None,
        }
    }

    pub(crate) fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        match &mut self.kind {
            EntityKind::Resource(resource) => Some(resource),
            EntityKind::Unit(_) | EntityKind::Building(_) => None,
        }
    }
}
