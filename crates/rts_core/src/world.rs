//! The world: entity arena, player table, terrain and occupancy index.
//!
//! Everything that changes observable state goes through a `World` method so
//! that the delta journal and the tile index never drift from the entity
//! table. Iteration over entities is always in id order.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::commands::{ActionCommand, CommandId, MoveCommand};
use crate::delta::{Delta, EntityRef, PropertyChange};
use crate::entity::{Construction, Entity, EntityId, EntityKind, PlayerId};
use crate::error::{GameError, Result};
use crate::math::{Fixed, RectFixed, Vec2Fixed};
use crate::spatial::{tiles_of, TerrainGrid, TileIndex};
use crate::types::{BuildingType, Cost, ResourceType, UnitType};

/// Monotonic id source. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    /// Hand out the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call will return.
    #[must_use]
    pub const fn peek(&self) -> u64 {
        self.next
    }
}

/// Outcome of a building placement check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Nothing in the way.
    Clear,
    /// The footprint covers a deposit the building is meant to stand on.
    OnResource(EntityId),
    /// Something is in the way.
    Blocked(String),
}

/// Per-player economy and research state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerState {
    /// Stockpile per resource kind.
    pub stock: BTreeMap<String, i64>,
    /// Researched technology names.
    pub technologies: BTreeSet<String>,
}

impl PlayerState {
    /// Amount of one resource held.
    #[must_use]
    pub fn amount(&self, resource: &str) -> i64 {
        self.stock.get(resource).copied().unwrap_or(0)
    }
}

/// Authoritative world state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    entity_ids: IdGenerator,
    command_ids: IdGenerator,
    terrain: TerrainGrid,
    index: TileIndex,
    entities: BTreeMap<EntityId, Entity>,
    players: BTreeMap<PlayerId, PlayerState>,
    #[serde(skip)]
    journal: Vec<Delta>,
}

impl World {
    /// An empty grass map.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_terrain(TerrainGrid::new(width, height))
    }

    /// An empty map over existing terrain.
    #[must_use]
    pub fn with_terrain(terrain: TerrainGrid) -> Self {
        Self {
            entity_ids: IdGenerator::default(),
            command_ids: IdGenerator::default(),
            terrain,
            index: TileIndex::new(),
            entities: BTreeMap::new(),
            players: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Terrain grid.
    #[must_use]
    pub const fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    /// Occupancy index.
    #[must_use]
    pub const fn tile_index(&self) -> &TileIndex {
        &self.index
    }

    /// Look up an entity.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Whether `id` is alive in this world.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entity ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Player state, if the player has ever held anything.
    #[must_use]
    pub fn player(&self, player: PlayerId) -> Option<&PlayerState> {
        self.players.get(&player)
    }

    /// Amount of `resource` in `player`'s stockpile.
    #[must_use]
    pub fn stock(&self, player: PlayerId, resource: &str) -> i64 {
        self.players
            .get(&player)
            .map_or(0, |state| state.amount(resource))
    }

    /// Whether `player` has researched `tech`.
    #[must_use]
    pub fn has_researched(&self, player: PlayerId, tech: &str) -> bool {
        self.players
            .get(&player)
            .is_some_and(|state| state.technologies.contains(tech))
    }

    // ------------------------------------------------------------------
    // Spatial queries
    // ------------------------------------------------------------------

    /// Whether a footprint lies entirely inside the map.
    #[must_use]
    pub fn in_bounds(&self, footprint: &RectFixed) -> bool {
        // Positions come off the wire, so the far edge may not be representable.
        let fits = |min: Fixed, extent: Fixed, limit: u32| {
            min >= Fixed::ZERO
                && min
                    .checked_add(extent)
                    .is_some_and(|edge| edge <= Fixed::from_num(limit))
        };
        fits(footprint.min.x, footprint.width, self.terrain.width())
            && fits(footprint.min.y, footprint.height, self.terrain.height())
    }

    /// Clamp a top-left corner so a footprint of `size` stays on the map.
    #[must_use]
    pub fn clamp_position(&self, position: Vec2Fixed, size: u32) -> Vec2Fixed {
        let max_x = (Fixed::from_num(self.terrain.width()) - Fixed::from_num(size)).max(Fixed::ZERO);
        let max_y = (Fixed::from_num(self.terrain.height()) - Fixed::from_num(size)).max(Fixed::ZERO);
        Vec2Fixed::new(
            position.x.clamp(Fixed::ZERO, max_x),
            position.y.clamp(Fixed::ZERO, max_y),
        )
    }

    /// The entity whose footprint strictly contains `point`.
    ///
    /// Footprints of units may overlap; when several match, the one that
    /// entered the point's tile first wins. Callers should not rely on which.
    #[must_use]
    pub fn entity_at(&self, point: Vec2Fixed) -> Option<EntityId> {
        let tile = (point.x.floor().to_num::<i32>(), point.y.floor().to_num::<i32>());
        self.index.at(tile).iter().copied().find(|id| {
            self.entities
                .get(id)
                .is_some_and(|entity| entity.footprint().strictly_contains(point))
        })
    }

    /// Entities whose footprint interior overlaps `area`, each once.
    #[must_use]
    pub fn entities_in_rect(&self, area: &RectFixed) -> Vec<EntityId> {
        self.index
            .candidates(area)
            .into_iter()
            .filter(|id| {
                self.entities
                    .get(id)
                    .is_some_and(|entity| entity.footprint().intersects(area))
            })
            .collect()
    }

    /// Check whether a building of type `ty` can stand at `position`.
    ///
    /// Every covered tile must be buildable terrain. A building that must
    /// stand on a resource needs exactly one deposit of that kind under it
    /// and nothing else; any other building needs an empty footprint.
    #[must_use]
    pub fn check_building_placement(&self, ty: &BuildingType, position: Vec2Fixed) -> Placement {
        let footprint = RectFixed::square(position, ty.size);
        if !self.in_bounds(&footprint) {
            return Placement::Blocked("outside the map".into());
        }
        if let Some(tile) = tiles_of(&footprint)
            .find(|&tile| !self.terrain.get(tile).is_some_and(|terrain| terrain.is_buildable()))
        {
            return Placement::Blocked(format!("terrain at {tile:?} is not buildable"));
        }

        let mut deposit = None;
        for id in self.entities_in_rect(&footprint) {
            let Some(entity) = self.entities.get(&id) else {
                continue;
            };
            let matches_site = match (&ty.built_on, entity.as_resource()) {
                (Some(kind), Some(resource)) => resource.ty.name == *kind,
                _ => false,
            };
            if !matches_site || deposit.is_some() {
                return Placement::Blocked(format!("{} {id} is in the way", entity.type_name()));
            }
            deposit = Some(id);
        }

        match (&ty.built_on, deposit) {
            (Some(_), Some(id)) => Placement::OnResource(id),
            (Some(kind), None) => Placement::Blocked(format!("{} must stand on {kind}", ty.name)),
            (None, _) => Placement::Clear,
        }
    }

    // ------------------------------------------------------------------
    // Creation and removal
    // ------------------------------------------------------------------

    /// Register an entity, assigning it a fresh id.
    ///
    /// Records the entity-add delta, followed by corrections for any state
    /// that differs from the defaults a mirror derives from the type name.
    ///
    /// # Errors
    ///
    /// [`GameError::OutOfBounds`] if the footprint leaves the map.
    pub fn place(&mut self, mut entity: Entity) -> Result<EntityId> {
        let footprint = entity.footprint();
        if !self.in_bounds(&footprint) {
            return Err(out_of_bounds(entity.position(), entity.size()));
        }

        let id = self.entity_ids.next_id();
        entity.set_id(id);
        self.index.insert(id, &footprint);

        let entity_ref = EntityRef::of(&entity);
        self.journal.push(Delta::EntityAdded {
            entity: entity_ref,
            name: entity.type_name().to_owned(),
            position: entity.position(),
            owner: entity.owner(),
        });
        for change in default_corrections(&entity) {
            self.journal.push(Delta::PropertyChanged {
                entity: entity_ref,
                change,
            });
        }

        trace!(entity = id, kind = entity.type_name(), "placed");
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Spawn a unit at full health.
    ///
    /// # Errors
    ///
    /// [`GameError::OutOfBounds`] if the footprint leaves the map.
    pub fn spawn_unit(
        &mut self,
        ty: Arc<UnitType>,
        position: Vec2Fixed,
        owner: PlayerId,
    ) -> Result<EntityId> {
        self.place(Entity::new_unit(ty, position, owner))
    }

    /// Spawn a building after checking placement.
    ///
    /// # Errors
    ///
    /// [`GameError::OutOfBounds`] or [`GameError::PlacementBlocked`].
    pub fn spawn_building(
        &mut self,
        ty: Arc<BuildingType>,
        position: Vec2Fixed,
        owner: PlayerId,
        construction: Construction,
    ) -> Result<EntityId> {
        let footprint = RectFixed::square(position, ty.size);
        if !self.in_bounds(&footprint) {
            return Err(out_of_bounds(position, ty.size));
        }
        let resource_under = match self.check_building_placement(&ty, position) {
            Placement::Clear => None,
            Placement::OnResource(id) => Some(id),
            Placement::Blocked(reason) => return Err(GameError::PlacementBlocked(reason)),
        };

        let mut entity = Entity::new_building(ty, position, owner, construction);
        if let Some(building) = entity.as_building_mut() {
            building.resource_under = resource_under;
        }
        self.place(entity)
    }

    /// Spawn a full resource deposit.
    ///
    /// # Errors
    ///
    /// [`GameError::OutOfBounds`] if the footprint leaves the map.
    pub fn spawn_resource(&mut self, ty: Arc<ResourceType>, position: Vec2Fixed) -> Result<EntityId> {
        self.place(Entity::new_resource(ty, position))
    }

    /// Unregister an entity and record its deletion.
    ///
    /// Commands held by other entities that reference it are left alone;
    /// they finish on their next tick.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownEntity`] if `id` is not alive.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        let entity = self
            .entities
            .remove(&id)
            .ok_or(GameError::UnknownEntity(id))?;
        self.index.remove(id, &entity.footprint());
        self.journal.push(Delta::EntityRemoved {
            entity: EntityRef::of(&entity),
        });
        trace!(entity = id, "removed");
        Ok(entity)
    }

    // ------------------------------------------------------------------
    // State changes
    // ------------------------------------------------------------------

    /// Move an entity's top-left corner, keeping the tile index current.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownEntity`] or [`GameError::OutOfBounds`].
    pub fn move_entity(&mut self, id: EntityId, to: Vec2Fixed) -> Result<()> {
        let entity = self.entities.get(&id).ok_or(GameError::UnknownEntity(id))?;
        let from = entity.footprint();
        let target = RectFixed::square(to, entity.size());
        if !self.in_bounds(&target) {
            return Err(out_of_bounds(to, entity.size()));
        }
        let entity_ref = EntityRef::of(entity);
        let (dx, dy) = (to.x - from.min.x, to.y - from.min.y);

        self.index.relocate(id, &from, &target);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.set_position(to);
        }

        if dx != Fixed::ZERO {
            self.record_change(entity_ref, PropertyChange::X(dx));
        }
        if dy != Fixed::ZERO {
            self.record_change(entity_ref, PropertyChange::Y(dy));
        }
        Ok(())
    }

    /// Deal mitigated damage. Returns the hitpoint change (zero or negative).
    pub fn damage(&mut self, id: EntityId, amount: u32) -> i32 {
        self.change_health(id, |health| health.apply_damage(amount))
    }

    /// Restore hitpoints. Returns the change (zero or positive).
    pub fn heal(&mut self, id: EntityId, amount: i32) -> i32 {
        self.change_health(id, |health| health.heal(amount))
    }

    fn change_health(
        &mut self,
        id: EntityId,
        apply: impl FnOnce(&mut crate::entity::Health) -> i32,
    ) -> i32 {
        let Some(entity) = self.entities.get_mut(&id) else {
            return 0;
        };
        let entity_ref = EntityRef::of(entity);
        let change = entity.health_mut().map_or(0, apply);
        if change != 0 {
            self.record_change(entity_ref, PropertyChange::Hitpoints(change));
        }
        change
    }

    /// Mark a construction site as finished.
    pub fn mark_built(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let entity_ref = EntityRef::of(entity);
        if let Some(building) = entity.as_building_mut() {
            if !building.built {
                building.built = true;
                self.record_change(entity_ref, PropertyChange::Built(true));
            }
        }
    }

    /// Remove up to `amount` from a deposit. Returns what was removed.
    pub fn extract(&mut self, id: EntityId, amount: i32) -> i32 {
        let Some(entity) = self.entities.get_mut(&id) else {
            return 0;
        };
        let entity_ref = EntityRef::of(entity);
        let extracted = entity
            .as_resource_mut()
            .map_or(0, |resource| resource.extract(amount));
        if extracted > 0 {
            self.record_change(entity_ref, PropertyChange::ResourceAmount(-extracted));
        }
        extracted
    }

    /// Add to a player's stockpile.
    pub fn credit(&mut self, player: PlayerId, resource: &str, amount: i64) {
        if amount == 0 {
            return;
        }
        *self
            .players
            .entry(player)
            .or_default()
            .stock
            .entry(resource.to_owned())
            .or_insert(0) += amount;
        self.journal.push(Delta::StockChanged {
            player,
            resource: resource.to_owned(),
            delta: amount,
        });
    }

    /// Check that `player` can pay `cost` without paying it.
    ///
    /// # Errors
    ///
    /// [`GameError::InsufficientResources`] naming the first short resource.
    pub fn check_affordable(&self, player: PlayerId, cost: &Cost) -> Result<()> {
        for (resource, required) in cost.iter() {
            let available = self.stock(player, resource);
            if available < required {
                return Err(GameError::InsufficientResources {
                    resource: resource.to_owned(),
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Deduct `cost` from `player`'s stockpile, all or nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::InsufficientResources`]; nothing is deducted.
    pub fn spend(&mut self, player: PlayerId, cost: &Cost) -> Result<()> {
        self.check_affordable(player, cost)?;
        for (resource, amount) in cost.iter() {
            self.credit(player, resource, -amount);
        }
        Ok(())
    }

    /// Record a finished technology.
    ///
    /// # Errors
    ///
    /// [`GameError::AlreadyResearched`] if `player` already has it.
    pub fn research(&mut self, player: PlayerId, tech: &str) -> Result<()> {
        let state = self.players.entry(player).or_default();
        if !state.technologies.insert(tech.to_owned()) {
            return Err(GameError::AlreadyResearched {
                player,
                tech: tech.to_owned(),
            });
        }
        self.journal.push(Delta::TechnologyResearched {
            player,
            tech: tech.to_owned(),
        });
        Ok(())
    }

    /// Set the walking animation flag.
    pub fn set_moving(&mut self, id: EntityId, moving: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if entity.flags.moving != moving {
            entity.flags.moving = moving;
            let entity_ref = EntityRef::of(entity);
            self.record_change(entity_ref, PropertyChange::MoveAnimation(moving));
        }
    }

    /// Set the working animation flag.
    pub fn set_working(&mut self, id: EntityId, working: bool) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if entity.flags.working != working {
            entity.flags.working = working;
            let entity_ref = EntityRef::of(entity);
            self.record_change(entity_ref, PropertyChange::AttackAnimation(working));
        }
    }

    /// Append a delta to the journal.
    pub(crate) fn record(&mut self, delta: Delta) {
        self.journal.push(delta);
    }

    fn record_change(&mut self, entity: EntityRef, change: PropertyChange) {
        self.journal.push(Delta::PropertyChanged { entity, change });
    }

    /// Drain everything recorded since the last call, in order.
    pub fn take_deltas(&mut self) -> Vec<Delta> {
        std::mem::take(&mut self.journal)
    }

    // ------------------------------------------------------------------
    // Command slots
    // ------------------------------------------------------------------

    /// Fresh command id.
    pub fn next_command_id(&mut self) -> CommandId {
        self.command_ids.next_id()
    }

    /// Replace the actor's movement.
    pub(crate) fn attach_movement(&mut self, movement: MoveCommand) {
        if let Some(commands) = self
            .entities
            .get_mut(&movement.actor)
            .and_then(Entity::commands_mut)
        {
            commands.movement = Some(movement);
        }
    }

    /// Replace the actor's action without releasing the previous one.
    pub(crate) fn set_action(&mut self, action: ActionCommand) {
        if let Some(commands) = self
            .entities
            .get_mut(&action.actor())
            .and_then(Entity::commands_mut)
        {
            commands.action = Some(action);
        }
    }

    /// Reset the re-route countdown of the actor's action if its id is
    /// `action`. Returns whether it matched.
    pub(crate) fn resume_action(&mut self, actor: EntityId, action: CommandId) -> bool {
        let Some(pending) = self
            .entities
            .get_mut(&actor)
            .and_then(Entity::commands_mut)
            .and_then(|commands| commands.action.as_mut())
        else {
            return false;
        };
        if pending.id() != action {
            return false;
        }
        pending.reactivate();
        true
    }

    /// Drop the actor's movement and stop its walking animation.
    pub fn cancel_movement(&mut self, actor: EntityId) {
        let had_movement = self
            .entities
            .get_mut(&actor)
            .and_then(Entity::commands_mut)
            .and_then(|commands| commands.movement.take())
            .is_some();
        if had_movement {
            self.set_moving(actor, false);
        }
    }

    /// Drop the actor's movement only if it is approaching for `action`.
    pub(crate) fn cancel_movement_for(&mut self, actor: EntityId, action: CommandId) {
        let serves = self
            .entities
            .get(&actor)
            .and_then(Entity::commands)
            .is_some_and(|commands| commands.movement_serves(action));
        if serves {
            self.cancel_movement(actor);
        }
    }

    /// Drop the actor's action, its approach movement, and any broadcast
    /// state it left behind.
    pub fn cancel_action(&mut self, actor: EntityId) {
        if let Some(mut action) = self.take_action(actor) {
            self.cancel_movement_for(actor, action.id());
            action.release(self);
        }
    }

    /// Detach the actor's action for ticking.
    pub(crate) fn take_action(&mut self, actor: EntityId) -> Option<ActionCommand> {
        self.entities
            .get_mut(&actor)
            .and_then(Entity::commands_mut)
            .and_then(|commands| commands.action.take())
    }

    /// Put a ticked action back unless something replaced it meanwhile.
    pub(crate) fn restore_action(&mut self, action: ActionCommand) {
        if let Some(commands) = self
            .entities
            .get_mut(&action.actor())
            .and_then(Entity::commands_mut)
        {
            if commands.action.is_none() {
                commands.action = Some(action);
            }
        }
    }

    /// Detach the actor's movement for ticking.
    pub(crate) fn take_movement(&mut self, actor: EntityId) -> Option<MoveCommand> {
        self.entities
            .get_mut(&actor)
            .and_then(Entity::commands_mut)
            .and_then(|commands| commands.movement.take())
    }

    /// Put a ticked movement back unless something replaced it meanwhile.
    pub(crate) fn restore_movement(&mut self, movement: MoveCommand) {
        if let Some(commands) = self
            .entities
            .get_mut(&movement.actor)
            .and_then(Entity::commands_mut)
        {
            if commands.movement.is_none() {
                commands.movement = Some(movement);
            }
        }
    }

    /// Ids of entities whose action targets `target`.
    #[must_use]
    pub fn actions_targeting(&self, target: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| {
                entity
                    .commands()
                    .and_then(|commands| commands.action.as_ref())
                    .is_some_and(|action| action.target() == target)
            })
            .map(Entity::id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Determinism support
    // ------------------------------------------------------------------

    /// Hash of every piece of simulation-visible state.
    ///
    /// Two worlds that took the same inputs hash identically.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.entity_ids.peek().hash(&mut hasher);
        self.entities.len().hash(&mut hasher);
        for (id, entity) in &self.entities {
            id.hash(&mut hasher);
            entity.type_name().hash(&mut hasher);
            entity.owner().hash(&mut hasher);
            entity.position().x.to_bits().hash(&mut hasher);
            entity.position().y.to_bits().hash(&mut hasher);
            entity.flags().moving.hash(&mut hasher);
            entity.flags().working.hash(&mut hasher);

            match entity.kind() {
                EntityKind::Unit(unit) => {
                    unit.health.current.hash(&mut hasher);
                }
                EntityKind::Building(building) => {
                    building.health.current.hash(&mut hasher);
                    building.built.hash(&mut hasher);
                    building.production.len().hash(&mut hasher);
                    if let Some(item) = building.production.current() {
                        item.progress.hash(&mut hasher);
                    }
                }
                EntityKind::Resource(resource) => {
                    resource.amount.hash(&mut hasher);
                }
            }

            if let Some(commands) = entity.commands() {
                commands.movement.as_ref().map(|m| m.id).hash(&mut hasher);
                commands.action.as_ref().map(ActionCommand::id).hash(&mut hasher);
            }
        }

        self.players.hash(&mut hasher);
        hasher.finish()
    }

    /// Serialize the world with bincode. The delta journal is not included.
    ///
    /// # Errors
    ///
    /// [`GameError::Snapshot`] if encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Snapshot(e.to_string()))
    }

    /// Rebuild a world from [`snapshot`](Self::snapshot) bytes.
    ///
    /// # Errors
    ///
    /// [`GameError::Snapshot`] if decoding fails.
    pub fn restore(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::Snapshot(e.to_string()))
    }
}

fn out_of_bounds(position: Vec2Fixed, size: u32) -> GameError {
    GameError::OutOfBounds {
        x: position.x.to_string(),
        y: position.y.to_string(),
        size,
    }
}

/// Changes a mirror must apply on top of what it derives from the type name.
///
/// Mirrors seed hitpoints at the type maximum, buildings as built, and
/// deposits at their full amount.
fn default_corrections(entity: &Entity) -> Vec<PropertyChange> {
    let mut changes = Vec::new();
    if let Some(health) = entity.health() {
        if health.current != health.max {
            changes.push(PropertyChange::Hitpoints(health.current - health.max));
        }
    }
    match entity.kind() {
        EntityKind::Building(building) if !building.built => {
            changes.push(PropertyChange::Built(false));
        }
        EntityKind::Resource(resource) if resource.amount != resource.ty.amount => {
            changes.push(PropertyChange::ResourceAmount(resource.amount - resource.ty.amount));
        }
        _ => {}
    }
    changes
}
