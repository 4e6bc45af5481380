//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and processes all game logic
//! deterministically. It owns the [`World`], the type tables and the requests
//! that arrived since the last tick.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness
//! - Entities are always visited in ascending id order
//! - Same requests in the same order always produce the same deltas
//!
//! # Example
//!
//! ```
//! use rts_core::config::SimConfig;
//! use rts_core::math::Vec2Fixed;
//! use rts_core::request::Request;
//! use rts_core::simulation::Simulation;
//! use rts_core::types::TypeRegistry;
//! use rts_core::world::World;
//!
//! let registry = TypeRegistry::from_ron_str(
//!     r#"(units: [(name: "scout", hitpoints: 10, speed: 5.0)])"#,
//! ).unwrap();
//! let mut sim = Simulation::new(World::new(16, 16), registry, SimConfig::default());
//! let scout = sim.spawn_unit("scout", Vec2Fixed::from_tiles(1, 1), 1).unwrap();
//!
//! sim.queue_request(1, Request::Move { entity: scout, target: Vec2Fixed::from_tiles(8, 1) });
//! let report = sim.advance_tick();
//! assert_eq!(report.tick, 1);
//! assert!(!report.deltas.is_empty());
//! ```

use std::sync::Arc;

use tracing::{debug, trace};

use crate::commands::{
    AttackCommand, BuildCommand, Command, GatherCommand, MoveCommand, TickOutcome,
};
use crate::config::SimConfig;
use crate::delta::{Delta, EntityRef};
use crate::entity::{Capability, Construction, Entity, EntityId, PlayerId};
use crate::error::{GameError, Result};
use crate::math::{RectFixed, Vec2Fixed};
use crate::request::Request;
use crate::types::{TypeRegistry, UnitType};
use crate::world::World;

/// Everything that happened in one tick, in the order it happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The tick number just completed (first tick is 1).
    pub tick: u64,
    /// Changes to broadcast, oldest first.
    pub deltas: Vec<Delta>,
}

/// The authoritative simulation.
///
/// # Tick order
///
/// 0. **Requests** queued since the last tick, in arrival order
/// 1. **Movement** for every entity whose move is not suppressed by an
///    in-range action of its own
/// 2. **Actions** (attack, build, gather)
/// 3. **Production** at finished trainers
/// 4. **Death**: remove dead entities and cancel actions aimed at them
/// 5. **Drain** the delta journal
#[derive(Debug, Clone)]
pub struct Simulation {
    tick: u64,
    world: World,
    registry: TypeRegistry,
    config: SimConfig,
    queued: Vec<(PlayerId, Request)>,
}

impl Simulation {
    /// Wrap a populated world.
    #[must_use]
    pub fn new(world: World, registry: TypeRegistry, config: SimConfig) -> Self {
        Self {
            tick: 0,
            world,
            registry,
            config,
            queued: Vec::new(),
        }
    }

    /// Ticks completed so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// World state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world, for map setup and tests.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Type tables.
    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Tuning parameters.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Map setup
    // ------------------------------------------------------------------

    /// Spawn a unit by type name.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownType`] or [`GameError::OutOfBounds`].
    pub fn spawn_unit(&mut self, name: &str, position: Vec2Fixed, owner: PlayerId) -> Result<EntityId> {
        let ty = self.unit_type(name)?;
        self.world.spawn_unit(ty, position, owner)
    }

    /// Spawn a finished building by type name.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownType`], [`GameError::OutOfBounds`] or
    /// [`GameError::PlacementBlocked`].
    pub fn spawn_building(
        &mut self,
        name: &str,
        position: Vec2Fixed,
        owner: PlayerId,
    ) -> Result<EntityId> {
        let ty = self
            .registry
            .building(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownType(name.to_owned()))?;
        self.world
            .spawn_building(ty, position, owner, Construction::Complete)
    }

    /// Spawn a full deposit by type name.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownType`] or [`GameError::OutOfBounds`].
    pub fn spawn_resource(&mut self, name: &str, position: Vec2Fixed) -> Result<EntityId> {
        let ty = self
            .registry
            .resource(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownType(name.to_owned()))?;
        self.world.spawn_resource(ty, position)
    }

    fn unit_type(&self, name: &str) -> Result<Arc<UnitType>> {
        self.registry
            .unit(name)
            .cloned()
            .ok_or_else(|| GameError::UnknownType(name.to_owned()))
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Queue a request for the start of the next tick.
    pub fn queue_request(&mut self, player: PlayerId, request: Request) {
        self.queued.push((player, request));
    }

    /// Validate and apply a request immediately.
    ///
    /// Nothing changes and no delta is recorded when this returns an error.
    ///
    /// # Errors
    ///
    /// - [`GameError::UnknownEntity`] / [`GameError::UnknownType`] for stale or
    ///   bogus references
    /// - [`GameError::NotOwner`] when acting through someone else's entity
    /// - [`GameError::InvalidCapability`] when the entity cannot do that
    /// - [`GameError::InsufficientResources`], [`GameError::PlacementBlocked`],
    ///   [`GameError::OutOfBounds`], [`GameError::QueueFull`] and
    ///   [`GameError::AlreadyResearched`] for economy requests
    pub fn apply_request(&mut self, player: PlayerId, request: Request) -> Result<()> {
        if let Some(actor) = request.actor() {
            self.check_owner(player, actor)?;
        }

        match request {
            Request::Move { entity, target } => {
                self.issue(Command::Move(MoveCommand::new(0, entity, target)))?;
            }
            Request::Attack { entity, target } => {
                let target_ref = self
                    .world
                    .entity(target)
                    .map(EntityRef::of)
                    .ok_or(GameError::UnknownEntity(target))?;
                self.issue(Command::Attack(AttackCommand::new(0, entity, target_ref)))?;
            }
            Request::Build { entity, target } => {
                self.issue(Command::Build(BuildCommand::new(0, entity, target)))?;
            }
            Request::Gather { entity, target } => {
                self.issue(Command::Gather(GatherCommand::new(0, entity, target)))?;
            }
            Request::PlaceBuilding {
                building_type,
                position,
            } => {
                let ty = self
                    .registry
                    .building(&building_type)
                    .cloned()
                    .ok_or(GameError::UnknownType(building_type))?;
                self.world.check_affordable(player, &ty.cost)?;
                let cost = ty.cost.clone();
                let id = self
                    .world
                    .spawn_building(ty, position, player, Construction::Site)?;
                self.world.spend(player, &cost)?;
                debug!(player, entity = id, "construction site placed");
            }
            Request::Train {
                building,
                unit_type,
            } => self.train(player, building, &unit_type)?,
            Request::Research { tech } => {
                let ty = self
                    .registry
                    .technology(&tech)
                    .cloned()
                    .ok_or(GameError::UnknownType(tech))?;
                if self.world.has_researched(player, &ty.name) {
                    return Err(GameError::AlreadyResearched {
                        player,
                        tech: ty.name.clone(),
                    });
                }
                self.world.spend(player, &ty.cost)?;
                self.world.research(player, &ty.name)?;
            }
            Request::Delete { entity } => {
                self.remove_entity(entity)?;
            }
        }
        Ok(())
    }

    /// Validate a player command, then give it a fresh id and attach it.
    fn issue(&mut self, command: Command) -> Result<()> {
        command.validate(&self.world)?;
        let id = self.world.next_command_id();
        command.with_id(id).execute(&mut self.world, &self.config)?;
        Ok(())
    }

    fn check_owner(&self, player: PlayerId, entity: EntityId) -> Result<()> {
        let owner = self
            .world
            .entity(entity)
            .ok_or(GameError::UnknownEntity(entity))?
            .owner();
        if owner == player {
            Ok(())
        } else {
            Err(GameError::NotOwner { player, entity })
        }
    }

    fn train(&mut self, player: PlayerId, building: EntityId, unit_type: &str) -> Result<()> {
        let ty = self.unit_type(unit_type)?;
        let trainer = self
            .world
            .entity(building)
            .ok_or(GameError::UnknownEntity(building))?;
        let Some(state) = trainer
            .as_building()
            .filter(|_| trainer.has(Capability::Trainer))
        else {
            return Err(GameError::InvalidCapability {
                entity: building,
                action: "train",
            });
        };
        if !state.built {
            return Err(GameError::InvalidCapability {
                entity: building,
                action: "train before construction finishes",
            });
        }
        if !state.ty.can_train(&ty.name) {
            return Err(GameError::InvalidCapability {
                entity: building,
                action: "train that unit type",
            });
        }
        if state.production.is_full() {
            return Err(GameError::QueueFull(building));
        }

        self.world.spend(player, &ty.cost)?;
        if let Some(state) = self
            .world
            .entity_mut(building)
            .and_then(Entity::as_building_mut)
        {
            state.production.push(ty);
        }
        Ok(())
    }

    /// Remove an entity, first cancelling its own action and every action
    /// aimed at it so attack-stop deltas precede the deletion.
    fn remove_entity(&mut self, id: EntityId) -> Result<()> {
        if !self.world.contains(id) {
            return Err(GameError::UnknownEntity(id));
        }
        self.world.cancel_action(id);
        for actor in self.world.actions_targeting(id) {
            self.world.cancel_action(actor);
        }
        self.world.remove(id)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick and return its deltas.
    pub fn advance_tick(&mut self) -> TickReport {
        // 0. Requests
        for (player, request) in std::mem::take(&mut self.queued) {
            if let Err(error) = self.apply_request(player, request) {
                debug!(tick = self.tick + 1, player, %error, "request rejected");
            }
        }

        // 1. Movement
        let ids = self.world.sorted_ids();
        for &id in &ids {
            self.run_movement(id);
        }

        // 2. Actions
        for &id in &ids {
            self.run_action(id);
        }

        // 2b. Production
        for &id in &ids {
            self.run_production(id);
        }

        // 3. Collect dead
        let dead: Vec<EntityId> = self
            .world
            .entities()
            .filter(|entity| entity.is_dead())
            .map(Entity::id)
            .collect();

        // 4. Remove dead
        for id in dead {
            trace!(tick = self.tick + 1, entity = id, "died");
            if let Err(error) = self.remove_entity(id) {
                debug!(entity = id, %error, "dead entity already gone");
            }
        }

        // 5. Drain
        self.tick += 1;
        TickReport {
            tick: self.tick,
            deltas: self.world.take_deltas(),
        }
    }

    fn run_movement(&mut self, id: EntityId) {
        let suppressed = self
            .world
            .entity(id)
            .and_then(Entity::commands)
            .is_some_and(|commands| match (&commands.movement, &commands.action) {
                (Some(movement), Some(action)) => {
                    movement.resume == Some(action.id())
                        && action.in_range(&self.world, &self.config)
                }
                _ => false,
            });
        if suppressed {
            return;
        }

        let Some(mut movement) = self.world.take_movement(id) else {
            return;
        };
        if movement.tick(&mut self.world, &self.config) == TickOutcome::Continue {
            self.world.restore_movement(movement);
        }
    }

    fn run_action(&mut self, id: EntityId) {
        let Some(mut action) = self.world.take_action(id) else {
            return;
        };
        match action.tick(&mut self.world, &self.config) {
            TickOutcome::Continue => self.world.restore_action(action),
            TickOutcome::Done => {
                self.world.cancel_movement_for(id, action.id());
                action.release(&mut self.world);
            }
        }
    }

    fn run_production(&mut self, id: EntityId) {
        let Some(ready) = self
            .world
            .entity_mut(id)
            .and_then(Entity::as_building_mut)
            .filter(|building| building.built)
            .and_then(|building| building.production.tick())
        else {
            return;
        };
        let Some(trainer) = self.world.entity(id) else {
            return;
        };
        let owner = trainer.owner();
        let Some(spot) = self.spawn_spot(&trainer.footprint(), ready.size) else {
            trace!(entity = id, "no room to spawn, waiting");
            return;
        };

        match self.world.spawn_unit(ready, spot, owner) {
            Ok(unit) => {
                debug!(tick = self.tick + 1, trainer = id, unit, "unit trained");
                if let Some(building) = self.world.entity_mut(id).and_then(Entity::as_building_mut) {
                    building.production.pop_complete();
                }
            }
            Err(error) => debug!(trainer = id, %error, "spawn failed"),
        }
    }

    /// First free spot of `size` hugging `footprint`, starting below it and
    /// walking clockwise.
    fn spawn_spot(&self, footprint: &RectFixed, size: u32) -> Option<Vec2Fixed> {
        let (x0, y0, x1, y1) = footprint.tile_span();
        let size = i32::try_from(size).ok()?;
        let (left, right) = (x0 - size, x1 + 1);
        let (top, bottom) = (y0 - size, y1 + 1);

        let below = (left..=right).rev().map(|x| (x, bottom));
        let west = (top..bottom).rev().map(|y| (left, y));
        let above = (left + 1..=right).map(|x| (x, top));
        let east = (top + 1..bottom).map(|y| (right, y));

        below
            .chain(west)
            .chain(above)
            .chain(east)
            .map(|(x, y)| Vec2Fixed::from_tiles(x, y))
            .find(|&position| {
                let area = RectFixed::square(position, size.unsigned_abs());
                self.world.in_bounds(&area) && self.world.entities_in_rect(&area).is_empty()
            })
    }

    /// Hash of the world plus the tick counter.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.world.state_hash() ^ self.tick.rotate_left(32)
    }
}
