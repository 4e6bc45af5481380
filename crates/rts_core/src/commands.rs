//! Command state machine.
//!
//! A command is *created* as a plain value, becomes *active* once
//! [`Command::execute`] attaches it to its actor's [`PendingCommands`], and is
//! *done* when its tick reports [`TickOutcome::Done`] and the simulation drops
//! it. Commands hold entity ids, never references, and look everything up
//! through the [`World`] each tick.
//!
//! Every entity holds at most one movement and one action. An action that has
//! to walk to its target attaches an auxiliary [`MoveCommand`] whose
//! `resume` field names the action; when that move arrives the action is
//! re-executed, which makes it re-evaluate range on the same tick.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::delta::{Delta, EntityRef};
use crate::entity::{Capability, EntityId};
use crate::error::{GameError, Result};
use crate::math::{step_toward, Fixed, RectFixed, Vec2Fixed};
use crate::world::World;

/// World-scoped command identifier.
pub type CommandId = u64;

/// Result of ticking an active command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep the command attached.
    Continue,
    /// Remove the command.
    Done,
}

/// Walk in a straight line to a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCommand {
    /// Command id.
    pub id: CommandId,
    /// Entity being moved.
    pub actor: EntityId,
    /// Destination (top-left corner of the footprint).
    pub target: Vec2Fixed,
    /// Action to re-execute on arrival. `None` for player-issued moves.
    pub resume: Option<CommandId>,
}

impl MoveCommand {
    /// A player-issued move.
    #[must_use]
    pub const fn new(id: CommandId, actor: EntityId, target: Vec2Fixed) -> Self {
        Self {
            id,
            actor,
            target,
            resume: None,
        }
    }

    /// Advance one tick toward the destination.
    ///
    /// Each tick spends `speed × tick_seconds` of Manhattan distance; the last
    /// step lands exactly on the destination.
    pub fn tick(&mut self, world: &mut World, config: &SimConfig) -> TickOutcome {
        let Some(actor) = world.entity(self.actor) else {
            return TickOutcome::Done;
        };
        let Some(speed) = actor.speed() else {
            return TickOutcome::Done;
        };

        let budget = speed * config.tick_seconds();
        let (next, arrived) = step_toward(actor.position(), self.target, budget);

        if world.move_entity(self.actor, next).is_err() {
            // Destination was clamped on issue, so this only happens if the
            // map shrank under us; give up rather than wedge the unit.
            world.set_moving(self.actor, false);
            return TickOutcome::Done;
        }

        if arrived {
            world.set_moving(self.actor, false);
            if let Some(action) = self.resume {
                world.resume_action(self.actor, action);
            }
            TickOutcome::Done
        } else {
            world.set_moving(self.actor, true);
            TickOutcome::Continue
        }
    }
}

/// Re-route bookkeeping shared by the actions that walk to their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Approach {
    /// Ticks until the next re-route is allowed. Zero means now.
    pub reroute_in: u32,
}

impl Approach {
    /// Issue an approach move if the countdown allows it.
    ///
    /// `reach` is how close the actor must get, as a footprint gap.
    fn step(
        &mut self,
        world: &mut World,
        config: &SimConfig,
        actor: EntityId,
        target: EntityId,
        resume: CommandId,
        reach: Fixed,
    ) {
        if self.reroute_in > 0 {
            self.reroute_in -= 1;
            return;
        }
        self.reroute_in = config.reroute_interval.saturating_sub(1);

        let (Some(actor_entity), Some(target_entity)) = (world.entity(actor), world.entity(target))
        else {
            return;
        };
        if !actor_entity.has(Capability::Mover) {
            return;
        }
        let destination = approach_point(
            &actor_entity.footprint(),
            &target_entity.footprint(),
            (reach - config.approach_margin).max(Fixed::ZERO),
        );
        let destination = world.clamp_position(destination, actor_entity.size());
        let id = world.next_command_id();
        world.attach_movement(MoveCommand {
            id,
            actor,
            target: destination,
            resume: Some(resume),
        });
    }
}

/// Top-left corner that puts `actor` at most `reach` away from `target`, on
/// the line between their centres.
#[must_use]
pub fn approach_point(actor: &RectFixed, target: &RectFixed, reach: Fixed) -> Vec2Fixed {
    let two = Fixed::from_num(2);
    let actor_center = actor.center();
    let target_center = target.center();
    let direction = (actor_center - target_center).normalize();
    if direction == Vec2Fixed::ZERO {
        return actor.min;
    }

    let distance = (actor.width + target.width) / two + reach;
    let center = target_center + direction.scale(distance);
    Vec2Fixed::new(center.x - actor.width / two, center.y - actor.height / two)
}

/// Attack an entity until it dies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCommand {
    /// Command id.
    pub id: CommandId,
    /// Attacking entity.
    pub actor: EntityId,
    /// Defender.
    pub target: EntityRef,
    /// Approach state.
    pub approach: Approach,
    /// Ticks until the next hit.
    pub cooldown: u32,
    /// Whether an attack-start has been broadcast without a matching stop.
    pub engaged: bool,
}

impl AttackCommand {
    /// Create an attack command.
    #[must_use]
    pub const fn new(id: CommandId, actor: EntityId, target: EntityRef) -> Self {
        Self {
            id,
            actor,
            target,
            approach: Approach { reroute_in: 0 },
            cooldown: 0,
            engaged: false,
        }
    }

    fn engage(&mut self, world: &mut World, active: bool) {
        if self.engaged == active {
            return;
        }
        self.engaged = active;
        if let Some(attacker) = world.entity(self.actor).map(EntityRef::of) {
            world.record(Delta::AttackState {
                attacker,
                defender: self.target,
                active,
            });
        }
        world.set_working(self.actor, active);
    }

    fn tick(&mut self, world: &mut World, config: &SimConfig) -> TickOutcome {
        let Some(profile) = world
            .entity(self.actor)
            .and_then(|attacker| attacker.attack_profile().cloned())
        else {
            return TickOutcome::Done;
        };
        let Some(defender) = world.entity(self.target.id) else {
            return TickOutcome::Done;
        };
        if defender.is_dead() {
            return TickOutcome::Done;
        }

        if !self.in_range(world) {
            self.engage(world, false);
            let can_move = world
                .entity(self.actor)
                .is_some_and(|attacker| attacker.has(Capability::Mover));
            if !can_move {
                return TickOutcome::Done;
            }
            self.approach
                .step(world, config, self.actor, self.target.id, self.id, profile.range);
            return TickOutcome::Continue;
        }

        world.cancel_movement_for(self.actor, self.id);
        self.engage(world, true);

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return TickOutcome::Continue;
        }

        let damage = world
            .entity(self.target.id)
            .and_then(|defender| defender.resistances())
            .map_or(profile.damage, |resist| {
                resist.mitigate(profile.damage, profile.damage_type)
            });
        world.damage(self.target.id, damage);
        self.cooldown = profile.interval.saturating_sub(1);

        if world.entity(self.target.id).map_or(true, |d| d.is_dead()) {
            TickOutcome::Done
        } else {
            TickOutcome::Continue
        }
    }

    fn in_range(&self, world: &World) -> bool {
        let (Some(attacker), Some(defender)) = (world.entity(self.actor), world.entity(self.target.id))
        else {
            return false;
        };
        attacker.attack_profile().is_some_and(|profile| {
            attacker
                .footprint()
                .within_range(&defender.footprint(), profile.range)
        })
    }
}

/// Raise a construction site to full hitpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
    /// Command id.
    pub id: CommandId,
    /// Builder.
    pub actor: EntityId,
    /// Construction site.
    pub target: EntityId,
    /// Approach state.
    pub approach: Approach,
}

impl BuildCommand {
    /// Create a build command.
    #[must_use]
    pub const fn new(id: CommandId, actor: EntityId, target: EntityId) -> Self {
        Self {
            id,
            actor,
            target,
            approach: Approach { reroute_in: 0 },
        }
    }

    fn tick(&mut self, world: &mut World, config: &SimConfig) -> TickOutcome {
        let Some(build_speed) = world.entity(self.actor).and_then(|e| e.build_speed()) else {
            return TickOutcome::Done;
        };
        let Some(site) = world.entity(self.target).and_then(|e| e.as_building()) else {
            return TickOutcome::Done;
        };
        if site.built {
            return TickOutcome::Done;
        }
        let resistance = site.ty.build_resistance.max(1);

        if !self.in_range(world, config) {
            world.set_working(self.actor, false);
            self.approach
                .step(world, config, self.actor, self.target, self.id, config.build_range);
            return TickOutcome::Continue;
        }

        world.cancel_movement_for(self.actor, self.id);
        world.set_working(self.actor, true);

        let progress = i32::try_from((build_speed / resistance).max(1)).unwrap_or(i32::MAX);
        world.heal(self.target, progress);

        let finished = world
            .entity(self.target)
            .and_then(|e| e.health())
            .is_some_and(|health| health.is_full());
        if finished {
            world.mark_built(self.target);
            TickOutcome::Done
        } else {
            TickOutcome::Continue
        }
    }

    fn in_range(&self, world: &World, config: &SimConfig) -> bool {
        match (world.entity(self.actor), world.entity(self.target)) {
            (Some(builder), Some(site)) => builder
                .footprint()
                .within_range(&site.footprint(), config.build_range),
            _ => false,
        }
    }
}

/// Extract from a deposit until it is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherCommand {
    /// Command id.
    pub id: CommandId,
    /// Gatherer.
    pub actor: EntityId,
    /// Deposit.
    pub target: EntityId,
    /// Approach state.
    pub approach: Approach,
    /// Ticks spent in range since the last extraction.
    pub since_extraction: u32,
}

impl GatherCommand {
    /// Create a gather command.
    #[must_use]
    pub const fn new(id: CommandId, actor: EntityId, target: EntityId) -> Self {
        Self {
            id,
            actor,
            target,
            approach: Approach { reroute_in: 0 },
            since_extraction: 0,
        }
    }

    fn tick(&mut self, world: &mut World, config: &SimConfig) -> TickOutcome {
        let Some((profile, owner)) = world
            .entity(self.actor)
            .and_then(|e| e.gather_profile().cloned().map(|p| (p, e.owner())))
        else {
            return TickOutcome::Done;
        };
        let Some(deposit) = world.entity(self.target).and_then(|e| e.as_resource()) else {
            return TickOutcome::Done;
        };
        if deposit.is_depleted() {
            return TickOutcome::Done;
        }
        let kind = deposit.ty.name.clone();

        if !self.in_range(world, config) {
            world.set_working(self.actor, false);
            self.approach
                .step(world, config, self.actor, self.target, self.id, config.gather_range);
            return TickOutcome::Continue;
        }

        world.cancel_movement_for(self.actor, self.id);
        world.set_working(self.actor, true);

        self.since_extraction += 1;
        if self.since_extraction >= profile.interval.max(1) {
            self.since_extraction = 0;
            let extracted = world.extract(self.target, profile.amount);
            if extracted > 0 {
                world.credit(owner, &kind, i64::from(extracted));
            }
        }

        let depleted = world
            .entity(self.target)
            .and_then(|e| e.as_resource())
            .map_or(true, |deposit| deposit.is_depleted());
        if depleted {
            TickOutcome::Done
        } else {
            TickOutcome::Continue
        }
    }

    fn in_range(&self, world: &World, config: &SimConfig) -> bool {
        match (world.entity(self.actor), world.entity(self.target)) {
            (Some(gatherer), Some(deposit)) => gatherer
                .footprint()
                .within_range(&deposit.footprint(), config.gather_range),
            _ => false,
        }
    }
}

/// A command that works on a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCommand {
    /// Attack.
    Attack(AttackCommand),
    /// Construct.
    Build(BuildCommand),
    /// Gather.
    Gather(GatherCommand),
}

impl ActionCommand {
    /// Command id.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        match self {
            Self::Attack(cmd) => cmd.id,
            Self::Build(cmd) => cmd.id,
            Self::Gather(cmd) => cmd.id,
        }
    }

    /// Acting entity.
    #[must_use]
    pub const fn actor(&self) -> EntityId {
        match self {
            Self::Attack(cmd) => cmd.actor,
            Self::Build(cmd) => cmd.actor,
            Self::Gather(cmd) => cmd.actor,
        }
    }

    /// Target entity.
    #[must_use]
    pub const fn target(&self) -> EntityId {
        match self {
            Self::Attack(cmd) => cmd.target.id,
            Self::Build(cmd) => cmd.target,
            Self::Gather(cmd) => cmd.target,
        }
    }

    /// Whether the actor is close enough to work this tick.
    #[must_use]
    pub fn in_range(&self, world: &World, config: &SimConfig) -> bool {
        match self {
            Self::Attack(cmd) => cmd.in_range(world),
            Self::Build(cmd) => cmd.in_range(world, config),
            Self::Gather(cmd) => cmd.in_range(world, config),
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self, world: &mut World, config: &SimConfig) -> TickOutcome {
        match self {
            Self::Attack(cmd) => cmd.tick(world, config),
            Self::Build(cmd) => cmd.tick(world, config),
            Self::Gather(cmd) => cmd.tick(world, config),
        }
    }

    /// Make the next tick re-evaluate range and re-route immediately.
    pub fn reactivate(&mut self) {
        let approach = match self {
            Self::Attack(cmd) => &mut cmd.approach,
            Self::Build(cmd) => &mut cmd.approach,
            Self::Gather(cmd) => &mut cmd.approach,
        };
        approach.reroute_in = 0;
    }

    /// Undo broadcast state before the command is dropped.
    pub fn release(&mut self, world: &mut World) {
        match self {
            Self::Attack(cmd) => cmd.engage(world, false),
            Self::Build(cmd) => world.set_working(cmd.actor, false),
            Self::Gather(cmd) => world.set_working(cmd.actor, false),
        }
    }

    /// Walk toward the target now if out of range.
    fn approach_now(&mut self, world: &mut World, config: &SimConfig) {
        if self.in_range(world, config) {
            return;
        }
        let reach = match self {
            Self::Attack(cmd) => match world
                .entity(cmd.actor)
                .and_then(|attacker| attacker.attack_profile())
            {
                Some(profile) => profile.range,
                None => return,
            },
            Self::Build(_) => config.build_range,
            Self::Gather(_) => config.gather_range,
        };
        let (id, actor, target) = (self.id(), self.actor(), self.target());
        let approach = match self {
            Self::Attack(cmd) => &mut cmd.approach,
            Self::Build(cmd) => &mut cmd.approach,
            Self::Gather(cmd) => &mut cmd.approach,
        };
        approach.reroute_in = 0;
        approach.step(world, config, actor, target, id, reach);
    }
}

/// An issuable command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move to a point.
    Move(MoveCommand),
    /// Attack an entity.
    Attack(AttackCommand),
    /// Build a construction site.
    Build(BuildCommand),
    /// Gather from a deposit.
    Gather(GatherCommand),
}

impl Command {
    /// Command id.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        match self {
            Self::Move(cmd) => cmd.id,
            Self::Attack(cmd) => cmd.id,
            Self::Build(cmd) => cmd.id,
            Self::Gather(cmd) => cmd.id,
        }
    }

    /// Acting entity.
    #[must_use]
    pub const fn actor(&self) -> EntityId {
        match self {
            Self::Move(cmd) => cmd.actor,
            Self::Attack(cmd) => cmd.actor,
            Self::Build(cmd) => cmd.actor,
            Self::Gather(cmd) => cmd.actor,
        }
    }

    /// Same command under a different id.
    #[must_use]
    pub fn with_id(mut self, id: CommandId) -> Self {
        match &mut self {
            Self::Move(cmd) => cmd.id = id,
            Self::Attack(cmd) => cmd.id = id,
            Self::Build(cmd) => cmd.id = id,
            Self::Gather(cmd) => cmd.id = id,
        }
        self
    }

    /// Check that the actor can perform the command on its target.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownEntity`] if the actor or target is gone, and
    /// [`GameError::InvalidCapability`] if the actor cannot perform the command
    /// or the target cannot receive it.
    pub fn validate(&self, world: &World) -> Result<()> {
        let actor_id = self.actor();
        let actor = world
            .entity(actor_id)
            .ok_or(GameError::UnknownEntity(actor_id))?;

        match self {
            Self::Move(_) => require(actor_id, actor.has(Capability::Mover), "move"),
            Self::Attack(cmd) => {
                require(actor_id, actor.has(Capability::Attacker), "attack")?;
                let target = world
                    .entity(cmd.target.id)
                    .ok_or(GameError::UnknownEntity(cmd.target.id))?;
                require(
                    actor_id,
                    target.has(Capability::Attackable) && cmd.target.id != actor_id,
                    "attack that target",
                )
            }
            Self::Build(cmd) => {
                require(actor_id, actor.has(Capability::Builder), "build")?;
                let target = world
                    .entity(cmd.target)
                    .ok_or(GameError::UnknownEntity(cmd.target))?;
                require(
                    actor_id,
                    target.as_building().is_some() && target.owner() == actor.owner(),
                    "build that target",
                )
            }
            Self::Gather(cmd) => {
                require(actor_id, actor.has(Capability::Gatherer), "gather")?;
                let target = world
                    .entity(cmd.target)
                    .ok_or(GameError::UnknownEntity(cmd.target))?;
                require(actor_id, target.has(Capability::Gatherable), "gather from that target")
            }
        }
    }

    /// Validate and attach the command to its actor.
    ///
    /// A player move cancels the actor's action and replaces its movement.
    /// An action replaces the previous action and any movement. Executing an
    /// action that is already attached only resets its re-route countdown.
    ///
    /// # Errors
    ///
    /// Whatever [`Command::validate`] reports. Nothing is mutated on error.
    pub fn execute(self, world: &mut World, config: &SimConfig) -> Result<CommandId> {
        self.validate(world)?;
        let id = self.id();
        let actor_id = self.actor();

        let action = match self {
            Self::Move(mut cmd) => {
                let size = world
                    .entity(actor_id)
                    .ok_or(GameError::UnknownEntity(actor_id))?
                    .size();
                cmd.target = world.clamp_position(cmd.target, size);
                if cmd.resume.is_none() {
                    world.cancel_action(actor_id);
                }
                world.attach_movement(cmd);
                return Ok(id);
            }
            Self::Attack(cmd) => {
                let target = world
                    .entity(cmd.target.id)
                    .map(EntityRef::of)
                    .ok_or(GameError::UnknownEntity(cmd.target.id))?;
                ActionCommand::Attack(AttackCommand { target, ..cmd })
            }
            Self::Build(cmd) => ActionCommand::Build(cmd),
            Self::Gather(cmd) => ActionCommand::Gather(cmd),
        };

        if world.resume_action(actor_id, id) {
            return Ok(id);
        }

        world.cancel_action(actor_id);
        world.cancel_movement(actor_id);
        let mut action = action;
        action.approach_now(world, config);
        world.set_action(action);
        Ok(id)
    }
}

fn require(entity: EntityId, ok: bool, action: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(GameError::InvalidCapability { entity, action })
    }
}

/// Commands attached to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingCommands {
    /// Current movement, player-issued or auxiliary.
    pub movement: Option<MoveCommand>,
    /// Current action.
    pub action: Option<ActionCommand>,
}

impl PendingCommands {
    /// Whether nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.movement.is_none() && self.action.is_none()
    }

    /// Whether the pending movement exists only to bring `action` into range.
    #[must_use]
    pub fn movement_serves(&self, action: CommandId) -> bool {
        self.movement
            .as_ref()
            .is_some_and(|movement| movement.resume == Some(action))
    }
}
