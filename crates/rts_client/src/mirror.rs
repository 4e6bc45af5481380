//! Client-side mirror of the world.
//!
//! Rebuilt purely from the server's delta stream, applied in arrival order.
//! A new entity is seeded from the local type tables (full hitpoints,
//! finished, full deposit) and the server follows up with corrections
//! where it differs. Lines naming an id the mirror does not know are
//! ignored: they refer to something already removed or never seen.

use std::collections::{BTreeMap, BTreeSet};

use rts_core::delta::{Delta, EntityRef, PropertyChange};
use rts_core::entity::{EntityCategory, EntityId, PlayerId};
use rts_core::math::Vec2Fixed;
use rts_core::types::TypeRegistry;
use rts_net::protocol::ServerMessage;
use rts_net::ProtocolError;
use tracing::{debug, trace};

/// One mirrored entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredEntity {
    /// Id assigned by the server.
    pub id: EntityId,
    /// Unit, building or resource.
    pub category: EntityCategory,
    /// Type name.
    pub type_name: String,
    /// Top-left corner.
    pub position: Vec2Fixed,
    /// Owning player.
    pub owner: PlayerId,
    /// Current hitpoints (0 for deposits).
    pub hitpoints: i32,
    /// Construction finished.
    pub built: bool,
    /// Remaining quantity (deposits only).
    pub amount: i32,
    /// Working animation flag.
    pub attacking: bool,
    /// Walking animation flag.
    pub moving: bool,
}

/// Read-only shadow of the authoritative world.
#[derive(Debug, Clone)]
pub struct Mirror {
    registry: TypeRegistry,
    entities: BTreeMap<EntityId, MirroredEntity>,
    attacks: BTreeSet<(EntityId, EntityId)>,
    stock: BTreeMap<(PlayerId, String), i64>,
    technologies: BTreeSet<(PlayerId, String)>,
    ticks: u64,
}

impl Mirror {
    /// Empty mirror using `registry` for seeding.
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            entities: BTreeMap::new(),
            attacks: BTreeSet::new(),
            stock: BTreeMap::new(),
            technologies: BTreeSet::new(),
            ticks: 0,
        }
    }

    /// Parse and apply one line.
    pub fn apply_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let message: ServerMessage = line.parse()?;
        self.apply(&message);
        Ok(())
    }

    /// Apply one message.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Tick => self.ticks += 1,
            ServerMessage::Delta(delta) => self.apply_delta(delta),
        }
    }

    fn apply_delta(&mut self, delta: &Delta) {
        match delta {
            Delta::EntityAdded {
                entity,
                name,
                position,
                owner,
            } => {
                let seeded = self.seed(*entity, name, *position, *owner);
                self.entities.insert(entity.id, seeded);
            }
            Delta::EntityRemoved { entity } => {
                if self.entities.remove(&entity.id).is_none() {
                    trace!(id = entity.id, "remove for unknown entity");
                }
                self.attacks
                    .retain(|&(attacker, defender)| attacker != entity.id && defender != entity.id);
            }
            Delta::PropertyChanged { entity, change } => {
                let Some(mirrored) = self.entities.get_mut(&entity.id) else {
                    trace!(id = entity.id, "change for unknown entity");
                    return;
                };
                match *change {
                    PropertyChange::Hitpoints(d) => mirrored.hitpoints += d,
                    PropertyChange::X(d) => mirrored.position.x += d,
                    PropertyChange::Y(d) => mirrored.position.y += d,
                    PropertyChange::AttackAnimation(on) => mirrored.attacking = on,
                    PropertyChange::MoveAnimation(on) => mirrored.moving = on,
                    PropertyChange::Built(on) => mirrored.built = on,
                    PropertyChange::ResourceAmount(d) => mirrored.amount += d,
                }
            }
            Delta::AttackState {
                attacker,
                defender,
                active,
            } => self.set_attack(*attacker, *defender, *active),
            Delta::TechnologyResearched { player, tech } => {
                self.technologies.insert((*player, tech.clone()));
            }
            Delta::StockChanged {
                player,
                resource,
                delta,
            } => {
                *self.stock.entry((*player, resource.clone())).or_insert(0) += delta;
            }
        }
    }

    fn set_attack(&mut self, attacker: EntityRef, defender: EntityRef, active: bool) {
        let pair = (attacker.id, defender.id);
        if !active {
            self.attacks.remove(&pair);
        } else if self.entities.contains_key(&attacker.id) && self.entities.contains_key(&defender.id) {
            self.attacks.insert(pair);
        }
    }

    fn seed(
        &self,
        entity: EntityRef,
        name: &str,
        position: Vec2Fixed,
        owner: PlayerId,
    ) -> MirroredEntity {
        let (hitpoints, amount) = match entity.category {
            EntityCategory::Unit => (self.registry.unit(name).map(|ty| ty.hitpoints), Some(0)),
            EntityCategory::Building => {
                (self.registry.building(name).map(|ty| ty.hitpoints), Some(0))
            }
            EntityCategory::Resource => (Some(0), self.registry.resource(name).map(|ty| ty.amount)),
        };
        if hitpoints.is_none() || amount.is_none() {
            debug!(id = entity.id, name, "no local type for mirrored entity");
        }
        MirroredEntity {
            id: entity.id,
            category: entity.category,
            type_name: name.to_string(),
            position,
            owner,
            hitpoints: hitpoints.unwrap_or(0),
            built: true,
            amount: amount.unwrap_or(0),
            attacking: false,
            moving: false,
        }
    }

    /// Mirrored entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&MirroredEntity> {
        self.entities.get(&id)
    }

    /// All mirrored entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &MirroredEntity> {
        self.entities.values()
    }

    /// Number of mirrored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is mirrored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// A player's stockpile of `resource`.
    #[must_use]
    pub fn stock(&self, player: PlayerId, resource: &str) -> i64 {
        self.stock
            .get(&(player, resource.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `player` has researched `tech`.
    #[must_use]
    pub fn has_researched(&self, player: PlayerId, tech: &str) -> bool {
        self.technologies.contains(&(player, tech.to_string()))
    }

    /// Whether `attacker` is currently hitting `defender`.
    #[must_use]
    pub fn is_attacking(&self, attacker: EntityId, defender: EntityId) -> bool {
        self.attacks.contains(&(attacker, defender))
    }

    /// `tick` markers seen so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Type tables used for seeding.
    #[must_use]
    pub const fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use rts_test_utils::fixtures::{fixed_f, sample_registry};

    use super::*;

    fn mirror_with(lines: &[&str]) -> Mirror {
        let mut mirror = Mirror::new(sample_registry());
        for line in lines {
            mirror.apply_line(line).unwrap();
        }
        mirror
    }

    #[test]
    fn test_add_seeds_from_type_tables() {
        let mirror = mirror_with(&["add 0 1 archer 2 3.5 1", "add 2 2 gold 10 10 0"]);
        let archer = mirror.entity(1).unwrap();
        assert_eq!(archer.hitpoints, 30);
        assert_eq!(archer.position, Vec2Fixed::new(fixed_f(2.0), fixed_f(3.5)));
        assert!(archer.built);
        assert_eq!(mirror.entity(2).unwrap().amount, 1000);
    }

    #[test]
    fn test_site_correction_after_add() {
        let mirror = mirror_with(&["add 1 5 barracks 4 4 2", "chg 1 5 0 -399", "chg 1 5 5 0"]);
        let site = mirror.entity(5).unwrap();
        assert_eq!(site.hitpoints, 1);
        assert!(!site.built);
    }

    #[test]
    fn test_numeric_changes_are_additive() {
        let split = mirror_with(&["add 0 1 swordsman 0 0 1", "chg 0 1 0 5", "chg 0 1 0 -3"]);
        let once = mirror_with(&["add 0 1 swordsman 0 0 1", "chg 0 1 0 2"]);
        assert_eq!(split.entity(1), once.entity(1));
        assert_eq!(once.entity(1).unwrap().hitpoints, 62);
    }

    #[test]
    fn test_flags_are_set_not_added() {
        let mirror = mirror_with(&["add 0 1 peasant 0 0 1", "chg 0 1 4 1", "chg 0 1 4 1"]);
        assert!(mirror.entity(1).unwrap().moving);
        let mirror = mirror_with(&["add 0 1 peasant 0 0 1", "chg 0 1 4 1", "chg 0 1 4 0"]);
        assert!(!mirror.entity(1).unwrap().moving);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let mut mirror = mirror_with(&["add 0 1 peasant 0 0 1", "del 0 1"]);
        mirror.apply_line("chg 0 1 0 -5").unwrap();
        mirror.apply_line("del 0 1").unwrap();
        mirror.apply_line("atk 0 1 0 9 1").unwrap();
        assert!(mirror.is_empty());
        assert!(!mirror.is_attacking(1, 9));
    }

    #[test]
    fn test_attack_state_tracks_pairs() {
        let mut mirror = mirror_with(&[
            "add 0 1 swordsman 0 0 1",
            "add 0 2 archer 1 0 2",
            "atk 0 1 0 2 1",
        ]);
        assert!(mirror.is_attacking(1, 2));
        mirror.apply_line("del 0 2").unwrap();
        assert!(!mirror.is_attacking(1, 2));
    }

    #[test]
    fn test_player_tables() {
        let mirror = mirror_with(&[
            "stock 1 gold 500",
            "stock 1 gold -40",
            "tech 2 masonry",
            "tick",
            "tick",
        ]);
        assert_eq!(mirror.stock(1, "gold"), 460);
        assert_eq!(mirror.stock(2, "gold"), 0);
        assert!(mirror.has_researched(2, "masonry"));
        assert!(!mirror.has_researched(1, "masonry"));
        assert_eq!(mirror.ticks(), 2);
    }

    #[test]
    fn test_unknown_type_seeds_zero() {
        let mirror = mirror_with(&["add 0 3 dragon 0 0 1"]);
        assert_eq!(mirror.entity(3).unwrap().hitpoints, 0);
    }

    #[test]
    fn test_bad_line_is_an_error() {
        let mut mirror = Mirror::new(sample_registry());
        assert!(mirror.apply_line("chg 0 1").is_err());
    }
}
