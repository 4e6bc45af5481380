//! End-to-end simulation scenarios.
//!
//! These drive the simulation only through requests and ticks, the same way
//! the server does, and check the world and the delta stream afterwards.

use rts_core::config::SimConfig;
use rts_core::delta::{Delta, PropertyChange};
use rts_core::entity::EntityId;
use rts_core::error::GameError;
use rts_core::math::{Fixed, Vec2Fixed};
use rts_core::request::Request;
use rts_core::simulation::Simulation;
use rts_core::types::TypeRegistry;
use rts_core::world::World;
use rts_test_utils::fixtures::{skirmish, tile};

const ARENA_TYPES: &str = r#"(
    units: [
        (name: "striker", hitpoints: 10, speed: 1.0,
         attack: Some((damage: 5, range: 1.0))),
        (name: "dummy", hitpoints: 1, speed: 1.0),
        (name: "worker", hitpoints: 10, speed: 1.0,
         build_speed: Some(10), gather: Some((amount: 10))),
    ],
    buildings: [
        (name: "wall", hitpoints: 100, size: 2, build_resistance: 2),
        (name: "watchtower", hitpoints: 50, attack: Some((damage: 2, range: 3.0, interval: 20))),
    ],
    resources: [
        (name: "ore", amount: 1000),
    ],
)"#;

fn arena() -> Simulation {
    arena_with(SimConfig::default())
}

fn arena_with(config: SimConfig) -> Simulation {
    let registry = TypeRegistry::from_ron_str(ARENA_TYPES).unwrap();
    Simulation::new(World::new(16, 16), registry, config)
}

fn hitpoints(sim: &Simulation, id: EntityId) -> i32 {
    sim.world().entity(id).unwrap().health().unwrap().current
}

fn amount(sim: &Simulation, id: EntityId) -> i32 {
    sim.world().entity(id).unwrap().as_resource().unwrap().amount
}

// =============================================================================
// Combat
// =============================================================================

#[test]
fn test_in_range_attack_kills_and_removes_defender() {
    let mut sim = arena();
    let attacker = sim.spawn_unit("striker", tile(3, 3), 1).unwrap();
    let defender = sim.spawn_unit("dummy", tile(4, 3), 2).unwrap();
    sim.world_mut().take_deltas();

    sim.queue_request(
        1,
        Request::Attack {
            entity: attacker,
            target: defender,
        },
    );
    let report = sim.advance_tick();

    assert!(!sim.world().contains(defender));
    assert_eq!(sim.world().entity(attacker).unwrap().position(), tile(3, 3));

    let start = report
        .deltas
        .iter()
        .position(|d| matches!(d, Delta::AttackState { active: true, .. }));
    let stop = report
        .deltas
        .iter()
        .position(|d| matches!(d, Delta::AttackState { active: false, .. }));
    let removed = report
        .deltas
        .iter()
        .position(|d| matches!(d, Delta::EntityRemoved { entity } if entity.id == defender));
    assert!(start < stop && stop < removed, "{:?}", report.deltas);
}

#[test]
fn test_attacker_in_range_does_not_move() {
    let mut sim = arena();
    let attacker = sim.spawn_unit("striker", tile(3, 3), 1).unwrap();
    let defender = sim.spawn_unit("striker", tile(7, 3), 2).unwrap();

    sim.apply_request(
        1,
        Request::Attack {
            entity: attacker,
            target: defender,
        },
    )
    .unwrap();

    let mut last = sim.world().entity(attacker).unwrap().position();
    let mut engaged_at = None;
    for tick in 0..40 {
        sim.advance_tick();
        let Some(entity) = sim.world().entity(attacker) else {
            break;
        };
        let target = sim.world().entity(defender);
        let in_range =
            target.is_some_and(|t| entity.footprint().within_range(&t.footprint(), Fixed::from_num(1)));
        if engaged_at.is_some() {
            assert_eq!(entity.position(), last, "moved while in range at tick {tick}");
        }
        if in_range && engaged_at.is_none() {
            engaged_at = Some(tick);
        }
        last = entity.position();
    }
    assert!(engaged_at.is_some());
    assert!(!sim.world().contains(defender));
}

#[test]
fn test_damage_respects_resistance_and_interval() {
    let (mut sim, ids) = skirmish();
    // Swordsmen hit archers for 6 pierce; archers have no resistance.
    let archer = ids.archers[0];
    let swordsman = sim.spawn_unit("swordsman", tile(23, 20), 1).unwrap();
    sim.apply_request(
        1,
        Request::Attack {
            entity: swordsman,
            target: archer,
        },
    )
    .unwrap();
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, archer), 24);
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, archer), 18);

    // Archers hit the town centre (60% pierce resistance) every second tick.
    let tc = ids.town_center;
    let raider = sim.spawn_unit("archer", tile(5, 2), 2).unwrap();
    sim.apply_request(
        2,
        Request::Attack {
            entity: raider,
            target: tc,
        },
    )
    .unwrap();
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, tc), 1200 - 1);
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, tc), 1200 - 1);
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, tc), 1200 - 2);
}

#[test]
fn test_tower_gives_up_when_target_leaves_range() {
    let mut sim = arena();
    let tower = sim.spawn_building("watchtower", tile(2, 2), 1).unwrap();
    let target = sim.spawn_unit("striker", tile(4, 2), 2).unwrap();

    sim.apply_request(1, Request::Attack { entity: tower, target }).unwrap();
    sim.advance_tick();
    assert_eq!(hitpoints(&sim, target), 8);

    sim.apply_request(
        2,
        Request::Move {
            entity: target,
            target: tile(14, 14),
        },
    )
    .unwrap();
    for _ in 0..80 {
        sim.advance_tick();
    }
    let tower_entity = sim.world().entity(tower).unwrap();
    assert!(tower_entity.commands().unwrap().action.is_none());
    assert!(!tower_entity.flags().working);
}

#[test]
fn test_attack_requires_capability() {
    let mut sim = arena();
    let dummy = sim.spawn_unit("dummy", tile(1, 1), 1).unwrap();
    let other = sim.spawn_unit("dummy", tile(2, 1), 2).unwrap();
    assert_eq!(
        sim.apply_request(
            1,
            Request::Attack {
                entity: dummy,
                target: other,
            },
        ),
        Err(GameError::InvalidCapability {
            entity: dummy,
            action: "attack",
        })
    );
    assert!(sim.apply_request(1, Request::Attack { entity: dummy, target: 999 })
        .unwrap_err()
        .is_invalid_reference());
}

/// Ticks on which a striker chasing a fleeing target re-issued its approach.
fn reroute_ticks(config: SimConfig, ticks: u32) -> Vec<u32> {
    let mut sim = arena_with(config);
    let attacker = sim.spawn_unit("striker", tile(1, 1), 1).unwrap();
    let runner = sim.spawn_unit("dummy", tile(6, 1), 2).unwrap();
    sim.apply_request(
        1,
        Request::Attack {
            entity: attacker,
            target: runner,
        },
    )
    .unwrap();
    sim.apply_request(
        2,
        Request::Move {
            entity: runner,
            target: tile(15, 1),
        },
    )
    .unwrap();

    let approach = |sim: &Simulation| {
        sim.world()
            .entity(attacker)
            .and_then(|e| e.commands())
            .and_then(|c| c.movement.clone())
            .unwrap()
    };
    let mut previous = approach(&sim);
    let mut rerouted = Vec::new();
    for tick in 1..=ticks {
        sim.advance_tick();
        let current = approach(&sim);
        if current != previous {
            assert_ne!(current.id, previous.id);
            assert_ne!(current.target, previous.target, "re-route at tick {tick} kept its goal");
            rerouted.push(tick);
        }
        previous = current;
    }
    rerouted
}

#[test]
fn test_chasing_attacker_reroutes_on_cadence() {
    let config = SimConfig {
        reroute_interval: 3,
        ..SimConfig::default()
    };
    assert_eq!(reroute_ticks(config, 12), vec![3, 6, 9, 12]);
    assert_eq!(reroute_ticks(SimConfig::default(), 20), vec![10, 20]);
}

#[test]
fn test_action_ends_when_target_vanishes() {
    let mut sim = arena();
    let attacker = sim.spawn_unit("striker", tile(3, 3), 1).unwrap();
    let defender = sim.spawn_unit("dummy", tile(10, 3), 2).unwrap();
    let worker = sim.spawn_unit("worker", tile(1, 12), 1).unwrap();
    let ore = sim.spawn_resource("ore", tile(12, 12)).unwrap();
    sim.apply_request(
        1,
        Request::Attack {
            entity: attacker,
            target: defender,
        },
    )
    .unwrap();
    sim.apply_request(
        1,
        Request::Gather {
            entity: worker,
            target: ore,
        },
    )
    .unwrap();

    // Removed behind the commands' backs, without cancelling them first.
    sim.world_mut().remove(defender).unwrap();
    sim.world_mut().remove(ore).unwrap();
    sim.world_mut().take_deltas();

    let report = sim.advance_tick();
    for id in [attacker, worker] {
        let entity = sim.world().entity(id).unwrap();
        assert!(entity.commands().unwrap().is_idle(), "entity {id} kept a command");
        assert!(!entity.flags().working);
    }
    assert!(
        !report
            .deltas
            .iter()
            .any(|d| matches!(d, Delta::AttackState { .. })),
        "{:?}",
        report.deltas
    );
}

// =============================================================================
// Gathering
// =============================================================================

#[test]
fn test_gather_exhausts_deposit_exactly() {
    let mut sim = arena();
    let worker = sim.spawn_unit("worker", tile(3, 3), 1).unwrap();
    let ore = sim.spawn_resource("ore", tile(5, 5)).unwrap();

    sim.apply_request(
        1,
        Request::Gather {
            entity: worker,
            target: ore,
        },
    )
    .unwrap();

    let mut previous = amount(&sim, ore);
    for _ in 0..400 {
        sim.advance_tick();
        let now = amount(&sim, ore);
        assert!(now <= previous);
        assert!(now >= 0);
        previous = now;
    }
    assert_eq!(amount(&sim, ore), 0);
    assert_eq!(sim.world().stock(1, "ore"), 1000);
    assert!(sim.world().entity(worker).unwrap().commands().unwrap().is_idle());

    sim.apply_request(
        1,
        Request::Gather {
            entity: worker,
            target: ore,
        },
    )
    .unwrap();
    for _ in 0..5 {
        sim.advance_tick();
    }
    assert_eq!(amount(&sim, ore), 0);
    assert_eq!(sim.world().stock(1, "ore"), 1000);
}

#[test]
fn test_several_gatherers_never_overdraw() {
    let mut sim = arena();
    let ore = sim.spawn_resource("ore", tile(8, 8)).unwrap();
    let workers: Vec<_> = [tile(6, 8), tile(10, 8), tile(8, 6)]
        .into_iter()
        .map(|at| sim.spawn_unit("worker", at, 1).unwrap())
        .collect();
    for &worker in &workers {
        sim.queue_request(
            1,
            Request::Gather {
                entity: worker,
                target: ore,
            },
        );
    }
    for _ in 0..200 {
        sim.advance_tick();
    }
    assert_eq!(amount(&sim, ore), 0);
    assert_eq!(sim.world().stock(1, "ore"), 1000);
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_build_raises_site_until_complete() {
    let mut sim = arena();
    let worker = sim.spawn_unit("worker", tile(1, 1), 1).unwrap();
    sim.apply_request(
        1,
        Request::PlaceBuilding {
            building_type: "wall".into(),
            position: tile(6, 1),
        },
    )
    .unwrap();
    let site = sim.world().entity_at(tile(6, 1) + tile(1, 1)).unwrap();
    assert_eq!(hitpoints(&sim, site), 1);

    sim.apply_request(
        1,
        Request::Build {
            entity: worker,
            target: site,
        },
    )
    .unwrap();

    let mut previous = 1;
    let mut finished = false;
    for _ in 0..200 {
        let report = sim.advance_tick();
        let now = hitpoints(&sim, site);
        assert!(now >= previous);
        previous = now;
        if report.deltas.iter().any(|d| {
            matches!(
                d,
                Delta::PropertyChanged {
                    change: PropertyChange::Built(true),
                    ..
                }
            )
        }) {
            finished = true;
            break;
        }
    }
    assert!(finished);
    assert_eq!(hitpoints(&sim, site), 100);
    assert!(sim.world().entity(site).unwrap().as_building().unwrap().built);
}

#[test]
fn test_move_mid_build_halts_construction() {
    let mut sim = arena();
    let worker = sim.spawn_unit("worker", tile(4, 1), 1).unwrap();
    sim.apply_request(
        1,
        Request::PlaceBuilding {
            building_type: "wall".into(),
            position: tile(5, 1),
        },
    )
    .unwrap();
    let site = sim.world().entity_at(tile(6, 2)).unwrap();
    sim.apply_request(
        1,
        Request::Build {
            entity: worker,
            target: site,
        },
    )
    .unwrap();
    for _ in 0..3 {
        sim.advance_tick();
    }
    let progress = hitpoints(&sim, site);
    assert_eq!(progress, 1 + 3 * 5);

    sim.apply_request(
        1,
        Request::Move {
            entity: worker,
            target: tile(4, 10),
        },
    )
    .unwrap();
    for _ in 0..20 {
        sim.advance_tick();
    }
    assert_eq!(hitpoints(&sim, site), progress);
    assert!(!sim.world().entity(site).unwrap().as_building().unwrap().built);
}

// =============================================================================
// Economy requests
// =============================================================================

#[test]
fn test_training_needs_finished_trainer_and_funds() {
    let (mut sim, ids) = skirmish();
    // Three peasants at 50 gold each out of 500.
    for _ in 0..3 {
        sim.apply_request(
            1,
            Request::Train {
                building: ids.town_center,
                unit_type: "peasant".into(),
            },
        )
        .unwrap();
    }
    assert_eq!(sim.world().stock(1, "gold"), 350);
    assert!(matches!(
        sim.apply_request(
            1,
            Request::Train {
                building: ids.town_center,
                unit_type: "archer".into(),
            },
        ),
        Err(GameError::InvalidCapability { .. })
    ));

    let before = sim.world().len();
    for _ in 0..45 {
        sim.advance_tick();
    }
    assert_eq!(sim.world().len(), before + 3);
}

#[test]
fn test_research_once_per_player() {
    let (mut sim, _) = skirmish();
    sim.apply_request(1, Request::Research { tech: "masonry".into() }).unwrap();
    assert_eq!(sim.world().stock(1, "stone"), 400);
    assert!(matches!(
        sim.apply_request(1, Request::Research { tech: "masonry".into() }),
        Err(GameError::AlreadyResearched { .. })
    ));
    sim.apply_request(2, Request::Research { tech: "masonry".into() }).unwrap();

    let deltas = sim.advance_tick().deltas;
    let researched: Vec<_> = deltas
        .iter()
        .filter_map(|d| match d {
            Delta::TechnologyResearched { player, tech } => Some((*player, tech.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(researched, vec![(1, "masonry"), (2, "masonry")]);
}

#[test]
fn test_mine_must_sit_on_gold() {
    let (mut sim, ids) = skirmish();
    assert!(matches!(
        sim.apply_request(
            1,
            Request::PlaceBuilding {
                building_type: "gold_mine".into(),
                position: tile(20, 3),
            },
        ),
        Err(GameError::PlacementBlocked(_))
    ));
    assert_eq!(sim.world().stock(1, "wood"), 500);

    sim.apply_request(
        1,
        Request::PlaceBuilding {
            building_type: "gold_mine".into(),
            position: tile(15, 15),
        },
    )
    .unwrap();
    let mine = sim
        .world()
        .entities()
        .find(|e| e.type_name() == "gold_mine")
        .unwrap();
    assert_eq!(mine.as_building().unwrap().resource_under, Some(ids.gold));
    assert_eq!(sim.world().stock(1, "wood"), 425);
    assert!(sim.world().contains(ids.gold));
}

// =============================================================================
// Request validation
// =============================================================================

#[test]
fn test_unrepresentable_positions_are_rejected() {
    let mut sim = arena();
    let worker = sim.spawn_unit("worker", tile(1, 1), 1).unwrap();
    sim.world_mut().take_deltas();
    let before = sim.world().len();

    let far = [
        Vec2Fixed::new(Fixed::from_num(2_147_483_647), Fixed::ZERO),
        Vec2Fixed::new(Fixed::ZERO, Fixed::MAX),
        Vec2Fixed::new(Fixed::MAX, Fixed::MAX),
        Vec2Fixed::new(Fixed::MIN, Fixed::ZERO),
    ];
    for position in far {
        assert!(sim
            .apply_request(
                1,
                Request::PlaceBuilding {
                    building_type: "wall".into(),
                    position,
                },
            )
            .is_err());
        sim.queue_request(
            1,
            Request::PlaceBuilding {
                building_type: "wall".into(),
                position,
            },
        );
    }
    let report = sim.advance_tick();
    assert_eq!(sim.world().len(), before);
    assert!(report.deltas.is_empty(), "{:?}", report.deltas);

    // A move toward the edge of the number line is clamped to the map.
    sim.apply_request(
        1,
        Request::Move {
            entity: worker,
            target: Vec2Fixed::new(Fixed::MAX, Fixed::MAX),
        },
    )
    .unwrap();
    for _ in 0..5 {
        sim.advance_tick();
    }
    let position = sim.world().entity(worker).unwrap().position();
    assert!(position.x < Fixed::from_num(16) && position.y < Fixed::from_num(16));
}

#[test]
fn test_rejected_requests_leave_no_trace() {
    let setup = || {
        let mut sim = arena();
        let striker = sim.spawn_unit("striker", tile(1, 1), 1).unwrap();
        let dummy = sim.spawn_unit("dummy", tile(3, 1), 1).unwrap();
        let ore = sim.spawn_resource("ore", tile(6, 6)).unwrap();
        (sim, striker, dummy, ore)
    };

    let (mut noisy, striker, dummy, ore) = setup();
    let rejected = [
        Request::Attack {
            entity: dummy,
            target: striker,
        },
        Request::Gather {
            entity: striker,
            target: ore,
        },
        Request::Build {
            entity: striker,
            target: ore,
        },
    ];
    for request in rejected {
        assert!(matches!(
            noisy.apply_request(1, request),
            Err(GameError::InvalidCapability { .. })
        ));
    }

    let (mut quiet, ..) = setup();
    for sim in [&mut noisy, &mut quiet] {
        sim.apply_request(
            1,
            Request::Move {
                entity: striker,
                target: tile(5, 1),
            },
        )
        .unwrap();
    }

    let movement_id = |sim: &Simulation| {
        sim.world()
            .entity(striker)
            .and_then(|e| e.commands())
            .and_then(|c| c.movement.as_ref())
            .map(|m| m.id)
    };
    assert_eq!(movement_id(&noisy), movement_id(&quiet));
    assert_eq!(noisy.world().snapshot().unwrap(), quiet.world().snapshot().unwrap());
}
