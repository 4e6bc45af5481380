//! Mirror fed straight from a simulation's delta stream, no sockets.

use proptest::prelude::*;
use rts_client::mirror::Mirror;
use rts_core::request::Request;
use rts_core::simulation::Simulation;
use rts_net::protocol::ServerMessage;
use rts_test_utils::determinism::strategies::arb_request_stream;
use rts_test_utils::fixtures::{empty_simulation, sample_registry, tile};

/// Encode every delta to its wire line and apply it, then the tick marker.
fn replay(sim: &mut Simulation, mirror: &mut Mirror) {
    let report = sim.advance_tick();
    for delta in report.deltas {
        let line = ServerMessage::Delta(delta).to_string();
        mirror.apply_line(&line).unwrap();
    }
    mirror.apply_line("tick").unwrap();
}

fn assert_matches(sim: &Simulation, mirror: &Mirror) {
    let world = sim.world();
    assert_eq!(mirror.len(), world.len());
    for entity in world.entities() {
        let shadow = mirror.entity(entity.id()).unwrap();
        assert_eq!(shadow.position, entity.position());
        if let Some(health) = entity.health() {
            assert_eq!(shadow.hitpoints, health.current);
        }
        if let Some(resource) = entity.as_resource() {
            assert_eq!(shadow.amount, resource.amount);
        }
        if let Some(building) = entity.as_building() {
            assert_eq!(shadow.built, building.built);
        }
    }
}

fn battlefield() -> Simulation {
    let mut sim = empty_simulation(20, 20);
    for player in [1, 2] {
        sim.world_mut().credit(player, "wood", 400);
        sim.world_mut().credit(player, "gold", 400);
    }
    sim.spawn_unit("peasant", tile(2, 2), 1).unwrap();
    sim.spawn_unit("swordsman", tile(6, 6), 1).unwrap();
    sim.spawn_unit("archer", tile(12, 6), 2).unwrap();
    sim.spawn_unit("peasant", tile(15, 15), 2).unwrap();
    sim.spawn_resource("wood", tile(4, 2)).unwrap();
    sim
}

#[test]
fn test_scripted_game_replays_exactly() {
    let mut sim = battlefield();
    let mut mirror = Mirror::new(sample_registry());
    replay(&mut sim, &mut mirror);
    assert_matches(&sim, &mirror);

    let commands = [
        (1, Request::Gather { entity: 1, target: 5 }),
        (1, Request::Attack { entity: 2, target: 3 }),
        (2, Request::Move { entity: 4, target: tile(10, 10) }),
        (
            2,
            Request::PlaceBuilding {
                building_type: "barracks".into(),
                position: tile(16, 2),
            },
        ),
        (2, Request::Build { entity: 4, target: 6 }),
    ];
    for (player, request) in commands {
        sim.queue_request(player, request);
    }
    for _ in 0..80 {
        replay(&mut sim, &mut mirror);
    }
    assert_matches(&sim, &mirror);
    assert_eq!(mirror.ticks(), 81);
    assert_eq!(mirror.stock(1, "wood"), sim.world().stock(1, "wood"));
}

proptest! {
    #[test]
    fn prop_hitpoint_deltas_compose(deltas in prop::collection::vec(-40i32..40, 0..20)) {
        let registry = sample_registry();
        let mut stepwise = Mirror::new(registry.clone());
        let mut summed = Mirror::new(registry);
        stepwise.apply_line("add 0 1 swordsman 0 0 1").unwrap();
        summed.apply_line("add 0 1 swordsman 0 0 1").unwrap();

        for d in &deltas {
            stepwise.apply_line(&format!("chg 0 1 0 {d}")).unwrap();
        }
        let total: i32 = deltas.iter().sum();
        summed.apply_line(&format!("chg 0 1 0 {total}")).unwrap();

        prop_assert_eq!(stepwise.entity(1), summed.entity(1));
    }

    #[test]
    fn prop_random_requests_replay(requests in arb_request_stream(8, 20)) {
        let mut sim = battlefield();
        let mut mirror = Mirror::new(sample_registry());
        for (_, player, request) in requests {
            sim.queue_request(player, request);
            replay(&mut sim, &mut mirror);
        }
        for _ in 0..5 {
            replay(&mut sim, &mut mirror);
        }
        assert_matches(&sim, &mirror);
    }
}
