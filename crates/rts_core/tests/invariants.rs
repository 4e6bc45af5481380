//! Property tests for the invariants the rest of the engine leans on.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rts_core::math::{step_toward, Vec2Fixed};
use rts_core::spatial::tiles_of;
use rts_core::types::{DamageType, Resistances};
use rts_core::world::World;
use rts_test_utils::determinism::strategies::{arb_budget, arb_position};
use rts_test_utils::fixtures::{fixed_f, sample_registry, tile};

const MAP: u32 = 24;

/// Every entity is indexed on exactly its footprint tiles and nothing else
/// is indexed at all.
fn assert_index_matches(world: &World) {
    let mut expected = BTreeSet::new();
    for entity in world.entities() {
        for t in tiles_of(&entity.footprint()) {
            assert!(
                world.tile_index().contains(t, entity.id()),
                "entity {} missing from {t:?}",
                entity.id()
            );
            expected.insert((t, entity.id()));
        }
    }
    let actual: BTreeSet<_> = world
        .tile_index()
        .iter()
        .flat_map(|(t, ids)| ids.iter().map(move |id| (*t, *id)))
        .collect();
    assert_eq!(actual, expected);
}

proptest! {
    #[test]
    fn prop_step_never_exceeds_budget(
        from in arb_position(MAP, MAP, 0),
        to in arb_position(MAP, MAP, 0),
        budget in arb_budget(),
    ) {
        let (next, arrived) = step_toward(from, to, budget);
        prop_assert!(from.manhattan_distance(next) <= budget);
        if arrived {
            prop_assert_eq!(next, to);
        } else {
            prop_assert!(next.manhattan_distance(to) < from.manhattan_distance(to));
        }
    }

    #[test]
    fn prop_repeated_steps_arrive_exactly(
        from in arb_position(MAP, MAP, 0),
        to in arb_position(MAP, MAP, 0),
        budget in arb_budget(),
    ) {
        let mut at = from;
        let limit = (from.manhattan_distance(to) / budget).to_num::<u32>() + 2;
        let mut arrived = false;
        for _ in 0..limit {
            let (next, done) = step_toward(at, to, budget);
            at = next;
            if done {
                arrived = true;
                break;
            }
        }
        prop_assert!(arrived);
        prop_assert_eq!(at, to);
    }

    #[test]
    fn prop_index_tracks_random_moves(
        spawns in prop::collection::vec(arb_position(MAP, MAP, 1), 1..12),
        moves in prop::collection::vec((0usize..12, arb_position(MAP, MAP, 1)), 0..60),
        removals in prop::collection::vec(0usize..12, 0..4),
    ) {
        let registry = sample_registry();
        let peasant = registry.unit("peasant").unwrap().clone();
        let mut world = World::new(MAP, MAP);
        let ids: Vec<_> = spawns
            .into_iter()
            .map(|at| world.spawn_unit(peasant.clone(), at, 1).unwrap())
            .collect();
        assert_index_matches(&world);

        for (pick, to) in moves {
            let id = ids[pick % ids.len()];
            world.move_entity(id, to).unwrap();
        }
        assert_index_matches(&world);

        for pick in removals {
            let _ = world.remove(ids[pick % ids.len()]);
        }
        assert_index_matches(&world);
        for entity in world.entities() {
            let hits = world.entities_in_rect(&entity.footprint());
            prop_assert!(hits.contains(&entity.id()));
            let unique: BTreeSet<_> = hits.iter().collect();
            prop_assert_eq!(unique.len(), hits.len());
        }
    }

    #[test]
    fn prop_mitigation_never_amplifies(
        damage in 0u32..10_000,
        percent in 0u8..=255,
    ) {
        let resist = Resistances::none().with(DamageType::Crush, percent);
        let taken = resist.mitigate(damage, DamageType::Crush);
        prop_assert!(taken <= damage);
        prop_assert_eq!(resist.mitigate(damage, DamageType::Fire), damage);
        if percent >= 100 {
            prop_assert_eq!(taken, 0);
        }
    }
}

#[test]
fn test_out_of_bounds_move_leaves_index_untouched() {
    let registry = sample_registry();
    let mut world = World::new(8, 8);
    let id = world
        .spawn_unit(registry.unit("archer").unwrap().clone(), tile(6, 6), 1)
        .unwrap();
    let beyond = Vec2Fixed::new(fixed_f(7.5), fixed_f(6.0));
    assert!(world.move_entity(id, beyond).is_err());
    assert_eq!(world.entity(id).unwrap().position(), tile(6, 6));
    assert_index_matches(&world);
}
