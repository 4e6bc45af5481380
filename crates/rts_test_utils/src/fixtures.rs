//! Test fixtures and helpers.
//!
//! Pre-built type tables and game states for consistent testing.

use fixed::types::I32F32;
use rts_core::config::SimConfig;
use rts_core::entity::EntityId;
use rts_core::math::Vec2Fixed;
use rts_core::simulation::Simulation;
use rts_core::types::TypeRegistry;
use rts_core::world::World;

/// Type tables shared by tests across the workspace.
///
/// Decimals are written with a fractional part so they parse as `f64`.
pub const SAMPLE_TYPES: &str = r#"(
    units: [
        (
            name: "swordsman",
            hitpoints: 60,
            speed: 1.0,
            attack: Some((damage: 6, damage_type: Pierce, range: 1.0, interval: 1)),
            resistances: {Pierce: 20},
            cost: {"gold": 40},
            train_ticks: 20,
        ),
        (
            name: "archer",
            hitpoints: 30,
            speed: 1.5,
            attack: Some((damage: 4, damage_type: Pierce, range: 4.0, interval: 2)),
            cost: {"gold": 30, "wood": 20},
            train_ticks: 25,
        ),
        (
            name: "peasant",
            hitpoints: 25,
            speed: 1.0,
            build_speed: Some(10),
            gather: Some((amount: 10, interval: 1)),
            cost: {"gold": 50},
            train_ticks: 15,
        ),
    ],
    buildings: [
        (
            name: "town_center",
            hitpoints: 1200,
            size: 3,
            build_resistance: 4,
            trains: ["peasant"],
            resistances: {Pierce: 60},
        ),
        (
            name: "barracks",
            hitpoints: 400,
            size: 2,
            build_resistance: 2,
            trains: ["swordsman", "archer"],
            cost: {"wood": 150},
        ),
        (
            name: "tower",
            hitpoints: 300,
            size: 1,
            build_resistance: 3,
            attack: Some((damage: 8, damage_type: Pierce, range: 5.0, interval: 3)),
            cost: {"wood": 100, "stone": 50},
        ),
        (
            name: "gold_mine",
            hitpoints: 250,
            size: 2,
            built_on: Some("gold"),
            cost: {"wood": 75},
        ),
    ],
    resources: [
        (name: "gold", amount: 1000, size: 2),
        (name: "wood", amount: 400, size: 1),
        (name: "stone", amount: 600, size: 1),
    ],
    technologies: [
        (name: "masonry", cost: {"stone": 100}),
        (name: "fletching", cost: {"wood": 50, "gold": 50}),
    ],
)"#;

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Position at integer tile coordinates.
#[must_use]
pub fn tile(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_tiles(x, y)
}

/// Registry parsed from [`SAMPLE_TYPES`].
///
/// # Panics
///
/// Panics if the sample tables stop parsing.
#[must_use]
pub fn sample_registry() -> TypeRegistry {
    TypeRegistry::from_ron_str(SAMPLE_TYPES).expect("sample type tables parse")
}

/// Empty simulation on a grass map using the sample types.
#[must_use]
pub fn empty_simulation(width: u32, height: u32) -> Simulation {
    Simulation::new(
        World::new(width, height),
        sample_registry(),
        SimConfig::default(),
    )
}

/// Entity ids of a [`skirmish`] setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Skirmish {
    /// Player 1's town centre.
    pub town_center: EntityId,
    /// Player 1's worker.
    pub peasant: EntityId,
    /// Player 1's fighters.
    pub swordsmen: [EntityId; 2],
    /// Player 2's archers.
    pub archers: [EntityId; 2],
    /// Gold deposit between the bases.
    pub gold: EntityId,
}

/// Two players on a 32x32 map: a small base with a worker for player 1,
/// fighters on both sides, and a gold deposit in the middle. Every player
/// starts with 500 of each resource. Nothing is commanded yet.
///
/// # Panics
///
/// Panics if the fixed layout stops fitting on the map.
#[must_use]
pub fn skirmish() -> (Simulation, Skirmish) {
    let mut sim = empty_simulation(32, 32);
    let setup = sim.world_mut();
    for player in [1, 2] {
        for resource in ["gold", "wood", "stone"] {
            setup.credit(player, resource, 500);
        }
    }

    let ids = Skirmish {
        town_center: sim.spawn_building("town_center", tile(2, 2), 1).expect("fits"),
        peasant: sim.spawn_unit("peasant", tile(6, 3), 1).expect("fits"),
        swordsmen: [
            sim.spawn_unit("swordsman", tile(8, 8), 1).expect("fits"),
            sim.spawn_unit("swordsman", tile(8, 10), 1).expect("fits"),
        ],
        archers: [
            sim.spawn_unit("archer", tile(24, 20), 2).expect("fits"),
            sim.spawn_unit("archer", tile(26, 20), 2).expect("fits"),
        ],
        gold: sim.spawn_resource("gold", tile(15, 15)).expect("fits"),
    };
    sim.world_mut().take_deltas();
    (sim, ids)
}
