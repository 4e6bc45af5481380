//! Scenario loading.
//!
//! A scenario lays out the starting map: its size, one base per player
//! slot, and the neutral deposits. Everything it spawns stays in the world's
//! delta journal, so the game's first tick replicates the whole starting
//! state to every client.

use std::collections::BTreeMap;

use rts_core::config::SimConfig;
use rts_core::entity::PlayerId;
use rts_core::error::GameError;
use rts_core::math::Vec2Fixed;
use rts_core::simulation::Simulation;
use rts_core::types::TypeRegistry;
use rts_core::world::World;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ServerError;

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Map dimensions (width, height) in tiles.
    pub map_size: (u32, u32),
    /// Starting bases, in player-slot order.
    pub bases: Vec<BaseSetup>,
    /// Neutral resource deposits.
    pub deposits: Vec<Placement>,
}

/// What one player starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseSetup {
    /// Stockpile by resource name.
    pub starting_stock: BTreeMap<String, i64>,
    /// Finished buildings.
    pub starting_buildings: Vec<Placement>,
    /// Units.
    pub starting_units: Vec<Placement>,
}

/// A type name at a tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    /// Type name.
    pub kind: String,
    /// Top-left tile (x, y).
    pub position: (i32, i32),
}

impl Placement {
    /// Create a new placement.
    #[must_use]
    pub fn new(kind: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            kind: kind.into(),
            position: (x, y),
        }
    }

    fn at(&self) -> Vec2Fixed {
        Vec2Fixed::from_tiles(self.position.0, self.position.1)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish_1v1()
    }
}

impl Scenario {
    /// Load from a RON string.
    pub fn from_ron_str(source: &str) -> Result<Self, ServerError> {
        Ok(ron::from_str(source)?)
    }

    /// Two mirrored bases on a 48x48 map with gold and wood between them.
    #[must_use]
    pub fn skirmish_1v1() -> Self {
        let base = |tc: (i32, i32), worker: (i32, i32)| BaseSetup {
            starting_stock: [("gold", 200), ("wood", 200), ("stone", 100)]
                .into_iter()
                .map(|(name, amount)| (name.to_string(), amount))
                .collect(),
            starting_buildings: vec![Placement::new("town_center", tc.0, tc.1)],
            starting_units: vec![
                Placement::new("peasant", worker.0, worker.1),
                Placement::new("peasant", worker.0, worker.1 + 1),
            ],
        };
        Self {
            name: "Standard 1v1 Skirmish".to_string(),
            map_size: (48, 48),
            bases: vec![base((4, 4), (8, 4)), base((41, 41), (39, 41))],
            deposits: vec![
                Placement::new("gold", 12, 12),
                Placement::new("gold", 34, 34),
                Placement::new("wood", 23, 10),
                Placement::new("wood", 24, 37),
            ],
        }
    }

    /// Build the starting simulation for the seated `players`.
    ///
    /// Bases are handed out in order; seats beyond the scenario's bases
    /// start empty. Setup deltas are left in the journal.
    pub fn build(
        &self,
        registry: TypeRegistry,
        config: SimConfig,
        players: &[PlayerId],
    ) -> Result<Simulation, GameError> {
        let (width, height) = self.map_size;
        let mut sim = Simulation::new(World::new(width, height), registry, config);

        for (index, &player) in players.iter().enumerate() {
            let Some(base) = self.bases.get(index) else {
                warn!(player, scenario = %self.name, "no base for player");
                continue;
            };
            for (resource, &amount) in &base.starting_stock {
                sim.world_mut().credit(player, resource, amount);
            }
            for building in &base.starting_buildings {
                sim.spawn_building(&building.kind, building.at(), player)?;
            }
            for unit in &base.starting_units {
                sim.spawn_unit(&unit.kind, unit.at(), player)?;
            }
        }
        for deposit in &self.deposits {
            sim.spawn_resource(&deposit.kind, deposit.at())?;
        }

        info!(
            scenario = %self.name,
            players = players.len(),
            entities = sim.world().len(),
            "scenario ready"
        );
        Ok(sim)
    }
}
