//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Clients never simulate, but the server must still be reproducible: the
//! same requests in the same order must yield the same delta stream, or a
//! replayed session diverges from what clients saw. Sources of
//! non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`rts_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The world iterates entities in id order; the tile index keeps arrival
//!   order per tile.
//!
//! - **System randomness**: None in the core.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual commands (movement, combat, etc.)
//! 2. **Property tests**: Random request streams replay identically
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::thread;

use rts_core::simulation::Simulation;
use rts_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use rts_test_utils::determinism::verify_determinism;
/// use rts_test_utils::fixtures::skirmish;
///
/// let result = verify_determinism(
///     3,
///     50,
///     || skirmish().0,
///     |sim| { sim.advance_tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the simulation twice from the same setup and compare final hashes
/// and the full delta streams.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let run = || {
        let mut sim = setup_fn();
        let stream: Vec<_> = (0..num_ticks).map(|_| sim.advance_tick()).collect();
        (sim.state_hash(), stream)
    };
    run() == run()
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.advance_tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        let a = sim1.advance_tick();
        let b = sim2.advance_tick();

        if a != b || sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a world snapshot taken mid-game restores exactly and keeps
/// simulating identically to the original.
pub fn verify_snapshot_determinism<F>(setup_fn: F, warmup: u64, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut original = setup_fn();
    for _ in 0..warmup {
        original.advance_tick();
    }

    let Ok(bytes) = original.world().snapshot() else {
        return false;
    };
    let Ok(world) = World::restore(&bytes) else {
        return false;
    };
    if world.state_hash() != original.world().state_hash() {
        return false;
    }

    let mut restored = Simulation::new(
        world,
        original.registry().clone(),
        original.config().clone(),
    );
    for _ in 0..num_ticks {
        if original.advance_tick().deltas != restored.advance_tick().deltas {
            return false;
        }
    }
    original.world().state_hash() == restored.world().state_hash()
}

/// Proptest strategies for determinism and invariant testing.
pub mod strategies {
    use proptest::prelude::*;
    use rts_core::entity::EntityId;
    use rts_core::math::{Fixed, Vec2Fixed};
    use rts_core::request::Request;

    /// A fixed-point coordinate in `[0, max)` with quarter-tile resolution.
    pub fn arb_coordinate(max: u32) -> impl Strategy<Value = Fixed> {
        let quarters = i32::try_from(max.saturating_mul(4)).unwrap_or(i32::MAX);
        (0..quarters).prop_map(|q| Fixed::from_num(q) / Fixed::from_num(4))
    }

    /// A position whose footprint of `size` fits on a `width` x `height` map.
    pub fn arb_position(width: u32, height: u32, size: u32) -> impl Strategy<Value = Vec2Fixed> {
        (
            arb_coordinate(width.saturating_sub(size).max(1)),
            arb_coordinate(height.saturating_sub(size).max(1)),
        )
            .prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// A movement budget between 1/16 and 4 tiles.
    pub fn arb_budget() -> impl Strategy<Value = Fixed> {
        (1i32..=64).prop_map(|sixteenths| Fixed::from_num(sixteenths) / Fixed::from_num(16))
    }

    /// Any request naming entity ids up to `max_id` and the sample type names.
    pub fn arb_request(max_id: EntityId, width: u32, height: u32) -> impl Strategy<Value = Request> {
        let id = 1..=max_id;
        prop_oneof![
            3 => (id.clone(), arb_position(width, height, 1))
                .prop_map(|(entity, target)| Request::Move { entity, target }),
            2 => (id.clone(), id.clone())
                .prop_map(|(entity, target)| Request::Attack { entity, target }),
            1 => (id.clone(), id.clone())
                .prop_map(|(entity, target)| Request::Build { entity, target }),
            1 => (id.clone(), id.clone())
                .prop_map(|(entity, target)| Request::Gather { entity, target }),
            1 => (prop::sample::select(vec!["barracks", "tower", "gold_mine"]), arb_position(width, height, 2))
                .prop_map(|(name, position)| Request::PlaceBuilding {
                    building_type: name.to_owned(),
                    position,
                }),
            1 => (id.clone(), prop::sample::select(vec!["peasant", "swordsman", "archer"]))
                .prop_map(|(building, name)| Request::Train {
                    building,
                    unit_type: name.to_owned(),
                }),
            1 => prop::sample::select(vec!["masonry", "fletching", "alchemy"])
                .prop_map(|tech| Request::Research { tech: tech.to_owned() }),
            1 => id.prop_map(|entity| Request::Delete { entity }),
        ]
    }

    /// A tick-stamped stream of `(tick, player, request)`.
    pub fn arb_request_stream(
        max_id: EntityId,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<(u64, u8, Request)>> {
        prop::collection::vec(
            (0u64..60, 1u8..=2, arb_request(max_id, 32, 32)),
            0..max_len,
        )
        .prop_map(|mut stream| {
            stream.sort_by_key(|(tick, _, _)| *tick);
            stream
        })
    }
}
