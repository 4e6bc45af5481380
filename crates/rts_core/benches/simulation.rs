//! Simulation benchmarks for rts_core.
//!
//! Run with: `cargo bench -p rts_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rts_core::math::{Fixed, RectFixed, Vec2Fixed};
use rts_core::request::Request;
use rts_core::simulation::Simulation;
use rts_test_utils::fixtures::{empty_simulation, tile};

/// 400 units on a 64x64 map, half of them marching across it.
fn crowd() -> Simulation {
    let mut sim = empty_simulation(64, 64);
    for row in 0..20 {
        for col in 0..20 {
            let owner = if col < 10 { 1 } else { 2 };
            let id = sim
                .spawn_unit("swordsman", tile(col * 3, row * 3), owner)
                .expect("crowd fits on the map");
            if row % 2 == 0 {
                sim.queue_request(
                    owner,
                    Request::Move {
                        entity: id,
                        target: tile(63 - col * 3, 63 - row * 3),
                    },
                );
            }
        }
    }
    sim.world_mut().take_deltas();
    sim
}

pub fn tick_benchmark(c: &mut Criterion) {
    c.bench_function("advance_tick_400_units", |b| {
        b.iter_batched(
            crowd,
            |mut sim| {
                for _ in 0..10 {
                    black_box(sim.advance_tick());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

pub fn spatial_benchmark(c: &mut Criterion) {
    let sim = crowd();
    let world = sim.world();
    let area = RectFixed::square(tile(20, 20), 8);
    let point = Vec2Fixed::new(Fixed::from_num(30.5), Fixed::from_num(30.5));

    c.bench_function("entities_in_rect_8x8", |b| {
        b.iter(|| black_box(world.entities_in_rect(black_box(&area))));
    });
    c.bench_function("entity_at", |b| {
        b.iter(|| black_box(world.entity_at(black_box(point))));
    });
}

criterion_group!(benches, tick_benchmark, spatial_benchmark);
criterion_main!(benches);
