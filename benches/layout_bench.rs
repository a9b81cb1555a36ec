use std::time::Duration;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use forcelayout::entity::Entity;
use forcelayout::quadtree::QuadTreeConfig;
use forcelayout::{Force, Simulation, SimulationConfig, entity};

const NUM_ENTITIES: usize = 2000;

fn entities() -> Vec<Entity<usize>> {
    (0..NUM_ENTITIES).map(|i| entity(i, ())).collect()
}

fn simulation(forces: Vec<Force<usize>>, leaf_capacity: usize) -> Simulation<usize> {
    let config = SimulationConfig {
        quadtree: QuadTreeConfig {
            leaf_capacity,
            ..Default::default()
        },
        ..Default::default()
    };
    // Only fails on an invalid config, which these are not
    Simulation::with_config(forces, &config).unwrap()
}

pub fn many_body_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_body_tick");
    group.sample_size(20).measurement_time(Duration::from_secs(5));
    for leaf_capacity in [2, 4, 8, 16, 32, 64, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_capacity),
            &leaf_capacity,
            |b, &leaf_capacity| {
                let mut sim = simulation(vec![Force::many_body(0..NUM_ENTITIES)], leaf_capacity);
                let start = entities();
                b.iter(|| {
                    // Keep every measured tick a full one
                    sim.reheat();
                    black_box(sim.tick(start.clone()))
                })
            },
        );
    }
    group.finish();
}

pub fn collision_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("collision_tick");
    group.sample_size(20).measurement_time(Duration::from_secs(5));
    for leaf_capacity in [2, 8, 32, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_capacity),
            &leaf_capacity,
            |b, &leaf_capacity| {
                let mut sim =
                    simulation(vec![Force::collision(6.0, 0..NUM_ENTITIES)], leaf_capacity);
                let start = entities();
                b.iter(|| {
                    // Keep every measured tick a full one
                    sim.reheat();
                    black_box(sim.tick(start.clone()))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, many_body_benchmark, collision_benchmark);
criterion_main!(benches);
