//! Benchmarks for the CPU engine.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glowswarm::prelude::*;
use glowswarm::spawn::{burst, BurstShape};
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 120.0;

fn filled_swarm(capacity: u32) -> ParticleSwarm {
    let mut swarm = ParticleSwarm::new(capacity);
    swarm.add_particles(&burst(
        Vec2::ZERO,
        capacity,
        BurstShape::Disc { radius: 0.9 },
        0.5,
        Vec4::ONE,
        1,
    ));
    swarm.params_mut().cursor = Vec2::new(0.3, -0.2);
    swarm
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step");

    for capacity in [10_000u32, 100_000, 1_000_000] {
        group.bench_with_input(BenchmarkId::new("no_obstacles", capacity), &capacity, |b, &cap| {
            let mut swarm = filled_swarm(cap);
            b.iter(|| swarm.step(black_box(DT), &[]))
        });
    }

    // Small walls scattered around; most particles test every box and survive.
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let walls: Vec<ObstacleBox> = (0..16)
        .map(|_| {
            ObstacleBox::new(
                Vec2::new(rng.gen_range(-0.9..0.9), rng.gen_range(-0.9..0.9)),
                Vec2::splat(0.01),
            )
        })
        .collect();
    group.bench_function("sixteen_walls/100000", |b| {
        let mut swarm = filled_swarm(100_000);
        b.iter(|| swarm.step(black_box(DT), &walls))
    });

    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for count in [1_000u32, 100_000] {
        let batch = burst(Vec2::ZERO, count, BurstShape::Ring { radius: 0.2 }, 0.5, Vec4::ONE, 3);
        group.bench_with_input(BenchmarkId::new("empty_pool", count), &batch, |b, batch| {
            b.iter_batched(
                || ParticleSwarm::new(count),
                |mut swarm| {
                    swarm.add_particles(black_box(batch));
                    swarm
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_step, bench_ingest);
criterion_main!(benches);
