//! End-to-end scenarios through the public API on the CPU engine.

use std::collections::HashSet;

use glowswarm::prelude::*;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 120.0;

fn random_particles(rng: &mut impl Rng, count: usize) -> Vec<Particle> {
    (0..count)
        .map(|_| {
            let position = Vec2::new(rng.gen_range(-0.9..0.9), rng.gen_range(-0.9..0.9));
            let velocity = Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
            let color = Vec4::new(rng.gen_range(0.0..4.0), rng.gen_range(0.0..4.0), rng.gen_range(0.0..4.0), 1.0);
            Particle::new(position, color).with_velocity(velocity)
        })
        .collect()
}

fn wall_everywhere() -> Obstacle {
    Obstacle::new(Vec2::ZERO, Vec2::splat(2.0), Vec4::new(200.0, 0.0, 0.0, 0.0))
}

#[test]
fn test_full_wipe_returns_every_slot() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let mut sandbox = Sandbox::new(ParticleSwarm::new(5000));
    let spawner = sandbox.spawner();

    assert!(spawner.spawn(random_particles(&mut rng, 1000)));
    sandbox.tick(DT);
    assert_eq!(sandbox.engine_mut().alive_count(), 1000);
    assert_eq!(sandbox.engine().render_indices().len(), 1000);

    sandbox.obstacles_mut().insert(wall_everywhere());
    sandbox.tick(DT);

    assert_eq!(sandbox.engine_mut().alive_count(), 0);
    assert_eq!(sandbox.engine().free_count(), 5000);
    assert!(sandbox.engine().render_indices().is_empty());
}

#[test]
fn test_still_swarm_at_origin_is_wiped_by_one_wall() {
    let mut sandbox = Sandbox::new(ParticleSwarm::new(16));
    sandbox.reset(true, 1000);
    assert_eq!(sandbox.engine_mut().alive_count(), 0);
    assert_eq!(sandbox.engine().free_count(), 1000);

    let params = sandbox.engine_mut().params_mut();
    params.magnetism = 0.0;
    params.friction = 0.0;

    sandbox
        .spawner()
        .spawn(vec![Particle::new(Vec2::ZERO, Vec4::ONE); 1000]);
    sandbox.tick(DT);
    assert_eq!(sandbox.engine_mut().alive_count(), 1000);
    assert_eq!(sandbox.engine().render_indices().len(), 1000);
    assert_eq!(sandbox.engine().free_count(), 0);

    sandbox
        .obstacles_mut()
        .insert(Obstacle::new(Vec2::ZERO, Vec2::splat(2.0), Vec4::ONE));
    sandbox.tick(DT);
    assert_eq!(sandbox.engine_mut().alive_count(), 0);
    assert_eq!(sandbox.engine().render_indices().len(), 0);
    assert_eq!(sandbox.engine().free_count(), 1000);
}

#[test]
fn test_ingestion_capacity_law() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(2);
    for _ in 0..20 {
        let capacity = rng.gen_range(0..300u32);
        let incoming = rng.gen_range(0..600usize);
        let mut swarm = ParticleSwarm::new(capacity);

        swarm.add_particles(&random_particles(&mut rng, incoming));

        let expected = (incoming as u32).min(capacity);
        assert_eq!(swarm.alive_count(), expected);
        assert_eq!(swarm.free_count(), capacity - expected);
    }
}

#[test]
fn test_render_list_and_free_list_partition_the_pool() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut swarm = ParticleSwarm::new(512);

    let batch: Vec<Particle> = random_particles(&mut rng, 400)
        .into_iter()
        .enumerate()
        .map(|(i, p)| if i % 3 == 0 { p.with_lifetime(DT * 0.5) } else { p })
        .collect();
    swarm.add_particles(&batch);
    swarm.step(DT, &[]);

    let rendered: HashSet<u32> = swarm.render_indices().into_iter().collect();
    let free: HashSet<u32> = swarm.free_indices().into_iter().collect();

    assert!(rendered.is_disjoint(&free));
    assert_eq!(rendered.len() + free.len(), 512);
    for &i in &rendered {
        assert!(swarm.particles()[i as usize].is_alive());
    }
    for &i in &free {
        assert!(!swarm.particles()[i as usize].is_alive());
    }
}

#[test]
fn test_invulnerable_particles_ignore_walls() {
    let mut sandbox = Sandbox::new(ParticleSwarm::new(16));
    sandbox.obstacles_mut().insert(wall_everywhere());

    sandbox.spawner().spawn(vec![
        Particle::new(Vec2::new(0.1, 0.1), Vec4::ONE).invulnerable(),
        Particle::new(Vec2::new(-0.1, 0.1), Vec4::ONE),
    ]);
    sandbox.tick(DT);

    assert_eq!(sandbox.engine_mut().alive_count(), 1);
    let survivor = sandbox.engine().render_indices()[0];
    assert_eq!(
        sandbox.engine().particles()[survivor as usize].lifetime,
        Lifetime::INVULNERABLE
    );
}

#[test]
fn test_hard_reset_through_command_channel() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(4);
    let mut sandbox = Sandbox::new(ParticleSwarm::new(100));
    sandbox.engine_mut().params_mut().magnetism = 9.0;
    sandbox.spawner().spawn(random_particles(&mut rng, 80));
    sandbox.tick(DT);
    assert_eq!(sandbox.engine_mut().alive_count(), 80);

    let commands = sandbox.command_sender();
    commands
        .send(Command::Reset {
            hard: true,
            capacity: 250,
        })
        .unwrap();
    sandbox.spawner().spawn(random_particles(&mut rng, 10));
    sandbox.tick(DT);

    assert_eq!(sandbox.engine().capacity(), 250);
    assert_eq!(sandbox.engine_mut().alive_count(), 10);
    assert_eq!(sandbox.engine().free_count(), 240);
    assert_eq!(*sandbox.engine().params(), SimulationParams::default());
}

#[test]
fn test_cursor_event_steers_the_swarm() {
    let mut sandbox = Sandbox::new(ParticleSwarm::new(4));
    sandbox.spawner().spawn(vec![Particle::new(Vec2::ZERO, Vec4::ONE)]);

    let cursor = sandbox.cursor_sender();
    for x in [10.0, 50.0, 100.0] {
        cursor
            .send(CursorEvent {
                x,
                y: 50.0,
                window_width: 100.0,
                window_height: 100.0,
            })
            .unwrap();
    }
    sandbox.tick(DT);

    // Only the last event counts: right edge, vertical center.
    assert_eq!(sandbox.engine().params().cursor, Vec2::new(1.0, 0.0));
    let index = sandbox.engine().render_indices()[0];
    let p = sandbox.engine().particles()[index as usize];
    assert!(p.velocity().x > 0.0);
    assert!(p.position().x > 0.0);
}

#[test]
fn test_flickering_wall_spares_particles_until_settled() {
    let mut sandbox = Sandbox::new(ParticleSwarm::new(64));
    sandbox
        .obstacles_mut()
        .insert(wall_everywhere().with_flicker(Flicker::new(0.5, Vec4::ONE, Vec4::ONE)));

    sandbox.spawner().spawn(vec![Particle::new(Vec2::ZERO, Vec4::ONE); 8]);

    for _ in 0..5 {
        sandbox.tick(0.1);
        assert_eq!(sandbox.engine_mut().alive_count(), 8);
    }
    sandbox.tick(0.1);
    assert_eq!(sandbox.engine_mut().alive_count(), 0);
}
