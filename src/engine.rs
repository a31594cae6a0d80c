//! The contract shared by the CPU and GPU particle engines.

use crate::kernel::ObstacleBox;
use crate::params::SimulationParams;
use crate::particle::Particle;

/// Storage, lifecycle and per-tick update of a fixed-capacity particle pool.
///
/// Implemented by [`ParticleSwarm`](crate::swarm::ParticleSwarm) on the CPU and
/// [`GpuSwarm`](crate::gpu::swarm::GpuSwarm) on the GPU. Callers must not
/// interleave `add_particles` with an in-flight `step`; the
/// [`Sandbox`](crate::sandbox::Sandbox) only ingests between ticks.
pub trait ParticleEngine {
    /// Reallocate to `capacity` slots, all free. A hard reset also restores
    /// default parameters.
    fn reset(&mut self, hard: bool, capacity: u32);

    /// Number of slots in the pool.
    fn capacity(&self) -> u32;

    fn params(&self) -> &SimulationParams;

    /// Parameters are read by value at the start of each step.
    fn params_mut(&mut self) -> &mut SimulationParams;

    /// Allocate a free slot per particle. Particles beyond the free list are
    /// dropped without error.
    fn add_particles(&mut self, particles: &[Particle]);

    /// Advance every alive slot by `dt` against the given active obstacles.
    fn step(&mut self, dt: f32, obstacles: &[ObstacleBox]);

    /// `capacity - free`, clamped into `[0, capacity]`.
    ///
    /// Takes `&mut self` because the GPU engine reads the count back.
    fn alive_count(&mut self) -> u32;
}

/// Clamp a raw `capacity - free` difference, logging when it is out of range.
pub(crate) fn clamp_alive(capacity: u32, free: i64) -> u32 {
    let alive = capacity as i64 - free;
    if alive < 0 || alive > capacity as i64 {
        log::warn!(
            "free list out of range (capacity {}, free {}), clamping alive count",
            capacity,
            free
        );
    }
    alive.clamp(0, capacity as i64) as u32
}
