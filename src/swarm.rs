//! CPU particle engine.
//!
//! Runs the same per-slot kernel as `update.wgsl`, spread across threads with
//! rayon. Useful headless and as the executable reference for the GPU engine.
//!
//! # Example
//!
//! ```
//! use glowswarm::prelude::*;
//!
//! let mut swarm = ParticleSwarm::new(4);
//! swarm.add_particles(&[Particle::new(Vec2::new(0.5, 0.5), Vec4::ONE); 6]);
//! assert_eq!(swarm.alive_count(), 4);
//!
//! swarm.step(1.0 / 120.0, &[ObstacleBox::new(Vec2::ZERO, Vec2::splat(2.0))]);
//! assert_eq!(swarm.alive_count(), 0);
//! ```

use rayon::prelude::*;

use crate::engine::{clamp_alive, ParticleEngine};
use crate::kernel::{update_slot, ObstacleBox, SlotOutcome};
use crate::params::SimulationParams;
use crate::particle::Particle;
use crate::pool::{RenderIndexList, TombstoneStack};

/// Fixed-capacity particle pool updated on the CPU.
#[derive(Debug)]
pub struct ParticleSwarm {
    particles: Vec<Particle>,
    tombstones: TombstoneStack,
    render_list: RenderIndexList,
    params: SimulationParams,
}

impl ParticleSwarm {
    /// An empty pool with every slot free and default parameters.
    pub fn new(capacity: u32) -> Self {
        Self {
            particles: vec![Particle::default(); capacity as usize],
            tombstones: TombstoneStack::full(capacity),
            render_list: RenderIndexList::with_capacity(capacity),
            params: SimulationParams::default(),
        }
    }

    /// Every slot, dead ones included.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Slots drawn after the last step, in no particular order.
    pub fn render_indices(&self) -> Vec<u32> {
        self.render_list.to_vec()
    }

    /// Free slot indices, bottom of the stack first.
    pub fn free_indices(&self) -> Vec<u32> {
        self.tombstones.to_vec()
    }

    /// Number of slots on the free list.
    pub fn free_count(&self) -> u32 {
        self.tombstones.len()
    }

    /// Like [`ParticleEngine::add_particles`] but reports how many were admitted.
    ///
    /// Particles that are already dead (`lifetime <= 0`) are skipped without
    /// taking a slot.
    pub fn try_add(&mut self, particles: &[Particle]) -> usize {
        let mut admitted = 0;
        let mut rejected = 0;

        for (n, particle) in particles.iter().enumerate() {
            if !particle.is_alive() {
                rejected += 1;
                continue;
            }
            match self.tombstones.pop() {
                Some(index) => {
                    self.particles[index as usize] = *particle;
                    admitted += 1;
                }
                None => {
                    log::debug!(
                        "particle pool full, dropped {} of {} particles",
                        particles.len() - n,
                        particles.len()
                    );
                    break;
                }
            }
        }

        if rejected > 0 {
            log::debug!("skipped {} particles spawned with no lifetime", rejected);
        }
        admitted
    }
}

impl ParticleEngine for ParticleSwarm {
    fn reset(&mut self, hard: bool, capacity: u32) {
        log::info!("resetting CPU swarm (hard: {}, capacity: {})", hard, capacity);
        let mut params = self.params;
        if hard {
            params.restore_defaults();
        }
        *self = Self::new(capacity);
        self.params = params;
    }

    fn capacity(&self) -> u32 {
        self.tombstones.capacity()
    }

    fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut SimulationParams {
        &mut self.params
    }

    fn add_particles(&mut self, particles: &[Particle]) {
        self.try_add(particles);
    }

    fn step(&mut self, dt: f32, obstacles: &[ObstacleBox]) {
        self.render_list.clear();

        let params = self.params;
        let tombstones = &self.tombstones;
        let render_list = &self.render_list;

        self.particles
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, particle)| match update_slot(particle, &params, obstacles, dt) {
                SlotOutcome::Survived => {
                    render_list.push(i as u32);
                }
                SlotOutcome::Killed => {
                    if !tombstones.push(i as u32) {
                        log::warn!("free list already full when releasing slot {}", i);
                    }
                }
                SlotOutcome::Vacant => {}
            });
    }

    fn alive_count(&mut self) -> u32 {
        clamp_alive(self.capacity(), self.tombstones.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec4};

    const DT: f32 = 1.0 / 120.0;

    fn spark(x: f32, y: f32) -> Particle {
        Particle::new(Vec2::new(x, y), Vec4::new(1.0, 0.6, 0.2, 1.0))
    }

    #[test]
    fn test_new_swarm_is_empty() {
        let mut swarm = ParticleSwarm::new(16);
        assert_eq!(swarm.capacity(), 16);
        assert_eq!(swarm.alive_count(), 0);
        assert_eq!(swarm.free_count(), 16);
        assert!(swarm.particles().iter().all(|p| !p.is_alive()));
    }

    #[test]
    fn test_ingestion_respects_capacity() {
        let mut swarm = ParticleSwarm::new(8);
        assert_eq!(swarm.try_add(&[spark(0.0, 0.0); 5]), 5);
        assert_eq!(swarm.try_add(&[spark(0.0, 0.0); 5]), 3);
        assert_eq!(swarm.alive_count(), 8);
        assert_eq!(swarm.try_add(&[spark(0.0, 0.0)]), 0);
    }

    #[test]
    fn test_dead_records_do_not_take_slots() {
        let mut swarm = ParticleSwarm::new(4);
        let batch = [spark(0.0, 0.0).with_lifetime(0.0), spark(0.1, 0.1)];
        assert_eq!(swarm.try_add(&batch), 1);
        assert_eq!(swarm.alive_count(), 1);
    }

    #[test]
    fn test_nan_lifetime_is_dead() {
        let mut swarm = ParticleSwarm::new(4);
        let batch = [spark(0.0, 0.0).with_lifetime(f32::NAN), spark(0.1, 0.1)];
        assert_eq!(swarm.try_add(&batch), 1);
        swarm.step(DT, &[]);
        assert_eq!(swarm.alive_count(), 1);
        assert_eq!(swarm.render_indices().len(), 1);
    }

    #[test]
    fn test_survivors_listed_for_render() {
        let mut swarm = ParticleSwarm::new(4);
        swarm.add_particles(&[spark(0.5, 0.5), spark(-0.5, 0.5)]);
        swarm.step(DT, &[]);

        let mut indices = swarm.render_indices();
        indices.sort_unstable();
        assert_eq!(indices, vec![2, 3]);
    }

    #[test]
    fn test_killed_slot_is_reused() {
        let mut swarm = ParticleSwarm::new(4);
        swarm.add_particles(&[spark(0.5, 0.5)]);
        let slot = swarm
            .particles()
            .iter()
            .position(|p| p.is_alive())
            .unwrap() as u32;

        swarm.step(DT, &[ObstacleBox::new(Vec2::new(0.5, 0.5), Vec2::splat(0.2))]);
        assert_eq!(swarm.alive_count(), 0);
        assert!(swarm.render_indices().is_empty());
        assert_eq!(swarm.free_indices().last(), Some(&slot));

        swarm.add_particles(&[spark(-0.5, -0.5)]);
        assert!(swarm.particles()[slot as usize].is_alive());
        assert_eq!(swarm.particles()[slot as usize].position(), Vec2::new(-0.5, -0.5));
    }

    #[test]
    fn test_dead_slots_are_not_freed_twice() {
        let mut swarm = ParticleSwarm::new(4);
        swarm.add_particles(&[spark(0.0, 0.0); 2]);
        let wall = [ObstacleBox::new(Vec2::ZERO, Vec2::ONE)];
        swarm.step(DT, &wall);
        swarm.step(DT, &wall);
        assert_eq!(swarm.free_count(), 4);

        let mut free = swarm.free_indices();
        free.sort_unstable();
        assert_eq!(free, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_soft_reset_keeps_params() {
        let mut swarm = ParticleSwarm::new(4);
        swarm.add_particles(&[spark(0.0, 0.0)]);
        swarm.params_mut().magnetism = 5.0;

        swarm.reset(false, 10);
        assert_eq!(swarm.capacity(), 10);
        assert_eq!(swarm.alive_count(), 0);
        assert_eq!(swarm.params().magnetism, 5.0);

        swarm.reset(true, 10);
        assert_eq!(swarm.params(), &SimulationParams::default());
    }

    #[test]
    fn test_hard_reset_keeps_cursor() {
        let mut swarm = ParticleSwarm::new(4);
        swarm.params_mut().cursor = Vec2::new(1.0, 1.0);
        swarm.params_mut().friction = 0.5;

        swarm.reset(true, 8);
        assert_eq!(swarm.params().cursor, Vec2::new(1.0, 1.0));
        assert_eq!(swarm.params().friction, SimulationParams::DEFAULT_FRICTION);
        assert_eq!(swarm.free_count(), 8);
        assert_eq!(swarm.alive_count(), 0);
    }

    #[test]
    fn test_expired_particles_leave_render_list() {
        let mut swarm = ParticleSwarm::new(2);
        swarm.add_particles(&[spark(0.0, 0.5).with_lifetime(0.05), spark(0.0, -0.5)]);
        for _ in 0..5 {
            swarm.step(DT, &[]);
        }
        assert_eq!(swarm.alive_count(), 2);
        for _ in 0..5 {
            swarm.step(DT, &[]);
        }
        assert_eq!(swarm.alive_count(), 1);
        assert_eq!(swarm.render_indices().len(), 1);
    }
}
