//! Per-slot update math.
//!
//! This is the CPU rendition of `shaders/update.wgsl`; both must agree on
//! every step so the two engines produce the same observable behavior.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::params::SimulationParams;
use crate::particle::{Lifetime, Particle};

/// Axis-aligned collision box handed to the kernel, 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ObstacleBox {
    pub position: [f32; 2],
    pub half_extent: [f32; 2],
}

impl ObstacleBox {
    pub fn new(position: Vec2, half_extent: Vec2) -> Self {
        Self {
            position: position.to_array(),
            half_extent: half_extent.to_array(),
        }
    }

    /// Strict containment on both axes.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        let d = (point - Vec2::from_array(self.position)).abs();
        let h = Vec2::from_array(self.half_extent);
        d.x < h.x && d.y < h.y
    }
}

/// What happened to a slot during one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Slot was already free; nothing to do.
    Vacant,
    /// Particle is alive and should be drawn this tick.
    Survived,
    /// Particle died this tick; its index must go back on the free list.
    Killed,
}

/// Acceleration toward the cursor.
///
/// `magnetism * (1 + acceleration_constant / max(dist, min_distance))` along the
/// unit direction to the cursor. Zero when the particle sits on the cursor.
pub fn attraction(position: Vec2, params: &SimulationParams) -> Vec2 {
    let to_cursor = params.cursor - position;
    let dist = to_cursor.length();
    if dist <= 0.0 {
        return Vec2::ZERO;
    }
    let falloff = 1.0 + params.acceleration_constant / dist.max(params.acceleration_min_distance);
    to_cursor / dist * params.magnetism * falloff
}

/// Velocity multiplier for one step: `(1 - friction)^dt`.
#[inline]
pub fn damping(friction: f32, dt: f32) -> f32 {
    (1.0 - friction.clamp(0.0, 1.0)).powf(dt)
}

/// Advance one slot by `dt`.
///
/// A killed particle has its lifetime zeroed so later ticks see a dead slot.
pub fn update_slot(
    particle: &mut Particle,
    params: &SimulationParams,
    obstacles: &[ObstacleBox],
    dt: f32,
) -> SlotOutcome {
    if !particle.is_alive() {
        return SlotOutcome::Vacant;
    }

    let mut position = particle.position();
    let mut velocity = particle.velocity();

    velocity += attraction(position, params) * dt;
    velocity *= damping(params.friction, dt);
    position += velocity * dt;

    particle.position = position.to_array();
    particle.velocity = velocity.into();

    let mut dead = Lifetime::collides(particle.lifetime)
        && obstacles.iter().any(|b| b.contains(position));

    if !dead && Lifetime::counts_down(particle.lifetime) {
        particle.lifetime -= dt;
        dead = particle.lifetime <= 0.0;
    }

    if dead {
        particle.lifetime = 0.0;
        SlotOutcome::Killed
    } else {
        SlotOutcome::Survived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn still_params() -> SimulationParams {
        SimulationParams {
            magnetism: 0.0,
            friction: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_attraction_points_at_cursor() {
        let params = SimulationParams {
            cursor: Vec2::new(1.0, 0.0),
            ..Default::default()
        };
        let a = attraction(Vec2::new(-1.0, 0.0), &params);
        assert!((a - Vec2::new(1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_attraction_inverse_distance_is_clamped() {
        let params = SimulationParams {
            magnetism: 2.0,
            acceleration_constant: 1.0,
            acceleration_min_distance: 0.5,
            cursor: Vec2::ZERO,
            ..Default::default()
        };
        // dist 0.1 is clamped to 0.5: 2 * (1 + 1/0.5) = 6
        let near = attraction(Vec2::new(0.1, 0.0), &params);
        assert!((near.length() - 6.0).abs() < 1e-5);
        // dist 2.0 is not clamped: 2 * (1 + 1/2) = 3
        let far = attraction(Vec2::new(0.0, 2.0), &params);
        assert!((far.length() - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_attraction_on_cursor_is_zero() {
        assert_eq!(attraction(Vec2::ZERO, &SimulationParams::default()), Vec2::ZERO);
    }

    #[test]
    fn test_damping_range() {
        assert_eq!(damping(0.0, 0.5), 1.0);
        assert_eq!(damping(1.0, 0.5), 0.0);
        assert_eq!(damping(4.0, 0.5), 0.0);
        assert!((damping(0.75, 0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_vacant_slot_untouched() {
        let mut p = Particle::default();
        let before = p;
        assert_eq!(update_slot(&mut p, &still_params(), &[], 0.1), SlotOutcome::Vacant);
        assert_eq!(p, before);
    }

    #[test]
    fn test_velocity_integrates_position() {
        let mut p = Particle::new(Vec2::ZERO, Vec4::ONE).with_velocity(Vec2::new(1.0, -0.5));
        assert_eq!(update_slot(&mut p, &still_params(), &[], 0.5), SlotOutcome::Survived);
        assert!((p.position() - Vec2::new(0.5, -0.25)).length() < 1e-3);
    }

    #[test]
    fn test_obstacle_kills_after_integration() {
        let wall = ObstacleBox::new(Vec2::new(0.5, 0.0), Vec2::new(0.1, 0.1));
        let mut p = Particle::new(Vec2::ZERO, Vec4::ONE).with_velocity(Vec2::new(1.0, 0.0));
        assert_eq!(update_slot(&mut p, &still_params(), &[wall], 0.5), SlotOutcome::Killed);
        assert!(!p.is_alive());
    }

    #[test]
    fn test_invulnerable_ignores_obstacles() {
        let wall = ObstacleBox::new(Vec2::ZERO, Vec2::splat(2.0));
        let mut p = Particle::new(Vec2::ZERO, Vec4::ONE).invulnerable();
        assert_eq!(update_slot(&mut p, &still_params(), &[wall], 0.1), SlotOutcome::Survived);
        assert_eq!(p.lifetime, Lifetime::INVULNERABLE);
    }

    #[test]
    fn test_countdown_expires() {
        let mut p = Particle::new(Vec2::ZERO, Vec4::ONE).with_lifetime(0.25);
        assert_eq!(update_slot(&mut p, &still_params(), &[], 0.2), SlotOutcome::Survived);
        assert_eq!(update_slot(&mut p, &still_params(), &[], 0.2), SlotOutcome::Killed);
        assert_eq!(p.lifetime, 0.0);
    }

    #[test]
    fn test_box_edges_are_outside() {
        let b = ObstacleBox::new(Vec2::ZERO, Vec2::ONE);
        assert!(b.contains(Vec2::new(0.99, -0.99)));
        assert!(!b.contains(Vec2::new(1.0, 0.0)));
    }
}
