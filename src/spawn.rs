//! Spawn helpers for building particle batches.
//!
//! [`SpawnContext`] hands out deterministic pseudo-random values per particle
//! so a burst spawned with the same seed always looks the same. [`burst`] and
//! [`ring`] build complete batches ready for a [`Spawner`](crate::sandbox::Spawner).
//!
//! ```
//! use glowswarm::spawn::{burst, BurstShape};
//! use glam::{Vec2, Vec4};
//!
//! let batch = burst(Vec2::ZERO, 256, BurstShape::Disc { radius: 0.1 }, 0.4, Vec4::new(4.0, 1.0, 0.2, 1.0), 7);
//! assert_eq!(batch.len(), 256);
//! ```

use std::f32::consts::TAU;

use glam::{Vec2, Vec4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::particle::Particle;

/// Per-particle context with helpers for common spawn patterns.
pub struct SpawnContext {
    /// Index of the particle being spawned (0 to count-1).
    pub index: u32,
    /// Total number of particles being spawned.
    pub count: u32,
    rng: SmallRng,
}

impl SpawnContext {
    /// Context for particle `index` of `count`. The same `seed` and index
    /// always produce the same sequence.
    pub fn new(index: u32, count: u32, seed: u32) -> Self {
        let seed = ((seed as u64) << 32) ^ index as u64;
        Self {
            index,
            count,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Normalized progress through the batch (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.index as f32 / self.count as f32
        }
    }

    /// Random f32 between 0.0 and 1.0.
    #[inline]
    pub fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Random f32 in `[min, max)`. Returns `min` for an empty range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if min < max {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Uniform point inside a disc.
    pub fn random_in_disc(&mut self, radius: f32) -> Vec2 {
        let theta = self.random() * TAU;
        // sqrt for uniform area
        let r = radius * self.random().sqrt();
        Vec2::new(r * theta.cos(), r * theta.sin())
    }

    /// Evenly spaced point on a circle, by batch progress.
    pub fn ring_position(&self, radius: f32) -> Vec2 {
        let angle = self.progress() * TAU;
        Vec2::new(radius * angle.cos(), radius * angle.sin())
    }

    pub fn random_direction(&mut self) -> Vec2 {
        let theta = self.random() * TAU;
        Vec2::new(theta.cos(), theta.sin())
    }

    /// Velocity pointing away from the origin of `offset`.
    pub fn outward_velocity(&mut self, offset: Vec2, speed: f32) -> Vec2 {
        if offset.length_squared() > 1e-8 {
            offset.normalize() * speed
        } else {
            self.random_direction() * speed
        }
    }

    /// Random hue at the given saturation and value.
    pub fn random_hue(&mut self, saturation: f32, value: f32) -> Vec4 {
        let hue = self.random();
        hsv_to_rgba(hue, saturation, value)
    }
}

/// HSV to linear RGBA with alpha 1.
pub fn hsv_to_rgba(h: f32, s: f32, v: f32) -> Vec4 {
    let h = h.rem_euclid(1.0);
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h * 6.0) as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Vec4::new(r + m, g + m, b + m, 1.0)
}

/// Where particles of a burst start relative to its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurstShape {
    /// Uniformly inside a disc.
    Disc { radius: f32 },
    /// Evenly spaced on a circle.
    Ring { radius: f32 },
}

/// A batch of persistent particles flying outward from `center`.
///
/// Speeds vary between half and full `speed`; colors are `emissive` with a
/// small per-particle brightness jitter.
pub fn burst(
    center: Vec2,
    count: u32,
    shape: BurstShape,
    speed: f32,
    emissive: Vec4,
    seed: u32,
) -> Vec<Particle> {
    (0..count)
        .map(|i| {
            let mut ctx = SpawnContext::new(i, count, seed);
            let offset = match shape {
                BurstShape::Disc { radius } => ctx.random_in_disc(radius),
                BurstShape::Ring { radius } => ctx.ring_position(radius),
            };
            let launch_speed = speed * ctx.random_range(0.5, 1.0);
            let velocity = ctx.outward_velocity(offset, launch_speed);
            let brightness = ctx.random_range(0.75, 1.25);
            Particle::new(center + offset, emissive * brightness).with_velocity(velocity)
        })
        .collect()
}

/// A rainbow ring of particles with a countdown lifetime.
pub fn ring(center: Vec2, count: u32, radius: f32, speed: f32, intensity: f32, lifetime: f32) -> Vec<Particle> {
    (0..count)
        .map(|i| {
            let ctx = SpawnContext::new(i, count, 0);
            let offset = ctx.ring_position(radius);
            let color = hsv_to_rgba(ctx.progress(), 1.0, intensity);
            Particle::new(center + offset, color)
                .with_velocity(offset.normalize_or_zero() * speed)
                .with_lifetime(lifetime)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let ctx = SpawnContext::new(50, 100, 1);
        assert!((ctx.progress() - 0.5).abs() < 0.001);
        assert_eq!(SpawnContext::new(0, 0, 1).progress(), 0.0);
    }

    #[test]
    fn test_random_in_unit_range() {
        let mut ctx = SpawnContext::new(3, 10, 42);
        for _ in 0..1000 {
            let r = ctx.random();
            assert!((0.0..=1.0).contains(&r));
        }
    }

    #[test]
    fn test_disc_bounds() {
        let mut ctx = SpawnContext::new(0, 1, 9);
        for _ in 0..200 {
            assert!(ctx.random_in_disc(0.5).length() <= 0.5 + 1e-5);
        }
    }

    #[test]
    fn test_burst_is_deterministic() {
        let a = burst(Vec2::ONE, 64, BurstShape::Disc { radius: 0.2 }, 1.0, Vec4::ONE, 11);
        let b = burst(Vec2::ONE, 64, BurstShape::Disc { radius: 0.2 }, 1.0, Vec4::ONE, 11);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.is_alive()));
        assert!(a.iter().all(|p| (p.position() - Vec2::ONE).length() <= 0.2 + 1e-3));
    }

    #[test]
    fn test_ring_velocities_point_outward() {
        let batch = ring(Vec2::ZERO, 16, 0.3, 0.5, 2.0, 4.0);
        for p in &batch {
            assert!(p.position().dot(p.velocity()) > 0.0);
            assert_eq!(p.lifetime, 4.0);
        }
    }

    #[test]
    fn test_contexts_differ_by_index_and_seed() {
        let a = SpawnContext::new(0, 2, 5).random();
        let b = SpawnContext::new(1, 2, 5).random();
        let c = SpawnContext::new(0, 2, 6).random();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, SpawnContext::new(0, 2, 5).random());
    }

    #[test]
    fn test_random_range_bounds() {
        let mut ctx = SpawnContext::new(1, 4, 3);
        for _ in 0..500 {
            let r = ctx.random_range(0.5, 1.0);
            assert!((0.5..1.0).contains(&r));
        }
        assert_eq!(ctx.random_range(2.0, 2.0), 2.0);
    }

    #[test]
    fn test_burst_speeds_stay_in_band() {
        let batch = burst(Vec2::ZERO, 128, BurstShape::Ring { radius: 0.1 }, 2.0, Vec4::ONE, 9);
        for p in &batch {
            let speed = p.velocity().length();
            // half-float velocity packing
            assert!(speed >= 1.0 - 0.01 && speed <= 2.0 + 0.01, "speed {}", speed);
        }
    }

    #[test]
    fn test_hsv_to_rgba() {
        let red = hsv_to_rgba(0.0, 1.0, 1.0);
        assert!((red.x - 1.0).abs() < 0.001);
        assert!(red.y < 0.001);
        assert!(red.z < 0.001);
        assert_eq!(red.w, 1.0);
    }
}
