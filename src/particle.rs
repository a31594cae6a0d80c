//! The particle record shared by the CPU engine, the GPU buffers and the WGSL kernels.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec4};

use crate::color::{PackedRgba, PackedVec2};

/// Lifetime sentinels.
///
/// | `lifetime` | Meaning |
/// |------------|---------|
/// | `<= 0` | dead slot, skipped by the kernel |
/// | `(0, PERSISTENT)` | countdown in seconds, dies at zero |
/// | `>= PERSISTENT` | never expires, still dies on obstacle contact |
/// | `>= INVULNERABLE` | never expires and ignores obstacles |
///
/// The same constants are baked into `update.wgsl`.
pub struct Lifetime;

impl Lifetime {
    pub const PERSISTENT: f32 = 1.0e30;
    pub const INVULNERABLE: f32 = 3.0e38;

    #[inline]
    pub fn is_alive(lifetime: f32) -> bool {
        lifetime > 0.0
    }

    #[inline]
    pub fn counts_down(lifetime: f32) -> bool {
        lifetime < Self::PERSISTENT
    }

    #[inline]
    pub fn collides(lifetime: f32) -> bool {
        lifetime < Self::INVULNERABLE
    }
}

/// One simulated unit, 24 bytes, laid out exactly like the WGSL `Particle` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Scene-space position, `[-1, 1]` on both axes by convention.
    pub position: [f32; 2],
    /// Emissive RGBA as packed half floats.
    pub emissive: PackedRgba,
    /// Velocity as packed half floats.
    pub velocity: PackedVec2,
    /// Countdown or sentinel, see [`Lifetime`].
    pub lifetime: f32,
}

impl Particle {
    /// A persistent particle at rest.
    pub fn new(position: Vec2, emissive: Vec4) -> Self {
        Self {
            position: position.to_array(),
            emissive: emissive.into(),
            velocity: PackedVec2::ZERO,
            lifetime: Lifetime::PERSISTENT,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity.into();
        self
    }

    /// Give the particle a countdown in seconds.
    pub fn with_lifetime(mut self, seconds: f32) -> Self {
        self.lifetime = seconds;
        self
    }

    pub fn invulnerable(mut self) -> Self {
        self.lifetime = Lifetime::INVULNERABLE;
        self
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity.to_vec2()
    }

    #[inline]
    pub fn emissive(&self) -> Vec4 {
        self.emissive.to_vec4()
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        Lifetime::is_alive(self.lifetime)
    }
}
