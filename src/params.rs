//! Tunable simulation parameters and cursor normalization.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Knobs read by value once per tick.
///
/// Written directly by whatever tuning surface the host provides. No range
/// validation happens here; `friction` is meant to stay in `[0, 1]` and the
/// kernel clamps it when computing damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Attraction-to-cursor coefficient.
    pub magnetism: f32,
    /// Fraction of velocity lost per second.
    pub friction: f32,
    /// Inverse-distance boost added on top of the base attraction.
    pub acceleration_constant: f32,
    /// Distance clamp for the inverse-distance term, avoids the singularity at the cursor.
    pub acceleration_min_distance: f32,
    /// Cursor in normalized scene space.
    pub cursor: Vec2,
}

impl SimulationParams {
    pub const DEFAULT_MAGNETISM: f32 = 1.0;
    pub const DEFAULT_FRICTION: f32 = 0.15;
    pub const DEFAULT_ACCELERATION_CONSTANT: f32 = 0.0;
    pub const DEFAULT_ACCELERATION_MIN_DISTANCE: f32 = 1.0;

    /// Put the tuning knobs back to their defaults. The cursor tracks the
    /// pointer, not a setting, so it is kept.
    pub fn restore_defaults(&mut self) {
        *self = Self {
            cursor: self.cursor,
            ..Self::default()
        };
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            magnetism: Self::DEFAULT_MAGNETISM,
            friction: Self::DEFAULT_FRICTION,
            acceleration_constant: Self::DEFAULT_ACCELERATION_CONSTANT,
            acceleration_min_distance: Self::DEFAULT_ACCELERATION_MIN_DISTANCE,
            cursor: Vec2::ZERO,
        }
    }
}

/// Uniform block consumed by `update.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct UpdateUniforms {
    pub dt: f32,
    pub magnetism: f32,
    pub cursor: [f32; 2],
    pub friction: f32,
    pub acceleration_constant: f32,
    pub acceleration_min_distance: f32,
    pub obstacle_count: u32,
    pub capacity: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

impl UpdateUniforms {
    pub fn new(params: &SimulationParams, dt: f32, obstacle_count: u32, capacity: u32) -> Self {
        Self {
            dt,
            magnetism: params.magnetism,
            cursor: params.cursor.to_array(),
            friction: params.friction,
            acceleration_constant: params.acceleration_constant,
            acceleration_min_distance: params.acceleration_min_distance,
            obstacle_count,
            capacity,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        }
    }
}

/// Map a window-relative pixel position into normalized scene space.
///
/// `x` follows `px / width * 2 - 1`. The window's y axis points down while the
/// scene's points up, so y is flipped: `1 - py / height * 2`.
pub fn normalize_cursor(px: f64, py: f64, width: f64, height: f64) -> Vec2 {
    if width <= 0.0 || height <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        (px / width * 2.0 - 1.0) as f32,
        (1.0 - py / height * 2.0) as f32,
    )
}
