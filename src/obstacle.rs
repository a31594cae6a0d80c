//! Wall obstacles and their time-driven behaviours.
//!
//! An [`Obstacle`] is a box in scene space. Active obstacles kill particles that
//! end a tick inside them; inactive ones are still drawn. Two optional
//! behaviours change an obstacle over time:
//!
//! - [`Flicker`] pulses the color for a few seconds, then settles on a steady
//!   color, removes itself and switches the obstacle on.
//! - [`Movement`] ping-pongs the center between two points with a fixed period.
//!
//! # Example
//!
//! ```
//! use glowswarm::obstacle::{Flicker, Movement, Obstacle, ObstacleField};
//! use glam::{Vec2, Vec4};
//!
//! let mut field = ObstacleField::new();
//! let wall = field.insert(
//!     Obstacle::new(Vec2::ZERO, Vec2::new(0.05, 0.4), Vec4::new(200.0, 0.0, 0.0, 0.0))
//!         .with_flicker(Flicker::default())
//!         .with_movement(Movement::new(Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.0), 8.0)),
//! );
//!
//! assert!(field.active_boxes().is_empty());
//! for _ in 0..30 {
//!     field.advance(0.1);
//! }
//! assert!(field.get(wall).unwrap().active);
//! ```

use std::f32::consts::PI;

use glam::{Vec2, Vec4};

use crate::color::PackedRgba;
use crate::kernel::ObstacleBox;

/// Remaining flicker time below which the effect is considered finished.
///
/// Absorbs float drift from summing many small ticks.
const FLICKER_EPSILON: f32 = 1.0e-4;

/// A box obstacle.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// Center in scene space.
    pub position: Vec2,
    /// Half the box size on each axis.
    pub half_extent: Vec2,
    /// Rotation in radians. Only affects drawing; collision is axis-aligned.
    pub rotation: f32,
    /// Emissive color used when drawing the outline.
    pub color: PackedRgba,
    /// Whether the obstacle currently kills particles.
    pub active: bool,
    pub flicker: Option<Flicker>,
    pub movement: Option<Movement>,
}

impl Obstacle {
    /// An active, static obstacle.
    pub fn new(position: Vec2, half_extent: Vec2, color: Vec4) -> Self {
        Self {
            position,
            half_extent,
            rotation: 0.0,
            color: color.into(),
            active: true,
            flicker: None,
            movement: None,
        }
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    /// Attach a flicker. The obstacle stays inactive until the flicker settles.
    pub fn with_flicker(mut self, flicker: Flicker) -> Self {
        self.active = false;
        self.color = flicker.color().into();
        self.flicker = Some(flicker);
        self
    }

    /// Attach a movement and snap the center to its current point.
    pub fn with_movement(mut self, movement: Movement) -> Self {
        self.position = movement.position();
        self.movement = Some(movement);
        self
    }

    /// Collision box handed to the simulation kernel.
    pub fn collision_box(&self) -> ObstacleBox {
        ObstacleBox::new(self.position, self.half_extent)
    }

    /// Advance attached behaviours by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        if let Some(flicker) = self.flicker.as_mut() {
            let color = flicker.advance(dt);
            self.color = color.into();
            if flicker.is_settled() {
                self.flicker = None;
                self.active = true;
            }
        }

        if let Some(movement) = self.movement.as_mut() {
            self.position = movement.advance(dt);
        }
    }
}

/// Temporary color pulse that ends by switching its obstacle on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flicker {
    /// Seconds until the flicker settles.
    pub time_left: f32,
    /// Total length, used to blend from `tone` toward `steady`.
    pub duration: f32,
    /// Pulsing color at the start of the effect.
    pub tone: Vec4,
    /// Color once settled.
    pub steady: Vec4,
}

impl Flicker {
    pub const DEFAULT_DURATION: f32 = 3.0;

    pub fn new(duration: f32, tone: Vec4, steady: Vec4) -> Self {
        Self {
            time_left: duration,
            duration,
            tone,
            steady,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.time_left <= 0.0
    }

    /// Color for the current `time_left`.
    pub fn color(&self) -> Vec4 {
        if self.is_settled() || self.duration <= 0.0 {
            return self.steady;
        }
        let t = self.time_left;
        let pulse = self.tone * (1.0 + (t * 4.0 * PI).sin() / 2.0);
        pulse.lerp(self.steady, 1.0 - t / self.duration)
    }

    /// Step the countdown and return the new color.
    pub fn advance(&mut self, dt: f32) -> Vec4 {
        self.time_left -= dt;
        if self.time_left <= FLICKER_EPSILON {
            self.time_left = 0.0;
        }
        self.color()
    }
}

impl Default for Flicker {
    /// Three seconds pulsing yellow, settling on red.
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_DURATION,
            Vec4::new(200.0, 200.0, 0.0, 0.0),
            Vec4::new(200.0, 0.0, 0.0, 0.0),
        )
    }
}

/// Periodic back-and-forth motion between `a` and `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub a: Vec2,
    pub b: Vec2,
    /// Seconds for a full `a -> b -> a` cycle.
    pub period: f32,
    /// Time into the current cycle, in `[0, period)`.
    pub accum: f32,
}

impl Movement {
    pub fn new(a: Vec2, b: Vec2, period: f32) -> Self {
        Self {
            a,
            b,
            period,
            accum: 0.0,
        }
    }

    /// Start partway into the cycle.
    pub fn with_offset(mut self, seconds: f32) -> Self {
        self.accum = self.wrap(seconds);
        self
    }

    fn wrap(&self, t: f32) -> f32 {
        if self.period > 0.0 {
            t.rem_euclid(self.period)
        } else {
            0.0
        }
    }

    /// Position for the current `accum`.
    pub fn position(&self) -> Vec2 {
        if self.period <= 0.0 {
            return self.a;
        }
        let phase = self.accum / (self.period / 2.0);
        if phase < 1.0 {
            self.a.lerp(self.b, phase)
        } else {
            self.a.lerp(self.b, 2.0 - phase)
        }
    }

    /// Step the cycle and return the new position.
    pub fn advance(&mut self, dt: f32) -> Vec2 {
        self.accum = self.wrap(self.accum + dt);
        self.position()
    }
}

/// Handle returned by [`ObstacleField::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(u32);

/// The set of obstacles in the scene.
#[derive(Debug, Default)]
pub struct ObstacleField {
    next_id: u32,
    entries: Vec<(ObstacleId, Obstacle)>,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, obstacle: Obstacle) -> ObstacleId {
        let id = ObstacleId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, obstacle));
        id
    }

    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let pos = self.entries.iter().position(|(eid, _)| *eid == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.entries.iter().find(|(eid, _)| *eid == id).map(|(_, o)| o)
    }

    pub fn get_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.entries
            .iter_mut()
            .find(|(eid, _)| *eid == id)
            .map(|(_, o)| o)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.entries.iter().map(|(id, o)| (*id, o))
    }

    /// Collision boxes of every active obstacle, in insertion order.
    pub fn active_boxes(&self) -> Vec<ObstacleBox> {
        self.entries
            .iter()
            .filter(|(_, o)| o.active)
            .map(|(_, o)| o.collision_box())
            .collect()
    }

    /// Advance flickers, then movements, for every obstacle.
    pub fn advance(&mut self, dt: f32) {
        for (_, obstacle) in &mut self.entries {
            obstacle.advance(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> Vec4 {
        Vec4::new(200.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_flicker_settles_after_thirty_ticks() {
        let mut obstacle = Obstacle::new(Vec2::ZERO, Vec2::ONE, red()).with_flicker(Flicker::default());
        assert!(!obstacle.active);

        for tick in 0..29 {
            obstacle.advance(0.1);
            assert!(obstacle.flicker.is_some(), "settled early at tick {}", tick);
            assert!(!obstacle.active);
        }

        obstacle.advance(0.1);
        assert!(obstacle.flicker.is_none());
        assert!(obstacle.active);
        assert_eq!(obstacle.color.to_vec4(), red());
    }

    #[test]
    fn test_flicker_starts_on_tone() {
        let f = Flicker::default();
        // sin(3 * 4pi) = 0 and the blend factor is 0
        let c = f.color();
        assert!((c.x - 200.0).abs() < 1e-2);
        assert!((c.y - 200.0).abs() < 1e-2);
    }

    #[test]
    fn test_flicker_single_large_step() {
        let mut f = Flicker::default();
        assert_eq!(f.advance(10.0), red());
        assert!(f.is_settled());
        assert_eq!(f.time_left, 0.0);
    }

    #[test]
    fn test_movement_ping_pong() {
        let a = Vec2::new(-1.0, 0.0);
        let b = Vec2::new(1.0, 0.5);
        let mut m = Movement::new(a, b, 10.0);

        assert_eq!(m.position(), a);
        assert_eq!(m.advance(5.0), b);
        assert_eq!(m.advance(5.0), a);
        assert_eq!(m.accum, 0.0);
    }

    #[test]
    fn test_movement_quarter_phases() {
        let mut m = Movement::new(Vec2::ZERO, Vec2::new(4.0, 0.0), 8.0);
        assert_eq!(m.advance(2.0), Vec2::new(2.0, 0.0));
        assert_eq!(m.advance(4.0), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_movement_zero_period_stays_put() {
        let mut m = Movement::new(Vec2::ONE, Vec2::ZERO, 0.0);
        assert_eq!(m.advance(1.0), Vec2::ONE);
    }

    #[test]
    fn test_field_insert_remove() {
        let mut field = ObstacleField::new();
        let a = field.insert(Obstacle::new(Vec2::ZERO, Vec2::ONE, red()));
        let b = field.insert(Obstacle::new(Vec2::ONE, Vec2::ONE, red()));
        assert_ne!(a, b);
        assert_eq!(field.len(), 2);

        assert!(field.remove(a).is_some());
        assert!(field.remove(a).is_none());
        assert!(field.get(b).is_some());
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn test_active_boxes_skip_inactive() {
        let mut field = ObstacleField::new();
        field.insert(Obstacle::new(Vec2::new(0.5, 0.0), Vec2::splat(0.1), red()));
        field.insert(Obstacle::new(Vec2::ZERO, Vec2::ONE, red()).with_flicker(Flicker::default()));

        let boxes = field.active_boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].position, [0.5, 0.0]);
        assert_eq!(boxes[0].half_extent, [0.1, 0.1]);
    }

    #[test]
    fn test_movement_updates_collision_box() {
        let mut field = ObstacleField::new();
        let id = field.insert(
            Obstacle::new(Vec2::ZERO, Vec2::ONE, red())
                .with_movement(Movement::new(Vec2::ZERO, Vec2::new(1.0, 0.0), 2.0)),
        );
        field.advance(1.0);
        assert_eq!(field.get(id).map(|o| o.position), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(field.active_boxes()[0].position, [1.0, 0.0]);
    }
}
