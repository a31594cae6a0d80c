//! Fixed-tick frame clock.
//!
//! The simulation advances in fixed steps decoupled from the frame rate: each
//! frame adds its wall-clock delta to an accumulator and drains whole ticks
//! out of it. A frame delta longer than one second (a stall, a debugger break,
//! a dragged window) is replaced with a single tick so the simulation does not
//! try to catch up.
//!
//! # Example
//!
//! ```ignore
//! use glowswarm::time::FrameClock;
//!
//! let mut clock = FrameClock::new(120.0);
//!
//! // In your frame loop:
//! for dt in clock.update() {
//!     sandbox.tick(dt);
//! }
//! println!("FPS: {:.1}", clock.fps());
//! ```

use std::time::{Duration, Instant};

/// Frame deltas above this are treated as a stall.
pub const MAX_FRAME_DELTA: f32 = 1.0;

/// Default simulation rate in ticks per second.
pub const DEFAULT_TICK_RATE: f32 = 120.0;

/// Accumulator-based tick scheduler with frame and FPS counters.
#[derive(Debug)]
pub struct FrameClock {
    /// Seconds per tick.
    tick: f32,
    /// Unconsumed simulation time.
    accumulator: f32,
    /// When the last frame occurred.
    last_frame: Instant,
    /// Total frames since start.
    frame_count: u64,
    /// Total ticks handed out since start.
    tick_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    /// Frame count at last FPS update.
    fps_frame_count: u64,
    /// Time of last FPS calculation.
    fps_update_time: Instant,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
    /// While paused frames still count but no ticks are produced.
    paused: bool,
}

impl FrameClock {
    /// A clock producing `tick_rate` ticks per second of wall time.
    ///
    /// Non-positive or non-finite rates fall back to [`DEFAULT_TICK_RATE`].
    pub fn new(tick_rate: f32) -> Self {
        let rate = if tick_rate.is_finite() && tick_rate > 0.0 {
            tick_rate
        } else {
            DEFAULT_TICK_RATE
        };
        let now = Instant::now();
        Self {
            tick: 1.0 / rate,
            accumulator: 0.0,
            last_frame: now,
            frame_count: 0,
            tick_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
        }
    }

    /// Measure the wall-clock delta since the last call and return the ticks due.
    pub fn update(&mut self) -> Ticks {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }

        self.advance(delta)
    }

    /// Feed a frame delta in seconds and return the ticks due.
    ///
    /// This is the deterministic core of [`update`](Self::update).
    pub fn advance(&mut self, delta: f32) -> Ticks {
        self.frame_count += 1;

        if self.paused {
            return Ticks::none(self.tick);
        }

        let delta = if delta > MAX_FRAME_DELTA || !delta.is_finite() {
            self.tick
        } else {
            delta.max(0.0)
        };

        self.accumulator += delta;
        let mut due = 0;
        while self.accumulator >= self.tick {
            self.accumulator -= self.tick;
            due += 1;
        }
        self.tick_count += due as u64;

        Ticks {
            remaining: due,
            dt: self.tick,
        }
    }

    /// Seconds per tick.
    #[inline]
    pub fn tick_duration(&self) -> f32 {
        self.tick
    }

    /// Fraction of a tick left in the accumulator, in `[0, 1)`.
    #[inline]
    pub fn overshoot(&self) -> f32 {
        self.accumulator / self.tick
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.tick_count
    }

    /// Calculated frames per second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.accumulator = 0.0;
    }

    /// Drop any unconsumed time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_frame = Instant::now();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

/// Ticks due this frame. Yields the fixed `dt` once per tick.
#[derive(Debug, Clone, Copy)]
pub struct Ticks {
    remaining: u32,
    dt: f32,
}

impl Ticks {
    fn none(dt: f32) -> Self {
        Self { remaining: 0, dt }
    }
}

impl Iterator for Ticks {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.dt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl ExactSizeIterator for Ticks {}
