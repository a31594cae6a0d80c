//! Sandbox configuration and the per-tick driver.
//!
//! [`Sandbox`] owns a [`ParticleEngine`] and the [`ObstacleField`] and runs the
//! fixed per-tick call list. Other parts of the program talk to it through
//! typed channels: a [`Spawner`] for particle batches, a cursor sender for
//! [`CursorEvent`]s and a command sender for [`Command`]s. Everything queued
//! is applied at the start of the next tick, never during a step.
//!
//! Spawn batches and resets share one queue, so they apply in the order they
//! were sent: a reset wipes batches queued before it.
//!
//! # Example
//!
//! ```
//! use glowswarm::prelude::*;
//!
//! let mut sandbox = Sandbox::new(ParticleSwarm::new(1000));
//! let spawner = sandbox.spawner();
//!
//! spawner.spawn(vec![Particle::new(Vec2::new(0.5, 0.0), Vec4::ONE); 10]);
//! sandbox.tick(1.0 / 120.0);
//! assert_eq!(sandbox.engine_mut().alive_count(), 10);
//! ```

use std::path::PathBuf;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::engine::ParticleEngine;
use crate::obstacle::ObstacleField;
use crate::params::normalize_cursor;
use crate::particle::Particle;
use crate::time::DEFAULT_TICK_RATE;

/// Cursor moved inside the window, in window pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorEvent {
    pub x: f64,
    pub y: f64,
    pub window_width: f64,
    pub window_height: f64,
}

/// Requests applied between ticks, in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ingest a batch of particles.
    Spawn(Vec<Particle>),
    /// Free every slot and resize the pool. A hard reset also restores
    /// default tuning parameters.
    Reset { hard: bool, capacity: u32 },
}

/// Cloneable handle for queueing particle batches.
#[derive(Debug, Clone)]
pub struct Spawner {
    tx: Sender<Command>,
}

impl Spawner {
    /// Queue a batch for the next tick. Returns `false` if the sandbox is gone.
    pub fn spawn(&self, particles: Vec<Particle>) -> bool {
        if particles.is_empty() {
            return true;
        }
        self.tx.send(Command::Spawn(particles)).is_ok()
    }
}

/// Runtime configuration for the windowed sandbox.
///
/// # Example
///
/// ```
/// use glowswarm::sandbox::SandboxConfig;
///
/// let config = SandboxConfig::new()
///     .with_capacity(1_000_000)
///     .with_bloom(5, 0.2, 1.5)
///     .with_render_scale(0.5);
/// assert_eq!(config.capacity, 1_000_000);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Particle pool size.
    pub capacity: u32,
    /// Simulation ticks per second.
    pub tick_rate: f32,
    /// Number of bloom mip levels.
    pub bloom_passes: u32,
    /// Weight of the final bloom composite.
    pub bloom_strength: f32,
    /// Upsample filter radius in texels.
    pub bloom_width: f32,
    /// Exposure multiplier applied before tone mapping.
    pub exposure: f32,
    /// Internal resolution relative to the window.
    pub render_scale: f32,
    /// Load WGSL from this directory instead of the built-in sources.
    pub shader_dir: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub title: String,
}

impl SandboxConfig {
    pub const DEFAULT_CAPACITY: u32 = 5_000_000;

    pub fn new() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            tick_rate: DEFAULT_TICK_RATE,
            bloom_passes: 6,
            bloom_strength: 1.0 / 16.0,
            bloom_width: 1.0,
            exposure: 1.0,
            render_scale: 1.0,
            shader_dir: None,
            window_size: (1280, 720),
            title: "glowswarm".to_string(),
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_tick_rate(mut self, ticks_per_second: f32) -> Self {
        self.tick_rate = ticks_per_second;
        self
    }

    /// Bloom mip count, final composite strength and upsample radius.
    pub fn with_bloom(mut self, passes: u32, strength: f32, width: f32) -> Self {
        self.bloom_passes = passes;
        self.bloom_strength = strength;
        self.bloom_width = width;
        self
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    /// Render at `scale` times the window size; the final blit rescales.
    pub fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale.clamp(0.1, 4.0);
        self
    }

    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Internal render resolution for a given surface size, never zero.
    pub fn render_extent(&self, surface_width: u32, surface_height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.render_scale).round() as u32).max(1);
        (scale(surface_width), scale(surface_height))
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a particle engine and its obstacles one fixed tick at a time.
pub struct Sandbox<E: ParticleEngine> {
    engine: E,
    obstacles: ObstacleField,
    cursor_tx: Sender<CursorEvent>,
    cursor_rx: Receiver<CursorEvent>,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
    ticks: u64,
}

impl<E: ParticleEngine> Sandbox<E> {
    pub fn new(engine: E) -> Self {
        let (cursor_tx, cursor_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        Self {
            engine,
            obstacles: ObstacleField::new(),
            cursor_tx,
            cursor_rx,
            command_tx,
            command_rx,
            ticks: 0,
        }
    }

    pub fn spawner(&self) -> Spawner {
        Spawner {
            tx: self.command_tx.clone(),
        }
    }

    pub fn cursor_sender(&self) -> Sender<CursorEvent> {
        self.cursor_tx.clone()
    }

    pub fn command_sender(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn obstacles(&self) -> &ObstacleField {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut ObstacleField {
        &mut self.obstacles
    }

    /// Ticks run since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Reset the engine immediately. Obstacles are kept.
    pub fn reset(&mut self, hard: bool, capacity: u32) {
        self.engine.reset(hard, capacity);
    }

    /// Apply queued spawns and resets in send order, then the latest cursor move.
    pub fn drain_events(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                Command::Spawn(batch) => self.engine.add_particles(&batch),
                Command::Reset { hard, capacity } => self.reset(hard, capacity),
            }
        }

        if let Some(event) = self.cursor_rx.try_iter().last() {
            self.engine.params_mut().cursor = normalize_cursor(
                event.x,
                event.y,
                event.window_width,
                event.window_height,
            );
        }
    }

    /// One fixed simulation tick.
    ///
    /// Collision boxes are captured before behaviours advance, so an obstacle
    /// that finishes flickering this tick starts killing particles next tick.
    pub fn tick(&mut self, dt: f32) {
        self.drain_events();

        let boxes = self.obstacles.active_boxes();
        self.obstacles.advance(dt);
        self.engine.step(dt, &boxes);

        self.ticks += 1;
    }
}
