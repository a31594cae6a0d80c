//! # glowswarm
//!
//! A GPU particle sandbox: millions of glowing 2D particles drawn toward the
//! cursor, killed by wall obstacles and composited through an HDR bloom chain.
//!
//! ## Quick Start
//!
//! ```no_run
//! use glowswarm::sandbox::SandboxConfig;
//!
//! fn main() -> Result<(), glowswarm::GlowError> {
//!     glowswarm::run(
//!         SandboxConfig::new()
//!             .with_capacity(2_000_000)
//!             .with_bloom(6, 1.0 / 16.0, 1.0),
//!     )
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! A [`Particle`] is a 24-byte record: position, packed half-float emissive
//! color and velocity, and a lifetime. The lifetime doubles as the liveness
//! flag; see [`Lifetime`] for the sentinel values.
//!
//! ### Engines
//!
//! [`ParticleEngine`] is the pool contract: fixed capacity, a free list of
//! vacant slots, batched ingestion and a fixed-`dt` step. Two engines
//! implement it:
//!
//! - [`ParticleSwarm`] runs the kernel on the CPU with rayon.
//! - [`gpu::swarm::GpuSwarm`] runs `update.wgsl` and `add.wgsl` in wgpu buffers.
//!
//! ### Obstacles
//!
//! [`ObstacleField`] holds box [`Obstacle`]s. Active ones kill particles that
//! end a tick inside them. [`Flicker`] and [`Movement`] animate them.
//!
//! ### Sandbox
//!
//! [`Sandbox`] owns an engine and the obstacles and runs one tick at a time:
//! drain queued spawns and cursor moves, capture active boxes, advance
//! obstacles, step the engine.
//!
//! ## Rendering
//!
//! Each frame clears an `Rgba16Float` target, draws obstacle outlines, splats
//! particles into three atomic fixed-point channels, resolves them additively,
//! runs a bloom mip chain, tonemaps with dithering and blits to the window.

pub mod bloom;
pub mod color;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod kernel;
pub mod obstacle;
pub mod params;
pub mod particle;
pub mod pool;
pub mod sandbox;
pub mod shaders;
pub mod spawn;
pub mod swarm;
pub mod time;
mod window;

pub use bytemuck;
pub use engine::ParticleEngine;
pub use error::{GlowError, GpuError, ShaderError};
pub use glam::{Vec2, Vec4};
pub use kernel::ObstacleBox;
pub use obstacle::{Flicker, Movement, Obstacle, ObstacleField, ObstacleId};
pub use params::SimulationParams;
pub use particle::{Lifetime, Particle};
pub use sandbox::{Command, CursorEvent, Sandbox, SandboxConfig, Spawner};
pub use swarm::ParticleSwarm;
pub use window::{burst_center, movement_paths, run, seed_obstacles, BurstSchedule};

/// Convenience re-exports for common usage.
///
/// ```
/// use glowswarm::prelude::*;
/// ```
pub mod prelude {
    pub use crate::engine::ParticleEngine;
    pub use crate::gpu::primitives::{DebugCircle, DebugLine};
    pub use crate::kernel::ObstacleBox;
    pub use crate::obstacle::{Flicker, Movement, Obstacle, ObstacleField, ObstacleId};
    pub use crate::params::SimulationParams;
    pub use crate::particle::{Lifetime, Particle};
    pub use crate::sandbox::{Command, CursorEvent, Sandbox, SandboxConfig, Spawner};
    pub use crate::spawn::{burst, ring, BurstShape, SpawnContext};
    pub use crate::swarm::ParticleSwarm;
    pub use crate::time::FrameClock;
    pub use crate::{Vec2, Vec4};
}
