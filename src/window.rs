//! Windowed sandbox: winit event handling and the per-frame GPU chain.

use std::sync::Arc;

use glam::{Vec2, Vec4};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

use crossbeam_channel::Sender;

use crate::bloom::fitting_passes;
use crate::engine::ParticleEngine;
use crate::error::GlowError;
use crate::gpu::bloom::{Bloom, BloomSettings};
use crate::gpu::compositor::Compositor;
use crate::gpu::primitives::{DebugCircle, DebugLine, PrimitiveRenderer};
use crate::gpu::swarm::GpuSwarm;
use crate::gpu::tonemap::Tonemap;
use crate::gpu::GpuContext;
use crate::obstacle::{Flicker, Movement, Obstacle, ObstacleField};
use crate::params::normalize_cursor;
use crate::sandbox::{Command, CursorEvent, Sandbox, SandboxConfig, Spawner};
use crate::shaders::ShaderSet;
use crate::spawn::{burst, hsv_to_rgba, ring, BurstShape};
use crate::time::FrameClock;

/// Seconds of simulation time between automatic bursts.
const BURST_INTERVAL: f32 = 0.5;
const BURST_SIZE: u32 = 20_000;
const RING_SIZE: u32 = 4_096;

/// Log alive count and FPS every this many frames.
const STATS_INTERVAL: u64 = 240;

/// Emits a seed every `interval` seconds of accumulated tick time.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstSchedule {
    interval: f32,
    elapsed: f32,
    next_seed: u32,
}

impl BurstSchedule {
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            elapsed: 0.0,
            next_seed: 1,
        }
    }

    /// Returns the seed of the burst due after `dt`, if any. At most one per call.
    pub fn advance(&mut self, dt: f32) -> Option<u32> {
        self.elapsed += dt;
        if self.interval <= 0.0 || self.elapsed < self.interval {
            return None;
        }
        self.elapsed -= self.interval;
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(1);
        Some(seed)
    }
}

/// Center of the burst for `seed`, kept away from the window edges.
pub fn burst_center(seed: u32) -> Vec2 {
    let x = seed.wrapping_mul(0x9E37_79B9);
    let y = seed.wrapping_mul(0x85EB_CA6B) ^ 0x5bd1_e995;
    let unit = |v: u32| (v >> 8) as f32 / (1u32 << 24) as f32;
    Vec2::new(unit(x) * 1.6 - 0.8, unit(y) * 1.6 - 0.8)
}

/// The demo scene: a flickering wall sweeping up and down, a fixed wall and
/// a bar sliding along the bottom.
pub fn seed_obstacles(field: &mut ObstacleField) {
    let red = Vec4::new(200.0, 0.0, 0.0, 0.0);

    field.insert(
        Obstacle::new(Vec2::ZERO, Vec2::new(0.02, 0.25), red)
            .with_flicker(Flicker::default())
            .with_movement(Movement::new(Vec2::new(-0.5, -0.5), Vec2::new(-0.5, 0.5), 6.0)),
    );
    field.insert(Obstacle::new(Vec2::new(0.6, 0.1), Vec2::new(0.05, 0.05), red).with_rotation(0.3));
    field.insert(
        Obstacle::new(Vec2::ZERO, Vec2::new(0.2, 0.015), Vec4::new(0.0, 40.0, 200.0, 0.0))
            .with_flicker(Flicker::new(
                1.5,
                Vec4::new(0.0, 200.0, 200.0, 0.0),
                Vec4::new(0.0, 40.0, 200.0, 0.0),
            ))
            .with_movement(Movement::new(Vec2::new(-0.6, -0.75), Vec2::new(0.6, -0.75), 10.0).with_offset(2.5)),
    );
}

/// Travel paths of every moving obstacle.
pub fn movement_paths(field: &ObstacleField) -> Vec<DebugLine> {
    let dim = Vec4::new(0.4, 0.4, 0.4, 0.0);
    field
        .iter()
        .filter_map(|(_, o)| o.movement.as_ref())
        .map(|m| DebugLine {
            p0: m.a,
            color0: dim,
            p1: m.b,
            color1: dim,
        })
        .collect()
}

/// Everything that exists once the window has a GPU surface.
struct FrameState {
    window: Arc<Window>,
    gpu: GpuContext,
    sandbox: Sandbox<GpuSwarm>,
    compositor: Compositor,
    primitives: PrimitiveRenderer,
    bloom: Bloom,
    tonemap: Tonemap,
    clock: FrameClock,
    config: SandboxConfig,

    spawner: Spawner,
    cursor_tx: Sender<CursorEvent>,
    command_tx: Sender<Command>,
    bursts: BurstSchedule,
    cursor: Vec2,
}

impl FrameState {
    fn new(window: Arc<Window>, config: &SandboxConfig) -> Result<Self, GlowError> {
        let shaders = match &config.shader_dir {
            Some(dir) => ShaderSet::from_dir(dir)?,
            None => ShaderSet::builtin(),
        };

        let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
        let (width, height) = gpu.size();
        let extent = config.render_extent(width, height);

        let swarm = GpuSwarm::new(gpu.device.clone(), gpu.queue.clone(), &shaders, config.capacity);
        let mut sandbox = Sandbox::new(swarm);
        seed_obstacles(sandbox.obstacles_mut());

        let compositor = Compositor::new(gpu.device.clone(), gpu.queue.clone(), &shaders, extent);
        let primitives = PrimitiveRenderer::new(gpu.device.clone(), &shaders);
        let bloom = Bloom::new(
            gpu.device.clone(),
            &shaders,
            BloomSettings {
                passes: config.bloom_passes,
                strength: config.bloom_strength,
                width: config.bloom_width,
            },
            compositor.hdr_view(),
            compositor.extent(),
        );
        let tonemap = Tonemap::new(
            gpu.device.clone(),
            gpu.queue.clone(),
            &shaders,
            compositor.hdr_view(),
            compositor.extent(),
            gpu.format(),
            config.exposure,
        );

        log::info!(
            "rendering at {}x{} with {} bloom passes",
            extent.0,
            extent.1,
            fitting_passes(extent, config.bloom_passes)
        );

        Ok(Self {
            window,
            spawner: sandbox.spawner(),
            cursor_tx: sandbox.cursor_sender(),
            command_tx: sandbox.command_sender(),
            gpu,
            sandbox,
            compositor,
            primitives,
            bloom,
            tonemap,
            clock: FrameClock::new(config.tick_rate),
            config: config.clone(),
            bursts: BurstSchedule::new(BURST_INTERVAL),
            cursor: Vec2::ZERO,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
        self.compositor
            .resize(self.config.render_extent(width, height));
        let extent = self.compositor.extent();
        self.bloom.resize(self.compositor.hdr_view(), extent);
        self.tonemap.resize(self.compositor.hdr_view(), extent);
    }

    fn cursor_moved(&mut self, x: f64, y: f64) {
        let (width, height) = self.gpu.size();
        let event = CursorEvent {
            x,
            y,
            window_width: width as f64,
            window_height: height as f64,
        };
        self.cursor = normalize_cursor(x, y, event.window_width, event.window_height);
        let _ = self.cursor_tx.send(event);
    }

    fn spawn_ring(&self) {
        self.spawner
            .spawn(ring(self.cursor, RING_SIZE, 0.02, 0.6, 3.0, 4.0));
    }

    fn reset(&self, hard: bool) {
        let capacity = self.config.capacity;
        let _ = self.command_tx.send(Command::Reset { hard, capacity });
    }

    fn simulate(&mut self) {
        for dt in self.clock.update() {
            if let Some(seed) = self.bursts.advance(dt) {
                let color = hsv_to_rgba(seed as f32 * 0.137, 0.8, 4.0);
                self.spawner.spawn(burst(
                    burst_center(seed),
                    BURST_SIZE,
                    BurstShape::Disc { radius: 0.05 },
                    0.5,
                    color,
                    seed,
                ));
            }
            self.sandbox.tick(dt);
        }

        if self.clock.frame() % STATS_INTERVAL == 0 {
            let alive = self.sandbox.engine_mut().alive_count();
            log::debug!(
                "{} particles alive, {:.1} fps, {} ticks",
                alive,
                self.clock.fps(),
                self.sandbox.ticks()
            );
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.simulate();

        let output = self.gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let hdr = self.compositor.hdr_view();
        self.compositor.clear(&mut encoder);
        self.primitives
            .draw_obstacles(&mut encoder, hdr, self.sandbox.obstacles());
        self.primitives
            .draw_lines(&mut encoder, hdr, &movement_paths(self.sandbox.obstacles()));
        self.primitives.draw_circles(
            &mut encoder,
            hdr,
            &[DebugCircle {
                center: self.cursor,
                radius: 0.03,
                color: Vec4::new(0.5, 0.5, 1.0, 0.0),
            }],
        );
        self.compositor
            .draw_particles(&mut encoder, self.sandbox.engine());
        self.bloom.apply(&mut encoder, hdr);
        self.tonemap.apply(&mut encoder, self.clock.frame());
        self.tonemap.blit(&mut encoder, &surface_view);

        self.gpu.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

struct App {
    config: SandboxConfig,
    state: Option<FrameState>,
    error: Option<GlowError>,
    modifiers: ModifiersState,
}

impl App {
    fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            state: None,
            error: None,
            modifiers: ModifiersState::empty(),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: GlowError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let (width, height) = self.config.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        match FrameState::new(window.clone(), &self.config) {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                state.resize(physical_size.width, physical_size.height);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                state.spawn_ring();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::KeyR => state.reset(self.modifiers.shift_key()),
                KeyCode::Space => state.clock.toggle_pause(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                match state.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::warn!("surface lost, reconfiguring");
                        let (width, height) = state.gpu.size();
                        state.resize(width, height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("skipping frame: {:?}", e),
                }
                state.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Open a window and run the sandbox until it is closed.
pub fn run(config: SandboxConfig) -> Result<(), GlowError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_schedule() {
        let mut schedule = BurstSchedule::new(0.5);
        let due: Vec<u32> = (0..100).filter_map(|_| schedule.advance(1.0 / 120.0)).collect();
        assert_eq!(due, vec![1]);
        assert_eq!(schedule.advance(0.5), Some(2));
    }

    #[test]
    fn test_burst_schedule_disabled() {
        let mut schedule = BurstSchedule::new(0.0);
        assert_eq!(schedule.advance(10.0), None);
    }

    #[test]
    fn test_burst_centers_stay_inside() {
        for seed in 0..1000 {
            let c = burst_center(seed);
            assert!(c.x.abs() <= 0.8 && c.y.abs() <= 0.8, "seed {} at {:?}", seed, c);
        }
    }

    #[test]
    fn test_demo_scene_arms_after_flicker() {
        let mut field = ObstacleField::new();
        seed_obstacles(&mut field);
        assert_eq!(field.len(), 3);
        assert_eq!(field.active_boxes().len(), 1);
        assert_eq!(movement_paths(&field).len(), 2);

        for _ in 0..30 {
            field.advance(0.1);
        }
        assert_eq!(field.active_boxes().len(), 3);
    }
}
