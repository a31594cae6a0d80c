//! GPU particle engine.
//!
//! Buffers:
//!
//! | Buffer | Layout |
//! |--------|--------|
//! | particles | `capacity` × [`Particle`] |
//! | tombstones | `i32` count, then `capacity` free indices |
//! | render list | `u32` count, then up to `capacity` indices |
//! | obstacles | active [`ObstacleBox`]es, grown on demand |
//!
//! `update.wgsl` pushes onto the tombstone stack and appends to the render list;
//! `add.wgsl` pops from the tombstone stack. Ingestion and update are separate
//! submissions, so they never overlap.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::{compute_pipeline, dispatch_size, read_word, storage_entry, uniform_entry};
use crate::engine::{clamp_alive, ParticleEngine};
use crate::kernel::ObstacleBox;
use crate::params::{SimulationParams, UpdateUniforms};
use crate::particle::Particle;
use crate::pool::full_free_list_words;
use crate::shaders::ShaderSet;

const PARTICLE_SIZE: u64 = std::mem::size_of::<Particle>() as u64;
const OBSTACLE_SIZE: u64 = std::mem::size_of::<ObstacleBox>() as u64;

/// Particle pool living in GPU buffers.
pub struct GpuSwarm {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    capacity: u32,
    params: SimulationParams,

    update_pipeline: wgpu::ComputePipeline,
    update_layout: wgpu::BindGroupLayout,
    add_pipeline: wgpu::ComputePipeline,
    add_layout: wgpu::BindGroupLayout,

    particles: wgpu::Buffer,
    tombstones: wgpu::Buffer,
    render_list: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    obstacles: wgpu::Buffer,
    obstacle_slots: u32,
    readback: wgpu::Buffer,
    update_bind_group: wgpu::BindGroup,

    last_alive: u32,
}

impl GpuSwarm {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        shaders: &ShaderSet,
        capacity: u32,
    ) -> Self {
        let compute = wgpu::ShaderStages::COMPUTE;

        let update_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Update Layout"),
            entries: &[
                storage_entry(0, compute, false),
                storage_entry(1, compute, false),
                storage_entry(2, compute, false),
                storage_entry(3, compute, true),
                uniform_entry(4, compute),
            ],
        });
        let add_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Add Layout"),
            entries: &[
                storage_entry(0, compute, false),
                storage_entry(1, compute, false),
                storage_entry(2, compute, true),
            ],
        });

        let update_pipeline = compute_pipeline(&device, "Particle Update", &shaders.update, &update_layout);
        let add_pipeline = compute_pipeline(&device, "Particle Add", &shaders.add, &add_layout);

        let capacity = clamp_capacity(&device, capacity);
        let (particles, tombstones, render_list) = create_pool(&device, capacity);

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Update Uniforms"),
            size: std::mem::size_of::<UpdateUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let obstacle_slots = 8;
        let obstacles = create_obstacle_buffer(&device, obstacle_slots);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Free List Readback"),
            size: 4,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let update_bind_group = create_update_bind_group(
            &device,
            &update_layout,
            &particles,
            &tombstones,
            &render_list,
            &obstacles,
            &uniforms,
        );

        log::info!("GPU swarm ready with {} slots", capacity);

        Self {
            device,
            queue,
            capacity,
            params: SimulationParams::default(),
            update_pipeline,
            update_layout,
            add_pipeline,
            add_layout,
            particles,
            tombstones,
            render_list,
            uniforms,
            obstacles,
            obstacle_slots,
            readback,
            update_bind_group,
            last_alive: 0,
        }
    }

    /// Particle storage, read by the splat pass.
    pub fn particle_buffer(&self) -> &wgpu::Buffer {
        &self.particles
    }

    /// Count-prefixed render indices from the last step.
    pub fn render_list_buffer(&self) -> &wgpu::Buffer {
        &self.render_list
    }

    fn rebuild_update_bind_group(&mut self) {
        self.update_bind_group = create_update_bind_group(
            &self.device,
            &self.update_layout,
            &self.particles,
            &self.tombstones,
            &self.render_list,
            &self.obstacles,
            &self.uniforms,
        );
    }

    fn upload_obstacles(&mut self, boxes: &[ObstacleBox]) {
        if boxes.len() as u32 > self.obstacle_slots {
            self.obstacle_slots = (boxes.len() as u32).next_power_of_two();
            self.obstacles = create_obstacle_buffer(&self.device, self.obstacle_slots);
            self.rebuild_update_bind_group();
        }
        if !boxes.is_empty() {
            self.queue
                .write_buffer(&self.obstacles, 0, bytemuck::cast_slice(boxes));
        }
    }
}

impl ParticleEngine for GpuSwarm {
    fn reset(&mut self, hard: bool, capacity: u32) {
        log::info!("resetting GPU swarm (hard: {}, capacity: {})", hard, capacity);
        if hard {
            self.params.restore_defaults();
        }
        self.capacity = clamp_capacity(&self.device, capacity);
        let (particles, tombstones, render_list) = create_pool(&self.device, self.capacity);
        self.particles = particles;
        self.tombstones = tombstones;
        self.render_list = render_list;
        self.rebuild_update_bind_group();
        self.last_alive = 0;
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut SimulationParams {
        &mut self.params
    }

    fn add_particles(&mut self, particles: &[Particle]) {
        if particles.is_empty() || self.capacity == 0 {
            return;
        }

        let incoming = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Incoming Particles"),
                contents: bytemuck::cast_slice(particles),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Add Bind Group"),
            layout: &self.add_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.particles.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.tombstones.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: incoming.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Add Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Add Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.add_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (x, y) = dispatch_size(particles.len() as u32);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn step(&mut self, dt: f32, obstacles: &[ObstacleBox]) {
        if self.capacity == 0 {
            return;
        }
        self.upload_obstacles(obstacles);

        let uniforms = UpdateUniforms::new(&self.params, dt, obstacles.len() as u32, self.capacity);
        self.queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Update Encoder"),
            });
        // Fresh render list every tick.
        encoder.clear_buffer(&self.render_list, 0, Some(4));
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Update Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.update_pipeline);
            pass.set_bind_group(0, &self.update_bind_group, &[]);
            let (x, y) = dispatch_size(self.capacity);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn alive_count(&mut self) -> u32 {
        if self.capacity == 0 {
            // The placeholder slot in an empty pool is never handed out.
            return 0;
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Free List Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.tombstones, 0, &self.readback, 0, 4);
        self.queue.submit(Some(encoder.finish()));

        match read_word(&self.device, &self.readback) {
            Ok(word) => {
                // The kernels treat the count as signed.
                let free = word as i32 as i64;
                self.last_alive = clamp_alive(self.capacity, free);
            }
            Err(e) => log::warn!("free list readback failed: {}", e),
        }
        self.last_alive
    }
}

/// Largest pool whose particle buffer fits one storage binding.
fn clamp_capacity(device: &wgpu::Device, capacity: u32) -> u32 {
    let max = device.limits().max_storage_buffer_binding_size as u64 / PARTICLE_SIZE;
    if capacity as u64 > max {
        log::warn!(
            "capacity {} exceeds this device's storage binding limit, using {}",
            capacity,
            max
        );
        max as u32
    } else {
        capacity
    }
}

fn create_pool(device: &wgpu::Device, capacity: u32) -> (wgpu::Buffer, wgpu::Buffer, wgpu::Buffer) {
    // Zero-sized bindings are invalid, keep at least one slot of storage.
    // An empty pool never dispatches, so the placeholder is never used.
    let slots = capacity.max(1) as u64;

    // New buffers are zero-initialized, so every slot starts dead.
    let particles = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Buffer"),
        size: slots * PARTICLE_SIZE,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let tombstones = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Tombstone Buffer"),
        contents: bytemuck::cast_slice(&full_free_list_words(capacity.max(1))),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    });

    let render_list = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Render Index Buffer"),
        size: (slots + 1) * 4,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    (particles, tombstones, render_list)
}

fn create_obstacle_buffer(device: &wgpu::Device, slots: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Obstacle Buffer"),
        size: slots.max(1) as u64 * OBSTACLE_SIZE,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_update_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    particles: &wgpu::Buffer,
    tombstones: &wgpu::Buffer,
    render_list: &wgpu::Buffer,
    obstacles: &wgpu::Buffer,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Particle Update Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: particles.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: tombstones.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: render_list.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: obstacles.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: uniforms.as_entire_binding(),
            },
        ],
    })
}
