//! HDR scene target and particle accumulation.
//!
//! Particles are splatted by a compute pass into three fixed-point atomic
//! channels, one `u32` per pixel each. A fullscreen pass then decodes them and
//! adds the result onto the HDR target, on top of whatever primitives were
//! already drawn there.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::primitives::begin_load_pass;
use super::swarm::GpuSwarm;
use super::{dispatch_size, render_texture, storage_entry, uniform_entry, ADDITIVE, HDR_FORMAT};
use crate::engine::ParticleEngine;
use crate::shaders::{module, ShaderSet};

/// Fixed-point scale of the accumulation channels.
///
/// A pixel channel saturates at `u32::MAX / ACCUMULATION_SCALE` summed
/// intensity, about 4.19 million.
pub const ACCUMULATION_SCALE: f32 = 1024.0;

/// Fixed-point value a splat adds for one channel.
pub fn quantize(channel: f32) -> u32 {
    (channel.max(0.0) * ACCUMULATION_SCALE) as u32
}

/// One splat added onto an accumulated channel, as `splat.wgsl` does it.
pub fn accumulate(raw: u32, channel: f32) -> u32 {
    raw.saturating_add(quantize(channel))
}

/// Decoded value of an accumulated channel.
pub fn dequantize(raw: u32) -> f32 {
    raw as f32 / ACCUMULATION_SCALE
}

/// Shared by the splat and resolve shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct FrameInfo {
    width: u32,
    height: u32,
    scale: f32,
    _pad: u32,
}

pub struct Compositor {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    extent: (u32, u32),

    hdr_view: wgpu::TextureView,
    accum: [wgpu::Buffer; 3],
    frame_info: wgpu::Buffer,

    splat_pipeline: wgpu::ComputePipeline,
    splat_layout: wgpu::BindGroupLayout,
    resolve_pipeline: wgpu::RenderPipeline,
    resolve_layout: wgpu::BindGroupLayout,
    resolve_bind_group: wgpu::BindGroup,
}

impl Compositor {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        shaders: &ShaderSet,
        extent: (u32, u32),
    ) -> Self {
        let extent = (extent.0.max(1), extent.1.max(1));

        let splat_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Splat Layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(1, wgpu::ShaderStages::COMPUTE, true),
                storage_entry(2, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(3, wgpu::ShaderStages::COMPUTE, false),
                storage_entry(4, wgpu::ShaderStages::COMPUTE, false),
                uniform_entry(5, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let splat_pipeline = super::compute_pipeline(&device, "Splat Pipeline", &shaders.splat, &splat_layout);

        let resolve_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Resolve Layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::FRAGMENT, true),
                storage_entry(1, wgpu::ShaderStages::FRAGMENT, true),
                storage_entry(2, wgpu::ShaderStages::FRAGMENT, true),
                uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            ],
        });
        let resolve_shader = module(&device, "Resolve Shader", &shaders.resolve);
        let resolve_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Resolve Pipeline Layout"),
            bind_group_layouts: &[&resolve_layout],
            push_constant_ranges: &[],
        });
        let resolve_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Resolve Pipeline"),
            layout: Some(&resolve_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &resolve_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &resolve_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: HDR_FORMAT,
                    blend: Some(ADDITIVE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let frame_info = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Info"),
            contents: bytemuck::bytes_of(&frame_info_for(extent)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let hdr_view = render_texture(&device, "HDR Target", extent, HDR_FORMAT, 1)
            .create_view(&wgpu::TextureViewDescriptor::default());
        let accum = create_accumulation(&device, extent);
        let resolve_bind_group = create_resolve_bind_group(&device, &resolve_layout, &accum, &frame_info);

        Self {
            device,
            queue,
            extent,
            hdr_view,
            accum,
            frame_info,
            splat_pipeline,
            splat_layout,
            resolve_pipeline,
            resolve_layout,
            resolve_bind_group,
        }
    }

    /// Recreate the HDR target and accumulation buffers.
    pub fn resize(&mut self, extent: (u32, u32)) {
        let extent = (extent.0.max(1), extent.1.max(1));
        if extent == self.extent {
            return;
        }
        log::debug!("compositor resized to {}x{}", extent.0, extent.1);
        self.extent = extent;
        self.hdr_view = render_texture(&self.device, "HDR Target", extent, HDR_FORMAT, 1)
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.accum = create_accumulation(&self.device, extent);
        self.queue
            .write_buffer(&self.frame_info, 0, bytemuck::bytes_of(&frame_info_for(extent)));
        self.resolve_bind_group =
            create_resolve_bind_group(&self.device, &self.resolve_layout, &self.accum, &self.frame_info);
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    pub fn hdr_view(&self) -> &wgpu::TextureView {
        &self.hdr_view
    }

    /// Clear the HDR target to black and zero the accumulation channels.
    pub fn clear(&self, encoder: &mut wgpu::CommandEncoder) {
        for channel in &self.accum {
            encoder.clear_buffer(channel, 0, None);
        }
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("HDR Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.hdr_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    /// Splat every particle on the swarm's render list, then add them to the HDR target.
    pub fn draw_particles(&self, encoder: &mut wgpu::CommandEncoder, swarm: &GpuSwarm) {
        if swarm.capacity() > 0 {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Splat Bind Group"),
                layout: &self.splat_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: swarm.particle_buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: swarm.render_list_buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.accum[0].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.accum[1].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: self.accum[2].as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: self.frame_info.as_entire_binding(),
                    },
                ],
            });

            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Splat Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.splat_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (x, y) = dispatch_size(swarm.capacity());
            pass.dispatch_workgroups(x, y, 1);
        }

        let mut pass = begin_load_pass(encoder, &self.hdr_view, "Resolve Pass");
        pass.set_pipeline(&self.resolve_pipeline);
        pass.set_bind_group(0, &self.resolve_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn frame_info_for(extent: (u32, u32)) -> FrameInfo {
    FrameInfo {
        width: extent.0,
        height: extent.1,
        scale: ACCUMULATION_SCALE,
        _pad: 0,
    }
}

fn create_accumulation(device: &wgpu::Device, extent: (u32, u32)) -> [wgpu::Buffer; 3] {
    let size = extent.0 as u64 * extent.1 as u64 * 4;
    ["Accumulation R", "Accumulation G", "Accumulation B"].map(|label| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    })
}

fn create_resolve_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    accum: &[wgpu::Buffer; 3],
    frame_info: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Resolve Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: accum[0].as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: accum[1].as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: accum[2].as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: frame_info.as_entire_binding(),
            },
        ],
    })
}
