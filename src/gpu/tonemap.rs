//! HDR to LDR conversion and the final blit onto the window surface.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{render_texture, uniform_entry, LDR_FORMAT};
use crate::shaders::{module, ShaderSet};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct TonemapUniforms {
    exposure: f32,
    frame: u32,
    _pad0: u32,
    _pad1: u32,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
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
    })
}

fn replace_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Tonemaps the HDR target into an LDR image and scales that onto the surface.
pub struct Tonemap {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    exposure: f32,

    uniforms: wgpu::Buffer,
    tonemap_layout: wgpu::BindGroupLayout,
    tonemap_pipeline: wgpu::RenderPipeline,
    tonemap_bind_group: wgpu::BindGroup,

    ldr_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    blit_layout: wgpu::BindGroupLayout,
    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group: wgpu::BindGroup,
}

impl Tonemap {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        shaders: &ShaderSet,
        hdr_view: &wgpu::TextureView,
        extent: (u32, u32),
        surface_format: wgpu::TextureFormat,
        exposure: f32,
    ) -> Self {
        let tonemap_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tonemap Layout"),
            entries: &[texture_entry(0), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
        });
        let tonemap_shader = module(&device, "Tonemap Shader", &shaders.tonemap);
        let tonemap_pipeline =
            fullscreen_pipeline(&device, "Tonemap Pipeline", &tonemap_shader, &tonemap_layout, LDR_FORMAT);

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Layout"),
            entries: &[
                texture_entry(0),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let blit_shader = module(&device, "Blit Shader", &shaders.blit);
        let blit_pipeline =
            fullscreen_pipeline(&device, "Blit Pipeline", &blit_shader, &blit_layout, surface_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blit Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Tonemap Uniforms"),
            contents: bytemuck::bytes_of(&TonemapUniforms {
                exposure,
                frame: 0,
                _pad0: 0,
                _pad1: 0,
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let ldr_view = create_ldr_view(&device, extent);
        let tonemap_bind_group = create_tonemap_bind_group(&device, &tonemap_layout, hdr_view, &uniforms);
        let blit_bind_group = create_blit_bind_group(&device, &blit_layout, &ldr_view, &sampler);

        Self {
            device,
            queue,
            exposure,
            uniforms,
            tonemap_layout,
            tonemap_pipeline,
            tonemap_bind_group,
            ldr_view,
            sampler,
            blit_layout,
            blit_pipeline,
            blit_bind_group,
        }
    }

    /// Rebind to a new HDR target and recreate the LDR image at its size.
    pub fn resize(&mut self, hdr_view: &wgpu::TextureView, extent: (u32, u32)) {
        self.ldr_view = create_ldr_view(&self.device, extent);
        self.tonemap_bind_group =
            create_tonemap_bind_group(&self.device, &self.tonemap_layout, hdr_view, &self.uniforms);
        self.blit_bind_group =
            create_blit_bind_group(&self.device, &self.blit_layout, &self.ldr_view, &self.sampler);
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    /// Tonemap into the LDR image. `frame` seeds the dither pattern.
    pub fn apply(&self, encoder: &mut wgpu::CommandEncoder, frame: u64) {
        let uniforms = TonemapUniforms {
            exposure: self.exposure,
            frame: (frame % 64) as u32,
            _pad0: 0,
            _pad1: 0,
        };
        self.queue
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&uniforms));

        let mut pass = replace_pass(encoder, &self.ldr_view, "Tonemap Pass");
        pass.set_pipeline(&self.tonemap_pipeline);
        pass.set_bind_group(0, &self.tonemap_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Scale the LDR image onto `surface_view`.
    pub fn blit(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let mut pass = replace_pass(encoder, surface_view, "Blit Pass");
        pass.set_pipeline(&self.blit_pipeline);
        pass.set_bind_group(0, &self.blit_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_ldr_view(device: &wgpu::Device, extent: (u32, u32)) -> wgpu::TextureView {
    let extent = (extent.0.max(1), extent.1.max(1));
    render_texture(device, "LDR Image", extent, LDR_FORMAT, 1).create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_tonemap_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    hdr_view: &wgpu::TextureView,
    uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Tonemap Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(hdr_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: uniforms.as_entire_binding(),
            },
        ],
    })
}

fn create_blit_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    ldr_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Blit Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(ldr_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<TonemapUniforms>(), 16);
    }
}
