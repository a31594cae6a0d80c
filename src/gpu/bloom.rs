//! Bloom filter over the HDR target.
//!
//! Walks a [`BloomPlan`]: downsample passes overwrite successive mips of a
//! half-resolution scratch texture, upsample passes add back up the chain and
//! finally onto the HDR target.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{render_texture, uniform_entry, ADDITIVE, HDR_FORMAT};
use crate::bloom::{fitting_passes, BloomLevel, BloomPass, BloomPassKind, BloomPlan};
use crate::shaders::{module, ShaderSet};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct BloomUniforms {
    source_texel: [f32; 2],
    width: f32,
    strength: f32,
}

/// Bloom settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomSettings {
    /// Requested mip levels. Clamped to what the target size allows.
    pub passes: u32,
    /// Weight of the final composite onto the HDR target.
    pub strength: f32,
    /// Upsample filter radius in source texels.
    pub width: f32,
}

struct EncodedPass {
    kind: BloomPassKind,
    target: BloomLevel,
    bind_group: wgpu::BindGroup,
}

pub struct Bloom {
    device: Arc<wgpu::Device>,
    settings: BloomSettings,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    downsample: wgpu::RenderPipeline,
    upsample: wgpu::RenderPipeline,
    scratch_views: Vec<wgpu::TextureView>,
    passes: Vec<EncodedPass>,
}

impl Bloom {
    pub fn new(
        device: Arc<wgpu::Device>,
        shaders: &ShaderSet,
        settings: BloomSettings,
        hdr_view: &wgpu::TextureView,
        extent: (u32, u32),
    ) -> Self {
        let shader = module(&device, "Bloom Shader", &shaders.bloom);

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, entry_point: &str, blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend,
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
        };
        let downsample = pipeline("Bloom Downsample Pipeline", "fs_downsample", None);
        let upsample = pipeline("Bloom Upsample Pipeline", "fs_upsample", Some(ADDITIVE));

        let mut bloom = Self {
            device,
            settings,
            layout,
            sampler,
            downsample,
            upsample,
            scratch_views: Vec::new(),
            passes: Vec::new(),
        };
        bloom.resize(hdr_view, extent);
        bloom
    }

    /// Rebuild the scratch chain for a new HDR target.
    pub fn resize(&mut self, hdr_view: &wgpu::TextureView, extent: (u32, u32)) {
        let passes = fitting_passes(extent, self.settings.passes);
        if passes < self.settings.passes {
            log::debug!(
                "bloom reduced to {} of {} passes at {}x{}",
                passes,
                self.settings.passes,
                extent.0,
                extent.1
            );
        }
        if passes == 0 {
            self.scratch_views.clear();
            self.passes.clear();
            return;
        }

        let plan = BloomPlan::new(extent, passes, self.settings.strength, self.settings.width);
        let scratch = render_texture(
            &self.device,
            "Bloom Scratch",
            plan.scratch_extent(),
            HDR_FORMAT,
            plan.scratch_mips(),
        );
        self.scratch_views = (0..plan.scratch_mips())
            .map(|mip| {
                scratch.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Bloom Scratch Mip"),
                    base_mip_level: mip,
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();

        self.passes = plan
            .passes()
            .iter()
            .map(|pass| self.encode_pass(pass, hdr_view, plan.width()))
            .collect();
    }

    fn view<'a>(&'a self, level: BloomLevel, hdr_view: &'a wgpu::TextureView) -> &'a wgpu::TextureView {
        match level {
            BloomLevel::Target => hdr_view,
            BloomLevel::Scratch(mip) => &self.scratch_views[mip as usize],
        }
    }

    fn encode_pass(&self, pass: &BloomPass, hdr_view: &wgpu::TextureView, width: f32) -> EncodedPass {
        let uniforms = BloomUniforms {
            source_texel: pass.source_texel(),
            width,
            strength: pass.strength,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(self.view(pass.source, hdr_view)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
        });
        EncodedPass {
            kind: pass.kind,
            target: pass.target,
            bind_group,
        }
    }

    /// Record the whole chain. Does nothing when no pass fits the target.
    pub fn apply(&self, encoder: &mut wgpu::CommandEncoder, hdr_view: &wgpu::TextureView) {
        for pass in &self.passes {
            let (pipeline, load, label) = match pass.kind {
                BloomPassKind::Downsample => (
                    &self.downsample,
                    wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    "Bloom Downsample Pass",
                ),
                BloomPassKind::Upsample => (&self.upsample, wgpu::LoadOp::Load, "Bloom Upsample Pass"),
            };
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.view(pass.target, hdr_view),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &pass.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
    }
}
