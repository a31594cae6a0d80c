//! Obstacle outlines and debug shapes drawn into the HDR target.
//!
//! Boxes and circles share one instanced line-strip pipeline over a unit shape;
//! each instance carries `translate * rotate * scale` as three columns. Lines
//! go through a separate line-list pipeline with per-vertex colors.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2, Vec4};
use wgpu::util::DeviceExt;

use super::{storage_entry, ADDITIVE, HDR_FORMAT};
use crate::color::PackedRgba;
use crate::obstacle::ObstacleField;
use crate::shaders::{module, ShaderSet};

/// Segments in a debug circle outline.
pub const CIRCLE_SEGMENTS: u32 = 50;

/// Closed unit square, corners at ±1 so a box's scale is its half extent.
pub const BOX_OUTLINE: [[f32; 2]; 5] = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [-1.0, -1.0]];

/// Closed unit circle with `segments + 1` vertices.
pub fn circle_outline(segments: u32) -> Vec<[f32; 2]> {
    (0..=segments)
        .map(|i| {
            let angle = i as f32 / segments as f32 * std::f32::consts::TAU;
            [angle.cos(), angle.sin()]
        })
        .collect()
}

/// Per-instance data for `vs_primitive`, 32 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Primitive {
    pub col0: [f32; 2],
    pub col1: [f32; 2],
    pub col2: [f32; 2],
    pub color: PackedRgba,
}

impl Primitive {
    /// `translate(translation) * rotate(rotation) * scale(scale)`.
    pub fn new(translation: Vec2, rotation: f32, scale: Vec2, color: PackedRgba) -> Self {
        let m = Affine2::from_scale_angle_translation(scale, rotation, translation);
        Self {
            col0: m.matrix2.x_axis.to_array(),
            col1: m.matrix2.y_axis.to_array(),
            col2: m.translation.to_array(),
            color,
        }
    }

    /// Apply the transform to a point of the unit shape.
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::from_array(self.col0) * p.x + Vec2::from_array(self.col1) * p.y + Vec2::from_array(self.col2)
    }
}

/// A line segment with a color at each end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub p0: Vec2,
    pub color0: Vec4,
    pub p1: Vec2,
    pub color1: Vec4,
}

/// A circle outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugCircle {
    pub center: Vec2,
    pub radius: f32,
    pub color: Vec4,
}

impl DebugCircle {
    pub fn primitive(&self) -> Primitive {
        Primitive::new(self.center, 0.0, Vec2::splat(self.radius), self.color.into())
    }
}

/// Vertex of the line-list pipeline, 16 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: PackedRgba,
}

/// Two vertices per line.
pub fn line_vertices(lines: &[DebugLine]) -> Vec<LineVertex> {
    lines
        .iter()
        .flat_map(|l| {
            [
                LineVertex {
                    position: l.p0.to_array(),
                    color: l.color0.into(),
                },
                LineVertex {
                    position: l.p1.to_array(),
                    color: l.color1.into(),
                },
            ]
        })
        .collect()
}

/// One instance per obstacle, active or not.
pub fn obstacle_primitives(obstacles: &ObstacleField) -> Vec<Primitive> {
    obstacles
        .iter()
        .map(|(_, o)| Primitive::new(o.position, o.rotation, o.half_extent, o.color))
        .collect()
}

/// Pipelines and static vertex buffers for outlines.
pub struct PrimitiveRenderer {
    device: Arc<wgpu::Device>,
    primitive_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    instance_layout: wgpu::BindGroupLayout,
    box_vertices: wgpu::Buffer,
    circle_vertices: wgpu::Buffer,
}

impl PrimitiveRenderer {
    pub fn new(device: Arc<wgpu::Device>, shaders: &ShaderSet) -> Self {
        let shader = module(&device, "Primitive Shader", &shaders.primitives);

        let instance_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Primitive Instance Layout"),
            entries: &[storage_entry(0, wgpu::ShaderStages::VERTEX, true)],
        });

        let primitive_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Primitive Pipeline Layout"),
            bind_group_layouts: &[&instance_layout],
            push_constant_ranges: &[],
        });
        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let targets = [Some(wgpu::ColorTargetState {
            format: HDR_FORMAT,
            blend: Some(ADDITIVE),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let primitive_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Primitive Pipeline"),
            layout: Some(&primitive_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_primitive"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Pipeline"),
            layout: Some(&line_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_line"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Uint32x2],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let box_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Box Outline Vertices"),
            contents: bytemuck::cast_slice(&BOX_OUTLINE),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let circle_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Circle Outline Vertices"),
            contents: bytemuck::cast_slice(&circle_outline(CIRCLE_SEGMENTS)),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            device,
            primitive_pipeline,
            line_pipeline,
            instance_layout,
            box_vertices,
            circle_vertices,
        }
    }

    /// Outline every obstacle onto `target`.
    pub fn draw_obstacles(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        obstacles: &ObstacleField,
    ) {
        let instances = obstacle_primitives(obstacles);
        self.draw_instances(encoder, target, &instances, &self.box_vertices, BOX_OUTLINE.len() as u32);
    }

    pub fn draw_circles(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        circles: &[DebugCircle],
    ) {
        let instances: Vec<Primitive> = circles.iter().map(DebugCircle::primitive).collect();
        self.draw_instances(encoder, target, &instances, &self.circle_vertices, CIRCLE_SEGMENTS + 1);
    }

    pub fn draw_lines(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        lines: &[DebugLine],
    ) {
        if lines.is_empty() {
            return;
        }
        let vertices = line_vertices(lines);
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Debug Line Vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let mut pass = begin_load_pass(encoder, target, "Debug Line Pass");
        pass.set_pipeline(&self.line_pipeline);
        pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        pass.draw(0..vertices.len() as u32, 0..1);
    }

    fn draw_instances(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        instances: &[Primitive],
        outline: &wgpu::Buffer,
        vertex_count: u32,
    ) {
        if instances.is_empty() {
            return;
        }
        let instance_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Primitive Instances"),
                contents: bytemuck::cast_slice(instances),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Primitive Instance Bind Group"),
            layout: &self.instance_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: instance_buffer.as_entire_binding(),
            }],
        });

        let mut pass = begin_load_pass(encoder, target, "Primitive Pass");
        pass.set_pipeline(&self.primitive_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, outline.slice(..));
        pass.draw(0..vertex_count, 0..instances.len() as u32);
    }
}

/// Render pass that keeps whatever is already in `target`.
pub(crate) fn begin_load_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}
