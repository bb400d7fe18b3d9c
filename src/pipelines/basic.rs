use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::vertex::{Vertex, VertexPositionColor};

/// Per-effect constants shared by the basic and normal-map shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectUniform {
    world: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
    // w is unused; vec3 uniforms need 16 byte alignment anyway
    eye_position: [f32; 4],
    light_direction: [f32; 4],
}

impl EffectUniform {
    pub fn new() -> Self {
        let light = Vector3::new(-0.5265408, -0.5735765, -0.6275069).normalize();
        Self {
            world: Matrix4::identity().into(),
            view_proj: Matrix4::identity().into(),
            eye_position: [0.0, 0.0, 0.0, 1.0],
            light_direction: [light.x, light.y, light.z, 0.0],
        }
    }

    pub fn set_matrices(&mut self, world: Matrix4<f32>, view: Matrix4<f32>, proj: Matrix4<f32>) {
        self.world = world.into();
        self.view_proj = (proj * view).into();
        if let Some(inverse) = view.invert() {
            self.eye_position = [inverse.w.x, inverse.w.y, inverse.w.z, 1.0];
        }
    }

    pub fn world(&self) -> Matrix4<f32> {
        self.world.into()
    }

    pub fn eye_position(&self) -> [f32; 3] {
        [self.eye_position[0], self.eye_position[1], self.eye_position[2]]
    }
}

impl Default for EffectUniform {
    fn default() -> Self {
        Self::new()
    }
}

pub fn effect_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("effect_bind_group_layout"),
    })
}

/// Uniform buffer and bind group backing one effect instance.
#[derive(Debug)]
pub struct EffectConstants {
    pub uniform: EffectUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl EffectConstants {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniform = EffectUniform::new();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn apply(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

/// Unlit vertex-colour effect drawing line lists (the wireframe grid).
#[derive(Debug)]
pub struct BasicEffect {
    pub pipeline: wgpu::RenderPipeline,
    pub constants: EffectConstants,
}

impl BasicEffect {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let layout = effect_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Basic Effect Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Basic Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("basic.wgsl").into()),
        };
        let pipeline = mk_render_pipeline(
            device,
            &pipeline_layout,
            color_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            depth_format,
            &[VertexPositionColor::desc()],
            wgpu::PrimitiveTopology::LineList,
            shader,
        );
        let constants = EffectConstants::new(device, &layout, "Basic Effect Constants");
        Self {
            pipeline,
            constants,
        }
    }

    pub fn set_matrices(&mut self, world: Matrix4<f32>, view: Matrix4<f32>, proj: Matrix4<f32>) {
        self.constants.uniform.set_matrices(world, view, proj);
    }

    pub fn apply(&self, queue: &wgpu::Queue) {
        self.constants.apply(queue);
    }

    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.constants.bind_group, &[]);
    }
}

/// Build a pipeline with `vs_main`/`fs_main` entry points.
///
/// Line topologies are never culled; triangle lists cull back faces with
/// counter-clockwise fronts.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    topology: wgpu::PrimitiveTopology,
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);
    let cull_mode = match topology {
        wgpu::PrimitiveTopology::TriangleList | wgpu::PrimitiveTopology::TriangleStrip => {
            Some(wgpu::Face::Back)
        }
        _ => None,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Point3};

    use super::*;

    #[test]
    fn eye_position_is_recovered_from_view() {
        let eye = Point3::new(1.0, 2.0, 3.0);
        let view = Matrix4::look_at_rh(eye, Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
        let proj = cgmath::perspective(Deg(60.0), 1.0, 0.1, 10.0);
        let mut uniform = EffectUniform::new();
        uniform.set_matrices(Matrix4::identity(), view, proj);
        let [x, y, z] = uniform.eye_position();
        assert!((x - 1.0).abs() < 1e-4 && (y - 2.0).abs() < 1e-4 && (z - 3.0).abs() < 1e-4);
    }

    #[test]
    fn uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<EffectUniform>() % 16, 0);
    }
}
