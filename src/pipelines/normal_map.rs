use cgmath::Matrix4;

use crate::{
    data_structures::vertex::{Vertex, VertexPositionNormalTexture},
    pipelines::basic::{EffectConstants, effect_layout, mk_render_pipeline},
};

/// Lit, textured effect with a tangent-space normal map.
///
/// Bind groups: 0 = effect constants, 1 = diffuse descriptor, 2 = normal map
/// descriptor. Both texture groups use
/// [`texture_layout`](crate::resources::texture::texture_layout).
#[derive(Debug)]
pub struct NormalMapEffect {
    pub pipeline: wgpu::RenderPipeline,
    pub constants: EffectConstants,
}

impl NormalMapEffect {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = effect_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Normal Map Effect Pipeline Layout"),
            bind_group_layouts: &[&layout, texture_layout, texture_layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Normal Map Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("normal_map.wgsl").into()),
        };
        let pipeline = mk_render_pipeline(
            device,
            &pipeline_layout,
            color_format,
            Some(wgpu::BlendState {
                alpha: wgpu::BlendComponent::REPLACE,
                color: wgpu::BlendComponent::REPLACE,
            }),
            depth_format,
            &[VertexPositionNormalTexture::desc()],
            wgpu::PrimitiveTopology::TriangleList,
            shader,
        );
        let constants = EffectConstants::new(device, &layout, "Normal Map Effect Constants");
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

    pub fn bind(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        diffuse: &wgpu::BindGroup,
        normal: &wgpu::BindGroup,
    ) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.constants.bind_group, &[]);
        render_pass.set_bind_group(1, diffuse, &[]);
        render_pass.set_bind_group(2, normal, &[]);
    }
}
