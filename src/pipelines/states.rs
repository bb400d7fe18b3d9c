/// Samplers shared by every textured pipeline.
#[derive(Debug)]
pub struct CommonStates {
    pub linear_wrap: wgpu::Sampler,
    pub point_clamp: wgpu::Sampler,
}

impl CommonStates {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            linear_wrap: mk_sampler(
                device,
                "linear_wrap",
                wgpu::AddressMode::Repeat,
                wgpu::FilterMode::Linear,
            ),
            point_clamp: mk_sampler(
                device,
                "point_clamp",
                wgpu::AddressMode::ClampToEdge,
                wgpu::FilterMode::Nearest,
            ),
        }
    }
}

fn mk_sampler(
    device: &wgpu::Device,
    label: &str,
    address_mode: wgpu::AddressMode,
    filter: wgpu::FilterMode,
) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
