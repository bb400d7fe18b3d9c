#![allow(dead_code)]

use emte::{data_structures::descriptor_pile::DescriptorPile, resources::TextureFactory};

/// Stands in for the GPU factory: every "texture" is its name, and the
/// descriptor written to the pile is the name as well.
#[derive(Default)]
pub(crate) struct FakeFactory {
    pub(crate) textures: Vec<String>,
    pub(crate) releases: u32,
}

impl TextureFactory for FakeFactory {
    type Descriptor = String;

    fn create_texture(
        &mut self,
        name: &str,
        descriptor: usize,
        pile: &mut DescriptorPile<String>,
    ) -> anyhow::Result<usize> {
        pile.set(descriptor, name.to_string())?;
        self.textures.push(name.to_string());
        Ok(self.textures.len() - 1)
    }

    fn release(&mut self) {
        self.textures.clear();
        self.releases += 1;
    }
}

pub(crate) fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(feature = "integration-tests")]
pub(crate) mod gpu {
    use std::time::Duration;

    /// Device and queue without a window. Panics when the machine has no
    /// usable adapter.
    pub(crate) fn headless(runtime: &tokio::runtime::Runtime) -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = runtime
            .block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            }))
            .expect("Failed to find a graphics adapter");
        runtime
            .block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("Test Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            }))
            .expect("Failed to create a device")
    }

    /// Copy an RGBA8 texture back to the CPU. `width * 4` must be a multiple
    /// of 256.
    pub(crate) fn read_back(
        runtime: &tokio::runtime::Runtime,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
    ) -> image::RgbaImage {
        let (width, height) = (texture.width(), texture.height());
        let u32_size = std::mem::size_of::<u32>() as u32;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            size: (u32_size * width * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: Some("Readback Buffer"),
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(u32_size * width),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        runtime.block_on(async {
            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).unwrap();
            });
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: Some(Duration::from_secs(3)),
                })
                .unwrap();
            rx.receive().await.unwrap().unwrap();
            let data = buffer_slice.get_mapped_range().to_vec();
            image::RgbaImage::from_raw(width, height, data).unwrap()
        })
    }

    pub(crate) fn to_rgba8(colour: wgpu::Color) -> image::Rgba<u8> {
        let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        image::Rgba([
            f_to_u8(colour.r),
            f_to_u8(colour.g),
            f_to_u8(colour.b),
            f_to_u8(colour.a),
        ])
    }
}
