//! Offscreen colour target.

use crate::data_structures::texture::Texture;

/// A colour texture the scene is rendered into before it is composited onto
/// the back buffer. Sized to the window; recreated only when the size
/// actually changes.
#[derive(Debug)]
pub struct RenderTexture {
    format: wgpu::TextureFormat,
    texture: Option<Texture>,
}

impl RenderTexture {
    pub fn new(format: wgpu::TextureFormat) -> Self {
        Self {
            format,
            texture: None,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// (Re)create the texture at `width × height`. Returns `true` if a new
    /// texture was created, in which case every view and descriptor taken
    /// from the old one is stale.
    pub fn size_resources(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        let size = [width.max(1), height.max(1)];
        if self.texture.as_ref().is_some_and(|t| t.size() == size) {
            return false;
        }
        log::debug!("offscreen target resized to {}x{}", size[0], size[1]);
        self.texture = Some(Texture::create_render_target(
            device,
            size,
            self.format,
            "Offscreen Render Target",
        ));
        true
    }

    /// Drop the texture, e.g. on device loss.
    pub fn release_device(&mut self) {
        self.texture = None;
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Open a pass that clears this target and `depth` and renders into them.
    pub fn begin_pass<'e>(
        view: &wgpu::TextureView,
        encoder: &'e mut wgpu::CommandEncoder,
        depth: &wgpu::TextureView,
        clear_colour: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }
}
