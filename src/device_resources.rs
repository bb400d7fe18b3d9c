//! Graphics device, surface and the window-size dependent depth buffer.
//!
//! [`DeviceResources`] is the only place that talks to the `wgpu` instance
//! and adapter. Everything else borrows its device and queue.
//!
//! Device loss is reported by wgpu from an arbitrary thread, so the callback
//! only raises a flag. The owner polls [`DeviceResources::is_device_lost`]
//! once per frame and runs the reset path on the event-loop thread:
//! [`DeviceNotify::on_device_lost`], [`DeviceResources::handle_device_lost`],
//! then [`DeviceNotify::on_device_restored`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context as _;
use winit::window::Window;

use crate::data_structures::texture::Texture;

/// Receiver of device-lost / device-restored notifications.
pub trait DeviceNotify {
    /// Release every object created from the lost device.
    fn on_device_lost(&mut self);

    /// Rebuild everything released by [`DeviceNotify::on_device_lost`].
    fn on_device_restored(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug)]
pub struct DeviceResources {
    // wgpu's adapter/device requests are futures; set-up blocks on them here
    runtime: tokio::runtime::Runtime,
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    depth_texture: Texture,
    device_lost: Arc<AtomicBool>,
    is_surface_configured: bool,
}

impl DeviceResources {
    /// Create the instance, surface, adapter and device for `window` with a
    /// back buffer of `width × height` pixels.
    pub fn new(window: Arc<Window>, width: u32, height: u32) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the set-up runtime")?;

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create a surface for the window")?;
        let adapter = runtime
            .block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            }))
            .context("no graphics adapter is compatible with the window")?;
        log::info!("adapter: {:?}", adapter.get_info());

        let device_lost = Arc::new(AtomicBool::new(false));
        let (device, queue) = Self::create_device(&runtime, &adapter, &device_lost)?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB back buffer.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface reports no supported formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let mut resources = Self {
            runtime,
            window,
            surface,
            adapter,
            device,
            queue,
            config,
            depth_texture,
            device_lost,
            is_surface_configured: false,
        };
        resources.create_window_size_dependent_resources();
        Ok(resources)
    }

    fn create_device(
        runtime: &tokio::runtime::Runtime,
        adapter: &wgpu::Adapter,
        device_lost: &Arc<AtomicBool>,
    ) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
        log::info!("device and queue");
        let (device, queue) = runtime
            .block_on(adapter.request_device(&wgpu::DeviceDescriptor {
                label: Some("EMTE Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            }))
            .context("failed to create the graphics device")?;

        let flag = device_lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::error!("graphics device lost ({:?}): {}", reason, message);
            flag.store(true, Ordering::SeqCst);
        });
        Ok((device, queue))
    }

    /// Re-request the device and queue from the adapter. Everything created
    /// from the old device is invalid afterwards.
    pub fn create_device_resources(&mut self) -> anyhow::Result<()> {
        let (device, queue) = Self::create_device(&self.runtime, &self.adapter, &self.device_lost)?;
        self.device = device;
        self.queue = queue;
        self.device_lost.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// (Re)configure the surface and the depth buffer at the current size.
    pub fn create_window_size_dependent_resources(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        self.is_surface_configured = true;
    }

    /// Resize the back buffer. Returns `false` when the size did not change
    /// or is degenerate (minimised window), in which case nothing happened.
    pub fn window_size_changed(&mut self, width: u32, height: u32) -> bool {
        let Some((width, height)) = resized_extent(self.output_size(), (width, height)) else {
            return false;
        };
        self.config.width = width;
        self.config.height = height;
        self.create_window_size_dependent_resources();
        true
    }

    /// Recreate the device and every size dependent object after a loss.
    ///
    /// The surface survives; only the device side is rebuilt.
    pub fn handle_device_lost(&mut self) -> anyhow::Result<()> {
        log::warn!("recreating the graphics device");
        self.create_device_resources()?;
        self.create_window_size_dependent_resources();
        Ok(())
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::SeqCst)
    }

    /// Treat the device as lost, as if wgpu had reported it.
    pub fn mark_device_lost(&self) {
        self.device_lost.store(true, Ordering::SeqCst);
    }

    /// Acquire the next back buffer.
    ///
    /// Returns `Ok(None)` when no frame can be produced right now: the
    /// surface was lost or outdated and has been reconfigured, or a timeout
    /// occurred. Out-of-memory marks the device lost. Reconfiguring follows
    /// the window, so [`output_size`](Self::output_size) may differ afterwards.
    pub fn begin_frame(&mut self) -> anyhow::Result<Option<wgpu::SurfaceTexture>> {
        if !self.is_surface_configured {
            return Ok(None);
        }
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("timed out waiting for the back buffer");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.mark_device_lost();
                Ok(None)
            }
            Err(e) => Err(e).context("unable to acquire the back buffer"),
        }
    }

    pub fn present(&self, frame: wgpu::SurfaceTexture) {
        self.window.pre_present_notify();
        frame.present();
    }

    /// Reconfigure the surface at the window's current size, e.g. after it
    /// was lost. Returns `true` if the size changed.
    pub fn reconfigure(&mut self) -> bool {
        if self.refresh_size() {
            return true;
        }
        self.create_window_size_dependent_resources();
        false
    }

    /// Follow the window's current size. Nothing is rebuilt when it still
    /// matches the back buffer.
    pub fn refresh_size(&mut self) -> bool {
        let size = self.window.inner_size();
        self.window_size_changed(size.width, size.height)
    }

    /// Back buffer size in pixels.
    pub fn output_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn back_buffer_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }
}

/// The back buffer extent to switch to, or `None` when `requested` is
/// degenerate or already current.
fn resized_extent(current: (u32, u32), requested: (u32, u32)) -> Option<(u32, u32)> {
    if requested.0 == 0 || requested.1 == 0 || requested == current {
        return None;
    }
    Some(requested)
}
