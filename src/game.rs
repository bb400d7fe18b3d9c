//! The application controller.
//!
//! [`Game`] owns every subsystem and sequences the frame:
//!
//! 1. `tick()` advances the [`StepTimer`] and calls `update` once per step
//! 2. `update()` moves the camera from keyboard/mouse state and spins the world
//! 3. `render()` draws the scene into the offscreen [`RenderTexture`], then
//!    composites that texture over the back buffer and presents
//!
//! Everything created from the `wgpu::Device` is either in [`SceneResources`],
//! the texture library's descriptor pile, the render-target pile or the render
//! texture. On device loss all of it is dropped and rebuilt from scratch.

use std::sync::Arc;

use anyhow::Context as _;
use cgmath::{Deg, Matrix4, Rad, SquareMatrix};
use winit::{
    event::{DeviceEvent, WindowEvent},
    keyboard::KeyCode,
    window::Window,
};

use crate::{
    camera::{Camera, CameraController, Projection},
    data_structures::{
        descriptor_pile::{DescriptorPile, Descriptors, RtDescriptors},
        geometry::{GeometricPrimitive, grid_lines},
        render_texture::RenderTexture,
        texture::Texture,
        texture_registry::TextureRegistry,
        vertex::{VertexPositionColor, VertexPositionNormalTexture},
    },
    device_resources::{DeviceNotify, DeviceResources},
    input::{Keyboard, Mouse, camera_input},
    pipelines::{
        basic::BasicEffect, normal_map::NormalMapEffect, sprite::SpritePipeline,
        states::CommonStates,
    },
    render::{PrimitiveBatch, Rect, SpriteBatch},
    resources::texture::{
        EffectTextureFactory, TextureFactory, TextureLibrary, texture_bind_group, texture_layout,
    },
    settings::Settings,
    timer::StepTimer,
};

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

/// Radians per second the sphere turns about the Y axis.
const SPIN_RATE: f32 = 0.5;

const SPHERE_DIAMETER: f32 = 1.0;
const FLOOR_EXTENT: f32 = 2.0;
const FLOOR_HEIGHT: f32 = -0.5;
/// Texture repeats across the floor quad.
const FLOOR_TILING: f32 = 4.0;
const GRID_COLOUR: [f32; 4] = [0.8, 0.8, 0.8, 0.6];
const HUD_HEIGHT: f32 = 24.0;
const HUD_COLOUR: [f32; 4] = [0.0, 0.0, 0.0, 0.35];
const WHITE: [f32; 4] = [1.0; 4];

/// Objects created from the device that are not descriptors.
#[derive(Debug)]
struct SceneResources {
    states: CommonStates,
    texture_layout: wgpu::BindGroupLayout,
    factory: EffectTextureFactory,
    // backs the `Descriptors::Gui` bind group
    _gui_texture: Texture,
    sphere_effect: NormalMapEffect,
    floor_effect: NormalMapEffect,
    wireframe_effect: BasicEffect,
    sphere: GeometricPrimitive,
    floor_batch: PrimitiveBatch<VertexPositionNormalTexture>,
    wireframe_batch: PrimitiveBatch<VertexPositionColor>,
    sprite_pipeline: SpritePipeline,
    sprite_batch: SpriteBatch,
    composite_pipeline: SpritePipeline,
    composite_batch: SpriteBatch,
}

#[derive(Debug)]
pub struct Game {
    settings: Settings,
    device_resources: DeviceResources,
    timer: StepTimer,

    keyboard: Keyboard,
    mouse: Mouse,
    camera: Camera,
    camera_controller: CameraController,
    projection: Projection,

    world: Matrix4<f32>,
    view: Matrix4<f32>,
    proj: Matrix4<f32>,

    textures: TextureLibrary<wgpu::BindGroup>,
    rt_descriptors: DescriptorPile<wgpu::TextureView>,
    render_texture: RenderTexture,
    scene: Option<SceneResources>,
    screen_pos: [f32; 2],

    exit_requested: bool,
}

impl Game {
    /// Window size used when the host has no better idea.
    pub const fn default_size() -> (u32, u32) {
        (DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Bind to `window` and build every device and window-size dependent
    /// resource.
    pub fn initialize(
        window: Arc<Window>,
        width: u32,
        height: u32,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let device_resources = DeviceResources::new(window, width, height)?;
        let (width, height) = device_resources.output_size();

        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(settings.fixed_time_step);

        let camera = start_camera(&settings);
        let camera_controller =
            CameraController::new(settings.movement_gain, settings.rotation_gain);
        let projection = Projection::new(width, height, Deg(70.0), 0.01, 100.0);
        let render_texture = RenderTexture::new(device_resources.back_buffer_format());
        let textures = TextureLibrary::new(settings.texture_load_list.clone());

        let mut game = Self {
            settings,
            device_resources,
            timer,
            keyboard: Keyboard::new(),
            mouse: Mouse::new(),
            view: camera.view_matrix(),
            camera,
            camera_controller,
            proj: projection.calc_matrix(),
            projection,
            world: Matrix4::identity(),
            textures,
            rt_descriptors: DescriptorPile::render_targets(),
            render_texture,
            scene: None,
            screen_pos: [width as f32 / 2.0, height as f32 / 2.0],
            exit_requested: false,
        };
        game.create_device_dependent_resources()?;
        game.create_window_size_dependent_resources()?;
        Ok(game)
    }

    /// Run one frame: recover from device loss if needed, update, render.
    pub fn tick(&mut self) {
        if self.device_resources.is_device_lost() {
            self.handle_device_lost();
        }

        let frames_before = self.timer.frame_count();
        let mut timer = std::mem::take(&mut self.timer);
        timer.tick(|t| self.update(t));
        self.timer = timer;
        end_input_frame(&mut self.keyboard, &self.timer, frames_before);

        if let Err(e) = self.render() {
            log::error!("Unable to render {:#}", e);
        }
    }

    fn update(&mut self, timer: &StepTimer) {
        if self.keyboard.is_pressed(KeyCode::Escape) {
            self.exit_requested = true;
        }
        if self.keyboard.is_pressed(KeyCode::Home) {
            self.camera = start_camera(&self.settings);
        }

        let input = camera_input(&self.keyboard, &mut self.mouse);
        self.camera_controller
            .update(&mut self.camera, &input, timer.elapsed_seconds());
        self.view = self.camera.view_matrix();
        self.world = Matrix4::from_angle_y(Rad(timer.total_seconds() * SPIN_RATE));
    }

    fn render(&mut self) -> anyhow::Result<()> {
        // Nothing to show before the first update.
        if self.timer.frame_count() == 0 {
            return Ok(());
        }
        let frame = self.device_resources.begin_frame()?;
        // acquiring may have reconfigured the back buffer at a new size
        let offscreen = self.render_texture.texture().map(Texture::size);
        if !offscreen_matches(offscreen, self.device_resources.output_size()) {
            self.create_window_size_dependent_resources()?;
        }
        let Some(frame) = frame else {
            return Ok(());
        };
        self.prepare()?;

        let mut encoder =
            self.device_resources
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass = self.clear(&mut encoder)?;
            self.draw_scene(&mut render_pass);
        }
        {
            let view = frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let Some(scene) = &self.scene {
                scene.composite_batch.render(
                    &mut render_pass,
                    &scene.composite_pipeline,
                    self.textures.pile(),
                );
            }
        }

        self.device_resources
            .queue
            .submit(std::iter::once(encoder.finish()));
        self.device_resources.present(frame);
        Ok(())
    }

    /// Upload this frame's constants and batches. Passes cannot write
    /// buffers, so this runs before any pass is opened.
    fn prepare(&mut self) -> anyhow::Result<()> {
        let scene = self
            .scene
            .as_mut()
            .context("device dependent resources are missing")?;
        let device = &self.device_resources.device;
        let queue = &self.device_resources.queue;
        let (width, height) = self.device_resources.output_size();

        scene
            .sphere_effect
            .set_matrices(self.world, self.view, self.proj);
        scene.sphere_effect.apply(queue);
        scene
            .floor_effect
            .set_matrices(Matrix4::identity(), self.view, self.proj);
        scene.floor_effect.apply(queue);
        scene
            .wireframe_effect
            .set_matrices(Matrix4::identity(), self.view, self.proj);
        scene.wireframe_effect.apply(queue);

        scene.floor_batch.begin();
        let up = [0.0, 1.0, 0.0];
        let (e, y, t) = (FLOOR_EXTENT, FLOOR_HEIGHT, FLOOR_TILING);
        scene.floor_batch.draw_quad(
            VertexPositionNormalTexture::new([-e, y, -e], up, [0.0, 0.0]),
            VertexPositionNormalTexture::new([-e, y, e], up, [0.0, t]),
            VertexPositionNormalTexture::new([e, y, e], up, [t, t]),
            VertexPositionNormalTexture::new([e, y, -e], up, [t, 0.0]),
        );
        scene.floor_batch.end(device, queue);

        scene.wireframe_batch.begin();
        let mut grid = grid_lines(FLOOR_EXTENT, self.settings.grid_divisions, GRID_COLOUR);
        // lift off the floor to avoid z-fighting
        grid.iter_mut().for_each(|v| v.position[1] = FLOOR_HEIGHT + 0.001);
        scene.wireframe_batch.draw_lines(&grid);
        scene.wireframe_batch.end(device, queue);

        scene.sprite_batch.begin();
        let sprite = &self.settings.scene_textures.sprite;
        match self.textures.registry().get(sprite).and_then(|handle| {
            scene
                .factory
                .texture(handle.slot)
                .map(|texture| (handle.desc, texture.size()))
        }) {
            Some((desc, size)) => {
                let origin = [size[0] as f32 / 2.0, size[1] as f32 / 2.0];
                scene
                    .sprite_batch
                    .draw(desc, size, self.screen_pos, origin, WHITE);
            }
            None => log::warn!("sprite texture `{}` is not loaded", sprite),
        }
        scene.sprite_batch.end(device, queue);

        scene.composite_batch.begin();
        let fullscreen_rect = Rect::from_size(width, height);
        scene.composite_batch.draw_rect(
            Descriptors::RenderTexture as usize,
            fullscreen_rect,
            WHITE,
        );
        let hud = Rect::new(0.0, height as f32 - HUD_HEIGHT, width as f32, height as f32);
        scene
            .composite_batch
            .draw_rect(Descriptors::Gui as usize, hud, HUD_COLOUR);
        scene.composite_batch.end(device, queue);
        Ok(())
    }

    /// Open the offscreen pass with colour and depth cleared.
    fn clear<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
    ) -> anyhow::Result<wgpu::RenderPass<'e>> {
        let target = self
            .rt_descriptors
            .get(RtDescriptors::OffscreenRt as usize)
            .context("offscreen render target is missing")?;
        Ok(RenderTexture::begin_pass(
            target,
            encoder,
            self.device_resources.depth_view(),
            self.settings.clear_colour,
        ))
    }

    fn draw_scene(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let Some(scene) = &self.scene else {
            return;
        };
        let names = &self.settings.scene_textures;

        match self.texture_pair(&names.sphere_diffuse, &names.sphere_normal) {
            Some((diffuse, normal)) => {
                scene.sphere_effect.bind(render_pass, diffuse, normal);
                scene.sphere.draw(render_pass);
            }
            None => log::warn!("sphere textures are not loaded"),
        }
        match self.texture_pair(&names.floor_diffuse, &names.floor_normal) {
            Some((diffuse, normal)) => {
                scene.floor_effect.bind(render_pass, diffuse, normal);
                scene.floor_batch.draw(render_pass);
            }
            None => log::warn!("floor textures are not loaded"),
        }

        scene.wireframe_effect.bind(render_pass);
        scene.wireframe_batch.draw(render_pass);

        scene
            .sprite_batch
            .render(render_pass, &scene.sprite_pipeline, self.textures.pile());
    }

    fn texture_pair(
        &self,
        diffuse: &str,
        normal: &str,
    ) -> Option<(&wgpu::BindGroup, &wgpu::BindGroup)> {
        Some((
            self.textures.descriptor(diffuse)?,
            self.textures.descriptor(normal)?,
        ))
    }

    /// Build effects, batches, samplers and load every texture on the list.
    pub fn create_device_dependent_resources(&mut self) -> anyhow::Result<()> {
        let device = &self.device_resources.device;
        let queue = &self.device_resources.queue;
        let color_format = self.device_resources.back_buffer_format();
        let depth_format = Some(Texture::DEPTH_FORMAT);
        let (width, height) = self.device_resources.output_size();

        let states = CommonStates::new(device);
        let texture_layout = texture_layout(device);

        let mut factory =
            EffectTextureFactory::new(device, queue, &texture_layout, &states.linear_wrap);
        self.textures.load(&mut factory)?;

        let gui_texture = Texture::solid(device, queue, [255; 4], 1, 1, "gui");
        let gui = texture_bind_group(
            device,
            &texture_layout,
            &gui_texture.view,
            &states.point_clamp,
            "gui",
        );
        self.textures
            .pile_mut()
            .set(Descriptors::Gui as usize, gui)?;

        let sphere_effect = NormalMapEffect::new(device, color_format, depth_format, &texture_layout);
        let floor_effect = NormalMapEffect::new(device, color_format, depth_format, &texture_layout);
        let wireframe_effect = BasicEffect::new(device, color_format, depth_format);
        let sphere = GeometricPrimitive::create_sphere(
            device,
            SPHERE_DIAMETER,
            self.settings.sphere_tessellation,
        );
        let sprite_pipeline =
            SpritePipeline::new(device, color_format, depth_format, &texture_layout);
        let sprite_batch = SpriteBatch::new(device, &sprite_pipeline, width, height, "Sprite Batch");
        let composite_pipeline = SpritePipeline::new(device, color_format, None, &texture_layout);
        let composite_batch = SpriteBatch::new(
            device,
            &composite_pipeline,
            width,
            height,
            "Composite Batch",
        );

        self.scene = Some(SceneResources {
            states,
            texture_layout,
            factory,
            _gui_texture: gui_texture,
            sphere_effect,
            floor_effect,
            wireframe_effect,
            sphere,
            floor_batch: PrimitiveBatch::new("Floor Batch"),
            wireframe_batch: PrimitiveBatch::new("Wireframe Batch"),
            sprite_pipeline,
            sprite_batch,
            composite_pipeline,
            composite_batch,
        });
        Ok(())
    }

    /// Resize the projection, the offscreen target and the sprite viewports
    /// to the current back buffer.
    pub fn create_window_size_dependent_resources(&mut self) -> anyhow::Result<()> {
        let (width, height) = self.device_resources.output_size();
        self.projection.resize(width, height);
        self.proj = self.projection.calc_matrix();
        self.screen_pos = [width as f32 / 2.0, height as f32 / 2.0];

        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        let device = &self.device_resources.device;
        let queue = &self.device_resources.queue;

        if self.render_texture.size_resources(device, width, height) {
            let texture = self
                .render_texture
                .texture()
                .context("offscreen render target was not created")?;
            let rt_view = texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
            self.rt_descriptors
                .set(RtDescriptors::OffscreenRt as usize, rt_view)?;
            let srv = texture_bind_group(
                device,
                &scene.texture_layout,
                &texture.view,
                &scene.states.point_clamp,
                "render_texture",
            );
            self.textures
                .pile_mut()
                .set(Descriptors::RenderTexture as usize, srv)?;
        }

        scene.sprite_batch.set_viewport(queue, width, height);
        scene.composite_batch.set_viewport(queue, width, height);
        Ok(())
    }

    fn handle_device_lost(&mut self) {
        self.on_device_lost();
        let restored = self
            .device_resources
            .handle_device_lost()
            .and_then(|()| self.on_device_restored());
        if let Err(e) = restored {
            log::error!("could not recover from device loss: {:#}", e);
            self.exit_requested = true;
        }
    }

    /// Feed keyboard and mouse state from a window event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        self.keyboard.handle_window_event(event);
        self.mouse.handle_window_event(event);
    }

    /// Feed relative mouse motion.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        self.mouse.handle_device_event(event);
    }

    pub fn on_activated(&mut self) {
        log::debug!("activated");
    }

    pub fn on_deactivated(&mut self) {
        log::debug!("deactivated");
        // key-up events for held keys go to whichever window has focus now
        self.keyboard.reset();
        self.mouse.reset();
    }

    pub fn on_suspending(&mut self) {
        log::info!("suspending");
    }

    pub fn on_resuming(&mut self) {
        log::info!("resuming");
        self.timer.reset_elapsed_time();
    }

    pub fn on_window_moved(&mut self) {
        self.refresh_output_size();
    }

    pub fn on_display_change(&mut self) {
        self.refresh_output_size();
    }

    pub fn on_window_size_changed(&mut self, width: u32, height: u32) {
        if !self.device_resources.window_size_changed(width, height) {
            return;
        }
        if let Err(e) = self.create_window_size_dependent_resources() {
            log::error!("failed to resize: {:#}", e);
        }
    }

    fn refresh_output_size(&mut self) {
        if !self.device_resources.refresh_size() {
            return;
        }
        if let Err(e) = self.create_window_size_dependent_resources() {
            log::error!("failed to resize: {:#}", e);
        }
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn registry(&self) -> &TextureRegistry {
        self.textures.registry()
    }

    pub fn timer(&self) -> &StepTimer {
        &self.timer
    }

    pub fn device_resources(&self) -> &DeviceResources {
        &self.device_resources
    }
}

impl DeviceNotify for Game {
    fn on_device_lost(&mut self) {
        log::warn!("device lost, releasing device dependent resources");
        if let Some(mut scene) = self.scene.take() {
            scene.factory.release();
        }
        release_descriptors(
            &mut self.textures,
            &mut self.rt_descriptors,
            &mut self.render_texture,
        );
    }

    fn on_device_restored(&mut self) -> anyhow::Result<()> {
        self.create_device_dependent_resources()?;
        self.create_window_size_dependent_resources()?;
        log::info!(
            "device restored with {} textures",
            self.textures.registry().len()
        );
        Ok(())
    }
}

/// Drop every descriptor taken from the lost device along with the
/// offscreen target. Static slots are cleared too.
fn release_descriptors<D, V>(
    textures: &mut TextureLibrary<D>,
    rt_descriptors: &mut DescriptorPile<V>,
    render_texture: &mut RenderTexture,
) {
    textures.release();
    rt_descriptors.reset();
    render_texture.release_device();
}

/// Whether the offscreen target exists at the back buffer's size.
fn offscreen_matches(offscreen: Option<[u32; 2]>, output: (u32, u32)) -> bool {
    offscreen == Some([output.0, output.1])
}

/// Key presses are edge-triggered: keep them until an update has seen them.
fn end_input_frame(keyboard: &mut Keyboard, timer: &StepTimer, frames_before: u32) {
    if timer.frame_count() != frames_before {
        keyboard.end_frame();
    }
}

fn start_camera(settings: &Settings) -> Camera {
    Camera::new(
        settings.start_position,
        Rad(settings.start_yaw),
        Rad(settings.start_pitch),
    )
}

#[cfg(test)]
mod tests {
    use instant::Duration;

    use super::*;

    /// Records each texture's name as its descriptor.
    #[derive(Default)]
    struct NameFactory {
        created: usize,
    }

    impl TextureFactory for NameFactory {
        type Descriptor = String;

        fn create_texture(
            &mut self,
            name: &str,
            descriptor: usize,
            pile: &mut DescriptorPile<String>,
        ) -> anyhow::Result<usize> {
            pile.set(descriptor, name.to_string())?;
            self.created += 1;
            Ok(self.created - 1)
        }

        fn release(&mut self) {
            self.created = 0;
        }
    }

    #[test]
    fn default_size_is_constant() {
        assert_eq!(Game::default_size(), (800, 600));
        assert_eq!(Game::default_size(), Game::default_size());
    }

    #[test]
    fn start_camera_uses_settings() {
        let settings = Settings {
            start_position: [1.0, 2.0, 3.0],
            start_yaw: 0.5,
            start_pitch: -0.25,
            ..Default::default()
        };
        let camera = start_camera(&settings);
        assert_eq!(camera.position, cgmath::Point3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.yaw, Rad(0.5));
        assert_eq!(camera.pitch, Rad(-0.25));
    }

    #[test]
    fn release_clears_every_descriptor_and_the_offscreen_target() {
        let list = vec!["a.png".to_string(), "b.png".to_string()];
        let mut textures = TextureLibrary::new(list);
        let mut factory = NameFactory::default();
        textures.load(&mut factory).unwrap();
        let pile = textures.pile_mut();
        pile.set(Descriptors::Gui as usize, "gui".to_string()).unwrap();
        pile.set(Descriptors::RenderTexture as usize, "rt".to_string())
            .unwrap();
        let mut rt_descriptors = DescriptorPile::render_targets();
        rt_descriptors
            .set(RtDescriptors::OffscreenRt as usize, "offscreen".to_string())
            .unwrap();
        let mut render_texture = RenderTexture::new(wgpu::TextureFormat::Rgba8Unorm);

        release_descriptors(&mut textures, &mut rt_descriptors, &mut render_texture);

        assert!(textures.registry().is_empty());
        assert_eq!(textures.pile().allocated(), 0);
        assert!(textures.pile().get(Descriptors::Gui as usize).is_none());
        assert!(
            textures
                .pile()
                .get(Descriptors::RenderTexture as usize)
                .is_none()
        );
        assert!(
            rt_descriptors
                .get(RtDescriptors::OffscreenRt as usize)
                .is_none()
        );
        assert!(render_texture.texture().is_none());

        factory.release();
        textures.load(&mut factory).unwrap();
        assert_eq!(textures.registry().len(), 2);
        assert_eq!(textures.descriptor("b.png").map(String::as_str), Some("b.png"));
    }

    #[test]
    fn offscreen_follows_a_resized_back_buffer() {
        assert!(offscreen_matches(Some([800, 600]), (800, 600)));
        // back buffer reconfigured while acquiring a frame
        assert!(!offscreen_matches(Some([800, 600]), (1024, 768)));
        // released on device loss
        assert!(!offscreen_matches(None, (800, 600)));
    }

    #[test]
    fn key_press_survives_a_tick_without_update() {
        let mut timer = StepTimer::new();
        timer.set_fixed_time_step(Some(Duration::from_millis(10)));
        let mut keyboard = Keyboard::new();
        keyboard.press(KeyCode::Escape);

        let frames_before = timer.frame_count();
        timer.advance(Duration::from_millis(2), |_| panic!("no whole step yet"));
        end_input_frame(&mut keyboard, &timer, frames_before);
        assert!(keyboard.is_pressed(KeyCode::Escape));

        let frames_before = timer.frame_count();
        let mut seen = false;
        timer.advance(Duration::from_millis(10), |_| {
            seen |= keyboard.is_pressed(KeyCode::Escape)
        });
        end_input_frame(&mut keyboard, &timer, frames_before);
        assert!(seen);
        assert!(!keyboard.is_pressed(KeyCode::Escape));
        assert!(keyboard.is_held(KeyCode::Escape));
    }
}
