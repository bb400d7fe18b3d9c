#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_clear_offscreen_target_to_clear_colour() {
    use emte::data_structures::{render_texture::RenderTexture, texture::Texture};

    use crate::common::test_utils::gpu;

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = gpu::headless(&runtime);

    let mut target = RenderTexture::new(wgpu::TextureFormat::Rgba8Unorm);
    assert!(target.size_resources(&device, 256, 64));
    assert!(!target.size_resources(&device, 256, 64));
    let texture = target.texture().unwrap();
    let depth = Texture::create_depth_texture(&device, [256, 64], "depth_texture");

    let colour = wgpu::Color {
        r: 1.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    };
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Test Encoder"),
    });
    {
        let _pass = RenderTexture::begin_pass(&texture.view, &mut encoder, &depth.view, colour);
    }
    queue.submit(std::iter::once(encoder.finish()));

    let img = gpu::read_back(&runtime, &device, &queue, &texture.texture);
    let desired_pixel = gpu::to_rgba8(colour);
    for pixel in img.pixels() {
        assert_eq!(*pixel, desired_pixel);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn should_load_default_textures_into_descriptors() {
    use emte::{
        Settings,
        pipelines::states::CommonStates,
        resources::{EffectTextureFactory, TextureLibrary, texture::texture_layout},
    };

    use crate::common::test_utils::gpu;

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (device, queue) = gpu::headless(&runtime);
    let states = CommonStates::new(&device);
    let layout = texture_layout(&device);

    let settings = Settings::default();
    let mut library = TextureLibrary::new(settings.texture_load_list.clone());
    let mut factory = EffectTextureFactory::new(&device, &queue, &layout, &states.linear_wrap);
    library.load(&mut factory).unwrap();

    assert_eq!(factory.len(), settings.texture_load_list.len());
    for name in &settings.texture_load_list {
        assert!(library.descriptor(name).is_some(), "{} has no descriptor", name);
        let handle = library.registry().get(name).unwrap();
        let size = factory.texture(handle.slot).unwrap().size();
        assert!(size[0] > 0 && size[1] > 0);
    }
}
