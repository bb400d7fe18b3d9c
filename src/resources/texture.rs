use std::path::PathBuf;

use anyhow::Context as _;

use crate::data_structures::{
    descriptor_pile::DescriptorPile,
    texture::Texture,
    texture_registry::{TexHandle, TextureRegistry},
};

/// Layout of a single-texture descriptor: a sampled 2D texture at binding 0
/// and its sampler at binding 1. Every descriptor in the shader-visible pile
/// uses it, so any texture can feed any textured pipeline.
pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

pub fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    label: &str,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some(label),
    })
}

/// Directories searched for asset files, in order: `$EMTE_ASSETS`,
/// `./assets`, then the copy the build script placed next to the build
/// output.
fn asset_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(dir) = std::env::var_os("EMTE_ASSETS") {
        dirs.push(PathBuf::from(dir));
    }
    dirs.push(std::path::Path::new("./").join("assets"));
    dirs.push(PathBuf::from(env!("OUT_DIR")).join("assets"));
    dirs
}

pub fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let dirs = asset_dirs();
    let path = dirs
        .iter()
        .map(|dir| dir.join(file_name))
        .find(|path| path.is_file())
        .with_context(|| format!("asset `{}` not found in {:?}", file_name, dirs))?;
    let data = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(data)
}

pub fn load_texture(
    file_name: &str,
    is_normal_map: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    let data = load_binary(file_name)?;
    let format = file_name.rsplit_once('.').map(|(_, ext)| ext);
    Texture::from_bytes(device, queue, &data, file_name, format, is_normal_map)
}

/// Creates GPU textures and writes their descriptors.
///
/// The factory owns the textures themselves (addressed by the returned
/// slot); the descriptor referencing each texture goes into the caller's
/// pile at the index the caller allocated.
pub trait TextureFactory {
    type Descriptor;

    /// Load `name`, store its descriptor at `descriptor` in `pile` and return
    /// the slot the texture occupies inside the factory.
    fn create_texture(
        &mut self,
        name: &str,
        descriptor: usize,
        pile: &mut DescriptorPile<Self::Descriptor>,
    ) -> anyhow::Result<usize>;

    /// Drop every texture created so far.
    fn release(&mut self);
}

/// [`TextureFactory`] backed by `wgpu`, loading files from the asset dirs.
#[derive(Debug)]
pub struct EffectTextureFactory {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: Vec<Texture>,
}

impl EffectTextureFactory {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) -> Self {
        // wgpu handles are internally reference counted, cloning only bumps the count
        Self {
            device: device.clone(),
            queue: queue.clone(),
            layout: layout.clone(),
            sampler: sampler.clone(),
            textures: Vec::new(),
        }
    }

    pub fn texture(&self, slot: usize) -> Option<&Texture> {
        self.textures.get(slot)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureFactory for EffectTextureFactory {
    type Descriptor = wgpu::BindGroup;

    fn create_texture(
        &mut self,
        name: &str,
        descriptor: usize,
        pile: &mut DescriptorPile<wgpu::BindGroup>,
    ) -> anyhow::Result<usize> {
        // Naming convention for linear data; everything else is colour.
        let is_normal_map = name.contains("normal");
        let texture = load_texture(name, is_normal_map, &self.device, &self.queue)?;
        let bind_group = texture_bind_group(
            &self.device,
            &self.layout,
            &texture.view,
            &self.sampler,
            name,
        );
        pile.set(descriptor, bind_group)?;
        let slot = self.textures.len();
        self.textures.push(texture);
        log::debug!("texture {} -> slot {}, descriptor {}", name, slot, descriptor);
        Ok(slot)
    }

    fn release(&mut self) {
        self.textures.clear();
    }
}

/// The load list together with the registry and descriptor pile it fills.
#[derive(Debug)]
pub struct TextureLibrary<D> {
    load_list: Vec<String>,
    registry: TextureRegistry,
    pile: DescriptorPile<D>,
}

impl<D> TextureLibrary<D> {
    pub fn new(load_list: Vec<String>) -> Self {
        Self {
            load_list,
            registry: TextureRegistry::new(),
            pile: DescriptorPile::shader_visible(),
        }
    }

    /// Load every entry of the load list through `factory`.
    ///
    /// Repeated names are skipped before a descriptor is allocated, so the
    /// first occurrence wins and nothing leaks.
    pub fn load<F>(&mut self, factory: &mut F) -> anyhow::Result<()>
    where
        F: TextureFactory<Descriptor = D>,
    {
        for name in &self.load_list {
            if self.registry.contains(name) {
                log::warn!("texture `{}` appears twice in the load list, skipping", name);
                continue;
            }
            let desc = self.pile.allocate()?;
            let slot = factory
                .create_texture(name, desc, &mut self.pile)
                .with_context(|| format!("failed to create texture `{}`", name))?;
            self.registry.insert(name, TexHandle::new(desc, slot))?;
        }
        log::info!("loaded {} textures", self.registry.len());
        Ok(())
    }

    /// Forget every handle and descriptor. Static descriptor slots are
    /// cleared as well.
    pub fn release(&mut self) {
        self.registry.clear();
        self.pile.reset();
    }

    pub fn registry(&self) -> &TextureRegistry {
        &self.registry
    }

    pub fn pile(&self) -> &DescriptorPile<D> {
        &self.pile
    }

    pub fn pile_mut(&mut self) -> &mut DescriptorPile<D> {
        &mut self.pile
    }

    pub fn load_list(&self) -> &[String] {
        &self.load_list
    }

    /// Descriptor of the texture registered under `name`.
    pub fn descriptor(&self, name: &str) -> Option<&D> {
        self.registry
            .get(name)
            .and_then(|handle| self.pile.get(handle.desc))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// Hands out consecutive slots and records the descriptor index as the
    /// descriptor itself.
    #[derive(Default)]
    struct CountingFactory {
        created: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl TextureFactory for CountingFactory {
        type Descriptor = usize;

        fn create_texture(
            &mut self,
            name: &str,
            descriptor: usize,
            pile: &mut DescriptorPile<usize>,
        ) -> anyhow::Result<usize> {
            if self.fail_on == Some(name) {
                anyhow::bail!("cannot decode {}", name);
            }
            pile.set(descriptor, descriptor)?;
            self.created.push(name.to_string());
            Ok(self.created.len() - 1)
        }

        fn release(&mut self) {
            self.created.clear();
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_entry_gets_distinct_slot_and_descriptor() {
        let mut library = TextureLibrary::new(names(&["a.png", "b.png", "c.png"]));
        let mut factory = CountingFactory::default();
        library.load(&mut factory).unwrap();

        let handles: Vec<_> = library.registry().iter().map(|(_, h)| h).collect();
        assert_eq!(handles.len(), 3);
        let slots: HashSet<_> = handles.iter().map(|h| h.slot).collect();
        let descs: HashSet<_> = handles.iter().map(|h| h.desc).collect();
        assert_eq!(slots.len(), 3);
        assert_eq!(descs.len(), 3);
        let b = library.registry().get("b.png").unwrap();
        assert_eq!(library.descriptor("b.png"), library.pile().get(b.desc));
    }

    #[test]
    fn duplicates_in_load_list_do_not_allocate() {
        let mut library = TextureLibrary::new(names(&["a.png", "a.png", "b.png"]));
        let mut factory = CountingFactory::default();
        library.load(&mut factory).unwrap();
        assert_eq!(library.registry().len(), 2);
        assert_eq!(library.pile().allocated(), 2);
        assert_eq!(factory.created, names(&["a.png", "b.png"]));
    }

    #[test]
    fn factory_errors_name_the_texture() {
        let mut library = TextureLibrary::new(names(&["a.png", "broken.png"]));
        let mut factory = CountingFactory {
            fail_on: Some("broken.png"),
            ..Default::default()
        };
        let err = library.load(&mut factory).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.png"));
    }

    #[test]
    fn running_out_of_descriptors_is_an_error() {
        let list: Vec<String> = (0..200).map(|i| format!("{}.png", i)).collect();
        let mut library = TextureLibrary::new(list);
        let mut factory = CountingFactory::default();
        assert!(library.load(&mut factory).is_err());
    }
}
