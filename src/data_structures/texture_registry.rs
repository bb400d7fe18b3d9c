//! Name → handle lookup for loaded textures.

use std::collections::HashMap;

use thiserror::Error;

/// Where a loaded texture lives on the GPU.
///
/// `desc` is the index of the texture's bind group in the shader-visible
/// [`DescriptorPile`](super::descriptor_pile::DescriptorPile), `slot` the index
/// of the texture itself inside the texture factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexHandle {
    pub desc: usize,
    pub slot: usize,
}

impl TexHandle {
    pub fn new(desc: usize, slot: usize) -> Self {
        Self { desc, slot }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("texture `{0}` is already registered")]
    Duplicate(String),
}

/// Maps texture names to their [`TexHandle`]s.
///
/// Entries are only ever added; on device loss the whole registry is cleared
/// and rebuilt.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    handles: HashMap<String, TexHandle>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. The first registration wins; a second one is rejected.
    pub fn insert(&mut self, name: &str, handle: TexHandle) -> Result<(), RegistryError> {
        if self.handles.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.handles.insert(name.to_string(), handle);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TexHandle> {
        self.handles.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TexHandle)> {
        self.handles.iter().map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }
}
