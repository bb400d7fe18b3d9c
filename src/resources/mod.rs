//! Loading textures from asset files and turning them into GPU descriptors.

pub mod texture;

pub use texture::{EffectTextureFactory, TextureFactory, TextureLibrary};
