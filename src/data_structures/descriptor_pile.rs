//! Fixed-capacity descriptor tables.
//!
//! A [`DescriptorPile`] partitions a table of GPU-visible objects (bind groups,
//! render-target views) into a static region addressed by well-known enums and
//! a dynamic region handed out by [`DescriptorPile::allocate`]. Indices are
//! never reused until the whole pile is [`reset`](DescriptorPile::reset).

use thiserror::Error;

/// Static slots of the shader-visible descriptor table.
///
/// Everything from `Reserve` up to [`DESCRIPTOR_COUNT`] is dynamic and is
/// handed out to loaded textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Descriptors {
    Gui = 0,
    RenderTexture = 1,
    Reserve = 2,
}

/// Capacity of the shader-visible descriptor table.
pub const DESCRIPTOR_COUNT: usize = 128;

/// Slots of the render-target descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum RtDescriptors {
    OffscreenRt = 0,
}

/// Capacity of the render-target descriptor table.
pub const RT_DESCRIPTOR_COUNT: usize = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("descriptor pile is full ({capacity} descriptors)")]
    Full { capacity: usize },
    #[error("descriptor index {index} is out of range (capacity {capacity})")]
    OutOfRange { index: usize, capacity: usize },
}

/// A table of `capacity` descriptors whose first `reserve` entries are static.
#[derive(Debug)]
pub struct DescriptorPile<T> {
    entries: Vec<Option<T>>,
    reserve: usize,
    top: usize,
}

impl<T> DescriptorPile<T> {
    pub fn new(capacity: usize, reserve: usize) -> Self {
        let reserve = reserve.min(capacity);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            reserve,
            top: reserve,
        }
    }

    /// The pile layout used for shader-visible textures.
    pub fn shader_visible() -> Self {
        Self::new(DESCRIPTOR_COUNT, Descriptors::Reserve as usize)
    }

    /// The pile layout used for render-target views. All slots are static.
    pub fn render_targets() -> Self {
        Self::new(RT_DESCRIPTOR_COUNT, RT_DESCRIPTOR_COUNT)
    }

    /// Hand out the next dynamic index.
    pub fn allocate(&mut self) -> Result<usize, DescriptorError> {
        if self.top >= self.entries.len() {
            return Err(DescriptorError::Full {
                capacity: self.entries.len(),
            });
        }
        let index = self.top;
        self.top += 1;
        Ok(index)
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), DescriptorError> {
        let capacity = self.entries.len();
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(DescriptorError::OutOfRange { index, capacity })?;
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Drop every descriptor and rewind the dynamic allocator.
    pub fn reset(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.top = self.reserve;
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of dynamic indices handed out since the last reset.
    pub fn allocated(&self) -> usize {
        self.top - self.reserve
    }
}
