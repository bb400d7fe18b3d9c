//! Immediate-mode draw batching.
//!
//! Geometry is queued on the CPU between `begin` and `end`; `end` uploads it
//! into a single vertex buffer that is drawn later inside a render pass. All
//! batches must be ended before the pass that draws them is opened, since a
//! pass cannot write buffers.
//!
//! # Key types
//!
//! - [`PrimitiveBatch<V>`] collects lines, triangles and quads of any vertex type
//! - [`SpriteBatch`] collects screen-space textured quads grouped by descriptor
//! - [`Rect`] is a pixel rectangle used for sprite destinations

use std::ops::Range;

use crate::{
    data_structures::{
        descriptor_pile::DescriptorPile,
        vertex::{SpriteVertex, Vertex},
    },
    pipelines::sprite::{SpritePipeline, ViewportUniform},
};

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Dynamic vertex buffer for primitives of vertex type `V`.
///
/// The GPU buffer grows to the next power of two when a frame needs more
/// room and is reused otherwise.
#[derive(Debug)]
pub struct PrimitiveBatch<V: Vertex> {
    label: &'static str,
    vertices: Vec<V>,
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
    count: u32,
}

impl<V: Vertex> PrimitiveBatch<V> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            vertices: Vec::new(),
            buffer: None,
            capacity: 0,
            count: 0,
        }
    }

    pub fn begin(&mut self) {
        self.vertices.clear();
    }

    pub fn draw_line(&mut self, a: V, b: V) {
        self.vertices.extend_from_slice(&[a, b]);
    }

    pub fn draw_lines(&mut self, lines: &[V]) {
        self.vertices.extend_from_slice(lines);
    }

    pub fn draw_triangle(&mut self, a: V, b: V, c: V) {
        self.vertices.extend_from_slice(&[a, b, c]);
    }

    /// Two triangles `a b c` and `a c d`; pass the corners counter-clockwise.
    pub fn draw_quad(&mut self, a: V, b: V, c: V, d: V) {
        self.vertices.extend_from_slice(&[a, b, c, a, c, d]);
    }

    /// Vertices queued since `begin`.
    pub fn pending(&self) -> &[V] {
        &self.vertices
    }

    /// Upload the queued vertices. An empty batch draws nothing.
    pub fn end(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.count = self.vertices.len() as u32;
        if self.vertices.is_empty() {
            return;
        }
        if self.buffer.is_none() || self.vertices.len() > self.capacity {
            self.capacity = self.vertices.len().next_power_of_two();
            self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: (self.capacity * std::mem::size_of::<V>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }
        if let Some(buffer) = &self.buffer {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&self.vertices));
        }
    }

    /// Draw `range` of the uploaded vertices. Pipeline and bind groups must
    /// already be set.
    pub fn draw_range(&self, render_pass: &mut wgpu::RenderPass<'_>, range: Range<u32>) {
        let Some(buffer) = &self.buffer else {
            return;
        };
        if range.is_empty() || range.end > self.count {
            return;
        }
        render_pass.set_vertex_buffer(0, buffer.slice(..));
        render_pass.draw(range, 0..1);
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        self.draw_range(render_pass, 0..self.count);
    }

    /// Number of vertices uploaded by the last `end`.
    pub fn uploaded(&self) -> u32 {
        self.count
    }
}

/// Six vertices covering `dest` with the full texture.
pub fn sprite_quad(dest: Rect, color: [f32; 4]) -> [SpriteVertex; 6] {
    let tl = SpriteVertex {
        position: [dest.left, dest.top],
        tex_coords: [0.0, 0.0],
        color,
    };
    let tr = SpriteVertex {
        position: [dest.right, dest.top],
        tex_coords: [1.0, 0.0],
        color,
    };
    let br = SpriteVertex {
        position: [dest.right, dest.bottom],
        tex_coords: [1.0, 1.0],
        color,
    };
    let bl = SpriteVertex {
        position: [dest.left, dest.bottom],
        tex_coords: [0.0, 1.0],
        color,
    };
    [tl, bl, br, tl, br, tr]
}

/// Screen-space textured quads, batched by descriptor.
#[derive(Debug)]
pub struct SpriteBatch {
    viewport: ViewportUniform,
    viewport_buffer: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    quads: PrimitiveBatch<SpriteVertex>,
    draws: Vec<(usize, Range<u32>)>,
}

impl SpriteBatch {
    pub fn new(
        device: &wgpu::Device,
        pipeline: &SpritePipeline,
        width: u32,
        height: u32,
        label: &'static str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let viewport = ViewportUniform::new(width, height);
        let viewport_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&[viewport]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
            label: Some(label),
        });
        Self {
            viewport,
            viewport_buffer,
            viewport_bind_group,
            quads: PrimitiveBatch::new(label),
            draws: Vec::new(),
        }
    }

    pub fn set_viewport(&mut self, queue: &wgpu::Queue, width: u32, height: u32) {
        self.viewport = ViewportUniform::new(width, height);
        queue.write_buffer(&self.viewport_buffer, 0, bytemuck::cast_slice(&[self.viewport]));
    }

    pub fn begin(&mut self) {
        self.quads.begin();
        self.draws.clear();
    }

    /// Draw the texture at `descriptor` so that its `origin` (in texture
    /// pixels) lands on `position`.
    pub fn draw(
        &mut self,
        descriptor: usize,
        size: [u32; 2],
        position: [f32; 2],
        origin: [f32; 2],
        color: [f32; 4],
    ) {
        let left = position[0] - origin[0];
        let top = position[1] - origin[1];
        let dest = Rect::new(left, top, left + size[0] as f32, top + size[1] as f32);
        self.draw_rect(descriptor, dest, color);
    }

    pub fn draw_rect(&mut self, descriptor: usize, dest: Rect, color: [f32; 4]) {
        let start = self.quads.pending().len() as u32;
        self.quads.draw_lines(&sprite_quad(dest, color));
        let end = start + 6;
        match self.draws.last_mut() {
            Some((last, range)) if *last == descriptor && range.end == start => range.end = end,
            _ => self.draws.push((descriptor, start..end)),
        }
    }

    pub fn end(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.quads.end(device, queue);
    }

    /// Draw calls recorded since `begin`, as (descriptor, vertex range).
    pub fn draws(&self) -> &[(usize, Range<u32>)] {
        &self.draws
    }

    pub fn render(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        pipeline: &SpritePipeline,
        pile: &DescriptorPile<wgpu::BindGroup>,
    ) {
        if self.draws.is_empty() {
            return;
        }
        render_pass.set_pipeline(&pipeline.pipeline);
        render_pass.set_bind_group(0, &self.viewport_bind_group, &[]);
        for (descriptor, range) in &self.draws {
            match pile.get(*descriptor) {
                Some(bind_group) => {
                    render_pass.set_bind_group(1, bind_group, &[]);
                    self.quads.draw_range(render_pass, range.clone());
                }
                None => log::warn!("sprite descriptor {} is empty, skipping", descriptor),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::vertex::VertexPositionColor;

    fn v(x: f32) -> VertexPositionColor {
        VertexPositionColor::new([x, 0.0, 0.0], [1.0; 4])
    }

    #[test]
    fn quad_expands_to_two_triangles() {
        let mut batch: PrimitiveBatch<VertexPositionColor> = PrimitiveBatch::new("test");
        batch.begin();
        batch.draw_quad(v(0.0), v(1.0), v(2.0), v(3.0));
        let xs: Vec<f32> = batch.pending().iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 0.0, 2.0, 3.0]);
    }

    #[test]
    fn begin_discards_previous_frame() {
        let mut batch: PrimitiveBatch<VertexPositionColor> = PrimitiveBatch::new("test");
        batch.begin();
        batch.draw_line(v(0.0), v(1.0));
        batch.draw_triangle(v(0.0), v(1.0), v(2.0));
        assert_eq!(batch.pending().len(), 5);
        batch.begin();
        assert!(batch.pending().is_empty());
    }

    #[test]
    fn sprite_quad_covers_rect_with_full_uvs() {
        let quad = sprite_quad(Rect::new(10.0, 20.0, 30.0, 60.0), [1.0; 4]);
        let min_x = quad.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        let max_y = quad.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert_eq!(min_x, 10.0);
        assert_eq!(max_y, 60.0);
        assert!(quad.iter().any(|v| v.tex_coords == [1.0, 1.0]));
        assert!(quad.iter().any(|v| v.tex_coords == [0.0, 0.0]));
    }

    #[test]
    fn rect_from_size() {
        let rect = Rect::from_size(800, 600);
        assert_eq!((rect.width(), rect.height()), (800.0, 600.0));
    }
}
