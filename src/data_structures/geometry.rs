//! Procedural meshes.
//!
//! [`sphere`] produces CPU-side vertex/index data; [`GeometricPrimitive`]
//! uploads it and knows how to draw itself. [`grid_lines`] builds the line
//! list used by the wireframe batch.

use std::f32::consts::PI;

use wgpu::util::DeviceExt;

use crate::data_structures::vertex::{VertexPositionColor, VertexPositionNormalTexture};

/// UV sphere centred on the origin.
///
/// `tessellation` is the number of horizontal segments (clamped to at least 3);
/// there are half as many vertical segments. Triangles wind counter-clockwise
/// when seen from outside.
pub fn sphere(diameter: f32, tessellation: u32) -> (Vec<VertexPositionNormalTexture>, Vec<u32>) {
    let tessellation = tessellation.max(3);
    let vertical = tessellation / 2;
    let horizontal = tessellation;
    let radius = diameter / 2.0;

    let mut vertices = Vec::with_capacity(((vertical + 1) * (horizontal + 1)) as usize);
    for i in 0..=vertical {
        let v = i as f32 / vertical as f32;
        let latitude = v * PI - PI / 2.0;
        let (dy, dxz) = latitude.sin_cos();

        for j in 0..=horizontal {
            let u = j as f32 / horizontal as f32;
            let longitude = u * 2.0 * PI;
            let (dx, dz) = longitude.sin_cos();
            let normal = [dx * dxz, dy, dz * dxz];
            vertices.push(VertexPositionNormalTexture::new(
                [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                [u, 1.0 - v],
            ));
        }
    }

    let stride = horizontal + 1;
    let mut indices = Vec::with_capacity((vertical * horizontal * 6) as usize);
    for i in 0..vertical {
        for j in 0..horizontal {
            let next_i = i + 1;
            let next_j = j + 1;
            indices.extend_from_slice(&[
                i * stride + j,
                i * stride + next_j,
                next_i * stride + j,
                next_i * stride + j,
                i * stride + next_j,
                next_i * stride + next_j,
            ]);
        }
    }

    (vertices, indices)
}

/// Line list for a square grid of `divisions × divisions` cells on the XZ
/// plane, `extent` units from the centre to each edge.
pub fn grid_lines(extent: f32, divisions: u32, color: [f32; 4]) -> Vec<VertexPositionColor> {
    let divisions = divisions.max(1);
    let mut lines = Vec::with_capacity(((divisions + 1) * 4) as usize);
    for i in 0..=divisions {
        let t = i as f32 / divisions as f32 * 2.0 - 1.0;
        let offset = t * extent;
        lines.push(VertexPositionColor::new([offset, 0.0, -extent], color));
        lines.push(VertexPositionColor::new([offset, 0.0, extent], color));
        lines.push(VertexPositionColor::new([-extent, 0.0, offset], color));
        lines.push(VertexPositionColor::new([extent, 0.0, offset], color));
    }
    lines
}

/// An indexed mesh living in GPU buffers.
#[derive(Debug)]
pub struct GeometricPrimitive {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl GeometricPrimitive {
    pub fn create_sphere(device: &wgpu::Device, diameter: f32, tessellation: u32) -> Self {
        let (vertices, indices) = sphere(diameter, tessellation);
        Self::from_data(device, "Sphere", &vertices, &indices)
    }

    fn from_data(
        device: &wgpu::Device,
        name: &str,
        vertices: &[VertexPositionNormalTexture],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        }
    }

    /// Issue the draw. Pipeline and bind groups must already be set.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.num_elements, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertex_and_index_counts() {
        let t = 16;
        let (vertices, indices) = sphere(1.0, t);
        assert_eq!(vertices.len() as u32, (t + 1) * (t / 2 + 1));
        assert_eq!(indices.len() as u32, t * (t / 2) * 6);
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
    }

    #[test]
    fn sphere_vertices_lie_on_surface_with_unit_normals() {
        let (vertices, _) = sphere(3.0, 12);
        for v in vertices {
            let r = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2)).sqrt();
            let n = (v.normal[0].powi(2) + v.normal[1].powi(2) + v.normal[2].powi(2)).sqrt();
            assert!((r - 1.5).abs() < 1e-4);
            assert!((n - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn tiny_tessellation_is_clamped() {
        let (vertices, indices) = sphere(1.0, 0);
        assert!(!vertices.is_empty());
        assert!(!indices.is_empty());
    }

    #[test]
    fn grid_has_two_lines_per_division_boundary() {
        let lines = grid_lines(2.0, 10, [1.0; 4]);
        assert_eq!(lines.len(), 11 * 4);
        assert!(lines.iter().all(|v| v.position[1] == 0.0));
    }
}
