//! Engine data structures: textures, descriptor tables, vertices and meshes.
//!
//! - `descriptor_pile` holds fixed-capacity descriptor tables and their slot enums
//! - `texture_registry` maps texture names to their descriptor/slot handles
//! - `texture` is the GPU texture wrapper
//! - `render_texture` is the offscreen colour target
//! - `vertex` defines the vertex layouts
//! - `geometry` builds procedural meshes (sphere, grid)

pub mod descriptor_pile;
pub mod geometry;
pub mod render_texture;
pub mod texture;
pub mod texture_registry;
pub mod vertex;
