//! emte
//!
//! A small real-time renderer built around a single controller, [`game::Game`],
//! that owns the graphics device, a frame timer, loaded textures, draw batches
//! and an offscreen render target. Each frame the scene (a normal-mapped
//! sphere, a textured floor, a wireframe grid and a sprite) is drawn into the
//! offscreen texture, which is then composited onto the window.
//!
//! High-level modules
//! - `app`: winit event loop hosting the game; `run()` is the entry point
//! - `game`: the controller and its lifecycle (initialize, tick, update, render)
//! - `device_resources`: wgpu device/surface ownership and device-loss recovery
//! - `camera`: first-person camera, controller and projection
//! - `input`: keyboard and mouse state
//! - `timer`: fixed or variable step frame timer
//! - `settings`: start-up configuration
//! - `data_structures`: textures, descriptor piles, registry, vertices, meshes
//! - `pipelines`: normal-map, wireframe and sprite effects plus samplers
//! - `resources`: texture loading and the texture factory
//! - `render`: primitive and sprite batches
//!

pub mod app;
pub mod camera;
pub mod data_structures;
pub mod device_resources;
pub mod game;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod settings;
pub mod timer;

// Re-exports commonly used types for convenience in downstream code.
pub use game::Game;
pub use settings::Settings;
