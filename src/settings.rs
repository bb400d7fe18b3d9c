//! Start-up configuration.
//!
//! Everything the demo would otherwise hard-code lives in [`Settings`]. The
//! defaults reproduce the stock scene; callers override fields before handing
//! the struct to [`crate::app::run_with`].

use std::f32::consts::PI;

use instant::Duration;

/// Which registry entries the scene draws with.
#[derive(Debug, Clone)]
pub struct SceneTextures {
    pub sphere_diffuse: String,
    pub sphere_normal: String,
    pub floor_diffuse: String,
    pub floor_normal: String,
    pub sprite: String,
}

impl Default for SceneTextures {
    fn default() -> Self {
        Self {
            sphere_diffuse: "planet.png".into(),
            sphere_normal: "planet_normal.png".into(),
            floor_diffuse: "tiles.png".into(),
            floor_normal: "tiles_normal.png".into(),
            sprite: "marker.png".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub title: String,
    pub clear_colour: wgpu::Color,
    /// Files under `assets/` loaded on device creation, in order.
    pub texture_load_list: Vec<String>,
    pub scene_textures: SceneTextures,
    pub start_position: [f32; 3],
    /// Radians; `π` faces `-Z`.
    pub start_yaw: f32,
    /// Radians; negative looks down.
    pub start_pitch: f32,
    pub rotation_gain: f32,
    pub movement_gain: f32,
    pub fixed_time_step: Option<Duration>,
    pub sphere_tessellation: u32,
    pub grid_divisions: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let scene_textures = SceneTextures::default();
        let texture_load_list = vec![
            scene_textures.sphere_diffuse.clone(),
            scene_textures.sphere_normal.clone(),
            scene_textures.floor_diffuse.clone(),
            scene_textures.floor_normal.clone(),
            scene_textures.sprite.clone(),
        ];
        Self {
            title: "EMTE".into(),
            clear_colour: wgpu::Color {
                r: 0.392,
                g: 0.584,
                b: 0.929,
                a: 1.0,
            },
            texture_load_list,
            scene_textures,
            start_position: [0.0, 2.0, 2.0],
            start_yaw: PI,
            start_pitch: -PI / 4.0,
            rotation_gain: 0.1,
            movement_gain: 1.0,
            fixed_time_step: None,
            sphere_tessellation: 32,
            grid_divisions: 10,
        }
    }
}
