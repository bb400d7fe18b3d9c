//! First-person camera.
//!
//! - [`Camera`] holds position, yaw and pitch and builds the view matrix
//! - [`CameraController`] turns one frame of input into camera motion
//! - [`Projection`] holds the perspective parameters and follows the viewport
//!
//! The camera looks along `(cos(pitch)·sin(yaw), sin(pitch), cos(pitch)·cos(yaw))`,
//! so yaw `0` faces `+Z` and yaw `π` faces `-Z`.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3, perspective};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the view from flipping over the poles.
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(
        position: V,
        yaw: Y,
        pitch: P,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(Vector3::unit_y()).normalize()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.position + self.forward(), Vector3::unit_y())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// One update's worth of camera input.
///
/// Movement axes are in `[-1, 1]` (keys held); look deltas are raw mouse counts.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CameraInput {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub look_dx: f32,
    pub look_dy: f32,
}

impl CameraInput {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraController {
    /// Degrees of rotation per mouse count.
    pub rotation_gain: f32,
    /// Units travelled per second while a movement key is held.
    pub movement_gain: f32,
}

impl CameraController {
    pub fn new(movement_gain: f32, rotation_gain: f32) -> Self {
        Self {
            rotation_gain,
            movement_gain,
        }
    }

    pub fn update(&self, camera: &mut Camera, input: &CameraInput, dt: f32) {
        if input.is_idle() {
            return;
        }

        let gain = self.rotation_gain.to_radians();
        camera.yaw.0 -= input.look_dx * gain;
        camera.pitch.0 -= input.look_dy * gain;
        camera.pitch.0 = camera.pitch.0.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        camera.yaw.0 = wrap_angle(camera.yaw.0);

        let step = self.movement_gain * dt;
        let motion = camera.forward() * input.forward
            + camera.right() * input.right
            + Vector3::unit_y() * input.up;
        camera.position += motion * step;
    }
}

/// Wrap `angle` into `[-π, π)`, however many turns away it is.
fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;

    fn camera() -> Camera {
        Camera::new((0.0, 2.0, 2.0), Rad(PI), Deg(-45.0))
    }

    #[test]
    fn idle_input_does_not_drift() {
        let mut cam = camera();
        let start = cam;
        let controller = CameraController::new(1.0, 0.1);
        for _ in 0..1000 {
            controller.update(&mut cam, &CameraInput::default(), 1.0 / 60.0);
        }
        assert_eq!(cam, start);
    }

    #[test]
    fn forward_moves_along_view_direction() {
        let mut cam = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0));
        let controller = CameraController::new(2.0, 0.1);
        let input = CameraInput {
            forward: 1.0,
            ..Default::default()
        };
        controller.update(&mut cam, &input, 0.5);
        assert!((cam.position.z - 1.0).abs() < 1e-5);
        assert!(cam.position.x.abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = camera();
        let controller = CameraController::new(1.0, 0.1);
        let input = CameraInput {
            look_dy: -1.0e6,
            ..Default::default()
        };
        controller.update(&mut cam, &input, 0.0);
        assert!((cam.pitch.0 - PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn yaw_wraps_into_half_turn() {
        let mut cam = camera();
        let controller = CameraController::new(1.0, 1.0);
        let input = CameraInput {
            look_dx: -90.0,
            ..Default::default()
        };
        controller.update(&mut cam, &input, 0.0);
        assert!(cam.yaw.0 <= PI && cam.yaw.0 >= -PI);
        assert!((cam.yaw.0 - (-FRAC_PI_2)).abs() < 1e-5);
    }

    #[test]
    fn yaw_wraps_after_multi_turn_flick() {
        let mut cam = camera();
        let controller = CameraController::new(1.0, 0.1);
        // 1000 degrees in one update
        let input = CameraInput {
            look_dx: -10_000.0,
            ..Default::default()
        };
        controller.update(&mut cam, &input, 0.0);
        assert!(cam.yaw.0 <= PI && cam.yaw.0 >= -PI, "yaw {}", cam.yaw.0);
        // 180 + 1000 = 1180 = 3 turns + 100
        assert!((cam.yaw.0 - 100f32.to_radians()).abs() < 1e-3);

        for _ in 0..50 {
            controller.update(&mut cam, &input, 0.0);
            assert!(cam.yaw.0 <= PI && cam.yaw.0 >= -PI, "yaw {}", cam.yaw.0);
        }
    }

    #[test]
    fn wrap_angle_handles_negative_turns() {
        assert!((wrap_angle(-5.0 * TAU - 0.5) - (-0.5)).abs() < 1e-4);
        assert!((wrap_angle(3.0 * TAU + 0.25) - 0.25).abs() < 1e-4);
        assert!(wrap_angle(PI) >= -PI && wrap_angle(PI) < PI);
    }

    #[test]
    fn projection_aspect_follows_resize() {
        let mut projection = Projection::new(800, 600, Deg(70.0), 0.01, 100.0);
        projection.resize(1920, 1080);
        let m = projection.calc_matrix();
        let aspect = m.y.y / m.x.x;
        assert!((aspect - 1920.0 / 1080.0).abs() < 1e-5);
        assert!((projection.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn zero_height_does_not_divide_by_zero() {
        let projection = Projection::new(640, 0, Deg(70.0), 0.01, 100.0);
        assert!(projection.aspect().is_finite());
    }

    #[test]
    fn default_pose_looks_at_origin() {
        let cam = camera();
        let view = cam.view_matrix();
        let origin = view * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        // In view space the origin is straight ahead (negative z, centred).
        assert!(origin.x.abs() < 1e-4);
        assert!(origin.y.abs() < 1e-4);
        assert!(origin.z < 0.0);
    }
}
