//! Keyboard and mouse state fed from winit events.
//!
//! Events arrive through [`Keyboard::handle_window_event`],
//! [`Mouse::handle_window_event`] and [`Mouse::handle_device_event`]; the game
//! polls the resulting state once per update.

use std::collections::HashSet;

use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::camera::CameraInput;

#[derive(Debug, Default)]
pub struct Keyboard {
    held: HashSet<KeyCode>,
    pressed_this_frame: HashSet<KeyCode>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if let WindowEvent::KeyboardInput { event, .. } = event {
            if let PhysicalKey::Code(code) = event.physical_key {
                match event.state {
                    ElementState::Pressed => self.press(code),
                    ElementState::Released => self.release(code),
                }
            }
        }
    }

    pub fn press(&mut self, code: KeyCode) {
        if self.held.insert(code) {
            self.pressed_this_frame.insert(code);
        }
    }

    pub fn release(&mut self, code: KeyCode) {
        self.held.remove(&code);
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    /// True only during the update in which the key went down.
    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed_this_frame.contains(&code)
    }

    pub fn end_frame(&mut self) {
        self.pressed_this_frame.clear();
    }

    /// Forget everything, e.g. when the window loses focus and key-up
    /// events would never arrive.
    pub fn reset(&mut self) {
        self.held.clear();
        self.pressed_this_frame.clear();
    }

    fn axis(&self, positive: [KeyCode; 2], negative: [KeyCode; 2]) -> f32 {
        let pos = positive.iter().any(|k| self.is_held(*k)) as i32;
        let neg = negative.iter().any(|k| self.is_held(*k)) as i32;
        (pos - neg) as f32
    }
}

#[derive(Debug)]
pub struct Mouse {
    pub coords: PhysicalPosition<f64>,
    look_held: bool,
    delta: (f64, f64),
}

impl Default for Mouse {
    fn default() -> Self {
        Self {
            coords: (0.0, 0.0).into(),
            look_held: false,
            delta: (0.0, 0.0),
        }
    }
}

impl Mouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.coords = *position,
            WindowEvent::MouseInput { state, button, .. } => {
                self.set_button(*button, state.is_pressed())
            }
            _ => (),
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.handle_motion(*dx, *dy);
        }
    }

    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        if let MouseButton::Right = button {
            self.look_held = pressed;
            if !pressed {
                self.delta = (0.0, 0.0);
            }
        }
    }

    /// Relative motion only counts while the look button is held.
    pub fn handle_motion(&mut self, dx: f64, dy: f64) {
        if self.look_held {
            self.delta.0 += dx;
            self.delta.1 += dy;
        }
    }

    pub fn is_looking(&self) -> bool {
        self.look_held
    }

    /// Motion accumulated since the last call.
    pub fn take_delta(&mut self) -> (f64, f64) {
        std::mem::take(&mut self.delta)
    }

    pub fn reset(&mut self) {
        self.look_held = false;
        self.delta = (0.0, 0.0);
    }
}

/// Drain one update's worth of input into a [`CameraInput`].
pub fn camera_input(keyboard: &Keyboard, mouse: &mut Mouse) -> CameraInput {
    let (dx, dy) = mouse.take_delta();
    CameraInput {
        forward: keyboard.axis([KeyCode::KeyW, KeyCode::ArrowUp], [KeyCode::KeyS, KeyCode::ArrowDown]),
        right: keyboard.axis(
            [KeyCode::KeyD, KeyCode::ArrowRight],
            [KeyCode::KeyA, KeyCode::ArrowLeft],
        ),
        up: keyboard.axis([KeyCode::Space, KeyCode::PageUp], [KeyCode::KeyX, KeyCode::PageDown]),
        look_dx: dx as f32,
        look_dy: dy as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_input_means_idle_camera_input() {
        let keyboard = Keyboard::new();
        let mut mouse = Mouse::new();
        assert!(camera_input(&keyboard, &mut mouse).is_idle());
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut keyboard = Keyboard::new();
        keyboard.press(KeyCode::KeyW);
        keyboard.press(KeyCode::ArrowDown);
        keyboard.press(KeyCode::KeyD);
        let input = camera_input(&keyboard, &mut Mouse::new());
        assert_eq!(input.forward, 0.0);
        assert_eq!(input.right, 1.0);
    }

    #[test]
    fn pressed_is_edge_triggered() {
        let mut keyboard = Keyboard::new();
        keyboard.press(KeyCode::Home);
        assert!(keyboard.is_pressed(KeyCode::Home));
        keyboard.end_frame();
        keyboard.press(KeyCode::Home);
        assert!(!keyboard.is_pressed(KeyCode::Home));
        assert!(keyboard.is_held(KeyCode::Home));
    }

    #[test]
    fn mouse_motion_needs_look_button() {
        let mut mouse = Mouse::new();
        mouse.handle_motion(5.0, 3.0);
        assert_eq!(mouse.take_delta(), (0.0, 0.0));
        mouse.set_button(MouseButton::Right, true);
        mouse.handle_motion(5.0, 3.0);
        mouse.handle_motion(1.0, -1.0);
        assert_eq!(mouse.take_delta(), (6.0, 2.0));
        assert_eq!(mouse.take_delta(), (0.0, 0.0));
    }

    #[test]
    fn reset_releases_everything() {
        let mut keyboard = Keyboard::new();
        let mut mouse = Mouse::new();
        keyboard.press(KeyCode::KeyW);
        mouse.set_button(MouseButton::Right, true);
        keyboard.reset();
        mouse.reset();
        assert!(!keyboard.is_held(KeyCode::KeyW));
        assert!(!mouse.is_looking());
    }
}
