//! Keyboard, mouse and touch state for the current frame.
//!
//! [`Input`] is owned by the running app and fed every [`WindowEvent`]. Once per
//! frame the loop reads it: held keys become a [`KeyState`] for
//! [`Camera::process_keyboard`](crate::Camera::process_keyboard), and the
//! accumulated drag delta is forwarded to
//! [`Camera::process_mouse_movement`](crate::Camera::process_mouse_movement).
//! [`Input::begin_frame`] then clears the per-frame parts.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Which physical keys drive the camera.
#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub back: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    /// Logs the camera position and orientation when pressed.
    pub log_camera: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            back: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            up: KeyCode::KeyE,
            down: KeyCode::KeyQ,
            log_camera: KeyCode::KeyJ,
        }
    }
}

/// Movement flags consumed by the camera for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl KeyState {
    pub fn from_input(input: &Input, bindings: &KeyBindings) -> Self {
        Self {
            forward: input.key_down(bindings.forward),
            back: input.key_down(bindings.back),
            left: input.key_down(bindings.left),
            right: input.key_down(bindings.right),
            up: input.key_down(bindings.up),
            down: input.key_down(bindings.down),
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right || self.up || self.down
    }
}

#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    touch: Option<(u64, Vec2)>,
    touch_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears per-frame state. Call after the frame has consumed its input.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.touch_delta = Vec2::ZERO;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
            }
            WindowEvent::Touch(touch) => {
                let location = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                self.touch_event(touch.id, touch.phase, location);
            }
            WindowEvent::Focused(false) => {
                // Key releases are not delivered while unfocused.
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    pub(crate) fn press_key(&mut self, key: KeyCode) {
        if self.keys_down.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub(crate) fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub(crate) fn move_cursor(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    pub(crate) fn touch_event(&mut self, id: u64, phase: TouchPhase, location: Vec2) {
        match (phase, self.touch) {
            (TouchPhase::Started, None) => self.touch = Some((id, location)),
            (TouchPhase::Moved, Some((active, last))) if active == id => {
                self.touch_delta += location - last;
                self.touch = Some((id, location));
            }
            (TouchPhase::Ended | TouchPhase::Cancelled, Some((active, _))) if active == id => {
                self.touch = None;
            }
            _ => {}
        }
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    pub fn mouse_position(&self) -> Option<Vec2> {
        self.mouse_position
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Screen-space drag for this frame: cursor motion while the left button is
    /// held plus any single-finger touch drag. Y grows downwards.
    pub fn drag_delta(&self) -> Vec2 {
        let mut delta = self.touch_delta;
        if self.mouse_down(MouseButton::Left) {
            delta += self.mouse_delta;
        }
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_only_on_first_frame() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);
        assert!(input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.begin_frame();
        // key repeat
        input.press_key(KeyCode::KeyW);
        assert!(!input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.release_key(KeyCode::KeyW);
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn key_state_follows_bindings() {
        let mut input = Input::new();
        input.press_key(KeyCode::KeyA);
        input.press_key(KeyCode::KeyE);

        let state = KeyState::from_input(&input, &KeyBindings::default());
        assert_eq!(
            state,
            KeyState {
                left: true,
                up: true,
                ..Default::default()
            }
        );
        assert!(state.any());
        assert!(!KeyState::default().any());
    }

    #[test]
    fn first_cursor_event_has_no_delta() {
        let mut input = Input::new();
        input.move_cursor(Vec2::new(400.0, 300.0));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);

        input.move_cursor(Vec2::new(410.0, 295.0));
        input.move_cursor(Vec2::new(412.0, 295.0));
        assert_eq!(input.mouse_delta(), Vec2::new(12.0, -5.0));

        input.begin_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn drag_needs_button_or_touch() {
        let mut input = Input::new();
        input.move_cursor(Vec2::ZERO);
        input.move_cursor(Vec2::new(5.0, 5.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);

        input.touch_event(7, TouchPhase::Started, Vec2::new(100.0, 100.0));
        input.touch_event(3, TouchPhase::Moved, Vec2::new(0.0, 0.0));
        input.touch_event(7, TouchPhase::Moved, Vec2::new(90.0, 120.0));
        assert_eq!(input.drag_delta(), Vec2::new(-10.0, 20.0));

        input.touch_event(7, TouchPhase::Ended, Vec2::new(90.0, 120.0));
        input.begin_frame();
        input.touch_event(7, TouchPhase::Moved, Vec2::new(0.0, 0.0));
        assert_eq!(input.drag_delta(), Vec2::ZERO);
    }
}
