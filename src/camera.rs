//! Free-look perspective camera.
//!
//! Orientation is stored as yaw and pitch in degrees. The orthonormal
//! `front`/`right`/`up` basis is rebuilt whenever the position or an angle
//! changes, so the view matrix can be derived on demand and is never stale.
//!
//! ```ignore
//! let mut camera = Camera::perspective(1280.0, 720.0);
//! camera.process_keyboard(&KeyState { forward: true, ..Default::default() });
//! camera.process_mouse_movement(12.0, -4.0);
//! let view_proj = camera.projection_matrix() * camera.view_matrix();
//! ```

use glam::{Mat4, Vec3};

use crate::input::KeyState;

/// Degrees of rotation per pixel of pointer movement.
pub const MOUSE_SENSITIVITY: f32 = 0.1;
/// World units moved per tick while a movement key is held.
pub const MOVEMENT_SPEED: f32 = 0.1;
/// Pitch is clamped to `±PITCH_LIMIT` degrees so the basis never degenerates.
pub const PITCH_LIMIT: f32 = 89.0;

#[derive(Clone, Debug)]
pub struct Camera {
    position: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    fov: f32,
    width: f32,
    height: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl Camera {
    /// Creates a camera with a 45° field of view over an 800×600 viewport.
    /// Use [`with_projection`](Self::with_projection) to change it.
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            world_up,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            fov: 45.0,
            width: 800.0,
            height: 600.0,
            near: 0.1,
            far: 100.0,
            projection: Mat4::IDENTITY,
        };
        camera.update_camera_vectors();
        camera.rebuild_projection();
        camera
    }

    pub fn with_projection(mut self, fov: f32, width: f32, height: f32, near: f32, far: f32) -> Self {
        self.set_projection_matrix_props(width, height, near, far, fov);
        self
    }

    /// Camera at `(0, 0, 3)` looking down `-Z`.
    pub fn perspective(width: f32, height: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Y, -90.0, 0.0)
            .with_projection(45.0, width, height, 0.1, 100.0)
    }

    /// Same placement as [`perspective`](Self::perspective), turned to yaw -45°
    /// and pitch 45°.
    pub fn isometric(width: f32, height: f32) -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0), Vec3::Y, -45.0, 45.0)
            .with_projection(45.0, width, height, 0.1, 100.0)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_camera_vectors();
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
        self.update_camera_vectors();
    }

    /// Sets the pitch, clamped to `±PITCH_LIMIT`.
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_camera_vectors();
    }

    /// World-to-view transform for the current position and orientation.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn update_projection_matrix_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.rebuild_projection();
    }

    pub fn update_projection_matrix_aspect(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.rebuild_projection();
    }

    pub fn set_projection_matrix_props(
        &mut self,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
        fov: f32,
    ) {
        self.width = width;
        self.height = height;
        self.near = near;
        self.far = far;
        self.fov = fov;
        self.rebuild_projection();
    }

    /// Moves the camera by one tick of [`MOVEMENT_SPEED`] for every held
    /// direction. Opposing keys cancel.
    pub fn process_keyboard(&mut self, keys: &KeyState) {
        if !keys.any() {
            return;
        }

        let velocity = MOVEMENT_SPEED;
        if keys.forward {
            self.position += self.front * velocity;
        }
        if keys.back {
            self.position -= self.front * velocity;
        }
        if keys.left {
            self.position -= self.right * velocity;
        }
        if keys.right {
            self.position += self.right * velocity;
        }
        if keys.up {
            self.position += self.up * velocity;
        }
        if keys.down {
            self.position -= self.up * velocity;
        }
        self.update_camera_vectors();
    }

    /// Turns the camera by a pointer delta. Positive `dy` looks up.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * MOUSE_SENSITIVITY;
        self.pitch = (self.pitch + dy * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_camera_vectors();
    }

    fn update_camera_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    fn rebuild_projection(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect(), self.near, self.far);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPS
    }

    #[test]
    fn basis_is_orthonormal_over_angle_grid() {
        let mut camera = Camera::perspective(800.0, 600.0);
        for yaw in (-360..=360).step_by(15) {
            for pitch in (-89..=89).step_by(7) {
                camera.set_yaw(yaw as f32);
                camera.set_pitch(pitch as f32);

                let (f, r, u) = (camera.front(), camera.right(), camera.up());
                assert!((f.length() - 1.0).abs() < EPS, "yaw {yaw} pitch {pitch}");
                assert!(f.dot(r).abs() < EPS);
                assert!(f.dot(u).abs() < EPS);
                assert!(r.dot(u).abs() < EPS);
            }
        }
    }

    #[test]
    fn pitch_stays_clamped() {
        let mut camera = Camera::perspective(800.0, 600.0);
        for _ in 0..100 {
            camera.process_mouse_movement(3.0, 250.0);
            assert!(camera.pitch() <= PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), PITCH_LIMIT);

        for _ in 0..100 {
            camera.process_mouse_movement(-3.0, -400.0);
            assert!(camera.pitch() >= -PITCH_LIMIT);
        }
        assert_eq!(camera.pitch(), -PITCH_LIMIT);

        camera.set_pitch(120.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT);
    }

    #[test]
    fn mouse_movement_uses_fixed_sensitivity() {
        let mut camera = Camera::perspective(800.0, 600.0);
        camera.process_mouse_movement(100.0, 50.0);
        assert!((camera.yaw() - (-90.0 + 10.0)).abs() < EPS);
        assert!((camera.pitch() - 5.0).abs() < EPS);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::perspective(800.0, 600.0);
        assert!(approx(camera.front(), Vec3::NEG_Z));
        assert!(approx(camera.right(), Vec3::X));
        assert!(approx(camera.up(), Vec3::Y));
    }

    #[test]
    fn forward_tick_moves_along_front() {
        let mut camera = Camera::perspective(800.0, 600.0);
        camera.process_keyboard(&KeyState {
            forward: true,
            ..Default::default()
        });
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 2.9)));

        camera.process_keyboard(&KeyState {
            forward: true,
            back: true,
            ..Default::default()
        });
        assert!(approx(camera.position(), Vec3::new(0.0, 0.0, 2.9)));

        camera.process_keyboard(&KeyState {
            right: true,
            up: true,
            ..Default::default()
        });
        assert!(approx(camera.position(), Vec3::new(0.1, 0.1, 2.9)));
    }

    #[test]
    fn eye_maps_to_view_origin() {
        let mut camera = Camera::perspective(800.0, 600.0);
        camera.set_position(Vec3::new(4.0, -2.0, 7.5));

        let eye = camera.view_matrix() * camera.position().extend(1.0);
        assert!(eye.x.abs() < EPS);
        assert!(eye.y.abs() < EPS);
        assert!(eye.z.abs() < EPS);

        // a point one unit ahead lands on the -Z axis of view space
        let ahead = camera.view_matrix() * (camera.position() + camera.front()).extend(1.0);
        assert!(ahead.x.abs() < EPS && ahead.y.abs() < EPS);
        assert!((ahead.z + 1.0).abs() < EPS);
    }

    #[test]
    fn view_tracks_latest_state() {
        let mut camera = Camera::perspective(800.0, 600.0);
        let before = camera.view_matrix();
        camera.set_yaw(0.0);
        assert_ne!(before, camera.view_matrix());
        assert!(approx(camera.front(), Vec3::X));
    }

    #[test]
    fn projection_updates() {
        let mut camera = Camera::perspective(800.0, 600.0);
        let original = camera.projection_matrix();

        camera.update_projection_matrix_aspect(1920.0, 1080.0);
        assert!((camera.aspect() - 16.0 / 9.0).abs() < EPS);
        assert_ne!(original, camera.projection_matrix());

        camera.update_projection_matrix_fov(60.0);
        let expected = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        assert!(camera.projection_matrix().abs_diff_eq(expected, EPS));

        camera.set_projection_matrix_props(100.0, 100.0, 1.0, 10.0, 90.0);
        assert_eq!(camera.near(), 1.0);
        assert_eq!(camera.far(), 10.0);
        let expected = Mat4::perspective_rh(90f32.to_radians(), 1.0, 1.0, 10.0);
        assert!(camera.projection_matrix().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn isometric_preset_angles() {
        let camera = Camera::isometric(800.0, 600.0);
        assert_eq!(camera.yaw(), -45.0);
        assert_eq!(camera.pitch(), 45.0);
        let f = camera.front();
        assert!(f.x > 0.0 && f.y > 0.0 && f.z < 0.0);
        assert!((f.x + f.z).abs() < EPS);
    }
}
