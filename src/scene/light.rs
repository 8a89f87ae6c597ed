use glam::Vec3;

/// A light infinitely far away, shining along `direction`.
///
/// `direction` need not be unit length; shaders normalize it. `color` is an
/// unclamped intensity, so values above 1 brighten the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self { direction, color }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(-0.2, -1.0, -0.3), Vec3::ONE)
    }
}

/// Light that reaches every surface equally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
}

impl AmbientLight {
    pub fn new(color: Vec3) -> Self {
        Self { color }
    }
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::new(Vec3::splat(0.1))
    }
}
