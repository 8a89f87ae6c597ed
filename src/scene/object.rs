use glam::{Mat3, Mat4, Vec3};

use crate::assets::MeshId;
use crate::mesh::Transform;
use crate::shader::{MODEL_UNIFORM, NORMAL_MATRIX_UNIFORM, ShaderScope};

use super::ShaderId;

/// A mesh placed in the world and drawn with one shader.
///
/// The model matrix is cached and recomputed by every setter, so
/// [`model_matrix`](Self::model_matrix) always reflects the current transform.
#[derive(Clone, Debug)]
pub struct SceneObject {
    transform: Transform,
    model: Mat4,
    mesh: MeshId,
    shader: ShaderId,
}

impl SceneObject {
    pub fn new(mesh: MeshId, shader: ShaderId) -> Self {
        Self {
            transform: Transform::default(),
            model: Mat4::IDENTITY,
            mesh,
            shader,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self.update_model_matrix();
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Euler angles in degrees.
    pub fn rotation(&self) -> Vec3 {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn shader(&self) -> ShaderId {
        self.shader
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// Inverse-transpose of the model matrix's upper 3x3, for transforming
    /// normals under non-uniform scale. Identity when the model is singular.
    pub fn normal_matrix(&self) -> Mat3 {
        let linear = Mat3::from_mat4(self.model);
        if linear.determinant().abs() <= f32::EPSILON {
            return Mat3::IDENTITY;
        }
        linear.inverse().transpose()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.update_model_matrix();
    }

    pub fn set_rotation(&mut self, degrees: Vec3) {
        self.transform.rotation = degrees;
        self.update_model_matrix();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.update_model_matrix();
    }

    pub fn translate_object(&mut self, delta: Vec3) {
        self.set_position(self.transform.position + delta);
    }

    pub fn rotate_object(&mut self, degrees: Vec3) {
        self.set_rotation(self.transform.rotation + degrees);
    }

    pub fn scale_object(&mut self, factor: Vec3) {
        self.set_scale(self.transform.scale * factor);
    }

    pub(crate) fn write_uniforms(&self, scope: &mut ShaderScope<'_>) {
        scope.set_mat4(MODEL_UNIFORM, self.model);
        scope.set_mat3(NORMAL_MATRIX_UNIFORM, self.normal_matrix());
    }

    fn update_model_matrix(&mut self) {
        self.model = self.transform.matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> SceneObject {
        SceneObject::new(MeshId(0), ShaderId(0))
    }

    #[test]
    fn position_moves_the_origin() {
        let mut obj = object();
        let p = Vec3::new(1.5, -2.0, 7.25);
        obj.set_position(p);
        assert_eq!(obj.model_matrix().transform_point3(Vec3::ZERO), p);
    }

    #[test]
    fn setters_never_leave_a_stale_matrix() {
        let mut obj = object();
        obj.set_scale(Vec3::splat(2.0));
        obj.set_rotation(Vec3::new(0.0, 90.0, 0.0));
        obj.set_position(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(obj.model_matrix(), obj.transform().matrix());

        let p = obj.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5, "{p}");
    }

    #[test]
    fn relative_operations_accumulate() {
        let mut obj = object();
        obj.translate_object(Vec3::X);
        obj.translate_object(Vec3::Y);
        obj.rotate_object(Vec3::new(0.0, 10.0, 0.0));
        obj.rotate_object(Vec3::new(0.0, 5.0, 0.0));
        obj.scale_object(Vec3::new(2.0, 3.0, 1.0));
        obj.scale_object(Vec3::splat(0.5));

        assert_eq!(obj.position(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(obj.rotation(), Vec3::new(0.0, 15.0, 0.0));
        assert_eq!(obj.scale(), Vec3::new(1.0, 1.5, 0.5));
        assert_eq!(obj.model_matrix(), obj.transform().matrix());
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let obj = object().with_transform(Transform::new().scale(Vec3::new(2.0, 1.0, 1.0)));
        let n = obj.normal_matrix() * Vec3::X;
        assert!((n - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);

        let flat = object().with_transform(Transform::new().scale(Vec3::ZERO));
        assert_eq!(flat.normal_matrix(), Mat3::IDENTITY);
    }
}
