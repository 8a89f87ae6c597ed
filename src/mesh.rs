//! GPU meshes and object transforms.
//!
//! - [`Vertex3d`]: the interleaved vertex format every mesh uses
//! - [`Mesh`]: vertex and index buffers plus the texture the mesh is drawn with
//! - [`Transform`]: position, Euler rotation (degrees) and scale
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | uv        | Float32x2 | 12     | 1               |
//! | normal    | Float32x3 | 20     | 2               |
//!
//! Every pipeline built by [`Shader`](crate::Shader) reads this layout through
//! [`Vertex3d::LAYOUT`].

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::assets::TextureId;
use crate::error::RenderError;
use crate::geometry::{RawGeometry, SphereNormals};
use crate::gpu::GpuContext;

/// One vertex: position, texture coordinate and normal, 32 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    /// Should be unit length for lighting to be correct.
    pub normal: [f32; 3],
}

impl Vertex3d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 20,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: [f32; 3], uv: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            uv,
            normal,
        }
    }
}

/// Geometry resident on the GPU, drawn with a single texture.
///
/// Meshes are immutable once created and are shared between scene objects
/// through [`MeshId`](crate::MeshId) handles. All built-in primitives wind
/// front faces counter-clockwise.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
    vertex_count: u32,
    texture: TextureId,
}

impl Mesh {
    /// Uploads `geometry` into new vertex and index buffers.
    ///
    /// Fails with [`RenderError::ResourceCreation`] if the geometry is empty,
    /// references a vertex that does not exist, or the device refuses the
    /// allocation.
    pub fn create(
        gpu: &GpuContext,
        geometry: &RawGeometry,
        texture: TextureId,
    ) -> Result<Self, RenderError> {
        use wgpu::util::DeviceExt;

        if geometry.indices.is_empty() || geometry.vertices.is_empty() {
            return Err(RenderError::resource("mesh", "geometry has no triangles"));
        }
        if let Some(bad) = geometry
            .indices
            .iter()
            .find(|&&i| i as usize >= geometry.vertices.len())
        {
            return Err(RenderError::resource(
                "mesh",
                format!(
                    "index {bad} out of range for {} vertices",
                    geometry.vertices.len()
                ),
            ));
        }

        let (buffers, error) = gpu.scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&geometry.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (vertex_buffer, index_buffer)
        });
        if let Some(error) = error {
            return Err(RenderError::resource("mesh buffers", error));
        }

        let (vertex_buffer, index_buffer) = buffers;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            vertex_count: geometry.vertices.len() as u32,
            texture,
        })
    }

    /// Builds a mesh from flat parallel streams: `positions` (xyz), `uvs` (uv)
    /// and optional `normals` (xyz). Missing normals are computed from the
    /// triangles.
    pub fn from_streams(
        gpu: &GpuContext,
        positions: &[f32],
        indices: &[u32],
        uvs: &[f32],
        normals: Option<&[f32]>,
        texture: TextureId,
    ) -> Result<Self, RenderError> {
        let geometry = RawGeometry::from_streams(positions, indices, uvs, normals)?;
        Self::create(gpu, &geometry, texture)
    }

    /// A `width` × `height` rectangle in the XY plane with one corner at the origin.
    pub fn plane(
        gpu: &GpuContext,
        width: f32,
        height: f32,
        texture: TextureId,
    ) -> Result<Self, RenderError> {
        Self::create(gpu, &RawGeometry::plane(width, height), texture)
    }

    /// A box centred on the origin.
    pub fn cube(
        gpu: &GpuContext,
        width: f32,
        height: f32,
        depth: f32,
        texture: TextureId,
    ) -> Result<Self, RenderError> {
        Self::create(gpu, &RawGeometry::cube(width, height, depth), texture)
    }

    /// A UV sphere. See [`RawGeometry::sphere`].
    pub fn sphere(
        gpu: &GpuContext,
        radius: f32,
        slices: u32,
        stacks: u32,
        normals: SphereNormals,
        texture: TextureId,
    ) -> Result<Self, RenderError> {
        Self::create(
            gpu,
            &RawGeometry::sphere(radius, slices, stacks, normals),
            texture,
        )
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Binds `texture` at group 1 with the mesh buffers and draws every index.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>, texture: &wgpu::BindGroup) {
        pass.set_bind_group(1, texture, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub(crate) fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Position, rotation and scale of an object.
///
/// `rotation` holds Euler angles in degrees. They are applied about Z, then Y,
/// then X in the object's parent frame, i.e. the quaternion is `qz * qy * qx`.
/// [`matrix`](Self::matrix) composes translate · rotate · scale.
///
/// ```
/// use glint::{Transform, Vec3};
///
/// let t = Transform::new()
///     .position(Vec3::new(0.0, 2.0, -5.0))
///     .rotation(Vec3::new(0.0, 45.0, 0.0))
///     .uniform_scale(2.0);
/// assert_eq!(t.scale, Vec3::splat(2.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the Euler rotation in degrees.
    pub fn rotation(mut self, degrees: Vec3) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn quaternion(&self) -> Quat {
        let r = self.rotation;
        Quat::from_euler(
            EulerRot::ZYX,
            r.z.to_radians(),
            r.y.to_radians(),
            r.x.to_radians(),
        )
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quaternion(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 32);
        assert_eq!(Vertex3d::LAYOUT.array_stride, 32);
    }

    #[test]
    fn translation_moves_origin() {
        let p = Vec3::new(3.0, -1.0, 8.0);
        let m = Transform::from_position(p).matrix();
        assert!(m.transform_point3(Vec3::ZERO).abs_diff_eq(p, EPS));
    }

    #[test]
    fn yaw_rotation_turns_x_towards_negative_z() {
        let m = Transform::new().rotation(Vec3::new(0.0, 90.0, 0.0)).matrix();
        assert!(m.transform_point3(Vec3::X).abs_diff_eq(Vec3::NEG_Z, EPS));
    }

    #[test]
    fn rotation_order_is_z_then_y_then_x() {
        let t = Transform::new().rotation(Vec3::new(30.0, 40.0, 50.0));
        let expected = Quat::from_rotation_z(50f32.to_radians())
            * Quat::from_rotation_y(40f32.to_radians())
            * Quat::from_rotation_x(30f32.to_radians());
        assert!(t.quaternion().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn scale_applies_before_translation() {
        let m = Transform::new()
            .position(Vec3::new(1.0, 0.0, 0.0))
            .scale(Vec3::new(2.0, 3.0, 4.0))
            .matrix();
        assert!(
            m.transform_point3(Vec3::ONE)
                .abs_diff_eq(Vec3::new(3.0, 3.0, 4.0), EPS)
        );
    }
}
