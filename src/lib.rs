//! # Glint
//!
//! **A small forward renderer for lit, textured 3D scenes.**
//!
//! A free-look camera, a flat scene of meshes paired with shaders, one
//! directional light and an ambient term, drawn every display refresh.
//!
//! ## Quick Start
//!
//! ```no_run
//! use glint::*;
//!
//! fn main() -> Result<(), AppError> {
//!     run(|ctx| {
//!         let lit = ctx.lit_shader()?;
//!         let checker = ctx.checkerboard(
//!             256,
//!             8,
//!             Color::WHITE,
//!             Color::rgb(0.2, 0.2, 0.25),
//!             TextureOptions::new().filter(FilterMode::Nearest),
//!         )?;
//!         let cube = ctx.mesh_cube(1.0, 1.0, 1.0, checker)?;
//!         let id = ctx.add_object(cube, lit, Transform::from_position(Vec3::new(0.0, 0.0, -2.0)));
//!
//!         Ok(move |frame: &mut Frame| {
//!             if let Some(cube) = frame.scene.object_mut(id) {
//!                 cube.rotate_object(Vec3::new(0.0, 45.0 * frame.dt, 0.0));
//!             }
//!         })
//!     })
//! }
//! ```
//!
//! ## Per-frame flow
//!
//! 1. Finished background loads are uploaded ([`Assets::poll`]).
//! 2. The camera integrates held keys and the pointer drag.
//! 3. The frame closure animates objects and the light.
//! 4. Every object whose mesh and texture are ready is drawn in insertion
//!    order, each through its own [`ShaderScope`].
//!
//! Hold W/A/S/D/E/Q to fly, drag with the left mouse button (or a finger) to
//! look around, press J to log the camera pose.

mod app;
mod assets;
mod camera;
mod color;
mod error;
mod geometry;
mod gpu;
mod input;
mod mesh;
mod render;
pub mod scene;
mod shader;
mod texture;

pub use app::{AppConfig, CameraPreset, Frame, SetupContext, run, run_with_config};
pub use assets::{Assets, MeshId, Resource, ResourceStatus, TextureId};
pub use camera::{Camera, MOUSE_SENSITIVITY, MOVEMENT_SPEED, PITCH_LIMIT};
pub use color::{Color, ColorError};
pub use error::{AppError, RenderError, ShaderStage};
pub use geometry::{GeometryError, RawGeometry, SphereNormals, parse_obj};
pub use gpu::{DEPTH_FORMAT, GpuContext};
pub use input::{Input, KeyBindings, KeyState};
pub use mesh::{Mesh, Transform, Vertex3d};
pub use render::ForwardPass;
pub use scene::{AmbientLight, DirectionalLight, ObjectId, Scene, SceneObject, ShaderId};
pub use shader::{
    AMBIENT_UNIFORM, CAMERA_POSITION_UNIFORM, LIGHT_UNIFORM, LIT_FRAGMENT_SOURCE,
    LIT_VERTEX_SOURCE, MODEL_UNIFORM, NORMAL_MATRIX_UNIFORM, PROJECTION_UNIFORM,
    SKY_FRAGMENT_SOURCE, Shader, ShaderDescriptor, ShaderScope, TEXTURE_UNIFORM, UniformKind,
    UniformLayout, VIEW_UNIFORM, numbered_listing,
};
pub use texture::{AlphaMode, FilterMode, Texture, TextureOptions, WrapMode, decode_image};

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
