//! The world being drawn: objects, their shaders and the lights.
//!
//! A [`Scene`] is a flat, insertion-ordered list of [`SceneObject`]s. Objects
//! never reference each other; each one pairs a [`MeshId`](crate::MeshId) with
//! a [`ShaderId`] and carries its own transform. Draw order is insertion order.
//!
//! Every object's shader scope receives the camera, the object's own matrices
//! and the current lights before its draw, so objects using different shaders
//! all see the same lighting.

mod light;
mod object;
#[allow(clippy::module_inception)]
mod scene;

pub use light::{AmbientLight, DirectionalLight};
pub use object::SceneObject;
pub use scene::{ObjectId, Scene, ShaderId};
