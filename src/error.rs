//! Error types shared by the renderer.
//!
//! Everything that can fail while building GPU state reports a [`RenderError`].
//! Setup failures are fatal: [`run`](crate::run) stops the event loop and
//! hands the error back to the caller wrapped in an [`AppError`].

use std::fmt;

use crate::geometry::GeometryError;

/// Which programmable stage a shader module belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures raised while creating or using GPU resources.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// No usable adapter, device or surface format.
    #[error("unsupported graphics device: {0}")]
    UnsupportedDevice(String),

    /// The device refused an allocation or the input data was unusable.
    #[error("failed to create {resource}: {message}")]
    ResourceCreation { resource: String, message: String },

    /// A shader module was rejected. `listing` is the numbered source.
    #[error("{stage} shader `{label}` failed to compile:\n{log}\n{listing}")]
    Compile {
        label: String,
        stage: ShaderStage,
        listing: String,
        log: String,
    },

    /// The stages compiled but could not be combined into a pipeline.
    #[error("shader `{label}` failed to link:\n{log}")]
    Link { label: String, log: String },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl RenderError {
    pub(crate) fn resource(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        RenderError::ResourceCreation {
            resource: resource.into(),
            message: message.to_string(),
        }
    }
}

/// Errors returned from [`run`](crate::run) once the event loop has stopped.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to create window: {0}")]
    Window(String),

    #[error("event loop error: {0}")]
    EventLoop(String),
}

impl From<winit::error::OsError> for AppError {
    fn from(e: winit::error::OsError) -> Self {
        AppError::Window(e.to_string())
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e.to_string())
    }
}
