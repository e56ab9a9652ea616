//! GPU abstraction layer
//!
//! Everything the core needs from a graphics API goes through the
//! [`GraphicsBackend`] trait: stage compilation, program linking, uniform
//! locations and writes, texture/mesh resources, clears, draws, compute
//! dispatches and present. [`GpuContext`] wraps one backend together with the
//! binding register (the currently bound program, texture units and image
//! units), which is the single piece of global GPU state the renderer has to
//! keep consistent.
//!
//! [`HeadlessBackend`] is a complete backend that records every command
//! instead of talking to a driver. It reflects uniform declarations out of the
//! GLSL sources so naming mismatches surface exactly as they would on a real
//! context.

mod backend;
mod context;
mod headless;
mod mesh;
mod reflect;
mod value;

pub use backend::{GraphicsBackend, BackendResult};
pub use context::{GpuContext, BindingError};
pub use headless::{HeadlessBackend, GpuCommand};
pub use mesh::{MeshData, TextureData};
pub use value::UniformValue;

use std::fmt;
use thiserror::Error;

/// Handle to a compiled (not yet linked) shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageId(pub u32);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Resolved binding location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Opaque handle to mesh geometry uploaded to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Opaque handle to a texture uploaded to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Kind of a shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Compute stage (cannot be linked together with graphics stages)
    Compute,
}

impl StageKind {
    /// Conventional file extension of the stage's source
    pub fn extension(self) -> &'static str {
        match self {
            Self::Vertex => "vert",
            Self::Fragment => "frag",
            Self::Compute => "comp",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// How a compute program may touch a bound image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAccess {
    /// Load only
    ReadOnly,
    /// Store only
    WriteOnly,
    /// Load and store
    ReadWrite,
}

bitflags::bitflags! {
    /// Framebuffer targets cleared at the start of a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearTargets: u32 {
        /// Color attachment
        const COLOR = 1 << 0;
        /// Depth attachment
        const DEPTH = 1 << 1;
        /// Stencil attachment
        const STENCIL = 1 << 2;
    }
}

/// A GPU resource whose lifetime is owned by a scene module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResource {
    /// Mesh geometry
    Mesh(MeshHandle),
    /// Texture image
    Texture(TextureHandle),
}

/// Errors reported by a graphics backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Stage compilation failed; carries the compiler diagnostic
    #[error("Shader compilation failed: {0}")]
    CompileFailed(String),

    /// Program link failed; carries the linker diagnostic
    #[error("Program link failed: {0}")]
    LinkFailed(String),

    /// Mesh or texture creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// A draw call could not be issued
    #[error("Draw failed: {0}")]
    DrawFailed(String),

    /// A compute dispatch could not be issued
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    /// The handle does not name a live backend resource
    #[error("Unknown resource: {0}")]
    UnknownResource(String),
}
