//! # Rendering
//!
//! The [`RenderEngine`] turns a [`SceneGraph`](crate::scene::SceneGraph) into
//! draw calls. A frame runs as a small state machine:
//!
//! ```text
//! begin_frame -> render_pass(Opaque) -> [render_pass / render_node ...] -> end_frame
//! ```
//!
//! `begin_frame` frees resources released by the scene, applies a pending
//! viewport change, clears the framebuffer, queries the camera and builds the
//! frame's view-space light snapshot. Each pass walks the scene depth-first;
//! for every node with a [`RenderModule`](crate::scene::RenderModule) it binds
//! the technique for that pass, uploads lights once per lit program, runs the
//! technique's uniform hook, draws and unbinds. When an overlay blend is
//! enabled, a compute pass composites the overlay target onto the scene target
//! after the last pass. `end_frame` presents.

mod camera;
mod engine;
mod frame;
mod surface;

pub use camera::{Camera, CameraView};
pub use engine::{BuiltinTechniques, RenderEngine};
pub use frame::{FramePhase, FrameStats};
pub use surface::SurfaceState;

use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::gpu::BackendError;
use crate::scene::{ModuleKind, SceneError};
use crate::shader::{ShaderError, ShaderKey};

/// Traversal purpose; selects which technique draws a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// Main scene pass; falls back to each node's own technique
    Opaque,
    /// Selection outline pass
    Highlight,
    /// Overlay drawn on top of the scene
    Overlay,
}

impl fmt::Display for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opaque => "opaque",
            Self::Highlight => "highlight",
            Self::Overlay => "overlay",
        };
        f.write_str(name)
    }
}

/// Rendering errors
///
/// Every variant aborts the frame it occurred in. Per-node draw failures are
/// not errors; they are logged and counted in [`FrameStats`].
#[derive(Error, Debug)]
pub enum RenderError {
    /// Shader construction, uniform or binding error
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// Scene graph error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Backend resource error
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Invalid renderer configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A technique needs a sibling module the node does not have
    #[error("Node '{node}' has no {kind} module")]
    MissingModule {
        /// Debug name of the node
        node: String,
        /// Kind of the missing module
        kind: ModuleKind,
    },

    /// A shader key that is not in the technique registry
    #[error("Technique {0:?} is not registered")]
    UnknownTechnique(ShaderKey),

    /// A frame call arrived in the wrong phase
    #[error("Expected frame phase {expected:?}, but the frame is {actual:?}")]
    FrameState {
        /// Phase the call needs
        expected: FramePhase,
        /// Phase the engine is in
        actual: FramePhase,
    },
}
