//! Shader programs and rendering techniques
//!
//! A [`ShaderProgram`] owns one linked GPU program and the cache of its
//! uniform locations. A [`ShaderTechnique`] wraps a program together with the
//! per-node uniform hook that pulls data out of the scene graph; techniques
//! live in the [`TechniqueRegistry`] and are shared by every node that renders
//! with them.

mod program;
mod source;
mod technique;
pub mod techniques;
mod uniform;

pub use program::ShaderProgram;
pub use source::{BuiltinShader, ShaderSource};
pub use technique::{ShaderKey, ShaderTechnique, TechniqueRegistry, UniformScope};
pub use uniform::UniformStruct;

use std::path::PathBuf;
use thiserror::Error;

use crate::gpu::{BindingError, StageKind};

/// Shader construction and uniform errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// A stage failed to compile
    #[error("Failed to compile {stage} stage of '{program}': {log}")]
    Compile {
        /// Program being built
        program: String,
        /// Failing stage
        stage: StageKind,
        /// Compiler diagnostic
        log: String,
    },

    /// The program failed to link
    #[error("Failed to link '{program}': {log}")]
    Link {
        /// Program being built
        program: String,
        /// Linker diagnostic
        log: String,
    },

    /// The backend rejected a compute dispatch
    #[error("Failed to dispatch '{program}': {log}")]
    Dispatch {
        /// Dispatched program
        program: String,
        /// Backend diagnostic
        log: String,
    },

    /// `link` was called before any stage was added
    #[error("Program '{0}' has no stages to link")]
    NoStages(String),

    /// Stages were added or `link` called on a linked program
    #[error("Program '{0}' is already linked")]
    AlreadyLinked(String),

    /// The operation needs a linked program
    #[error("Program '{0}' is not linked")]
    NotLinked(String),

    /// The linked program does not declare the uniform
    #[error("Uniform '{name}' is not declared by program '{program}'")]
    UniformNotFound {
        /// Program queried
        program: String,
        /// Fully qualified uniform name
        name: String,
    },

    /// A setter used a name that was never registered
    #[error("Uniform '{name}' was never registered on program '{program}'")]
    UnregisteredUniform {
        /// Program written
        program: String,
        /// Uniform name
        name: String,
    },

    /// Struct array index beyond the registered capacity
    #[error("Index {index} out of range for uniform array '{name}' of capacity {capacity}")]
    IndexOutOfRange {
        /// Array uniform name
        name: String,
        /// Requested index
        index: usize,
        /// Registered capacity
        capacity: usize,
    },

    /// Bind/unbind misuse, or a write to a program that is not bound
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Shader source could not be read
    #[error("Failed to read shader source {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}
