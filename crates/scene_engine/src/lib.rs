//! # Scene Engine
//!
//! A scene-graph rendering core: a hierarchy of transform nodes carrying
//! modules (render, material, light), shader techniques with named uniforms,
//! a per-frame light pipeline that moves lights into view space, and a
//! selection set that can be re-rendered with an outline pass.
//!
//! ## Features
//!
//! - **Arena Scene Graph**: Generational node handles with cached world transforms
//! - **Modules**: At most one module per kind on each node, cleaned up exactly once
//! - **Shader Techniques**: Named uniforms, struct and array fields, per-pass selection
//! - **Lighting**: Scene and node lights uploaded in view space into fixed slots
//! - **Headless Backend**: Records every GPU command for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut engine = RenderEngine::new(HeadlessBackend::new(), RendererConfig::default())?;
//!     let techniques = engine.register_builtin_techniques()?;
//!
//!     let mut graph = SceneGraph::new();
//!     let mesh = engine.create_mesh(&MeshData::cube())?;
//!     let cube = graph.create_node("cube");
//!     graph.attach_module(cube, RenderModule::owned(mesh, techniques.phong))?;
//!     graph.attach_module(cube, MaterialModule::new())?;
//!
//!     let camera = Camera::default();
//!     let lights = SceneLights::default();
//!     let stats = engine.render_frame(&mut graph, &camera, &lights, None)?;
//!     println!("drew {} nodes", stats.nodes_drawn);
//!
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod foundation;
pub mod gpu;
pub mod lighting;
pub mod render;
pub mod scene;
pub mod selection;
pub mod shader;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig},
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        gpu::{GpuContext, GraphicsBackend, HeadlessBackend, MeshData, TextureData},
        lighting::{
            DirectionalLight, LightCapacity, NodeLight, PointLight, SceneLights, SpotLight,
        },
        render::{
            BuiltinTechniques, Camera, CameraView, FrameStats, RenderEngine, RenderError,
            RenderPass,
        },
        scene::{
            LightModule, MaterialModule, Module, ModuleKind, NodeId, RenderModule, SceneError,
            SceneGraph,
        },
        selection::SelectionManager,
        shader::{ShaderKey, ShaderProgram, ShaderTechnique, UniformScope},
    };
}
