//! Rendering techniques and the per-node uniform hook

use slotmap::SlotMap;

use super::ShaderProgram;
use crate::foundation::math::Mat4;
use crate::gpu::GpuContext;
use crate::render::RenderError;
use crate::scene::{Module, ModuleKind, NodeId, SceneGraph};

slotmap::new_key_type! {
    /// Handle to a technique in the [`TechniqueRegistry`]
    pub struct ShaderKey;
}

/// Everything a technique may read while syncing uniforms for one node
#[derive(Debug, Clone, Copy)]
pub struct UniformScope<'a> {
    /// Scene being rendered
    pub graph: &'a SceneGraph,
    /// Node being drawn
    pub node: NodeId,
    /// Camera view matrix for this frame
    pub view: Mat4,
    /// Camera projection matrix for this frame
    pub projection: Mat4,
}

impl<'a> UniformScope<'a> {
    /// World transform of the node
    pub fn world_transform(&self) -> Result<Mat4, RenderError> {
        Ok(self.graph.world_transform(self.node)?)
    }

    /// `view * world`
    pub fn model_view(&self) -> Result<Mat4, RenderError> {
        Ok(self.view * self.world_transform()?)
    }

    /// Sibling module the technique cannot render without
    pub fn require_module<T: Module>(&self, kind: ModuleKind) -> Result<&'a T, RenderError> {
        self.graph
            .module_as::<T>(self.node, kind)
            .ok_or_else(|| RenderError::MissingModule {
                node: self.graph.name(self.node).unwrap_or("<removed>").to_string(),
                kind,
            })
    }

    /// Sibling module that is used when present
    pub fn optional_module<T: Module>(&self, kind: ModuleKind) -> Option<&'a T> {
        self.graph.module_as::<T>(self.node, kind)
    }
}

/// A shader program plus the hook that feeds it per node
///
/// This is the extension point for new rendering techniques. The engine binds
/// the program, uploads the frame's lights when [`uses_lighting`] is set, then
/// calls [`update_uniforms`] before drawing the node's mesh.
///
/// [`uses_lighting`]: ShaderTechnique::uses_lighting
/// [`update_uniforms`]: ShaderTechnique::update_uniforms
pub trait ShaderTechnique {
    /// Name used in logs
    fn name(&self) -> &str {
        self.program().name()
    }

    /// The linked program
    fn program(&self) -> &ShaderProgram;

    /// Mutable access to the linked program
    fn program_mut(&mut self) -> &mut ShaderProgram;

    /// Whether the program declares the scene light uniforms
    fn uses_lighting(&self) -> bool {
        false
    }

    /// Write every per-node uniform for the node in `scope`
    fn update_uniforms(
        &mut self,
        gpu: &mut GpuContext,
        scope: &UniformScope<'_>,
    ) -> Result<(), RenderError>;
}

/// Shared techniques, one per rendering style
#[derive(Default)]
pub struct TechniqueRegistry {
    techniques: SlotMap<ShaderKey, Box<dyn ShaderTechnique>>,
}

impl TechniqueRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a technique
    pub fn insert(&mut self, technique: Box<dyn ShaderTechnique>) -> ShaderKey {
        log::debug!("Registering technique '{}'", technique.name());
        self.techniques.insert(technique)
    }

    /// Look up a technique
    pub fn get(&self, key: ShaderKey) -> Option<&dyn ShaderTechnique> {
        self.techniques.get(key).map(AsRef::as_ref)
    }

    /// Look up a technique mutably
    pub fn get_mut(&mut self, key: ShaderKey) -> Option<&mut (dyn ShaderTechnique + 'static)> {
        self.techniques.get_mut(key).map(AsMut::as_mut)
    }

    /// Whether `key` names a registered technique
    pub fn contains(&self, key: ShaderKey) -> bool {
        self.techniques.contains_key(key)
    }

    /// Number of registered techniques
    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    /// Whether no technique is registered
    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }

    /// Delete every program and empty the registry
    pub fn destroy_all(&mut self, gpu: &mut GpuContext) {
        for (_, mut technique) in self.techniques.drain() {
            technique.program_mut().destroy(gpu);
        }
    }
}

impl std::fmt::Debug for TechniqueRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.techniques.iter().map(|(key, t)| (key, t.name())))
            .finish()
    }
}
