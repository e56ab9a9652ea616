//! Node capabilities
//!
//! A module attaches one kind of behaviour to a node. Each node holds at most
//! one module per [`ModuleKind`]; the concrete type behind a kind is recovered
//! with checked downcasts.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use super::NodeId;
use crate::gpu::GpuResource;

/// Slot a module occupies on its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleKind {
    /// Mesh plus shader; makes a node drawable
    Render,
    /// Surface parameters and textures
    Material,
    /// A light carried by the node
    Light,
    /// Application-defined capability
    Custom(u16),
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render => f.write_str("render"),
            Self::Material => f.write_str("material"),
            Self::Light => f.write_str("light"),
            Self::Custom(id) => write!(f, "custom({id})"),
        }
    }
}

/// GPU resources waiting to be released by the renderer
///
/// The scene graph never talks to the GPU. Module cleanup pushes resources
/// here and the render engine drains the queue at the start of the next frame.
#[derive(Debug, Default)]
pub struct ReleaseQueue {
    pending: Vec<GpuResource>,
}

impl ReleaseQueue {
    /// Schedule a resource for release
    pub fn release(&mut self, resource: GpuResource) {
        log::trace!("Queued {:?} for release", resource);
        self.pending.push(resource);
    }

    /// Resources scheduled so far
    pub fn pending(&self) -> &[GpuResource] {
        &self.pending
    }

    /// Take every scheduled resource
    pub fn drain(&mut self) -> Vec<GpuResource> {
        std::mem::take(&mut self.pending)
    }
}

/// A capability attached to exactly one node
pub trait Module: Any {
    /// Slot this module occupies
    fn kind(&self) -> ModuleKind;

    /// Node the module is attached to
    fn owner(&self) -> Option<NodeId>;

    /// Called by the graph on attach (`Some`) and detach (`None`)
    fn set_owner(&mut self, owner: Option<NodeId>);

    /// Release owned resources; runs exactly once when the module is
    /// replaced or its node is destroyed
    fn cleanup(&mut self, releases: &mut ReleaseQueue);

    /// Upcast for checked downcasts
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for checked downcasts
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Per-node module storage, one module per kind
#[derive(Default)]
pub(crate) struct ModuleMap {
    modules: BTreeMap<ModuleKind, Box<dyn Module>>,
}

impl ModuleMap {
    /// Insert, returning the module previously in that slot
    pub(crate) fn insert(&mut self, module: Box<dyn Module>) -> Option<Box<dyn Module>> {
        self.modules.insert(module.kind(), module)
    }

    pub(crate) fn remove(&mut self, kind: ModuleKind) -> Option<Box<dyn Module>> {
        self.modules.remove(&kind)
    }

    pub(crate) fn get(&self, kind: ModuleKind) -> Option<&dyn Module> {
        self.modules.get(&kind).map(AsRef::as_ref)
    }

    pub(crate) fn get_mut(&mut self, kind: ModuleKind) -> Option<&mut (dyn Module + 'static)> {
        self.modules.get_mut(&kind).map(AsMut::as_mut)
    }

    pub(crate) fn kinds(&self) -> impl Iterator<Item = ModuleKind> + '_ {
        self.modules.keys().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.modules.len()
    }

    /// Clean up every module and empty the map
    pub(crate) fn cleanup_all(&mut self, releases: &mut ReleaseQueue) {
        for (_, mut module) in std::mem::take(&mut self.modules) {
            module.cleanup(releases);
            module.set_owner(None);
        }
    }
}

impl fmt::Debug for ModuleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.modules.keys()).finish()
    }
}
