//! Scene node storage

use std::cell::Cell;

use super::module::ModuleMap;
use super::NodeId;
use crate::foundation::math::{Mat4, Transform};

/// One entity of the hierarchy
///
/// Nodes are owned by the [`SceneGraph`](super::SceneGraph) arena and are only
/// reachable through it; edges are [`NodeId`] handles. The world transform is
/// cached in a `Cell` so it can be refreshed through a shared borrow of the
/// graph.
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) local: Transform,
    pub(crate) world: Cell<Mat4>,
    pub(crate) dirty: Cell<bool>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) selected: bool,
    pub(crate) modules: ModuleMap,
}

impl Node {
    pub(crate) fn new(name: String, local: Transform) -> Self {
        Self {
            name,
            local,
            world: Cell::new(Mat4::identity()),
            dirty: Cell::new(true),
            parent: None,
            children: Vec::new(),
            selected: false,
            modules: ModuleMap::default(),
        }
    }

    /// Debug name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node-to-parent transform
    pub fn local_transform(&self) -> &Transform {
        &self.local
    }

    /// Parent handle, `None` for roots
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node is part of the selection
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Whether the cached world transform is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Number of attached modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
