//! Arena-backed scene graph

use slotmap::SlotMap;

use super::module::{Module, ModuleKind, ReleaseQueue};
use super::node::Node;
use super::{NodeId, SceneError};
use crate::foundation::math::{Mat4, Transform};
use crate::gpu::GpuResource;

/// Node hierarchy with lazily cached world transforms
///
/// Nodes live in a generational arena, so a handle to a removed node is
/// detected instead of dangling. World transforms are recomputed on read,
/// top-down from the nearest clean ancestor.
///
/// Invariant: every descendant of a dirty node is dirty. Marking a subtree
/// therefore stops at the first node that is already dirty.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
    releases: ReleaseQueue,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached root node with an identity transform
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        self.create_node_with(name, Transform::identity())
    }

    /// Create a detached root node
    pub fn create_node_with(&mut self, name: impl Into<String>, local: Transform) -> NodeId {
        let id = self.nodes.insert(Node::new(name.into(), local));
        self.roots.push(id);
        log::trace!("Created node {:?}", id);
        id
    }

    /// Create a node directly under `parent`
    pub fn create_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Transform,
    ) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let child = self.create_node_with(name, local);
        self.add_child(parent, child)?;
        Ok(child)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Whether `id` names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parentless nodes in creation order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Debug name of a live node
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(Node::name)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    /// Children of a node, in insertion order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.node(id)?.children)
    }

    /// Whether `ancestor` is `id` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|node| node.parent);
        }
        false
    }

    /// Append `child` to the children of `parent`
    ///
    /// `child` must be a root. The child's subtree is marked dirty.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node(parent)?;
        if let Some(existing) = self.node(child)?.parent {
            return Err(SceneError::AlreadyParented { child, parent: existing });
        }
        if self.is_ancestor(child, parent) {
            return Err(SceneError::WouldCreateCycle { parent, child });
        }

        self.roots.retain(|&root| root != child);
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        self.mark_dirty(child);
        log::trace!("Attached {:?} under {:?}", child, parent);
        Ok(())
    }

    /// Remove `child` from `parent` and destroy its subtree
    ///
    /// Every module of the removed subtree is cleaned up exactly once.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        self.node(parent)?;
        if self.node(child)?.parent != Some(parent) {
            return Err(SceneError::NotAChild { parent, child });
        }
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.destroy_subtree(child);
        Ok(())
    }

    /// Destroy a node and its subtree, wherever it sits
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), SceneError> {
        match self.node(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => {
                self.roots.retain(|&root| root != id);
                self.destroy_subtree(id);
                Ok(())
            }
        }
    }

    /// Destroy every node
    pub fn clear(&mut self) {
        for root in std::mem::take(&mut self.roots) {
            self.destroy_subtree(root);
        }
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        let doomed = self.depth_first_from(id);
        for node_id in &doomed {
            if let Some(mut node) = self.nodes.remove(*node_id) {
                node.modules.cleanup_all(&mut self.releases);
            }
        }
        log::debug!("Destroyed subtree of {:?} ({} nodes)", id, doomed.len());
    }

    /// Node-to-parent transform
    pub fn local_transform(&self, id: NodeId) -> Result<&Transform, SceneError> {
        Ok(&self.node(id)?.local)
    }

    /// Replace the local transform and invalidate the subtree
    pub fn set_local_transform(&mut self, id: NodeId, local: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.local = local;
        self.mark_dirty(id);
        Ok(())
    }

    /// Node-to-world transform, recomputed first when stale
    pub fn world_transform(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let node = self.node(id)?;
        if !node.dirty.get() {
            return Ok(node.world.get());
        }

        // Walk up to the nearest clean ancestor, then recompute downwards.
        let mut path = vec![id];
        let mut world = Mat4::identity();
        let mut cursor = node.parent;
        while let Some(parent_id) = cursor {
            let parent = self.node(parent_id)?;
            if !parent.dirty.get() {
                world = parent.world.get();
                break;
            }
            path.push(parent_id);
            cursor = parent.parent;
        }

        for &node_id in path.iter().rev() {
            let node = self.node(node_id)?;
            world = world * node.local.to_matrix();
            node.world.set(world);
            node.dirty.set(false);
        }
        Ok(world)
    }

    fn mark_dirty(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                if node.dirty.replace(true) {
                    continue;
                }
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Pre-order traversal of every tree, roots and siblings in order
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            self.collect_depth_first(root, &mut order);
        }
        order
    }

    /// Pre-order traversal of one subtree
    pub fn depth_first_from(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        self.collect_depth_first(id, &mut order);
        order
    }

    fn collect_depth_first(&self, id: NodeId, order: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                order.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// Attach a module, replacing and cleaning up any module of the same kind
    pub fn attach_module(&mut self, id: NodeId, module: impl Module) -> Result<(), SceneError> {
        self.attach_boxed(id, Box::new(module))
    }

    /// Attach an already boxed module
    pub fn attach_boxed(&mut self, id: NodeId, mut module: Box<dyn Module>) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        module.set_owner(Some(id));
        let kind = module.kind();
        if let Some(mut replaced) = node.modules.insert(module) {
            log::debug!("Replacing {} module on {:?}", kind, id);
            replaced.cleanup(&mut self.releases);
            replaced.set_owner(None);
        }
        Ok(())
    }

    /// Detach a module without cleaning it up
    pub fn detach_module(
        &mut self,
        id: NodeId,
        kind: ModuleKind,
    ) -> Result<Option<Box<dyn Module>>, SceneError> {
        let mut module = self.node_mut(id)?.modules.remove(kind);
        if let Some(module) = module.as_mut() {
            module.set_owner(None);
        }
        Ok(module)
    }

    /// Module of `kind`, if the node is live and has one
    pub fn module(&self, id: NodeId, kind: ModuleKind) -> Option<&dyn Module> {
        self.nodes.get(id)?.modules.get(kind)
    }

    /// Mutable module of `kind`
    pub fn module_mut(&mut self, id: NodeId, kind: ModuleKind) -> Option<&mut (dyn Module + 'static)> {
        self.nodes.get_mut(id)?.modules.get_mut(kind)
    }

    /// Module of `kind` downcast to its concrete type
    pub fn module_as<T: Module>(&self, id: NodeId, kind: ModuleKind) -> Option<&T> {
        self.module(id, kind)?.as_any().downcast_ref::<T>()
    }

    /// Mutable module of `kind` downcast to its concrete type
    pub fn module_as_mut<T: Module>(&mut self, id: NodeId, kind: ModuleKind) -> Option<&mut T> {
        self.module_mut(id, kind)?.as_any_mut().downcast_mut::<T>()
    }

    /// Kinds of the modules attached to a node
    pub fn module_kinds(&self, id: NodeId) -> Result<Vec<ModuleKind>, SceneError> {
        Ok(self.node(id)?.modules.kinds().collect())
    }

    /// Whether the node is part of the selection
    pub fn is_selected(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.selected)
    }

    pub(crate) fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.selected = selected;
        Ok(())
    }

    /// Resources released by module cleanup and not yet freed
    pub fn pending_releases(&self) -> &[GpuResource] {
        self.releases.pending()
    }

    /// Hand over every pending release
    pub fn take_releases(&mut self) -> Vec<GpuResource> {
        self.releases.drain()
    }
}
