//! Node selection
//!
//! [`SelectionManager`] keeps the selected nodes in selection order and
//! mirrors membership in each node's `selected` flag, so
//! [`SceneGraph::is_selected`] is always in agreement with the manager.
//! Selected nodes can be drawn again with another pass (typically
//! [`RenderPass::Highlight`]) without walking the whole tree.

use crate::render::{RenderEngine, RenderError, RenderPass};
use crate::scene::{NodeId, SceneError, SceneGraph};

/// Ordered set of selected nodes
#[derive(Debug, Default, Clone)]
pub struct SelectionManager {
    selected: Vec<NodeId>,
}

impl SelectionManager {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id`; returns false when it was already selected
    pub fn add_selection(&mut self, graph: &mut SceneGraph, id: NodeId) -> Result<bool, SceneError> {
        if graph.node(id)?.is_selected() {
            return Ok(false);
        }
        graph.set_selected(id, true)?;
        self.selected.push(id);
        Ok(true)
    }

    /// Deselect `id`; returns false when it was not selected
    ///
    /// A node that has been removed from the graph is simply forgotten.
    pub fn remove_selection(&mut self, graph: &mut SceneGraph, id: NodeId) -> bool {
        let Some(index) = self.selected.iter().position(|selected| *selected == id) else {
            return false;
        };
        self.selected.remove(index);
        if graph.contains(id) {
            let _ = graph.set_selected(id, false);
        }
        true
    }

    /// Deselect everything
    pub fn clear(&mut self, graph: &mut SceneGraph) {
        for id in self.selected.drain(..) {
            if graph.contains(id) {
                let _ = graph.set_selected(id, false);
            }
        }
    }

    /// Selected nodes in selection order
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.selected.iter().copied()
    }

    /// Number of selected nodes
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// True when nothing is selected
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether `id` is selected
    pub fn contains(&self, id: NodeId) -> bool {
        self.selected.contains(&id)
    }

    /// Draw every selected node again with `pass`
    ///
    /// Returns the number of nodes drawn.
    pub fn render_selected(
        &self,
        engine: &mut RenderEngine,
        graph: &SceneGraph,
        pass: RenderPass,
    ) -> Result<usize, RenderError> {
        self.render_selected_if(engine, graph, pass, |_, _| true)
    }

    /// Draw the selected nodes accepted by `predicate` again with `pass`
    ///
    /// Nodes removed from the graph since they were selected are skipped.
    pub fn render_selected_if<F>(
        &self,
        engine: &mut RenderEngine,
        graph: &SceneGraph,
        pass: RenderPass,
        mut predicate: F,
    ) -> Result<usize, RenderError>
    where
        F: FnMut(&SceneGraph, NodeId) -> bool,
    {
        let mut drawn = 0;
        for id in self.iter() {
            if !graph.contains(id) {
                log::debug!("Skipping stale selection {:?}", id);
                continue;
            }
            if predicate(graph, id) && engine.render_node(graph, id, pass)? {
                drawn += 1;
            }
        }
        Ok(drawn)
    }
}
