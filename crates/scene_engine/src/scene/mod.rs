//! Scene graph and node modules
//!
//! The scene is a forest of nodes stored in a [`SceneGraph`] arena and
//! addressed by [`NodeId`] handles. Nodes carry a local transform, a cached
//! world transform and a set of [`Module`]s, at most one per [`ModuleKind`].

mod graph;
mod module;
mod modules;
mod node;

pub use graph::SceneGraph;
pub use module::{Module, ModuleKind, ReleaseQueue};
pub use modules::{LightModule, MaterialModule, RenderModule};
pub use node::Node;

use thiserror::Error;

slotmap::new_key_type! {
    /// Generational handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The handle does not name a live node
    #[error("Node {0:?} does not exist")]
    NodeNotFound(NodeId),

    /// `child` is not a direct child of `parent`
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent
        parent: NodeId,
        /// Node that was named as child
        child: NodeId,
    },

    /// The node already has a parent
    #[error("Node {child:?} already has parent {parent:?}")]
    AlreadyParented {
        /// Node being attached
        child: NodeId,
        /// Its current parent
        parent: NodeId,
    },

    /// Attaching would make a node its own ancestor
    #[error("Attaching {child:?} under {parent:?} would create a cycle")]
    WouldCreateCycle {
        /// Requested parent
        parent: NodeId,
        /// Requested child
        child: NodeId,
    },
}
