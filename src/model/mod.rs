//! Core data model: nodes, edges, and the assembled graph artifact.

mod edge;
mod graph;
mod node;

pub use edge::{dynamic_target, is_dynamic_target, CallSite, Edge, EdgeKind};
pub use graph::{
    Cluster, CodeGraph, EntryNode, EntryPointStats, LargestFunction, Metadata, StatBlock, Stats,
    ENTRY_NODE_ID,
};
pub use node::{FunctionKind, Language, Node, NodeColor, NodeStatus, Parameter, Visibility};

/// Name of the synthetic per-file module-initializer node.
pub const VAR_INIT_NAME: &str = "__var_init__";
