//! Graph layer: from declared nodes to a validated, ordered connection graph.
//!
//! - topo: layered topological sort
//! - construct: output enumeration and edge construction
//! - adjust: lifetime and marker normalization
//! - inject: infrastructure nodes
//! - dangling: unconsumed output analysis
//! - actions: channel/device creation actions
//! - validate: structural and cross-edge checks

pub mod actions;
pub mod adjust;
pub mod construct;
pub mod dangling;
pub mod inject;
pub mod topo;
pub mod validate;

pub use actions::{EdgeAction, compute_in_edge_actions, compute_out_edge_actions, sort_edges};
pub use adjust::adjust_topology;
pub use construct::{
    ConstructedGraph, DeviceConnectionEdge, LogicalForwardInfo, LogicalOutputInfo,
    construct_graph, enumerate_outputs, node_dependencies,
};
pub use dangling::{analyze_outputs, compute_dangling_outputs};
pub use inject::inject_service_nodes;
pub use topo::{TopoIndexInfo, topological_sort};
pub use validate::{
    EdgeContext, EdgeValidator, WorkflowState, default_validators, validate_edges, verify_workflow,
};
