//! Error types for workflow planning.

use crate::spec::VariantType;
use thiserror::Error;

/// Everything that can abort the planning of a workflow.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A node was declared without a name.
    #[error("invalid node name: name must not be empty")]
    EmptyName,

    /// A node name contains one of the reserved separator characters.
    #[error("cannot use any of ,;:\"'$ in node name {name:?}")]
    ReservedCharacter { name: String },

    #[error("name {name} is used twice")]
    DuplicateName { name: String },

    #[error("node {node} must have at least one timeslice")]
    InvalidTimeslices { node: String },

    /// Declared option type and default value type disagree.
    #[error(
        "mismatch between declared option type ({declared}) and default value type ({actual}) for {option} in node {node}"
    )]
    OptionTypeMismatch {
        node: String,
        option: String,
        declared: VariantType,
        actual: VariantType,
    },

    #[error(
        "in node {node} input specification {index} requires binding, description and origin to be fully specified"
    )]
    IncompleteInput { node: String, index: usize },

    /// An input served by the clock node must name a concrete sub-spec.
    #[error("input {input} of node {node} must have a concrete sub-specification")]
    NonConcreteInput { node: String, input: String },

    /// No producer, direct or forwarded, matches a declared input.
    #[error("no matching output found for {input} as requested by node {node:?}. Candidates:\n{}", candidates.iter().map(|c| format!("-{c}\n")).collect::<String>())]
    UnsatisfiedInput {
        node: String,
        input: String,
        candidates: Vec<String>,
    },

    /// Every cross-edge contract violation found in the graph.
    #[error("{}", .0.join("\n"))]
    ContractViolations(Vec<String>),

    /// The graph is not acyclic.
    #[error("cycle detected: only {ordered} of {total} nodes could be ordered (stuck: {})", stuck.join(", "))]
    Cycle {
        ordered: usize,
        total: usize,
        stuck: Vec<String>,
    },

    #[error("unknown forwarding policy {0:?}")]
    UnknownForwardingPolicy(String),

    #[error("unknown forwarding destination {0:?}")]
    UnknownForwardingDestination(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
