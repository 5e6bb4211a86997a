//! Spec layer: the declarative workflow as supplied by its author.
//!
//! It owns:
//! - Lifetime tags
//! - Input/output data specs and the matching predicate
//! - Node options
//! - Nodes and the workflow document

pub mod data;
pub mod lifetime;
pub mod node;
pub mod option;
pub mod workflow;

pub use data::{
    ConcreteMatcher, InputSpec, OutputSpec, SubSpec, matches, matching_input, update_output_list,
};
pub use lifetime::Lifetime;
pub use node::{CompletionPolicy, INTERNAL_PREFIX, Node, name_hash};
pub use option::{ConfigParamSpec, Variant, VariantType, add_option_if_missing};
pub use workflow::Workflow;
