//! Data-flow workflow planning: turns a list of processing nodes with typed
//! inputs and outputs into a validated, topologically ordered connection
//! graph, injecting the infrastructure nodes the declared lifetimes imply.

pub mod config;
pub mod error;
pub mod graph;
pub mod plan;
pub mod render;
pub mod spec;

pub use config::PlannerConfig;
pub use error::{PlanError, Result};
pub use plan::{Plan, plan_workflow};
