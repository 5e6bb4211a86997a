//! Structural checks on the declared nodes and contract checks on edges.

use crate::config::PlannerConfig;
use crate::graph::DeviceConnectionEdge;
use crate::spec::{CompletionPolicy, InputSpec, Lifetime, Node, OutputSpec};
use crate::{PlanError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::warn;

static RESERVED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[,;:"'$]"#).expect("reserved character class is a valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Empty,
    Valid,
}

/// Names, timeslices, option defaults and input completeness. Fails on the
/// first problem.
pub fn verify_workflow(nodes: &[Node]) -> Result<WorkflowState> {
    if nodes.is_empty() {
        return Ok(WorkflowState::Empty);
    }

    let mut names = BTreeSet::new();
    for node in nodes {
        if node.name.is_empty() {
            return Err(PlanError::EmptyName);
        }
        if RESERVED_CHARS.is_match(&node.name) {
            return Err(PlanError::ReservedCharacter {
                name: node.name.clone(),
            });
        }
        if !names.insert(node.name.as_str()) {
            return Err(PlanError::DuplicateName {
                name: node.name.clone(),
            });
        }
        if node.max_input_timeslices == 0 {
            return Err(PlanError::InvalidTimeslices {
                node: node.name.clone(),
            });
        }
        for option in &node.options {
            if let Some(default) = option.default.as_ref().filter(|_| option.has_type_mismatch()) {
                return Err(PlanError::OptionTypeMismatch {
                    node: node.name.clone(),
                    option: option.name.clone(),
                    declared: option.kind,
                    actual: default.variant_type(),
                });
            }
        }
        if let Some(index) = node.inputs.iter().position(|i| !i.is_fully_specified()) {
            return Err(PlanError::IncompleteInput {
                node: node.name.clone(),
                index,
            });
        }
    }
    Ok(WorkflowState::Valid)
}

/// Everything an edge validator can look at.
#[derive(Debug, Clone, Copy)]
pub struct EdgeContext<'a> {
    pub producer: &'a Node,
    pub output: &'a OutputSpec,
    pub consumer: &'a Node,
    pub input: &'a InputSpec,
}

/// Returns a message for every violated contract, `None` otherwise.
pub type EdgeValidator = fn(&EdgeContext<'_>) -> Option<String>;

/// A Timeframe input must not be fed by a Sporadic output.
pub fn validate_lifetime(ctx: &EdgeContext<'_>) -> Option<String> {
    if ctx.consumer.completion == CompletionPolicy::ConsumeAny {
        return None;
    }
    (ctx.input.lifetime == Lifetime::Timeframe && ctx.output.lifetime == Lifetime::Sporadic).then(|| {
        format!(
            "Input {} of {} has lifetime Timeframe, but output {} of {} has lifetime Sporadic",
            ctx.input.describe(),
            ctx.consumer.name,
            ctx.output.describe(),
            ctx.producer.name
        )
    })
}

/// A critical consumer must not depend on an expendable producer.
pub fn validate_expendable(ctx: &EdgeContext<'_>) -> Option<String> {
    (ctx.producer.is_expendable() && ctx.consumer.is_critical()).then(|| {
        format!(
            "Critical consumer {} depends on expendable producer {}",
            ctx.consumer.name, ctx.producer.name
        )
    })
}

/// The validators enabled by `config`.
pub fn default_validators(config: &PlannerConfig) -> Vec<EdgeValidator> {
    let mut validators: Vec<EdgeValidator> = vec![validate_expendable];
    if config.check_lifetimes {
        validators.push(validate_lifetime);
    } else {
        warn!("lifetime validation disabled");
    }
    validators
}

/// Run every validator on every edge and report all violations at once.
pub fn validate_edges(
    nodes: &[Node],
    edges: &[DeviceConnectionEdge],
    outputs: &[OutputSpec],
    validators: &[EdgeValidator],
) -> Result<()> {
    let mut errors = Vec::new();
    for edge in edges {
        let consumer = &nodes[edge.consumer];
        let ctx = EdgeContext {
            producer: &nodes[edge.producer],
            output: &outputs[edge.output_global_index],
            consumer,
            input: &consumer.inputs[edge.consumer_input_index],
        };
        errors.extend(validators.iter().filter_map(|v| v(&ctx)));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlanError::ContractViolations(errors))
    }
}
