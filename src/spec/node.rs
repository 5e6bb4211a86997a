//! Processing nodes as declared by the workflow author.

use crate::spec::{ConfigParamSpec, InputSpec, Lifetime, OutputSpec, SubSpec};
use serde::{Deserialize, Serialize};

/// Label marking a node whose failure must not bring the workflow down.
pub const EXPENDABLE_LABEL: &str = "expendable";
/// Label marking a node which tolerates expendable upstreams.
pub const RESILIENT_LABEL: &str = "resilient";

/// Prefix reserved for infrastructure nodes added during planning.
pub const INTERNAL_PREFIX: &str = "internal-dpl-";

/// How a node decides that its inputs for one interval are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    #[default]
    ConsumeAll,
    /// Runs as soon as any input arrives; lifetimes are not cross-checked.
    ConsumeAny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    /// Time-pipelining multiplicity.
    #[serde(default = "default_timeslices", rename = "timeslices")]
    pub max_input_timeslices: usize,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub options: Vec<ConfigParamSpec>,
    #[serde(default)]
    pub completion: CompletionPolicy,
}

fn default_timeslices() -> usize {
    1
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            max_input_timeslices: 1,
            labels: Vec::new(),
            options: Vec::new(),
            completion: CompletionPolicy::ConsumeAll,
        }
    }

    pub fn with_input(
        mut self,
        binding: &str,
        origin: &str,
        description: &str,
        sub_spec: SubSpec,
        lifetime: Lifetime,
    ) -> Self {
        self.inputs
            .push(InputSpec::new(binding, origin, description, sub_spec, lifetime));
        self
    }

    pub fn with_output(
        mut self,
        origin: &str,
        description: &str,
        sub_spec: SubSpec,
        lifetime: Lifetime,
    ) -> Self {
        self.outputs
            .push(OutputSpec::new(origin, description, sub_spec, lifetime));
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn with_option(mut self, option: ConfigParamSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_timeslices(mut self, n: usize) -> Self {
        self.max_input_timeslices = n;
        self
    }

    pub fn with_completion(mut self, completion: CompletionPolicy) -> Self {
        self.completion = completion;
        self
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn is_expendable(&self) -> bool {
        self.has_label(EXPENDABLE_LABEL)
    }

    /// Neither expendable nor resilient.
    pub fn is_critical(&self) -> bool {
        !self.has_label(EXPENDABLE_LABEL) && !self.has_label(RESILIENT_LABEL)
    }

    pub fn is_internal(&self) -> bool {
        self.name.starts_with(INTERNAL_PREFIX)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }
}

/// Stable 32-bit hash of a node name, used as a per-node sub-spec.
pub fn name_hash(name: &str) -> u32 {
    crc32c::crc32c(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_minimal_json() {
        let node: Node = serde_json::from_str(r#"{"name":"reader"}"#).unwrap();
        assert_eq!(node.max_input_timeslices, 1);
        assert!(node.inputs.is_empty());
        assert_eq!(node.completion, CompletionPolicy::ConsumeAll);
    }

    #[test]
    fn criticality_from_labels() {
        assert!(Node::new("a").is_critical());
        assert!(!Node::new("a").with_label("resilient").is_critical());
        let n = Node::new("a").with_label("expendable");
        assert!(n.is_expendable());
        assert!(!n.is_critical());
    }

    #[test]
    fn name_hash_is_stable() {
        assert_eq!(name_hash("reader"), name_hash("reader"));
        assert_ne!(name_hash("reader"), name_hash("writer"));
    }
}
