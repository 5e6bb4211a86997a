//! Data specs: the (origin, description, sub-spec) triple plus lifetime.
//!
//! Inputs always carry a binding (the name the consumer uses to look the
//! data up). Outputs may carry one, but it plays no role in matching.
//!
//! JSON shape:
//! {
//!   "binding": "clusters",
//!   "origin": "TPC",
//!   "description": "CLUSTERS",
//!   "sub_spec": 0,              // omitted or null => wildcard
//!   "lifetime": "timeframe"     // optional, defaults to timeframe
//! }

use crate::spec::Lifetime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer disambiguator of an origin/description pair, or a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum SubSpec {
    Exact(u32),
    #[default]
    Any,
}

impl SubSpec {
    pub fn exact(self) -> Option<u32> {
        match self {
            SubSpec::Exact(v) => Some(v),
            SubSpec::Any => None,
        }
    }

    fn accepts(self, other: SubSpec) -> bool {
        match (self, other) {
            (SubSpec::Exact(a), SubSpec::Exact(b)) => a == b,
            _ => true,
        }
    }
}

impl From<Option<u32>> for SubSpec {
    fn from(v: Option<u32>) -> Self {
        v.map_or(SubSpec::Any, SubSpec::Exact)
    }
}

impl From<SubSpec> for Option<u32> {
    fn from(s: SubSpec) -> Self {
        s.exact()
    }
}

/// What a consumer asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(default)]
    pub binding: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sub_spec: SubSpec,
    #[serde(default)]
    pub lifetime: Lifetime,
}

/// What a producer offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    pub origin: String,
    pub description: String,
    #[serde(default)]
    pub sub_spec: SubSpec,
    #[serde(default)]
    pub lifetime: Lifetime,
}

/// A fully concrete (origin, description, sub-spec) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcreteMatcher {
    pub origin: String,
    pub description: String,
    pub sub_spec: u32,
}

impl ConcreteMatcher {
    pub fn new(origin: &str, description: &str, sub_spec: u32) -> Self {
        Self {
            origin: origin.to_string(),
            description: description.to_string(),
            sub_spec,
        }
    }

    pub fn to_input(&self, binding: &str, lifetime: Lifetime) -> InputSpec {
        InputSpec::new(binding, &self.origin, &self.description, SubSpec::Exact(self.sub_spec), lifetime)
    }

    pub fn to_output(&self, binding: Option<&str>, lifetime: Lifetime) -> OutputSpec {
        OutputSpec {
            binding: binding.map(str::to_string),
            origin: self.origin.clone(),
            description: self.description.clone(),
            sub_spec: SubSpec::Exact(self.sub_spec),
            lifetime,
        }
    }
}

impl InputSpec {
    pub fn new(
        binding: &str,
        origin: &str,
        description: &str,
        sub_spec: SubSpec,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            binding: binding.to_string(),
            origin: origin.to_string(),
            description: description.to_string(),
            sub_spec,
            lifetime,
        }
    }

    /// Binding, origin and description must all be set.
    pub fn is_fully_specified(&self) -> bool {
        !self.binding.is_empty() && !self.origin.is_empty() && !self.description.is_empty()
    }

    pub fn describe(&self) -> String {
        describe(&self.origin, &self.description, self.sub_spec)
    }

    /// The concrete triple, if the sub-spec is not a wildcard.
    pub fn as_concrete(&self) -> Option<ConcreteMatcher> {
        self.sub_spec.exact().map(|sub_spec| ConcreteMatcher {
            origin: self.origin.clone(),
            description: self.description.clone(),
            sub_spec,
        })
    }

    pub fn matches_concrete(&self, m: &ConcreteMatcher) -> bool {
        self.origin == m.origin
            && self.description == m.description
            && self.sub_spec.accepts(SubSpec::Exact(m.sub_spec))
    }

    /// Same origin and description, sub-spec ignored.
    pub fn matches_type(&self, origin: &str, description: &str) -> bool {
        self.origin == origin && self.description == description
    }
}

impl OutputSpec {
    pub fn new(origin: &str, description: &str, sub_spec: SubSpec, lifetime: Lifetime) -> Self {
        Self {
            binding: None,
            origin: origin.to_string(),
            description: description.to_string(),
            sub_spec,
            lifetime,
        }
    }

    pub fn describe(&self) -> String {
        describe(&self.origin, &self.description, self.sub_spec)
    }

    pub fn as_concrete(&self) -> Option<ConcreteMatcher> {
        self.sub_spec.exact().map(|sub_spec| ConcreteMatcher {
            origin: self.origin.clone(),
            description: self.description.clone(),
            sub_spec,
        })
    }

    pub fn matches_concrete(&self, m: &ConcreteMatcher) -> bool {
        self.origin == m.origin
            && self.description == m.description
            && self.sub_spec.accepts(SubSpec::Exact(m.sub_spec))
    }

    /// Compares the matcher part only; bindings are ignored.
    pub fn same_matcher(&self, other: &OutputSpec) -> bool {
        self.origin == other.origin
            && self.description == other.description
            && self.sub_spec == other.sub_spec
    }
}

/// Does `input` accept data described by `output`?
pub fn matches(input: &InputSpec, output: &OutputSpec) -> bool {
    input.origin == output.origin
        && input.description == output.description
        && input.sub_spec.accepts(output.sub_spec)
}

/// The input descriptor which would consume exactly `output`.
pub fn matching_input(output: &OutputSpec) -> InputSpec {
    InputSpec {
        binding: output.binding.clone().unwrap_or_default(),
        origin: output.origin.clone(),
        description: output.description.clone(),
        sub_spec: output.sub_spec,
        lifetime: output.lifetime,
    }
}

/// Append `output` unless an output with the same matcher is already there.
pub fn update_output_list(list: &mut Vec<OutputSpec>, output: OutputSpec) {
    if !list.iter().any(|o| o.same_matcher(&output)) {
        list.push(output);
    }
}

fn describe(origin: &str, description: &str, sub_spec: SubSpec) -> String {
    match sub_spec {
        SubSpec::Exact(v) => format!("{}/{}/{}", origin, description, v),
        SubSpec::Any => format!("{}/{}", origin, description),
    }
}

impl fmt::Display for InputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.lifetime)
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.describe(), self.lifetime)
    }
}
