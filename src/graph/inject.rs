//! Infrastructure nodes implied by the declared lifetimes.
//!
//! The injector mutates user nodes (synthetic enumeration inputs, per-input
//! options, rate-limit summaries) and appends:
//! - the condition backend, serving Condition inputs nobody provides;
//! - the clock, serving Timer, Signal, Enumeration and OutOfBand inputs;
//! - sinks for dangling outputs, according to the forwarding policy.
//!
//! Infrastructure nodes which end up without inputs and outputs are elided.

use crate::config::{ForwardingDestination, ForwardingPolicy, PlannerConfig};
use crate::graph::adjust::{DIST_STF_DESCRIPTION, DIST_STF_ORIGIN};
use crate::graph::dangling::analyze_outputs;
use crate::spec::{
    ConcreteMatcher, ConfigParamSpec, InputSpec, Lifetime, Node, OutputSpec, SubSpec, Variant,
    add_option_if_missing, matches, name_hash, update_output_list,
};
use crate::{PlanError, Result};
use tracing::{debug, info};

pub const CCDB_BACKEND: &str = "internal-dpl-ccdb-backend";
pub const CLOCK: &str = "internal-dpl-clock";
pub const FILE_SINK: &str = "internal-dpl-injected-global-binary-file-sink";
pub const OUTPUT_PROXY: &str = "internal-dpl-injected-output-proxy";
pub const DUMMY_SINK: &str = "internal-dpl-injected-dummy-sink";

/// Sub-spec of the marker the condition backend is clocked on.
pub const CCDB_DIST_STF_SUB_SPEC: u32 = 0xccdb;

const TFN_ORIGIN: &str = "TFN";
const TFN_DESCRIPTION: &str = "TFNumber";

/// Add infrastructure nodes to `nodes`. Returns the names of the nodes added.
pub fn inject_service_nodes(nodes: &mut Vec<Node>, config: &PlannerConfig) -> Result<Vec<String>> {
    let mut ccdb_backend = ccdb_backend_node(config);
    let mut clock = Node::new(CLOCK);

    let mut requested_ccdbs: Vec<InputSpec> = Vec::new();
    let mut provided_ccdbs: Vec<OutputSpec> = Vec::new();

    for node in nodes.iter_mut() {
        if node.inputs.is_empty() && !node.is_internal() {
            debug!(node = %node.name, "adding enumeration input");
            node.inputs.push(InputSpec::new(
                "enumeration",
                "DPL",
                "ENUM",
                SubSpec::Exact(name_hash(&node.name)),
                Lifetime::Enumeration,
            ));
            for option in enumeration_options() {
                add_option_if_missing(&mut node.options, option);
            }
        }

        if config.rate_limiting() {
            add_summary_output(node);
        }

        let mut has_condition_option = node.has_option("condition-backend");
        for input in &node.inputs {
            match input.lifetime {
                Lifetime::Timer => {
                    let concrete = concrete_input(node, input)?;
                    add_option_if_missing(
                        &mut node.options,
                        ConfigParamSpec::new(
                            format!("period-{}", input.binding),
                            Variant::Int(1000),
                            "period of the timer in milliseconds",
                        ),
                    );
                    update_output_list(&mut clock.outputs, concrete.to_output(None, Lifetime::Timer));
                }
                Lifetime::Signal => {
                    let concrete = concrete_input(node, input)?;
                    update_output_list(&mut clock.outputs, concrete.to_output(None, Lifetime::Signal));
                }
                Lifetime::Enumeration => {
                    let concrete = concrete_input(node, input)?;
                    update_output_list(
                        &mut clock.outputs,
                        concrete.to_output(None, Lifetime::Enumeration),
                    );
                }
                Lifetime::Condition => {
                    if !has_condition_option {
                        node.options.push(ConfigParamSpec::new(
                            "condition-backend",
                            Variant::String(config.condition_backend()),
                            "URL for CCDB",
                        ));
                        node.options.push(ConfigParamSpec::new(
                            "condition-timestamp",
                            Variant::Int64(0),
                            "Force timestamp for CCDB lookup",
                        ));
                        has_condition_option = true;
                    }
                    requested_ccdbs.push(input.clone());
                }
                Lifetime::OutOfBand => {
                    let concrete = concrete_input(node, input)?;
                    add_option_if_missing(
                        &mut node.options,
                        ConfigParamSpec::new(
                            format!("out-of-band-channel-name-{}", input.binding),
                            Variant::String("out-of-band".to_string()),
                            "channel to listen for out of band data",
                        ),
                    );
                    update_output_list(
                        &mut clock.outputs,
                        concrete.to_output(None, Lifetime::Enumeration),
                    );
                }
                Lifetime::QA
                | Lifetime::Transient
                | Lifetime::Timeframe
                | Lifetime::Optional
                | Lifetime::Sporadic => {}
            }
        }

        provided_ccdbs.extend(
            node.outputs
                .iter()
                .filter(|o| o.lifetime == Lifetime::Condition)
                .cloned(),
        );
    }

    clock.outputs.sort_by_key(|o| o.sub_spec.exact());
    add_missing_outputs(&provided_ccdbs, &requested_ccdbs, &mut ccdb_backend);

    let mut extra = Vec::new();
    let mut dist_stf = ConcreteMatcher::new(DIST_STF_ORIGIN, DIST_STF_DESCRIPTION, CCDB_DIST_STF_SUB_SPEC);
    if !ccdb_backend.outputs.is_empty() {
        ccdb_backend
            .outputs
            .push(OutputSpec::new("CTP", "OrbitReset", SubSpec::Exact(0), Lifetime::Timeframe));

        let provides_tfn = nodes
            .iter()
            .flat_map(|n| &n.outputs)
            .any(|o| o.origin == TFN_ORIGIN && o.description == TFN_DESCRIPTION);
        let dist_stf_provider = nodes
            .iter()
            .flat_map(|n| &n.outputs)
            .find(|o| o.matches_concrete(&dist_stf));

        if provides_tfn {
            ccdb_backend.inputs.push(InputSpec::new(
                "tfn",
                TFN_ORIGIN,
                TFN_DESCRIPTION,
                SubSpec::Any,
                Lifetime::Timeframe,
            ));
        } else if let Some(provider) = dist_stf_provider {
            if let Some(concrete) = provider.as_concrete() {
                dist_stf = concrete;
            }
            ccdb_backend.inputs.push(dist_stf.to_input("tfn", Lifetime::Timeframe));
        } else if let Some(clock_spec) = attach_dist_stf(nodes, &dist_stf) {
            ccdb_backend.inputs.push(clock_spec.to_input("tfn", Lifetime::Timeframe));
        }
        extra.push(ccdb_backend);
    } else {
        let requires_dist_stf = nodes
            .iter()
            .flat_map(|n| &n.inputs)
            .any(|i| i.matches_concrete(&dist_stf));
        if requires_dist_stf {
            attach_dist_stf(nodes, &dist_stf);
        }
    }

    if !clock.outputs.is_empty() {
        extra.push(clock);
    }

    let mut injected = Vec::new();
    append(nodes, extra, &mut injected);

    let redirected = redirected_outputs(nodes, config.forwarding_policy);
    let mut sinks = Vec::new();
    let mut unmatched: Vec<InputSpec> = Vec::new();
    if !redirected.is_empty() {
        match config.forwarding_destination {
            ForwardingDestination::File => {
                let (valid, rest): (Vec<InputSpec>, Vec<InputSpec>) = redirected
                    .iter()
                    .cloned()
                    .partition(|i| i.origin != TFN_ORIGIN && i.lifetime == Lifetime::Timeframe);
                unmatched = rest;
                if !valid.is_empty() {
                    let mut sink = Node::new(FILE_SINK);
                    sink.inputs = valid;
                    sinks.push(sink);
                }
            }
            ForwardingDestination::Transport => {
                let mut proxy = Node::new(OUTPUT_PROXY);
                proxy.inputs = redirected.clone();
                sinks.push(proxy);
            }
            ForwardingDestination::Drop => {}
        }
    }
    if !unmatched.is_empty() || !redirected.is_empty() {
        let mut dummy = Node::new(DUMMY_SINK);
        for mut input in unmatched.into_iter().chain(redirected) {
            input.lifetime = Lifetime::Sporadic;
            // A repeated spec would match the sink's own forward.
            if !dummy.inputs.iter().any(|i| same_spec(i, &input)) {
                dummy.inputs.push(input);
            }
        }
        if let Some(channel) = config.rate_limit_output_channel() {
            dummy.options.push(ConfigParamSpec::new(
                "channel-config",
                Variant::String(channel),
                "how many timeframes can be in flight at the same time",
            ));
        }
        sinks.push(dummy);
    }
    append(nodes, sinks, &mut injected);

    Ok(injected)
}

fn append(nodes: &mut Vec<Node>, extra: Vec<Node>, injected: &mut Vec<String>) {
    for node in extra {
        if node.inputs.is_empty() && node.outputs.is_empty() {
            continue;
        }
        info!(
            node = %node.name,
            inputs = node.inputs.len(),
            outputs = node.outputs.len(),
            "injecting service node"
        );
        injected.push(node.name.clone());
        nodes.push(node);
    }
}

fn same_spec(a: &InputSpec, b: &InputSpec) -> bool {
    a.origin == b.origin && a.description == b.description && a.sub_spec == b.sub_spec
}

fn concrete_input(node: &Node, input: &InputSpec) -> Result<ConcreteMatcher> {
    input.as_concrete().ok_or_else(|| PlanError::NonConcreteInput {
        node: node.name.clone(),
        input: input.describe(),
    })
}

fn enumeration_options() -> Vec<ConfigParamSpec> {
    vec![
        ConfigParamSpec::new("orbit-offset-enumeration", Variant::Int64(0), "initial value for the orbit"),
        ConfigParamSpec::new(
            "orbit-multiplier-enumeration",
            Variant::Int64(0),
            "multiplier to get the orbit from the counter",
        ),
        ConfigParamSpec::new("start-value-enumeration", Variant::Int64(0), "initial value for the enumeration"),
        ConfigParamSpec::new("end-value-enumeration", Variant::Int64(-1), "final value for the enumeration"),
        ConfigParamSpec::new("step-value-enumeration", Variant::Int64(1), "step between one value and the other"),
    ]
}

fn ccdb_backend_node(config: &PlannerConfig) -> Node {
    let mut node = Node::new(CCDB_BACKEND);
    node.options = vec![
        ConfigParamSpec::new("condition-backend", Variant::String(config.condition_backend()), "URL for CCDB"),
        ConfigParamSpec::new(
            "condition-not-before",
            Variant::Int64(0),
            "do not fetch from CCDB objects created before provide timestamp",
        ),
        ConfigParamSpec::new(
            "condition-not-after",
            Variant::Int64(3_385_078_236_000),
            "do not fetch from CCDB objects created after the timestamp",
        ),
        ConfigParamSpec::new(
            "condition-remap",
            Variant::String(String::new()),
            "remap condition path in CCDB based on the provided string.",
        ),
        ConfigParamSpec::new(
            "condition-tf-per-query",
            Variant::Int(config.condition_query_rate),
            "check condition validity per requested number of TFs, fetch only once if <=0",
        ),
        ConfigParamSpec::new(
            "condition-tf-per-query-multiplier",
            Variant::Int(config.condition_query_rate_multiplier),
            "check conditions once per this amount of nominal checks",
        ),
        ConfigParamSpec::new(
            "condition-time-tolerance",
            Variant::Int64(5000),
            "prefer creation time if its difference to orbit-derived time exceeds threshold (ms), impose if <0",
        ),
    ];
    node.options.extend(enumeration_options());
    node
}

/// Timeframe sinks report back to the rate limiter through a summary output.
fn add_summary_output(node: &mut Node) {
    let has_tf_inputs = node.inputs.iter().any(|i| i.lifetime == Lifetime::Timeframe);
    let has_tf_outputs = node.outputs.iter().any(|o| o.lifetime == Lifetime::Timeframe);
    if !has_tf_inputs || has_tf_outputs || node.name.contains(DUMMY_SINK) {
        return;
    }
    let summary = ConcreteMatcher::new("DPL", "SUMMARY", name_hash(&node.name));
    if node.outputs.iter().any(|o| o.matches_concrete(&summary)) {
        debug!(node = %node.name, "summary output already present");
        return;
    }
    debug!(node = %node.name, sub_spec = summary.sub_spec, "adding summary output");
    node.outputs
        .push(summary.to_output(Some("dpl-summary"), Lifetime::Timeframe));
}

/// Give `reader` an output for every requested spec nobody provides yet.
fn add_missing_outputs(provided: &[OutputSpec], requested: &[InputSpec], reader: &mut Node) {
    for input in requested {
        if provided.iter().any(|o| matches(input, o)) {
            continue;
        }
        if reader.outputs.iter().any(|o| matches(input, o)) {
            continue;
        }
        reader.outputs.push(OutputSpec {
            binding: Some(input.binding.clone()),
            origin: input.origin.clone(),
            description: input.description.clone(),
            sub_spec: input.sub_spec,
            lifetime: input.lifetime,
        });
    }
}

/// Pick the node which clocks the sub-timeframe marker.
///
/// The alphabetically-first node whose only input is an enumeration gets the
/// marker as an extra output; failing that, the alphabetically-first node
/// whose only input is a timer lends its first output. Returns the spec the
/// condition backend should listen to.
fn attach_dist_stf(nodes: &mut [Node], dist_stf: &ConcreteMatcher) -> Option<ConcreteMatcher> {
    let mut enum_candidate: Option<usize> = None;
    let mut timer_candidate: Option<usize> = None;
    for (wi, node) in nodes.iter().enumerate() {
        let [input] = node.inputs.as_slice() else {
            continue;
        };
        let better = |current: Option<usize>| current.is_none_or(|c| nodes[c].name > node.name);
        if input.lifetime == Lifetime::Enumeration && better(enum_candidate) {
            enum_candidate = Some(wi);
        }
        if input.lifetime == Lifetime::Timer && better(timer_candidate) {
            timer_candidate = Some(wi);
        }
    }

    if let Some(wi) = enum_candidate {
        debug!(node = %nodes[wi].name, "attaching sub-timeframe marker");
        update_output_list(
            &mut nodes[wi].outputs,
            dist_stf.to_output(Some("ccdb-diststf"), Lifetime::Timeframe),
        );
        return Some(dist_stf.clone());
    }
    timer_candidate.and_then(|wi| {
        debug!(node = %nodes[wi].name, "using timer output as sub-timeframe clock");
        nodes[wi].outputs.first().and_then(OutputSpec::as_concrete)
    })
}

/// Outputs to hand to a sink under `policy`.
fn redirected_outputs(nodes: &[Node], policy: ForwardingPolicy) -> Vec<InputSpec> {
    if policy == ForwardingPolicy::None {
        return Vec::new();
    }
    let (outputs, dangling) = analyze_outputs(nodes);
    outputs
        .into_iter()
        .zip(dangling)
        .filter(|(_, d)| *d || policy == ForwardingPolicy::All)
        .map(|(input, _)| {
            debug!(output = %input.describe(), "redirecting output");
            input
        })
        .collect()
}
