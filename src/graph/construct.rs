//! Output enumeration and producer/consumer edge construction.
//!
//! Every declared output gets a global index equal to its position in the
//! flattened output list. Consumers are then visited in node order; each of
//! their inputs consumes every pool entry it matches and re-exports it as a
//! forward owned by the consumer, so that later consumers of the same data
//! are chained behind it instead of being connected to the original producer.

use crate::config::SelfMatchPolicy;
use crate::spec::{Node, OutputSpec, matches};
use crate::{PlanError, Result};
use serde::Serialize;
use tracing::{debug, trace};

/// One logical connection between a producer timeslice and a consumer timeslice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceConnectionEdge {
    pub producer: usize,
    pub consumer: usize,
    /// Consumer timeslice.
    pub time_index: usize,
    pub producer_time_index: usize,
    pub output_global_index: usize,
    pub consumer_input_index: usize,
    pub is_forward: bool,
}

/// Pool entry: an output still available for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalOutputInfo {
    /// Node currently offering the output (the producer, or the last consumer
    /// which forwards it).
    pub spec_index: usize,
    pub output_global_index: usize,
    pub forward: bool,
    pub enabled: bool,
}

impl LogicalOutputInfo {
    fn new(spec_index: usize, output_global_index: usize, forward: bool) -> Self {
        Self {
            spec_index,
            output_global_index,
            forward,
            enabled: true,
        }
    }
}

/// A consumer input which receives data forwarded by an upstream consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogicalForwardInfo {
    pub consumer: usize,
    pub consumer_input_index: usize,
    pub output_global_index: usize,
}

/// Result of the construction pass.
#[derive(Debug, Clone, Default)]
pub struct ConstructedGraph {
    pub edges: Vec<DeviceConnectionEdge>,
    /// Flattened outputs, indexed by `output_global_index`.
    pub outputs: Vec<OutputSpec>,
    pub forwards: Vec<LogicalForwardInfo>,
}

/// Flatten all outputs in node order and seed one pool entry per output.
pub fn enumerate_outputs(nodes: &[Node]) -> (Vec<OutputSpec>, Vec<LogicalOutputInfo>) {
    let mut outputs = Vec::new();
    let mut infos = Vec::new();
    for (wi, producer) in nodes.iter().enumerate() {
        if producer.outputs.is_empty() {
            debug!(index = wi, node = %producer.name, "no outputs");
        }
        for (oi, out) in producer.outputs.iter().enumerate() {
            let unique_id = outputs.len();
            trace!(node = %producer.name, oi, unique_id, output = %out.describe(), "enumerated output");
            infos.push(LogicalOutputInfo::new(wi, unique_id, false));
            outputs.push(out.clone());
        }
    }
    (outputs, infos)
}

/// Producer/consumer pairs between distinct nodes, one per pair at most.
///
/// Unlike the edges built by [`construct_graph`], these ignore forwarding:
/// they only say which node has to come before which.
pub fn node_dependencies(nodes: &[Node]) -> Vec<(usize, usize)> {
    let mut deps = Vec::new();
    for (ci, consumer) in nodes.iter().enumerate() {
        for (pi, producer) in nodes.iter().enumerate() {
            if pi == ci {
                continue;
            }
            let feeds = consumer
                .inputs
                .iter()
                .any(|i| producer.outputs.iter().any(|o| matches(i, o)));
            if feeds {
                deps.push((pi, ci));
            }
        }
    }
    deps
}

/// Build the edge list for `nodes`.
///
/// Forwards chain later consumers behind earlier ones, so `nodes` must
/// already be in dependency order.
pub fn construct_graph(nodes: &[Node], self_match: SelfMatchPolicy) -> Result<ConstructedGraph> {
    if nodes.is_empty() {
        return Ok(ConstructedGraph::default());
    }

    let (outputs, mut available) = enumerate_outputs(nodes);
    let mut edges = Vec::new();
    let mut forwards_info = Vec::new();
    let mut staged: Vec<LogicalOutputInfo> = Vec::new();
    let mut mask = vec![false; outputs.len()];

    for (consumer, node) in nodes.iter().enumerate() {
        debug!(consumer, node = %node.name, "matching inputs");
        for (input_index, input) in node.inputs.iter().enumerate() {
            staged.clear();
            for (slot, output) in mask.iter_mut().zip(&outputs) {
                *slot = matches(input, output);
                if *slot {
                    trace!(input = %input.describe(), output = %output.describe(), "input matches");
                }
            }

            for info in available.iter_mut() {
                if !mask[info.output_global_index] {
                    continue;
                }
                if self_match == SelfMatchPolicy::Forbid && info.spec_index == consumer {
                    continue;
                }
                if info.forward {
                    forwards_info.push(LogicalForwardInfo {
                        consumer,
                        consumer_input_index: input_index,
                        output_global_index: info.output_global_index,
                    });
                }
                let producer = info.spec_index;
                for tpi in 0..node.max_input_timeslices {
                    for ptpi in 0..nodes[producer].max_input_timeslices {
                        trace!(producer = %nodes[producer].name, consumer = %node.name, tpi, ptpi, "adding edge");
                        edges.push(DeviceConnectionEdge {
                            producer,
                            consumer,
                            time_index: tpi,
                            producer_time_index: ptpi,
                            output_global_index: info.output_global_index,
                            consumer_input_index: input_index,
                            is_forward: info.forward,
                        });
                    }
                }
                staged.push(LogicalOutputInfo::new(consumer, info.output_global_index, true));
                info.enabled = false;
            }

            if staged.is_empty() {
                return Err(PlanError::UnsatisfiedInput {
                    node: node.name.clone(),
                    input: input.describe(),
                    candidates: outputs.iter().map(OutputSpec::describe).collect(),
                });
            }
            available.retain(|info| info.enabled);
            available.append(&mut staged);
        }
    }

    Ok(ConstructedGraph {
        edges,
        outputs,
        forwards: forwards_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Lifetime, SubSpec};
    use pretty_assertions::assert_eq;

    fn producer(name: &str, sub: u32) -> Node {
        Node::new(name).with_output("TST", "A", SubSpec::Exact(sub), Lifetime::Timeframe)
    }

    fn consumer(name: &str, sub: SubSpec) -> Node {
        Node::new(name).with_input("a", "TST", "A", sub, Lifetime::Timeframe)
    }

    #[test]
    fn dependencies_skip_self_and_duplicates() {
        let nodes = vec![
            producer("a", 0).with_output("TST", "B", SubSpec::Exact(0), Lifetime::Timeframe),
            consumer("b", SubSpec::Any)
                .with_input("b", "TST", "B", SubSpec::Exact(0), Lifetime::Timeframe)
                .with_output("TST", "A", SubSpec::Exact(1), Lifetime::Timeframe),
        ];
        assert_eq!(node_dependencies(&nodes), vec![(0, 1)]);
    }

    #[test]
    fn enumerate_is_repeatable() {
        let nodes = vec![
            producer("a", 0).with_output("TST", "B", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("empty"),
            producer("c", 1),
        ];
        let (outs1, infos1) = enumerate_outputs(&nodes);
        let (outs2, infos2) = enumerate_outputs(&nodes);
        assert_eq!(outs1, outs2);
        assert_eq!(infos1, infos2);
        let owners: Vec<(usize, usize)> = infos1
            .iter()
            .map(|i| (i.spec_index, i.output_global_index))
            .collect();
        assert_eq!(owners, vec![(0, 0), (0, 1), (2, 2)]);
    }

    #[test]
    fn single_edge() {
        let nodes = vec![producer("a", 0), consumer("b", SubSpec::Exact(0))];
        let g = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap();
        assert_eq!(
            g.edges,
            vec![DeviceConnectionEdge {
                producer: 0,
                consumer: 1,
                time_index: 0,
                producer_time_index: 0,
                output_global_index: 0,
                consumer_input_index: 0,
                is_forward: false,
            }]
        );
        assert!(g.forwards.is_empty());
    }

    #[test]
    fn fan_in_gets_one_edge_per_producer() {
        let nodes = vec![producer("a", 0), producer("b", 1), consumer("c", SubSpec::Any)];
        let g = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap();
        let producers: Vec<usize> = g.edges.iter().map(|e| e.producer).collect();
        assert_eq!(producers, vec![0, 1]);
        assert!(g.edges.iter().all(|e| e.consumer == 2));
    }

    #[test]
    fn second_consumer_is_chained_as_forward() {
        let nodes = vec![producer("a", 0), consumer("b", SubSpec::Exact(0)), consumer("c", SubSpec::Exact(0))];
        let g = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap();
        assert_eq!(g.edges.len(), 2);
        assert_eq!((g.edges[1].producer, g.edges[1].consumer), (1, 2));
        assert!(g.edges[1].is_forward);
        assert_eq!(
            g.forwards,
            vec![LogicalForwardInfo {
                consumer: 2,
                consumer_input_index: 0,
                output_global_index: 0,
            }]
        );
    }

    #[test]
    fn timeslices_expand_to_cross_product() {
        let nodes = vec![producer("a", 0).with_timeslices(2), consumer("b", SubSpec::Exact(0)).with_timeslices(3)];
        let g = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap();
        assert_eq!(g.edges.len(), 6);
        let pairs: Vec<(usize, usize)> = g
            .edges
            .iter()
            .map(|e| (e.time_index, e.producer_time_index))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn unsatisfied_input_names_node_and_candidates() {
        let nodes = vec![producer("a", 0), consumer("b", SubSpec::Exact(7))];
        let err = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap_err();
        match err {
            PlanError::UnsatisfiedInput {
                node,
                input,
                candidates,
            } => {
                assert_eq!(node, "b");
                assert_eq!(input, "TST/A/7");
                assert_eq!(candidates, vec!["TST/A/0".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn self_match_policy() {
        let nodes = vec![
            producer("loop", 0).with_input("a", "TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
        ];
        let g = construct_graph(&nodes, SelfMatchPolicy::Allow).unwrap();
        assert_eq!((g.edges[0].producer, g.edges[0].consumer), (0, 0));

        let err = construct_graph(&nodes, SelfMatchPolicy::Forbid).unwrap_err();
        assert!(matches!(err, PlanError::UnsatisfiedInput { .. }));
    }

    #[test]
    fn empty_workflow() {
        let g = construct_graph(&[], SelfMatchPolicy::Allow).unwrap();
        assert!(g.edges.is_empty());
        assert!(g.outputs.is_empty());
    }
}
