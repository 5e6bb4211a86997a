//! The full planning pass: validated nodes in, ordered connection graph out.

use crate::config::PlannerConfig;
use crate::graph::{
    DeviceConnectionEdge, EdgeAction, LogicalForwardInfo, TopoIndexInfo,
    adjust_topology, compute_in_edge_actions, compute_out_edge_actions, construct_graph,
    default_validators, inject_service_nodes, node_dependencies, sort_edges, topological_sort,
    validate_edges, verify_workflow,
};
use crate::spec::{Node, OutputSpec, Workflow};
use crate::{PlanError, Result};
use serde::Serialize;
use tracing::{debug, info};

/// A finalized workflow, ready to be turned into processes and channels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    /// Declared and injected nodes, by dependency layer then name.
    pub nodes: Vec<Node>,
    pub edges: Vec<DeviceConnectionEdge>,
    /// Flattened outputs, indexed by `DeviceConnectionEdge::output_global_index`.
    pub outputs: Vec<OutputSpec>,
    pub forwards: Vec<LogicalForwardInfo>,
    pub order: Vec<TopoIndexInfo>,
    /// Edge indices grouped by consumer.
    pub in_index: Vec<usize>,
    /// Edge indices grouped by producer.
    pub out_index: Vec<usize>,
    /// Per edge, in `edges` order.
    pub in_actions: Vec<EdgeAction>,
    pub out_actions: Vec<EdgeAction>,
    /// Names of the injected infrastructure nodes.
    pub injected: Vec<String>,
}

impl Plan {
    pub fn layer_of(&self, node: usize) -> Option<usize> {
        self.order.iter().find(|t| t.index == node).map(|t| t.layer)
    }

    pub fn layer_count(&self) -> usize {
        self.order.iter().map(|t| t.layer + 1).max().unwrap_or(0)
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }
}

fn cycle_error(nodes: &[Node], order: &[TopoIndexInfo]) -> PlanError {
    let stuck = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !order.iter().any(|t| t.index == *i))
        .map(|(_, n)| n.name.clone())
        .collect();
    PlanError::Cycle {
        ordered: order.len(),
        total: nodes.len(),
        stuck,
    }
}

/// Reorder `nodes` by dependency layer, then by name within a layer.
fn sort_by_dependencies(nodes: Vec<Node>) -> Result<Vec<Node>> {
    let order = topological_sort(nodes.len(), &node_dependencies(&nodes), |&pair| pair);
    if order.len() < nodes.len() {
        return Err(cycle_error(&nodes, &order));
    }
    let mut order = order;
    order.sort_by(|a, b| {
        a.layer
            .cmp(&b.layer)
            .then_with(|| nodes[a.index].name.cmp(&nodes[b.index].name))
    });
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    Ok(order.iter().filter_map(|t| slots[t.index].take()).collect())
}

pub fn plan_workflow(workflow: Workflow, config: &PlannerConfig) -> Result<Plan> {
    if workflow.is_empty() {
        debug!("empty workflow, nothing to plan");
        return Ok(Plan::default());
    }
    let mut nodes = workflow.nodes;
    verify_workflow(&nodes)?;

    let injected = inject_service_nodes(&mut nodes, config)?;
    let rewritten = adjust_topology(&mut nodes);
    if rewritten > 0 {
        debug!(rewritten, "sub-timeframe markers renumbered");
    }
    let nodes = sort_by_dependencies(nodes)?;

    let graph = construct_graph(&nodes, config.self_match)?;
    validate_edges(&nodes, &graph.edges, &graph.outputs, &default_validators(config))?;

    // Dependency order excludes self-feeding nodes; the edges do not.
    let order = topological_sort(nodes.len(), &graph.edges, |e| (e.producer, e.consumer));
    if order.len() < nodes.len() {
        return Err(cycle_error(&nodes, &order));
    }

    let (in_index, out_index) = sort_edges(&graph.edges);
    let in_actions = compute_in_edge_actions(&graph.edges, &in_index);
    let out_actions = compute_out_edge_actions(&graph.edges, &out_index);

    info!(
        nodes = nodes.len(),
        edges = graph.edges.len(),
        injected = injected.len(),
        "workflow planned"
    );
    Ok(Plan {
        nodes,
        edges: graph.edges,
        outputs: graph.outputs,
        forwards: graph.forwards,
        order,
        in_index,
        out_index,
        in_actions,
        out_actions,
        injected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelfMatchPolicy;
    use crate::graph::inject::{CLOCK, DUMMY_SINK};
    use crate::spec::{Lifetime, SubSpec};
    use pretty_assertions::assert_eq;

    fn chain() -> Workflow {
        Workflow::from(vec![
            Node::new("reader").with_output("TST", "RAW", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("reco")
                .with_input("raw", "TST", "RAW", SubSpec::Exact(0), Lifetime::Timeframe)
                .with_output("TST", "TRK", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("writer").with_input("trk", "TST", "TRK", SubSpec::Any, Lifetime::Timeframe),
        ])
    }

    #[test]
    fn plans_a_chain() {
        let plan = plan_workflow(chain(), &PlannerConfig::default()).unwrap();
        assert_eq!(plan.injected, vec![CLOCK.to_string()]);
        assert_eq!(plan.nodes.len(), 4);

        let names: Vec<&str> = plan.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec![CLOCK, "reader", "reco", "writer"]);
        for (i, _) in names.iter().enumerate() {
            assert_eq!(plan.layer_of(i), Some(i));
        }
        assert_eq!(plan.layer_count(), 4);

        assert_eq!(plan.edges.len(), 3);
        assert_eq!(plan.in_actions.len(), plan.edges.len());
        assert_eq!(plan.out_actions.len(), plan.edges.len());
        assert!(plan.forwards.is_empty());
    }

    #[test]
    fn declaration_order_does_not_matter() {
        let mut nodes = chain().nodes;
        nodes.reverse();
        let plan = plan_workflow(Workflow::from(nodes), &PlannerConfig::default()).unwrap();
        let names: Vec<&str> = plan.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec![CLOCK, "reader", "reco", "writer"]);
        assert_eq!(plan.edges.len(), 3);
    }

    #[test]
    fn same_layer_sorts_by_name() {
        let workflow = Workflow::from(vec![
            Node::new("zulu").with_output("TST", "Z", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("alpha").with_output("TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("sink")
                .with_input("z", "TST", "Z", SubSpec::Exact(0), Lifetime::Timeframe)
                .with_input("a", "TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
        ]);
        let plan = plan_workflow(workflow, &PlannerConfig::default()).unwrap();
        let names: Vec<&str> = plan.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec![CLOCK, "alpha", "zulu", "sink"]);
    }

    #[test]
    fn zero_timeslices_are_rejected() {
        let workflow = Workflow::from(vec![
            Node::new("a").with_output("TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("b")
                .with_timeslices(0)
                .with_input("a", "TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
        ]);
        assert!(matches!(
            plan_workflow(workflow, &PlannerConfig::default()),
            Err(PlanError::InvalidTimeslices { node }) if node == "b"
        ));
    }

    #[test]
    fn empty_workflow_plans_nothing() {
        let plan = plan_workflow(Workflow::default(), &PlannerConfig::default()).unwrap();
        assert!(plan.nodes.is_empty());
        assert!(plan.edges.is_empty());
    }

    #[test]
    fn structural_errors_abort_before_injection() {
        let workflow = Workflow::from(vec![Node::new("a"), Node::new("a")]);
        assert!(matches!(
            plan_workflow(workflow, &PlannerConfig::default()),
            Err(PlanError::DuplicateName { .. })
        ));
    }

    #[test]
    fn self_feeding_node_is_a_cycle() {
        let workflow = Workflow::from(vec![
            Node::new("seed").with_output("TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("loop")
                .with_input("a", "TST", "A", SubSpec::Any, Lifetime::Timeframe)
                .with_output("TST", "A", SubSpec::Exact(1), Lifetime::Timeframe),
        ]);
        match plan_workflow(workflow, &PlannerConfig::default()) {
            Err(PlanError::Cycle { stuck, total, .. }) => {
                // seed, loop, clock and the sink for loop's own output.
                assert_eq!(total, 4);
                assert_eq!(stuck, vec!["loop".to_string(), DUMMY_SINK.to_string()]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn forbidding_self_match_breaks_the_loop() {
        let workflow = Workflow::from(vec![
            Node::new("seed").with_output("TST", "A", SubSpec::Exact(0), Lifetime::Timeframe),
            Node::new("loop")
                .with_input("a", "TST", "A", SubSpec::Any, Lifetime::Timeframe)
                .with_output("TST", "A", SubSpec::Exact(1), Lifetime::Timeframe),
        ]);
        let config = PlannerConfig {
            self_match: SelfMatchPolicy::Forbid,
            ..PlannerConfig::default()
        };
        let plan = plan_workflow(workflow, &config).unwrap();
        // loop's own output is unconsumed and ends in the dummy sink.
        assert!(plan.injected.contains(&DUMMY_SINK.to_string()));
        assert_eq!(plan.order.len(), plan.nodes.len());
    }
}
