//! Graphviz rendering. One vertex per node, one arrow per logical connection
//! (timeslice fan-out is collapsed).

use crate::plan::Plan;
use std::collections::BTreeSet;
use std::fmt;

pub struct Dot<'a>(pub &'a Plan);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.0;
        writeln!(f, "digraph workflow {{")?;
        writeln!(f, "  rankdir=LR;")?;
        writeln!(f, "  node [shape=box];")?;

        for (i, node) in plan.nodes.iter().enumerate() {
            let layer = plan.layer_of(i).map(|l| format!("\\nlayer {l}")).unwrap_or_default();
            let slices = if node.max_input_timeslices > 1 {
                format!(" x{}", node.max_input_timeslices)
            } else {
                String::new()
            };
            let style = if plan.injected.contains(&node.name) {
                ", style=dashed"
            } else {
                ""
            };
            writeln!(f, "  n{i} [label=\"{}{slices}{layer}\"{style}];", node.name)?;
        }

        let mut seen = BTreeSet::new();
        for edge in &plan.edges {
            if !seen.insert((edge.producer, edge.consumer, edge.output_global_index)) {
                continue;
            }
            let label = plan
                .outputs
                .get(edge.output_global_index)
                .map(|o| o.describe())
                .unwrap_or_default();
            let style = if edge.is_forward { ", style=dotted" } else { "" };
            writeln!(
                f,
                "  n{} -> n{} [label=\"{label}\"{style}];",
                edge.producer, edge.consumer
            )?;
        }
        writeln!(f, "}}")
    }
}
