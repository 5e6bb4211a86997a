use crate::graph::EdgeAction;
use crate::plan::Plan;
use std::fmt;

/// Human-readable summary: nodes by layer, then edges in consumer order.
pub struct Summary<'a>(pub &'a Plan);

fn action(a: &EdgeAction) -> &'static str {
    match (a.requires_new_device, a.requires_new_channel) {
        (true, _) => "new device",
        (false, true) => "new channel",
        (false, false) => "reuse",
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.0;
        writeln!(
            f,
            "{} nodes ({} injected), {} edges, {} layers",
            plan.nodes.len(),
            plan.injected.len(),
            plan.edges.len(),
            plan.layer_count()
        )?;

        for layer in 0..plan.layer_count() {
            writeln!(f, "layer {layer}:")?;
            for info in plan.order.iter().filter(|t| t.layer == layer) {
                let node = &plan.nodes[info.index];
                let tag = if plan.injected.contains(&node.name) { " [injected]" } else { "" };
                writeln!(
                    f,
                    "  {}{tag} ({} in, {} out)",
                    node.name,
                    node.inputs.len(),
                    node.outputs.len()
                )?;
            }
        }

        if !plan.edges.is_empty() {
            writeln!(f, "edges:")?;
        }
        for &i in &plan.in_index {
            let edge = &plan.edges[i];
            let spec = plan
                .outputs
                .get(edge.output_global_index)
                .map(|o| o.describe())
                .unwrap_or_default();
            writeln!(
                f,
                "  {}[{}] -> {}[{}] {spec}{} (out: {}, in: {})",
                plan.nodes[edge.producer].name,
                edge.producer_time_index,
                plan.nodes[edge.consumer].name,
                edge.time_index,
                if edge.is_forward { " forwarded" } else { "" },
                action(&plan.out_actions[i]),
                action(&plan.in_actions[i]),
            )?;
        }
        Ok(())
    }
}
