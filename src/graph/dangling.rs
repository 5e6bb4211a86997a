//! Dangling output analysis: outputs that no other node consumes.

use crate::spec::{InputSpec, Node, matches, matching_input};

/// One synthesized input per distinct output, plus whether it is dangling.
///
/// Inputs of the producing node itself never count as consumers. Outputs
/// which only differ by binding collapse into the first entry.
pub fn analyze_outputs(nodes: &[Node]) -> (Vec<InputSpec>, Vec<bool>) {
    let mut results: Vec<InputSpec> = Vec::new();
    let mut dangling = Vec::new();

    for (wi, producer) in nodes.iter().enumerate() {
        for (oi, output) in producer.outputs.iter().enumerate() {
            let matched = nodes
                .iter()
                .enumerate()
                .filter(|(ci, _)| *ci != wi)
                .any(|(_, consumer)| consumer.inputs.iter().any(|i| matches(i, output)));

            let mut input = matching_input(output);
            input.binding = format!("output_{}_{}", wi, oi);

            let seen = results.iter().any(|r| {
                r.origin == input.origin
                    && r.description == input.description
                    && r.sub_spec == input.sub_spec
                    && r.lifetime == input.lifetime
            });
            if !seen {
                results.push(input);
                dangling.push(!matched);
            }
        }
    }
    (results, dangling)
}

pub fn compute_dangling_outputs(nodes: &[Node]) -> Vec<InputSpec> {
    let (inputs, dangling) = analyze_outputs(nodes);
    inputs
        .into_iter()
        .zip(dangling)
        .filter_map(|(input, d)| d.then_some(input))
        .collect()
}
