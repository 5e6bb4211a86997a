//! Lifetime and sub-spec normalization run before edges are built.

use crate::spec::{ConcreteMatcher, Lifetime, Node, OutputSpec, SubSpec};
use tracing::{debug, error};

pub const DIST_STF_ORIGIN: &str = "FLP";
pub const DIST_STF_DESCRIPTION: &str = "DISTSUBTIMEFRAME";

/// The broadcast sub-timeframe marker as users are expected to request it.
pub fn dist_stf_marker() -> ConcreteMatcher {
    ConcreteMatcher::new(DIST_STF_ORIGIN, DIST_STF_DESCRIPTION, 0)
}

/// Rewrite lifetimes and marker sub-specs in place.
///
/// Returns how many marker inputs were renumbered.
pub fn adjust_topology(nodes: &mut [Node]) -> u32 {
    let marker = dist_stf_marker();
    let mut dist_stf_count: u32 = 0;

    for node in nodes.iter_mut() {
        let has_optionals = node.inputs.iter().any(|i| i.lifetime == Lifetime::Optional);
        let mut all_sporadic = true;
        let mut has_timer = false;
        let mut has_sporadic = false;

        for input in node.inputs.iter_mut() {
            if input.matches_type(DIST_STF_ORIGIN, DIST_STF_DESCRIPTION)
                && !input.matches_concrete(&marker)
            {
                error!(
                    "Only {}/{}/0 is supported as input provided by the user. Please replace {} with {}/{}/0 in {}.",
                    DIST_STF_ORIGIN,
                    DIST_STF_DESCRIPTION,
                    input.describe(),
                    DIST_STF_ORIGIN,
                    DIST_STF_DESCRIPTION,
                    input.binding
                );
            }
            // Renumber so the marker cannot be forwarded ahead of the payload
            // it is meant to follow. The first occurrence keeps sub-spec 0.
            if has_optionals && input.matches_concrete(&marker) {
                input.sub_spec = SubSpec::Exact(dist_stf_count);
                dist_stf_count += 1;
                continue;
            }
            // A timer alone does not make a node sporadic.
            if input.lifetime == Lifetime::Timer {
                has_timer = true;
                continue;
            }
            if input.lifetime == Lifetime::Sporadic {
                has_sporadic = true;
            } else {
                all_sporadic = false;
            }
        }

        debug!(
            node = %node.name,
            has_timer, has_sporadic, all_sporadic, "adjust topology"
        );

        if !all_sporadic || !has_sporadic {
            continue;
        }
        for output in node.outputs.iter_mut() {
            if output.lifetime == Lifetime::Timeframe {
                output.lifetime = Lifetime::Sporadic;
            }
        }
    }

    if dist_stf_count > 0 {
        let provider = nodes
            .iter_mut()
            .find(|n| n.outputs.iter().any(|o| o.matches_concrete(&marker)));
        if let Some(provider) = provider {
            for i in 1..dist_stf_count {
                provider.outputs.push(OutputSpec::new(
                    DIST_STF_ORIGIN,
                    DIST_STF_DESCRIPTION,
                    SubSpec::Exact(i),
                    Lifetime::Timeframe,
                ));
            }
        }
    }
    dist_stf_count
}
