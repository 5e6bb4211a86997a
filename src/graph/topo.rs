//! Layered topological sort over an arbitrary edge list.
//!
//! Layer 0 holds the nodes without incoming edges; every other node sits one
//! layer below the deepest of its direct predecessors. If the graph has a
//! cycle, the nodes on (or downstream of) it never become ready and the
//! returned order is shorter than the node count.

use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TopoIndexInfo {
    pub index: usize,
    pub layer: usize,
}

/// Sort `node_count` nodes given `edges`, where `endpoints` extracts the
/// (from, to) pair of every edge record. Pairs with an endpoint outside
/// `0..node_count` are skipped.
pub fn topological_sort<E>(
    node_count: usize,
    edges: &[E],
    endpoints: impl Fn(&E) -> (usize, usize),
) -> Vec<TopoIndexInfo> {
    let pairs: Vec<(usize, usize)> = edges
        .iter()
        .map(endpoints)
        .filter(|&(from, to)| {
            let in_range = from < node_count && to < node_count;
            if !in_range {
                warn!(from, to, node_count, "skipping edge with out-of-range endpoint");
            }
            in_range
        })
        .collect();

    let mut has_deps = vec![false; node_count];
    for &(_, to) in &pairs {
        has_deps[to] = true;
    }

    let mut frontier: VecDeque<TopoIndexInfo> = (0..node_count)
        .filter(|&i| !has_deps[i])
        .map(|index| TopoIndexInfo { index, layer: 0 })
        .collect();

    let mut remaining: Vec<usize> = (0..pairs.len()).collect();
    let mut sorted = Vec::with_capacity(node_count);

    while let Some(node) = frontier.pop_front() {
        sorted.push(node);

        // Split the remaining edges into the ones leaving `node` and the rest.
        let mut next = BTreeSet::new();
        remaining.retain(|&ei| {
            let (from, to) = pairs[ei];
            if from == node.index {
                next.insert(to);
                false
            } else {
                true
            }
        });

        for to in next {
            let still_blocked = remaining.iter().any(|&ei| pairs[ei].1 == to);
            if !still_blocked {
                frontier.push_back(TopoIndexInfo {
                    index: to,
                    layer: node.layer + 1,
                });
            }
        }
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn info(index: usize, layer: usize) -> TopoIndexInfo {
        TopoIndexInfo { index, layer }
    }

    #[test]
    fn diamond() {
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let sorted = topological_sort(4, &edges, |&e| e);
        assert_eq!(sorted, vec![info(0, 0), info(1, 1), info(2, 1), info(3, 2)]);
    }

    #[test]
    fn layer_follows_deepest_predecessor() {
        // 0 -> 1 -> 2 and 0 -> 2: node 2 must land below node 1.
        let edges = [(0, 2), (0, 1), (1, 2)];
        let sorted = topological_sort(3, &edges, |&e| e);
        assert_eq!(sorted, vec![info(0, 0), info(1, 1), info(2, 2)]);
    }

    #[test]
    fn strided_records() {
        struct Rec {
            _pad: u64,
            src: usize,
            dst: usize,
        }
        let edges = vec![
            Rec { _pad: 0, src: 2, dst: 0 },
            Rec { _pad: 0, src: 1, dst: 2 },
        ];
        let sorted = topological_sort(3, &edges, |r| (r.src, r.dst));
        assert_eq!(sorted, vec![info(1, 0), info(2, 1), info(0, 2)]);
    }

    #[test]
    fn parallel_edges_are_harmless() {
        let edges = [(0, 1), (0, 1), (0, 1)];
        let sorted = topological_sort(2, &edges, |&e| e);
        assert_eq!(sorted, vec![info(0, 0), info(1, 1)]);
    }

    #[test]
    fn cycle_yields_short_order() {
        let edges = [(0, 1), (1, 2), (2, 1)];
        let sorted = topological_sort(3, &edges, |&e| e);
        assert_eq!(sorted, vec![info(0, 0)]);
    }

    #[test]
    fn out_of_range_endpoints_are_skipped() {
        let edges = [(0, 1), (1, 7), (9, 0)];
        let sorted = topological_sort(2, &edges, |&e| e);
        assert_eq!(sorted, vec![info(0, 0), info(1, 1)]);
    }

    #[test]
    fn empty_graph() {
        let edges: [(usize, usize); 0] = [];
        assert!(topological_sort(0, &edges, |&e| e).is_empty());
        assert_eq!(topological_sort(2, &edges, |&e| e).len(), 2);
    }

    fn dag_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (2usize..12).prop_flat_map(|n| {
            let edge = (0..n, 0..n)
                .prop_filter("no self loops", |(a, b)| a != b)
                .prop_map(|(a, b)| (a.min(b), a.max(b)));
            (Just(n), prop::collection::vec(edge, 0..30))
        })
    }

    proptest! {
        #[test]
        fn acyclic_graphs_are_fully_ordered((n, edges) in dag_strategy()) {
            let sorted = topological_sort(n, &edges, |&e| e);
            prop_assert_eq!(sorted.len(), n);

            let mut seen: Vec<usize> = sorted.iter().map(|t| t.index).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());

            let mut layer = vec![0; n];
            for t in &sorted {
                layer[t.index] = t.layer;
            }
            for &(a, b) in &edges {
                prop_assert!(layer[a] < layer[b]);
            }
        }
    }
}
