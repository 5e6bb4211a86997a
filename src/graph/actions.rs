//! Channel and device creation actions derived from the sorted edge list.
//!
//! Each edge is compared with the edge preceding it in one of two orders:
//! grouped by consumer (incoming side) or by producer (outgoing side). Only
//! a change of the grouping key requires a new device or a new channel.

use crate::graph::DeviceConnectionEdge;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EdgeAction {
    pub requires_new_device: bool,
    pub requires_new_channel: bool,
}

/// Consumer-grouped and producer-grouped permutations of `edges`.
pub fn sort_edges(edges: &[DeviceConnectionEdge]) -> (Vec<usize>, Vec<usize>) {
    let mut in_index: Vec<usize> = (0..edges.len()).collect();
    let mut out_index = in_index.clone();

    in_index.sort_by_key(|&i| {
        let e = &edges[i];
        (e.consumer, e.time_index, e.producer, e.producer_time_index)
    });
    out_index.sort_by_key(|&i| {
        let e = &edges[i];
        (e.producer, e.producer_time_index, e.time_index, e.consumer)
    });
    (in_index, out_index)
}

/// Actions for the producing side, walking `edges` in `index` order.
pub fn compute_out_edge_actions(edges: &[DeviceConnectionEdge], index: &[usize]) -> Vec<EdgeAction> {
    debug_assert_eq!(edges.len(), index.len());
    let mut actions = vec![EdgeAction::default(); edges.len()];
    let mut last: Option<&DeviceConnectionEdge> = None;
    for &i in index {
        let edge = &edges[i];
        actions[i] = match last {
            None => EdgeAction {
                requires_new_device: true,
                requires_new_channel: true,
            },
            Some(last) => EdgeAction {
                requires_new_device: last.producer != edge.producer
                    || last.producer_time_index != edge.producer_time_index,
                requires_new_channel: last.consumer != edge.consumer
                    || last.producer != edge.producer
                    || last.time_index != edge.time_index
                    || last.producer_time_index != edge.producer_time_index,
            },
        };
        last = Some(edge);
    }
    actions
}

/// Actions for the consuming side, walking `edges` in `index` order.
pub fn compute_in_edge_actions(edges: &[DeviceConnectionEdge], index: &[usize]) -> Vec<EdgeAction> {
    debug_assert_eq!(edges.len(), index.len());
    let mut actions = vec![EdgeAction::default(); edges.len()];
    let mut last: Option<&DeviceConnectionEdge> = None;
    for &i in index {
        let edge = &edges[i];
        actions[i] = match last {
            None => EdgeAction {
                requires_new_device: true,
                requires_new_channel: true,
            },
            Some(last) => EdgeAction {
                requires_new_device: last.consumer != edge.consumer
                    || last.time_index != edge.time_index,
                requires_new_channel: last.consumer != edge.consumer
                    || last.time_index != edge.time_index
                    || last.producer != edge.producer
                    || last.producer_time_index != edge.producer_time_index,
            },
        };
        last = Some(edge);
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edge(producer: usize, ptpi: usize, consumer: usize, tpi: usize, input: usize) -> DeviceConnectionEdge {
        DeviceConnectionEdge {
            producer,
            consumer,
            time_index: tpi,
            producer_time_index: ptpi,
            output_global_index: input,
            consumer_input_index: input,
            is_forward: false,
        }
    }

    const NEW: EdgeAction = EdgeAction {
        requires_new_device: true,
        requires_new_channel: true,
    };
    const REUSE: EdgeAction = EdgeAction {
        requires_new_device: false,
        requires_new_channel: false,
    };
    const NEW_CHANNEL: EdgeAction = EdgeAction {
        requires_new_device: false,
        requires_new_channel: true,
    };

    #[test]
    fn shared_channel_is_reused() {
        // Two inputs of the same consumer fed by the same producer.
        let edges = vec![edge(0, 0, 1, 0, 0), edge(0, 0, 1, 0, 1)];
        let (in_index, out_index) = sort_edges(&edges);
        assert_eq!(compute_out_edge_actions(&edges, &out_index), vec![NEW, REUSE]);
        assert_eq!(compute_in_edge_actions(&edges, &in_index), vec![NEW, REUSE]);
    }

    #[test]
    fn fan_out_opens_channels_on_one_device() {
        let edges = vec![edge(0, 0, 1, 0, 0), edge(0, 0, 2, 0, 0)];
        let (in_index, out_index) = sort_edges(&edges);
        assert_eq!(compute_out_edge_actions(&edges, &out_index), vec![NEW, NEW_CHANNEL]);
        assert_eq!(compute_in_edge_actions(&edges, &in_index), vec![NEW, NEW]);
    }

    #[test]
    fn fan_in_opens_channels_on_one_device() {
        let edges = vec![edge(0, 0, 2, 0, 0), edge(1, 0, 2, 0, 0)];
        let (in_index, out_index) = sort_edges(&edges);
        assert_eq!(compute_in_edge_actions(&edges, &in_index), vec![NEW, NEW_CHANNEL]);
        assert_eq!(compute_out_edge_actions(&edges, &out_index), vec![NEW, NEW]);
    }

    #[test]
    fn sort_orders_group_by_side() {
        let edges = vec![edge(1, 0, 0, 0, 0), edge(0, 1, 1, 0, 0), edge(0, 0, 1, 1, 0)];
        let (in_index, out_index) = sort_edges(&edges);
        assert_eq!(in_index, vec![0, 1, 2]);
        assert_eq!(out_index, vec![2, 1, 0]);
    }

    #[test]
    fn time_pipelined_consumer_needs_devices_per_slice() {
        let edges = vec![edge(0, 0, 1, 0, 0), edge(0, 0, 1, 1, 0)];
        let (in_index, _) = sort_edges(&edges);
        assert_eq!(compute_in_edge_actions(&edges, &in_index), vec![NEW, NEW]);
    }

    #[test]
    fn empty_edges() {
        let (in_index, out_index) = sort_edges(&[]);
        assert!(compute_in_edge_actions(&[], &in_index).is_empty());
        assert!(compute_out_edge_actions(&[], &out_index).is_empty());
    }
}
