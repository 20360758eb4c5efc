use std::{cmp::Ordering, collections::BinaryHeap};

use fixedbitset::FixedBitSet;
use petgraph::graph::{EdgeIndex, NodeIndex};

use super::state::{Label, State};
use crate::model::{CampusGraph, Edge};

/// How edges are weighted during a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CostModel {
    /// Physical distance only
    Distance,
    /// Distance plus accessibility penalty
    Penalized,
    /// Distance over penalty-free edges; other edges are impassable
    AccessibleOnly,
}

impl CostModel {
    fn cost(self, edge: &Edge) -> Option<f64> {
        match self {
            CostModel::Distance => Some(edge.cost(false)),
            CostModel::Penalized => Some(edge.cost(true)),
            CostModel::AccessibleOnly => edge.is_accessible().then(|| edge.cost(false)),
        }
    }
}

/// Dijkstra search from `start` to `goal`.
///
/// Ties within epsilon are broken by fewer edges, then by the
/// lexicographically smallest sequence of node identifiers. Returns the path
/// as `(node, incoming edge)` pairs, or `None` if `goal` is unreachable.
pub(crate) fn shortest_path(
    graph: &CampusGraph,
    start: NodeIndex,
    goal: NodeIndex,
    model: CostModel,
) -> Option<Vec<(NodeIndex, Option<EdgeIndex>)>> {
    let node_count = graph.graph.node_count();
    let mut labels: Vec<Option<Label>> = vec![None; node_count];
    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::with_capacity(node_count / 4 + 1);

    labels[start.index()] = Some(Label::origin());
    heap.push(State {
        cost: 0.0,
        hops: 0,
        node: start,
    });

    while let Some(State { node, .. }) = heap.pop() {
        // Stale heap entry, the node already has its final label
        if settled.put(node.index()) {
            continue;
        }
        if node == goal {
            break;
        }

        let Some(label) = labels[node.index()] else {
            continue;
        };

        for (edge, next) in graph.outgoing(node) {
            if settled.contains(next.index()) {
                continue;
            }
            let Some(edge_cost) = model.cost(&graph.graph[edge]) else {
                continue;
            };

            let candidate = Label {
                cost: label.cost + edge_cost,
                hops: label.hops + 1,
                predecessor: Some((node, edge)),
            };

            let improves = match &labels[next.index()] {
                None => true,
                Some(existing) => is_better(graph, &labels, &candidate, existing),
            };

            if improves {
                labels[next.index()] = Some(candidate);
                heap.push(State {
                    cost: candidate.cost,
                    hops: candidate.hops,
                    node: next,
                });
            }
        }
    }

    if !settled.contains(goal.index()) {
        return None;
    }
    Some(trace_back(&labels, goal))
}

fn is_better(
    graph: &CampusGraph,
    labels: &[Option<Label>],
    candidate: &Label,
    existing: &Label,
) -> bool {
    match candidate.rank(existing) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => {
            let (Some((via_candidate, _)), Some((via_existing, _))) =
                (candidate.predecessor, existing.predecessor)
            else {
                return false;
            };
            // Both paths end with the same node, so comparing the prefixes is enough
            let candidate_ids = node_sequence(labels, via_candidate);
            let existing_ids = node_sequence(labels, via_existing);
            candidate_ids
                .iter()
                .map(|idx| graph.graph[*idx].id.as_str())
                .cmp(existing_ids.iter().map(|idx| graph.graph[*idx].id.as_str()))
                == Ordering::Less
        }
    }
}

fn node_sequence(labels: &[Option<Label>], last: NodeIndex) -> Vec<NodeIndex> {
    trace_back(labels, last)
        .into_iter()
        .map(|(node, _)| node)
        .collect()
}

/// Follows predecessors from `target` back to the search origin
fn trace_back(
    labels: &[Option<Label>],
    target: NodeIndex,
) -> Vec<(NodeIndex, Option<EdgeIndex>)> {
    let mut path = Vec::new();
    let mut current = Some(target);

    while let Some(node) = current {
        let predecessor = labels[node.index()].and_then(|label| label.predecessor);
        path.push((node, predecessor.map(|(_, edge)| edge)));
        current = predecessor.map(|(prev, _)| prev);
    }

    path.reverse();
    path
}
