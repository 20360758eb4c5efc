use std::cmp::Ordering;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::COST_EPSILON;

/// Heap entry of the search frontier
#[derive(Copy, Clone, Debug)]
pub(super) struct State {
    pub(super) cost: f64,
    pub(super) hops: usize,
    pub(super) node: NodeIndex,
}

// Min-heap by (cost, hops), node index keeps the pop order deterministic
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.hops.cmp(&self.hops))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

/// Best known way to reach a node
#[derive(Copy, Clone, Debug)]
pub(super) struct Label {
    pub(super) cost: f64,
    pub(super) hops: usize,
    pub(super) predecessor: Option<(NodeIndex, EdgeIndex)>,
}

impl Label {
    pub(super) fn origin() -> Self {
        Self {
            cost: 0.0,
            hops: 0,
            predecessor: None,
        }
    }

    /// Compares cost within [`COST_EPSILON`], then the number of edges.
    /// `Equal` means the node sequences have to decide.
    pub(super) fn rank(&self, other: &Self) -> Ordering {
        if self.cost < other.cost - COST_EPSILON {
            Ordering::Less
        } else if self.cost > other.cost + COST_EPSILON {
            Ordering::Greater
        } else {
            self.hops.cmp(&other.hops)
        }
    }
}
