use geo::Point;
use petgraph::graph::{EdgeIndex, NodeIndex};
use serde::Serialize;

use crate::model::{CampusGraph, Edge, Node};
use crate::{Meters, Seconds};

/// One location along a route with the edge used to get there
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub node: Node,
    /// `None` only for the first step
    pub incoming: Option<Edge>,
}

/// Immutable planned path from start to goal.
///
/// Routes are only produced by the planner, so holding one proves the graph
/// it came from was loaded successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    steps: Vec<RouteStep>,
    total_distance: Meters,
    estimated_time: Seconds,
    accessible: bool,
}

impl Route {
    pub(crate) fn from_path(
        graph: &CampusGraph,
        path: &[(NodeIndex, Option<EdgeIndex>)],
        require_accessible: bool,
    ) -> Self {
        let steps: Vec<RouteStep> = path
            .iter()
            .map(|&(node, edge)| RouteStep {
                node: graph.graph[node].clone(),
                incoming: edge.map(|edge| graph.graph[edge].clone()),
            })
            .collect();

        let edges = || steps.iter().filter_map(|step| step.incoming.as_ref());
        let total_distance = edges().map(|edge| edge.distance).sum();
        let estimated_time = edges().map(|edge| edge.base_cost).sum();
        let accessible = !require_accessible || edges().all(Edge::is_accessible);

        Self {
            steps,
            total_distance,
            estimated_time,
            accessible,
        }
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    /// Number of locations on the route, at least one
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn start(&self) -> &Node {
        &self.steps[0].node
    }

    pub fn goal(&self) -> &Node {
        &self.steps[self.steps.len() - 1].node
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.node.id.as_str()).collect()
    }

    pub fn total_distance(&self) -> Meters {
        self.total_distance
    }

    pub fn estimated_time(&self) -> Seconds {
        self.estimated_time
    }

    /// Whether every edge satisfied the accessibility requirement the route was planned with
    pub fn accessible(&self) -> bool {
        self.accessible
    }

    pub fn total_penalty(&self) -> f64 {
        self.edges().map(|edge| edge.accessibility_penalty).sum()
    }

    /// Edges in travel order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.steps.iter().filter_map(|step| step.incoming.as_ref())
    }

    pub(crate) fn point(&self, index: usize) -> Point<f64> {
        self.steps[index].node.geometry()
    }

    /// Length of the edge leading into step `index`
    pub(crate) fn edge_length(&self, index: usize) -> Meters {
        self.steps[index]
            .incoming
            .as_ref()
            .map_or(0.0, |edge| edge.distance)
    }

    /// Distance from the start to each step along the route
    pub(crate) fn cumulative_distances(&self) -> Vec<Meters> {
        self.steps
            .iter()
            .scan(0.0, |acc, step| {
                *acc += step.incoming.as_ref().map_or(0.0, |edge| edge.distance);
                Some(*acc)
            })
            .collect()
    }
}
