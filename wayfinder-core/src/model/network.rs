//! Campus graph and its spatial index

use geo::Point;
use hashbrown::HashMap;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rstar::{AABB, RTree, primitives::GeomWithData};

use super::components::{Edge, Node};
use crate::{Error, Meters, geometry};

/// Node position in the R-tree, `[lon, lat]`
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Candidates pulled from the R-tree before ranking by great-circle distance
const NEAREST_CANDIDATES: usize = 8;
/// Meters per degree of latitude, used to size search envelopes
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Immutable campus pathway graph
#[derive(Debug, Clone)]
pub struct CampusGraph {
    pub(crate) graph: DiGraph<Node, Edge>,
    pub(crate) id_index: HashMap<String, NodeIndex>,
    pub(crate) rtree: RTree<IndexedPoint>,
}

impl CampusGraph {
    pub(crate) fn from_graph(graph: DiGraph<Node, Edge>) -> Self {
        let id_index = graph
            .node_indices()
            .map(|idx| (graph[idx].id.clone(), idx))
            .collect();
        let points = graph
            .node_indices()
            .map(|idx| IndexedPoint::new([graph[idx].lon, graph[idx].lat], idx))
            .collect();

        Self {
            graph,
            id_index,
            rtree: RTree::bulk_load(points),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in load order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Looks up a node by identifier
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if the identifier is not in the graph
    pub fn node(&self, id: &str) -> Result<&Node, Error> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    pub(crate) fn node_index(&self, id: &str) -> Result<NodeIndex, Error> {
        self.id_index
            .get(id)
            .copied()
            .ok_or_else(|| Error::UnknownNode(id.to_string()))
    }

    /// Outgoing edges of `id` with their target nodes, in insertion order
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if the identifier is not in the graph
    pub fn neighbors(&self, id: &str) -> Result<Vec<(&Edge, &Node)>, Error> {
        let idx = self.node_index(id)?;
        Ok(self
            .outgoing(idx)
            .into_iter()
            .map(|(edge, target)| (&self.graph[edge], &self.graph[target]))
            .collect())
    }

    /// petgraph yields edges newest first; callers rely on insertion order
    pub(crate) fn outgoing(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_unstable_by_key(|(edge, _)| edge.index());
        edges
    }

    /// Nearest node to `point` and its distance in meters
    pub fn nearest_node(&self, point: &Point<f64>) -> Option<(&Node, Meters)> {
        self.rtree
            .nearest_neighbor_iter(&[point.x(), point.y()])
            .take(NEAREST_CANDIDATES)
            .map(|candidate| {
                let node = &self.graph[candidate.data];
                (node, geometry::distance(*point, node.geometry()))
            })
            .min_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
    }

    /// Nodes within `radius` meters of `point`, closest first
    pub fn nodes_within(&self, point: &Point<f64>, radius: Meters) -> Vec<(&Node, Meters)> {
        let lat_span = radius / METERS_PER_DEGREE;
        let lon_span = lat_span / point.y().to_radians().cos().abs().max(1e-6);
        let envelope = AABB::from_corners(
            [point.x() - lon_span, point.y() - lat_span],
            [point.x() + lon_span, point.y() + lat_span],
        );

        let mut found: Vec<(&Node, Meters)> = self
            .rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| {
                let node = &self.graph[candidate.data];
                (node, geometry::distance(*point, node.geometry()))
            })
            .filter(|(_, distance)| *distance <= radius)
            .collect();
        found.sort_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Nodes of the given category, in load order
    pub fn nodes_in_category(&self, category: &str) -> Vec<&Node> {
        self.nodes()
            .filter(|node| node.category.as_deref() == Some(category))
            .collect()
    }
}
