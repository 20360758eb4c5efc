use log::{info, warn};
use petgraph::graph::DiGraph;

use super::config::GraphConfig;
use super::records::{EdgeRecord, GraphData, NodeRecord};
use crate::model::{CampusGraph, Edge, Node};
use crate::{Error, geometry};

/// Creates a campus graph from externally loaded records
///
/// # Errors
///
/// Returns [`Error::MalformedGraph`] on duplicate identifiers, invalid
/// coordinates, dangling edges or invalid edge attributes
pub fn create_campus_graph(config: &GraphConfig, data: GraphData) -> Result<CampusGraph, Error> {
    validate_config(config)?;

    let GraphData { nodes, edges } = data;
    let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
    let mut ids = hashbrown::HashMap::with_capacity(nodes.len());

    for record in nodes {
        validate_node(&record)?;
        if ids.contains_key(&record.id) {
            return Err(Error::MalformedGraph(format!(
                "duplicate node identifier '{}'",
                record.id
            )));
        }
        let id = record.id.clone();
        let idx = graph.add_node(node_from_record(record));
        ids.insert(id, idx);
    }

    for record in edges {
        validate_edge(&record)?;
        let (Some(&from), Some(&to)) = (ids.get(&record.from), ids.get(&record.to)) else {
            return Err(Error::MalformedGraph(format!(
                "edge {} -> {} references an unknown node",
                record.from, record.to
            )));
        };
        if from == to {
            warn!("Ignoring self-loop edge on node '{}'", record.from);
            continue;
        }
        graph.add_edge(from, to, edge_from_record(config, record));
    }

    let campus = CampusGraph::from_graph(graph);
    info!(
        "Campus graph loaded: {} nodes, {} edges",
        campus.node_count(),
        campus.edge_count()
    );
    Ok(campus)
}

impl CampusGraph {
    /// Builds a graph with the default [`GraphConfig`]
    ///
    /// # Errors
    ///
    /// See [`create_campus_graph`]
    pub fn load(nodes: Vec<NodeRecord>, edges: Vec<EdgeRecord>) -> Result<Self, Error> {
        create_campus_graph(&GraphConfig::default(), GraphData { nodes, edges })
    }

    /// Builds a graph with an explicit configuration
    ///
    /// # Errors
    ///
    /// See [`create_campus_graph`]
    pub fn load_with(
        config: &GraphConfig,
        nodes: Vec<NodeRecord>,
        edges: Vec<EdgeRecord>,
    ) -> Result<Self, Error> {
        create_campus_graph(config, GraphData { nodes, edges })
    }
}

fn validate_config(config: &GraphConfig) -> Result<(), Error> {
    if config.walking_speed.is_finite() && config.walking_speed > 0.0 {
        Ok(())
    } else {
        Err(Error::MalformedGraph(format!(
            "walking speed must be positive, got {}",
            config.walking_speed
        )))
    }
}

fn validate_node(record: &NodeRecord) -> Result<(), Error> {
    if geometry::is_valid_coordinate(record.lat, record.lon) {
        Ok(())
    } else {
        Err(Error::MalformedGraph(format!(
            "node '{}' has invalid coordinates ({}, {})",
            record.id, record.lat, record.lon
        )))
    }
}

fn validate_edge(record: &EdgeRecord) -> Result<(), Error> {
    let describe = || format!("{} -> {}", record.from, record.to);

    if !(record.distance.is_finite() && record.distance > 0.0) {
        return Err(Error::MalformedGraph(format!(
            "edge {} has invalid distance {}",
            describe(),
            record.distance
        )));
    }
    if !(record.accessibility_penalty.is_finite() && record.accessibility_penalty >= 0.0) {
        return Err(Error::MalformedGraph(format!(
            "edge {} has invalid accessibility penalty {}",
            describe(),
            record.accessibility_penalty
        )));
    }
    if let Some(time) = record.traversal_time {
        if !(time.is_finite() && time >= 0.0) {
            return Err(Error::MalformedGraph(format!(
                "edge {} has invalid traversal time {time}",
                describe()
            )));
        }
    }
    Ok(())
}

fn node_from_record(record: NodeRecord) -> Node {
    Node {
        id: record.id,
        lat: record.lat,
        lon: record.lon,
        tags: record.tags.into_iter().collect(),
        name: record.name,
        category: record.category,
        description: record.description,
    }
}

fn edge_from_record(config: &GraphConfig, record: EdgeRecord) -> Edge {
    Edge {
        from: record.from,
        to: record.to,
        distance: record.distance,
        base_cost: record
            .traversal_time
            .unwrap_or(record.distance / config.walking_speed),
        accessibility_penalty: record.accessibility_penalty,
        instruction_override: record.instruction_override,
    }
}
