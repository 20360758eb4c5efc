use geo::Point;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pyfunction, gen_stub_pymethods};

use wayfinder_core::geometry::is_valid_coordinate;
use wayfinder_core::prelude::*;

/// CampusGraph
///
/// Walkable pathway network of a campus: named locations connected by
/// directed edges carrying a distance and an accessibility penalty.
///
/// The graph is immutable once loaded and is shared by every planning and
/// guidance call.
///
/// Example:
///
/// .. code-block:: python
///
///     graph = load_campus_graph("campus.json")
///     node_id, distance = graph.nearest_node(40.0, 116.3)
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "CampusGraph")]
pub struct PyCampusGraph {
    pub(crate) graph: CampusGraph,
}

pub(crate) fn checked_point(lat: f64, lon: f64) -> PyResult<Point<f64>> {
    if is_valid_coordinate(lat, lon) {
        Ok(Point::new(lon, lat))
    } else {
        Err(PyValueError::new_err(format!(
            "Coordinate ({lat}, {lon}) is out of range"
        )))
    }
}

fn build(json: &str, walking_speed: f64) -> PyResult<CampusGraph> {
    let data = GraphData::from_json(json)
        .map_err(|e| PyValueError::new_err(format!("Invalid campus dataset: {e}")))?;
    let config = GraphConfig { walking_speed };
    create_campus_graph(&config, data)
        .map_err(|e| PyValueError::new_err(format!("Failed to build campus graph: {e}")))
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyCampusGraph {
    /// Builds a graph from a JSON document with `nodes` and `edges` arrays
    #[staticmethod]
    #[pyo3(signature = (json, walking_speed = 1.25))]
    pub fn from_json(json: &str, walking_speed: f64) -> PyResult<Self> {
        Ok(Self {
            graph: build(json, walking_speed)?,
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.graph.nodes().map(|node| node.id.clone()).collect()
    }

    /// Full node record serialized as JSON
    pub fn node_json(&self, node_id: &str) -> PyResult<String> {
        let node = self
            .graph
            .node(node_id)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        serde_json::to_string(node)
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize node: {e}")))
    }

    /// Returns `(node_id, distance_m)` of the closest node, or None on an empty graph
    pub fn nearest_node(&self, lat: f64, lon: f64) -> PyResult<Option<(String, f64)>> {
        let point = checked_point(lat, lon)?;
        Ok(self
            .graph
            .nearest_node(&point)
            .map(|(node, distance)| (node.id.clone(), distance)))
    }

    /// Nodes within `radius` meters, closest first
    #[pyo3(signature = (lat, lon, radius = 100.0))]
    pub fn nodes_within(&self, lat: f64, lon: f64, radius: f64) -> PyResult<Vec<(String, f64)>> {
        let point = checked_point(lat, lon)?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(PyValueError::new_err(format!(
                "Radius {radius} is not a distance"
            )));
        }
        Ok(self
            .graph
            .nodes_within(&point, radius)
            .into_iter()
            .map(|(node, distance)| (node.id.clone(), distance))
            .collect())
    }

    pub fn nodes_in_category(&self, category: &str) -> Vec<String> {
        self.graph
            .nodes_in_category(category)
            .into_iter()
            .map(|node| node.id.clone())
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "CampusGraph with {} nodes and {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        )
    }

    fn __str__(&self) -> String {
        self.__repr__()
    }
}

/// Load a campus graph from a JSON file
///
/// Parameters
/// ----------
/// path : str
///     Path to a JSON document with `nodes` and `edges` arrays
/// walking_speed : float, default=1.25
///     Speed in m/s used for edges without an explicit traversal time
///
/// Returns
/// -------
/// CampusGraph
///
/// Raises
/// ------
/// OSError
///     If the file cannot be read
/// ValueError
///     If the dataset is malformed
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction(name = "load_campus_graph")]
#[pyo3(signature = (path, walking_speed = 1.25))]
pub fn py_load_campus_graph(path: &str, walking_speed: f64) -> PyResult<PyCampusGraph> {
    let json = std::fs::read_to_string(path)?;
    let graph = build(&json, walking_speed)?;
    log::info!(
        "Loaded campus graph from {path}: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(PyCampusGraph { graph })
}
