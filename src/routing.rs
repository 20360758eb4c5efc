use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pyfunction, gen_stub_pymethods};

use crate::graph::PyCampusGraph;
use wayfinder_core::prelude::*;

fn planning_error(e: Error) -> PyErr {
    match e {
        Error::UnknownNode(_) | Error::InvalidPosition(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(format!("Route planning failed: {e}")),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, what: &str) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize {what} to JSON: {e}")))
}

/// A single spoken announcement along a route
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "Instruction")]
#[derive(Clone)]
pub struct PyInstruction {
    pub(crate) inner: Instruction,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyInstruction {
    #[getter]
    fn sequence(&self) -> usize {
        self.inner.sequence
    }

    #[getter]
    fn route_index(&self) -> usize {
        self.inner.route_index
    }

    #[getter]
    fn text(&self) -> String {
        self.inner.text.clone()
    }

    /// Signed turn angle in degrees, positive to the right
    #[getter]
    fn angle(&self) -> f64 {
        self.inner.angle
    }

    #[getter]
    fn trigger_distance(&self) -> f64 {
        self.inner.trigger_distance
    }

    pub fn as_json(&self) -> PyResult<String> {
        to_json(&self.inner, "Instruction")
    }

    fn __repr__(&self) -> String {
        format!(
            "Instruction({}, at step {}: {:?})",
            self.inner.sequence, self.inner.route_index, self.inner.text
        )
    }
}

/// Route
///
/// Planned walk between two campus locations. The route is immutable;
/// instructions are derived from it on demand.
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "Route")]
#[derive(Clone)]
pub struct PyRoute {
    pub(crate) inner: Route,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyRoute {
    pub fn node_ids(&self) -> Vec<String> {
        self.inner
            .node_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[getter]
    fn total_distance(&self) -> f64 {
        self.inner.total_distance()
    }

    #[getter]
    fn estimated_time(&self) -> f64 {
        self.inner.estimated_time()
    }

    /// True when the route satisfied the accessibility requirement it was planned with
    #[getter]
    fn accessible(&self) -> bool {
        self.inner.accessible()
    }

    pub fn instructions(&self) -> Vec<PyInstruction> {
        synthesize(&self.inner)
            .into_iter()
            .map(|inner| PyInstruction { inner })
            .collect()
    }

    pub fn as_json(&self) -> PyResult<String> {
        to_json(&self.inner, "Route")
    }

    pub fn as_geojson(&self) -> PyResult<String> {
        self.inner
            .to_geojson_string()
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to export route: {e}")))
    }

    fn __repr__(&self) -> String {
        format!(
            "Route({} -> {}, {:.1} m, {} steps)",
            self.inner.start().id,
            self.inner.goal().id,
            self.inner.total_distance(),
            self.inner.len()
        )
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }
}

/// Plan the best walking route between two nodes
///
/// Parameters
/// ----------
/// graph : CampusGraph
/// start : str
///     Identifier of the start node
/// goal : str
///     Identifier of the destination node
/// require_accessible : bool, default=True
///     Prefer routes without accessibility penalties; falls back to the
///     least penalised route when none exists
///
/// Raises
/// ------
/// ValueError
///     If either node is unknown
/// RuntimeError
///     If the goal is unreachable
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (graph, start, goal, require_accessible = true))]
pub fn plan_route(
    graph: &PyCampusGraph,
    start: &str,
    goal: &str,
    require_accessible: bool,
) -> PyResult<PyRoute> {
    let inner = plan(&graph.graph, start, goal, require_accessible).map_err(planning_error)?;
    Ok(PyRoute { inner })
}

/// Plan routes from one start to many goals; unreachable goals yield None
#[cfg_attr(feature = "stubgen", gen_stub_pyfunction)]
#[pyfunction]
#[pyo3(signature = (graph, start, goals, require_accessible = true))]
pub fn plan_routes_one_to_many(
    graph: &PyCampusGraph,
    start: &str,
    goals: Vec<String>,
    require_accessible: bool,
) -> PyResult<Vec<Option<PyRoute>>> {
    let goals: Vec<&str> = goals.iter().map(String::as_str).collect();
    let routes = plan_one_to_many(&graph.graph, start, &goals, require_accessible)
        .map_err(planning_error)?;

    Ok(routes
        .into_iter()
        .map(|route| route.map(|inner| PyRoute { inner }))
        .collect())
}
