use pyo3::prelude::*;

use graph::{PyCampusGraph, py_load_campus_graph};
use guidance::PyGuidanceTracker;
use routing::{PyInstruction, PyRoute, plan_route, plan_routes_one_to_many};

pub mod graph;
pub mod guidance;
pub mod routing;

/// A Python module implemented in Rust.
#[pymodule]
fn wayfinder(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyCampusGraph>()?;
    m.add_function(wrap_pyfunction!(py_load_campus_graph, m)?)?;

    m.add_class::<PyRoute>()?;
    m.add_class::<PyInstruction>()?;
    m.add_function(wrap_pyfunction!(plan_route, m)?)?;
    m.add_function(wrap_pyfunction!(plan_routes_one_to_many, m)?)?;

    m.add_class::<PyGuidanceTracker>()?;
    Ok(())
}

#[cfg(feature = "stubgen")]
pyo3_stub_gen::define_stub_info_gatherer!(stub_info);
