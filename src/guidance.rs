use chrono::{DateTime, Utc};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
#[cfg(feature = "stubgen")]
use pyo3_stub_gen::derive::{gen_stub_pyclass, gen_stub_pymethods};

use crate::routing::PyRoute;
use wayfinder_core::prelude::*;

fn guidance_error(e: Error) -> PyErr {
    match e {
        Error::InvalidPosition(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Converts seconds since the Unix epoch, keeping microsecond precision
fn timestamp_from_secs(seconds: f64) -> PyResult<DateTime<Utc>> {
    let micros = (seconds * 1e6).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(PyValueError::new_err(format!(
            "Timestamp {seconds} is out of range"
        )));
    }
    DateTime::from_timestamp_micros(micros as i64)
        .ok_or_else(|| PyValueError::new_err(format!("Timestamp {seconds} is out of range")))
}

/// GuidanceTracker
///
/// Follows a user along a planned route from position fixes and queues the
/// announcements that become due. Events are collected until drained.
///
/// Example:
///
/// .. code-block:: python
///
///     tracker = GuidanceTracker()
///     tracker.start(plan_route(graph, "gate", "library"))
///     phase = tracker.update(40.0001, 116.3, time.time(), accuracy=4.0)
///     for event in tracker.drain_events():
///         speak(json.loads(event))
#[cfg_attr(feature = "stubgen", gen_stub_pyclass)]
#[pyclass(name = "GuidanceTracker")]
pub struct PyGuidanceTracker {
    inner: GuidanceTracker,
}

#[cfg_attr(feature = "stubgen", gen_stub_pymethods)]
#[pymethods]
impl PyGuidanceTracker {
    /// Creates an idle tracker; `config_json` overrides individual tuning values
    #[new]
    #[pyo3(signature = (config_json = None))]
    pub fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => serde_json::from_str::<GuidanceConfig>(json)
                .map_err(|e| PyValueError::new_err(format!("Invalid guidance config: {e}")))?,
            None => GuidanceConfig::default(),
        };
        Ok(Self {
            inner: GuidanceTracker::new(config, Vec::new()),
        })
    }

    /// Current phase: idle, navigating, paused, off_route or arrived
    #[getter]
    fn phase(&self) -> &'static str {
        self.inner.phase().as_str()
    }

    pub fn start(&mut self, route: &PyRoute) -> PyResult<()> {
        self.inner
            .start(route.inner.clone())
            .map_err(guidance_error)
    }

    /// Feeds one position fix and returns the resulting phase
    #[pyo3(signature = (lat, lon, timestamp, accuracy = None))]
    pub fn update(
        &mut self,
        lat: f64,
        lon: f64,
        timestamp: f64,
        accuracy: Option<f64>,
    ) -> PyResult<&'static str> {
        let mut sample = PositionSample::new(lat, lon, timestamp_from_secs(timestamp)?);
        sample.accuracy = accuracy;
        let phase = self.inner.update(sample).map_err(guidance_error)?;
        Ok(phase.as_str())
    }

    pub fn pause(&mut self) -> PyResult<()> {
        self.inner.pause().map_err(guidance_error)
    }

    pub fn resume(&mut self) -> PyResult<()> {
        self.inner.resume().map_err(guidance_error)
    }

    /// Replaces the route after the tracker left it
    pub fn reroute(&mut self, route: &PyRoute) -> PyResult<()> {
        self.inner
            .reroute(route.inner.clone())
            .map_err(guidance_error)
    }

    pub fn cancel(&mut self) {
        self.inner.cancel();
    }

    /// Returns the queued events as JSON documents and clears the queue
    pub fn drain_events(&mut self) -> PyResult<Vec<String>> {
        self.inner
            .sink_mut()
            .drain(..)
            .map(|event| {
                serde_json::to_string(&event).map_err(|e| {
                    PyRuntimeError::new_err(format!("Failed to serialize event: {e}"))
                })
            })
            .collect()
    }

    pub fn status_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.status())
            .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize status: {e}")))
    }

    fn __repr__(&self) -> String {
        format!("GuidanceTracker(phase={})", self.inner.phase().as_str())
    }
}
