use ice_fishing_core::config::SimConfig;
use ice_fishing_core::world::{ExperimentError, RunSummary, World};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Minimal PyO3 module exposing ice-fishing-core to Python through JSON.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Build a world from `config_json`, run it and return the `RunSummary` as JSON.
#[pyfunction]
fn run_experiment_json(
    py: Python<'_>,
    config_json: &str,
    steps: usize,
    sample_every: usize,
) -> PyResult<String> {
    let config: SimConfig =
        serde_json::from_str(config_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let summary = py
        .detach(|| -> Result<RunSummary, ExperimentError> {
            let mut world = World::try_new(config)?;
            world.try_run_experiment(steps, sample_every)
        })
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    serde_json::to_string(&summary).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_experiment_json, m)?)?;
    Ok(())
}
