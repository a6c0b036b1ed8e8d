//! Rust implementation of the transfer-aware project scheduler.
//!
//! This module provides the data types, the time-stepped scheduling engine and
//! the Python bindings for resource-constrained scheduling with resource
//! transfers between job locations.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;

mod config;
pub mod critical_path;
pub mod logging;
mod models;
pub mod multi_project;
pub mod patterson;
pub mod scheduler;
pub mod selection;

pub use config::{SchedulerConfig, SelectionRule, TransferRule};
pub use critical_path::{critical_path_lengths, topological_order, CriticalPathError};
pub use models::{Instance, InstanceError, Solution, Time, TransferRecord, Units};
pub use multi_project::{availability_bounds, merge_projects, merge_projects_seeded, AvailabilityBounds};
pub use patterson::{parse_patterson, read_patterson};
pub use scheduler::{ScheduleOutcome, SchedulerError, SchedulerStatus, TransferScheduler};

fn instance_error_to_py(err: InstanceError) -> PyErr {
    match err {
        InstanceError::Io(message) => pyo3::exceptions::PyOSError::new_err(message),
        other => pyo3::exceptions::PyValueError::new_err(other.to_string()),
    }
}

/// Run the transfer scheduler on an instance.
///
/// # Arguments
/// * `instance` - Project instance to schedule
/// * `config` - Selection rule, transfer policy, verbosity and horizon (defaults if omitted)
///
/// # Returns
/// * Solution; its schedule fields are None when the horizon is reached first
///
/// # Raises
/// * ValueError if a rule name is unknown, the instance is malformed or has a cycle
#[pyfunction]
#[pyo3(signature = (instance, config=None))]
fn run_schedule(instance: &Instance, config: Option<SchedulerConfig>) -> PyResult<Solution> {
    match scheduler::schedule(instance, config.unwrap_or_default()) {
        Ok(outcome) => Ok(outcome.into_solution()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Longest duration-weighted path from every job to the end of the project.
///
/// # Raises
/// * ValueError if the precedence graph has a cycle
#[pyfunction]
#[pyo3(name = "critical_path_lengths")]
fn py_critical_path_lengths(instance: &Instance) -> PyResult<Vec<Time>> {
    instance
        .validate()
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
    critical_path_lengths(instance)
        .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))
}

/// Parse an instance in Patterson format from a string.
#[pyfunction]
#[pyo3(name = "parse_patterson")]
fn py_parse_patterson(text: &str) -> PyResult<Instance> {
    parse_patterson(text).map_err(instance_error_to_py)
}

/// Read an instance in Patterson format from a file.
///
/// # Raises
/// * OSError if the file cannot be read
/// * ValueError if the contents are malformed
#[pyfunction]
#[pyo3(name = "read_patterson")]
fn py_read_patterson(path: std::path::PathBuf) -> PyResult<Instance> {
    read_patterson(path).map_err(instance_error_to_py)
}

/// Merge single-project instances into one multi-project instance.
///
/// # Arguments
/// * `projects` - Instances to merge, each with its own start and sink job
/// * `availability` - Shared availability; drawn from the merge bounds if omitted
/// * `seed` - Seed for the availability draw
///
/// # Raises
/// * ValueError if a project is malformed or `availability` has the wrong length
#[pyfunction]
#[pyo3(name = "merge_projects", signature = (projects, availability=None, seed=0))]
fn py_merge_projects(
    projects: Vec<Instance>,
    availability: Option<Vec<Units>>,
    seed: u64,
) -> PyResult<Instance> {
    let merged = match availability {
        Some(availability) => merge_projects(&projects, availability),
        None => merge_projects_seeded(&projects, seed),
    };
    merged.map_err(instance_error_to_py)
}

/// The rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<Instance>()?;
    m.add_class::<TransferRecord>()?;
    m.add_class::<Solution>()?;

    // Config types
    m.add_class::<SchedulerConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(run_schedule, m)?)?;
    m.add_function(wrap_pyfunction!(py_critical_path_lengths, m)?)?;

    // Readers
    m.add_function(wrap_pyfunction!(py_parse_patterson, m)?)?;
    m.add_function(wrap_pyfunction!(py_read_patterson, m)?)?;
    m.add_function(wrap_pyfunction!(py_merge_projects, m)?)?;

    Ok(())
}

