//! PERT chart scheduling and layout.
//!
//! Computes critical path timings for a set of tasks, turns the tasks into a
//! milestone graph and lays that graph out on a planar level grid ready for
//! drawing.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use pyo3::prelude::*;
use pyo3::types::PyDict;

pub mod chart;
mod config;
pub mod coords;
pub mod cpm;
pub mod index;
pub mod layout;
pub mod logging;
pub mod milestones;
mod models;

pub use chart::{calculate, PertChart, PertError, PertLayout};
pub use config::PertConfig;
pub use coords::{apply_pixel_shift, assign_coordinates};
pub use cpm::{calculate_schedule, round3, ActivityData, ActivityDates, Schedule};
pub use index::{PertWarning, TaskIndex, Work, WorkId};
pub use layout::{Edge, EdgeId, ElementRef, Face, LayoutError, PlanarLayout};
pub use milestones::{Milestone, MilestoneGraph, MilestoneId};
pub use models::{
    ActivityInfo, EdgeInfo, ExpectedTimeCalculator, MilestoneInfo, PertFormula, PertResult,
    PertTask, TaskContext,
};

/// Expected-time calculator backed by a Python callable.
///
/// The callable receives a dict with the task's `id`, `name`, estimates and
/// custom fields, and must return a number.
struct PyExpectedTime<'py> {
    callable: Bound<'py, PyAny>,
}

impl ExpectedTimeCalculator for PyExpectedTime<'_> {
    fn expected_time(&self, ctx: &TaskContext<'_>) -> Result<f64, String> {
        let fields = PyDict::new_bound(self.callable.py());
        let fill = || -> PyResult<()> {
            fields.set_item("id", ctx.id())?;
            fields.set_item("name", ctx.name())?;
            for (name, value) in ctx.task().estimates() {
                fields.set_item(name, value)?;
            }
            for (name, value) in &ctx.task().fields {
                fields.set_item(name, value)?;
            }
            Ok(())
        };
        fill()
            .and_then(|_| self.callable.call1((fields.clone(),)))
            .and_then(|result| result.extract::<f64>())
            .map_err(|e| e.to_string())
    }
}

/// Calculate the schedule and the chart layout of a set of tasks.
///
/// # Arguments
/// * `tasks` - Tasks with their dependencies and estimates
/// * `config` - Layout configuration (defaults when omitted)
/// * `expected_time` - Optional callable computing a task's duration from a
///   dict of its fields; the three-point PERT formula is used when omitted
///
/// # Returns
/// * PertResult with per-task timings, milestone positions and edges
///
/// # Raises
/// * ValueError on circular dependencies, invalid estimates or configuration,
///   a failing `expected_time`, or a graph that cannot be drawn in the plane
#[pyfunction]
#[pyo3(signature = (tasks, config=None, expected_time=None))]
fn calculate_pert(
    tasks: Vec<PertTask>,
    config: Option<PertConfig>,
    expected_time: Option<Bound<'_, PyAny>>,
) -> PyResult<PertResult> {
    let config = config.unwrap_or_default();
    let result = match expected_time {
        Some(callable) => calculate(&tasks, &config, &PyExpectedTime { callable }),
        None => calculate(&tasks, &config, &PertFormula),
    };

    match result {
        Ok(layout) => Ok(PertResult::from(&layout)),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// The pert_layout.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Input and config types
    m.add_class::<PertTask>()?;
    m.add_class::<PertConfig>()?;

    // Result types
    m.add_class::<ActivityInfo>()?;
    m.add_class::<MilestoneInfo>()?;
    m.add_class::<EdgeInfo>()?;
    m.add_class::<PertResult>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(calculate_pert, m)?)?;

    Ok(())
}
