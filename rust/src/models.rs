//! Core data types for the PERT layout pipeline.

use chrono::NaiveDate;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::chart::PertLayout;
use crate::layout::ElementRef;

// Note: We use std HashMap here for PyO3 interface compatibility

/// One input row: a task with its estimates and dependencies.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PertTask {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: Option<String>,
    #[pyo3(get, set)]
    pub depends_on: Option<Vec<String>>,
    #[pyo3(get, set)]
    pub optimistic: Option<f64>,
    #[pyo3(get, set)]
    pub pessimistic: Option<f64>,
    #[pyo3(get, set)]
    pub most_likely: Option<f64>,
    #[pyo3(get, set)]
    pub duration: Option<f64>,
    /// Arbitrary display fields, passed through to the expected time calculator.
    #[pyo3(get, set)]
    pub fields: HashMap<String, String>,
}

impl PertTask {
    /// Task with a fixed duration and the given dependencies.
    pub fn with_duration(id: &str, duration: f64, depends_on: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            depends_on: if depends_on.is_empty() {
                None
            } else {
                Some(depends_on.iter().map(|d| d.to_string()).collect())
            },
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Numeric estimates as (field name, value) pairs, for validation.
    pub(crate) fn estimates(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("optimistic", self.optimistic),
            ("pessimistic", self.pessimistic),
            ("most_likely", self.most_likely),
            ("duration", self.duration),
        ]
    }
}

#[pymethods]
impl PertTask {
    #[new]
    #[pyo3(signature = (
        id,
        depends_on=None,
        optimistic=None,
        pessimistic=None,
        most_likely=None,
        duration=None,
        name=None,
        fields=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        depends_on: Option<Vec<String>>,
        optimistic: Option<f64>,
        pessimistic: Option<f64>,
        most_likely: Option<f64>,
        duration: Option<f64>,
        name: Option<String>,
        fields: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            id,
            name,
            depends_on,
            optimistic,
            pessimistic,
            most_likely,
            duration,
            fields: fields.unwrap_or_default(),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "PertTask(id={:?}, deps={}, optimistic={:?}, pessimistic={:?})",
            self.id,
            self.depends_on.as_ref().map_or(0, |d| d.len()),
            self.optimistic,
            self.pessimistic
        )
    }
}

/// Read-only view of a task handed to an [`ExpectedTimeCalculator`].
#[derive(Clone, Copy, Debug)]
pub struct TaskContext<'a> {
    task: &'a PertTask,
}

impl<'a> TaskContext<'a> {
    pub fn new(task: &'a PertTask) -> Self {
        Self { task }
    }

    pub fn id(&self) -> &'a str {
        &self.task.id
    }

    pub fn name(&self) -> Option<&'a str> {
        self.task.name.as_deref()
    }

    pub fn optimistic(&self) -> Option<f64> {
        self.task.optimistic
    }

    pub fn pessimistic(&self) -> Option<f64> {
        self.task.pessimistic
    }

    pub fn most_likely(&self) -> Option<f64> {
        self.task.most_likely
    }

    pub fn duration(&self) -> Option<f64> {
        self.task.duration
    }

    /// Custom display field by name.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.task.fields.get(name).map(|s| s.as_str())
    }

    pub fn task(&self) -> &'a PertTask {
        self.task
    }
}

/// Computes the expected duration of a task from its estimates.
pub trait ExpectedTimeCalculator {
    fn expected_time(&self, ctx: &TaskContext<'_>) -> Result<f64, String>;
}

impl<F> ExpectedTimeCalculator for F
where
    F: Fn(&TaskContext<'_>) -> f64,
{
    fn expected_time(&self, ctx: &TaskContext<'_>) -> Result<f64, String> {
        Ok(self(ctx))
    }
}

/// Default three-point estimate: `(o + 4m + p) / 6`.
///
/// An explicit `duration` wins. A missing most likely estimate falls back to the
/// mean of the other two; a missing optimistic or pessimistic estimate falls back
/// to the other one, then to the most likely one. No estimates at all give 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct PertFormula;

impl ExpectedTimeCalculator for PertFormula {
    fn expected_time(&self, ctx: &TaskContext<'_>) -> Result<f64, String> {
        if let Some(duration) = ctx.duration() {
            return Ok(duration);
        }
        let m = ctx.most_likely();
        let o = ctx.optimistic().or(ctx.pessimistic()).or(m);
        let p = ctx.pessimistic().or(ctx.optimistic()).or(m);
        Ok(match (o, m, p) {
            (Some(o), Some(m), Some(p)) => (o + 4.0 * m + p) / 6.0,
            (Some(o), None, Some(p)) => (o + p) / 2.0,
            _ => 0.0,
        })
    }
}

/// Scheduling data of one task as exposed to Python.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ActivityInfo {
    #[pyo3(get)]
    pub id: String,
    #[pyo3(get)]
    pub earliest_start: f64,
    #[pyo3(get)]
    pub earliest_finish: f64,
    #[pyo3(get)]
    pub latest_start: f64,
    #[pyo3(get)]
    pub latest_finish: f64,
    #[pyo3(get)]
    pub duration: f64,
    #[pyo3(get)]
    pub slack: f64,
    #[pyo3(get)]
    pub variance: f64,
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub earliest_start_date: Option<NaiveDate>,
    #[pyo3(get)]
    pub latest_finish_date: Option<NaiveDate>,
}

#[pymethods]
impl ActivityInfo {
    fn __repr__(&self) -> String {
        format!(
            "ActivityInfo(id={:?}, es={}, ef={}, slack={})",
            self.id, self.earliest_start, self.earliest_finish, self.slack
        )
    }
}

/// Placed milestone as exposed to Python.
#[pyclass]
#[derive(Clone, Debug)]
pub struct MilestoneInfo {
    #[pyo3(get)]
    pub id: usize,
    #[pyo3(get)]
    pub label: String,
    #[pyo3(get)]
    pub level: usize,
    #[pyo3(get)]
    pub index: Option<usize>,
    #[pyo3(get)]
    pub left: f64,
    #[pyo3(get)]
    pub top: f64,
    #[pyo3(get)]
    pub radius: f64,
    #[pyo3(get)]
    pub is_critical: bool,
    #[pyo3(get)]
    pub is_fake: bool,
}

#[pymethods]
impl MilestoneInfo {
    fn __repr__(&self) -> String {
        format!(
            "MilestoneInfo(label={:?}, level={}, left={}, top={})",
            self.label, self.level, self.left, self.top
        )
    }
}

/// Drawable edge as exposed to Python.
#[pyclass]
#[derive(Clone, Debug)]
pub struct EdgeInfo {
    #[pyo3(get)]
    pub from_milestone: usize,
    #[pyo3(get)]
    pub to_milestone: usize,
    #[pyo3(get)]
    pub is_critical: bool,
    /// Task drawn by this edge, None for dummy edges.
    #[pyo3(get)]
    pub task_id: Option<String>,
    #[pyo3(get)]
    pub is_fake: bool,
}

#[pymethods]
impl EdgeInfo {
    fn __repr__(&self) -> String {
        format!(
            "EdgeInfo({} -> {}, task={:?}, critical={})",
            self.from_milestone, self.to_milestone, self.task_id, self.is_critical
        )
    }
}

/// Complete result of one layout calculation.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct PertResult {
    #[pyo3(get)]
    pub activities: HashMap<String, ActivityInfo>,
    #[pyo3(get)]
    pub milestones: Vec<MilestoneInfo>,
    #[pyo3(get)]
    pub edges: Vec<EdgeInfo>,
    #[pyo3(get)]
    pub project_duration: f64,
    #[pyo3(get)]
    pub critical_path_std_dev: f64,
    #[pyo3(get)]
    pub warnings: Vec<String>,
}

#[pymethods]
impl PertResult {
    fn __repr__(&self) -> String {
        format!(
            "PertResult(activities={}, milestones={}, edges={}, duration={})",
            self.activities.len(),
            self.milestones.len(),
            self.edges.len(),
            self.project_duration
        )
    }
}

impl From<&PertLayout> for PertResult {
    fn from(layout: &PertLayout) -> Self {
        let activities = layout
            .works()
            .iter()
            .map(|work| {
                let data = layout.schedule().activity(work.index);
                let dates = layout.activity_dates(&work.id);
                let info = ActivityInfo {
                    id: work.id.clone(),
                    earliest_start: data.earliest_start,
                    earliest_finish: data.earliest_finish,
                    latest_start: data.latest_start,
                    latest_finish: data.latest_finish,
                    duration: data.duration,
                    slack: data.slack,
                    variance: data.variance,
                    is_critical: work.is_critical,
                    earliest_start_date: dates.map(|d| d.earliest_start),
                    latest_finish_date: dates.map(|d| d.latest_finish),
                };
                (work.id.clone(), info)
            })
            .collect();

        let milestones = layout
            .milestones()
            .iter()
            .enumerate()
            .map(|(id, m)| MilestoneInfo {
                id,
                label: m.label.clone(),
                level: m.level,
                index: m.index,
                left: m.left,
                top: m.top,
                radius: m.radius,
                is_critical: m.is_critical,
                is_fake: m.is_fake,
            })
            .collect();

        let edges = layout
            .edges()
            .map(|edge| EdgeInfo {
                from_milestone: edge.from,
                to_milestone: edge.to,
                is_critical: edge.is_critical,
                task_id: match edge.element_ref() {
                    ElementRef::Work(w) => Some(layout.works()[w].id.clone()),
                    _ => None,
                },
                is_fake: edge.is_fake,
            })
            .collect();

        Self {
            activities,
            milestones,
            edges,
            project_duration: layout.project_duration(),
            critical_path_std_dev: layout.critical_path_std_dev(),
            warnings: layout.warnings().iter().map(|w| w.to_string()).collect(),
        }
    }
}
