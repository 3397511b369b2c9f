//! Chart session: one complete layout calculation and the cache around it.
//!
//! [`calculate`] builds a fresh session (index, schedule, milestones, layout and
//! coordinates) and hands it back as a single [`PertLayout`]. [`PertChart`]
//! keeps the inputs and the last layout, redoing only the work its dirty bits
//! call for.

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::PertConfig;
use crate::coords::assign_coordinates;
use crate::cpm::{calculate_schedule, ActivityData, ActivityDates, Schedule};
use crate::index::{PertWarning, TaskIndex, Work};
use crate::layout::{Edge, Face, LayoutError, PlanarLayout};
use crate::log_warn;
use crate::milestones::{Milestone, MilestoneGraph, MilestoneId};
use crate::models::{ExpectedTimeCalculator, PertFormula, PertTask};

/// Errors that can occur while calculating a PERT chart.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PertError {
    #[error("Circular dependency detected between tasks: {0:?}")]
    CircularDependency(Vec<String>),
    #[error("Task {task:?} has invalid {field} estimate: {value}")]
    InvalidEstimate {
        task: String,
        field: &'static str,
        value: f64,
    },
    #[error("Expected time of task {task:?} must be a non-negative number, got {value}")]
    InvalidDuration { task: String, value: f64 },
    #[error("Expected time calculation failed for task {task:?}: {message}")]
    ExpectedTime { task: String, message: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Everything computed for one set of tasks.
#[derive(Clone, Debug)]
pub struct PertLayout {
    index: TaskIndex,
    schedule: Schedule,
    layout: PlanarLayout,
    warnings: Vec<PertWarning>,
    project_start: Option<NaiveDate>,
}

impl PertLayout {
    pub fn works(&self) -> &[Work] {
        &self.index.works
    }

    pub fn work(&self, id: &str) -> Option<&Work> {
        self.index.get(id).map(|w| self.index.work(w))
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn activity(&self, id: &str) -> Option<&ActivityData> {
        self.index.get(id).map(|w| self.schedule.activity(w))
    }

    /// Calendar dates of a task, when a project start is configured.
    pub fn activity_dates(&self, id: &str) -> Option<ActivityDates> {
        let start = self.project_start?;
        self.activity(id).map(|activity| activity.dates(start))
    }

    /// Start and finish milestone of a task.
    pub fn work_milestones(&self, id: &str) -> Option<(MilestoneId, MilestoneId)> {
        let work = self.index.get(id)?;
        Some((
            self.layout.graph.work_start(work),
            self.layout.graph.work_finish(work),
        ))
    }

    pub fn milestones(&self) -> &[Milestone] {
        self.layout.milestones()
    }

    /// Drawable edges; long edges appear as their chains of fake edges.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.layout.live_edges()
    }

    pub fn faces(&self) -> &[Face] {
        &self.layout.faces
    }

    pub fn columns(&self) -> &[Vec<MilestoneId>] {
        &self.layout.columns
    }

    pub fn start_milestone(&self) -> MilestoneId {
        self.layout.start()
    }

    pub fn finish_milestone(&self) -> MilestoneId {
        self.layout.finish()
    }

    pub fn max_level(&self) -> usize {
        self.layout.max_level
    }

    pub fn project_duration(&self) -> f64 {
        self.schedule.project_duration
    }

    pub fn critical_path_std_dev(&self) -> f64 {
        self.schedule.critical_path_std_dev
    }

    pub fn path_count(&self) -> u64 {
        self.layout.path_count
    }

    pub fn warnings(&self) -> &[PertWarning] {
        &self.warnings
    }

    /// Re-run the coordinate assigner with new appearance settings.
    fn relayout(&mut self, config: &PertConfig) -> Result<(), PertError> {
        config.validate()?;
        assign_coordinates(&mut self.layout, config)?;
        self.project_start = config.project_start;
        Ok(())
    }
}

/// Calculate schedule and layout for `tasks` from scratch.
///
/// # Errors
/// * `PertError::InvalidConfig` if `config` does not validate
/// * `PertError::CircularDependency` if the dependencies contain a cycle
/// * `PertError::InvalidEstimate` / `InvalidDuration` / `ExpectedTime` for bad timings
/// * `PertError::Layout` if the milestone graph cannot be drawn in the plane
pub fn calculate(
    tasks: &[PertTask],
    config: &PertConfig,
    calculator: &dyn ExpectedTimeCalculator,
) -> Result<PertLayout, PertError> {
    config.validate()?;
    let verbosity = config.verbosity;

    let mut index = TaskIndex::build(tasks, verbosity);
    let schedule = calculate_schedule(&index, tasks, calculator, verbosity)?;
    for work in &mut index.works {
        work.is_critical = schedule.is_critical(work.index);
    }

    let mut warnings = std::mem::take(&mut index.warnings);
    if schedule.is_degenerate {
        log_warn!(verbosity, "empty schedule, only start and finish are drawn");
        warnings.push(PertWarning::EmptySchedule);
    }

    let graph = MilestoneGraph::synthesize(&index, &schedule, verbosity);
    let mut layout = PlanarLayout::build(graph, &schedule, verbosity)?;
    warnings.append(&mut layout.warnings);
    assign_coordinates(&mut layout, config)?;

    Ok(PertLayout {
        index,
        schedule,
        layout,
        warnings,
        project_start: config.project_start,
    })
}

const CLEAN: u8 = 0;
/// Tasks or calculator changed: everything is recalculated.
const DATA: u8 = 1 << 0;
/// Only coordinate settings changed: the cached grid is re-mapped to pixels.
const APPEARANCE: u8 = 1 << 1;

/// Inputs of one chart plus its last calculated layout.
///
/// `calculate` takes `&mut self`, so a recalculation can never start while
/// another one on the same chart is in flight.
pub struct PertChart {
    tasks: Vec<PertTask>,
    config: PertConfig,
    calculator: Box<dyn ExpectedTimeCalculator>,
    layout: Option<PertLayout>,
    dirty: u8,
}

impl PertChart {
    pub fn new(tasks: Vec<PertTask>, config: PertConfig) -> Self {
        Self {
            tasks,
            config,
            calculator: Box::new(PertFormula),
            layout: None,
            dirty: DATA,
        }
    }

    pub fn with_calculator(mut self, calculator: impl ExpectedTimeCalculator + 'static) -> Self {
        self.set_calculator(calculator);
        self
    }

    pub fn tasks(&self) -> &[PertTask] {
        &self.tasks
    }

    pub fn config(&self) -> &PertConfig {
        &self.config
    }

    pub fn set_tasks(&mut self, tasks: Vec<PertTask>) {
        self.tasks = tasks;
        self.dirty |= DATA;
    }

    pub fn set_calculator(&mut self, calculator: impl ExpectedTimeCalculator + 'static) {
        self.calculator = Box::new(calculator);
        self.dirty |= DATA;
    }

    /// Spacing, sizes, origin and project start only affect the drawing.
    pub fn set_config(&mut self, config: PertConfig) {
        if config != self.config {
            self.config = config;
            self.dirty |= APPEARANCE;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != CLEAN
    }

    /// Last layout, if it is still up to date.
    pub fn layout(&self) -> Option<&PertLayout> {
        if self.is_dirty() {
            None
        } else {
            self.layout.as_ref()
        }
    }

    /// Bring the layout up to date and return it.
    pub fn calculate(&mut self) -> Result<&PertLayout, PertError> {
        let layout = match self.layout.take() {
            Some(mut layout) if self.dirty & DATA == CLEAN => {
                if self.dirty & APPEARANCE != CLEAN {
                    layout.relayout(&self.config)?;
                }
                layout
            }
            _ => calculate(&self.tasks, &self.config, self.calculator.as_ref())?,
        };
        self.dirty = CLEAN;
        Ok(self.layout.insert(layout))
    }
}
