//! Critical path method scheduling using forward and backward passes.
//!
//! Tasks are ordered with Kahn's algorithm first, so both passes are linear
//! loops and deep dependency chains never grow the call stack.

use chrono::{Days, NaiveDate};
use std::collections::VecDeque;

use crate::chart::PertError;
use crate::index::{TaskIndex, WorkId};
use crate::models::{ExpectedTimeCalculator, PertTask, TaskContext};
use crate::{log_stage, log_warn};

/// Round to 3 decimal digits, the precision every timing value is kept at.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Per-task timing information.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActivityData {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: f64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: f64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: f64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: f64,
    pub duration: f64,
    /// Slack = latest_finish - earliest_finish.
    pub slack: f64,
    /// ((pessimistic - optimistic) / 6)^2
    pub variance: f64,
}

impl ActivityData {
    /// Values are rounded, so zero slack compares exactly.
    pub fn is_critical(&self) -> bool {
        self.slack == 0.0
    }

    /// Project timings onto calendar days, rounding fractional days up.
    pub fn dates(&self, project_start: NaiveDate) -> ActivityDates {
        let day = |offset: f64| {
            project_start
                .checked_add_days(Days::new(offset.max(0.0).ceil() as u64))
                .unwrap_or(NaiveDate::MAX)
        };
        ActivityDates {
            earliest_start: day(self.earliest_start),
            earliest_finish: day(self.earliest_finish),
            latest_start: day(self.latest_start),
            latest_finish: day(self.latest_finish),
        }
    }
}

/// Calendar projection of an [`ActivityData`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityDates {
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
}

/// Result of scheduling every task of an index.
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    /// Timings indexed by work id.
    activities: Vec<ActivityData>,
    /// Works in dependency order (predecessors first).
    pub topo_order: Vec<WorkId>,
    /// Largest earliest finish over the finish activities.
    pub project_duration: f64,
    /// Square root of the summed variance of all critical activities.
    pub critical_path_std_dev: f64,
    /// No start or no finish activities existed.
    pub is_degenerate: bool,
}

impl Schedule {
    /// Memoized timing of one work.
    pub fn activity(&self, work: WorkId) -> &ActivityData {
        &self.activities[work]
    }

    pub fn activities(&self) -> &[ActivityData] {
        &self.activities
    }

    pub fn is_critical(&self, work: WorkId) -> bool {
        self.activities
            .get(work)
            .is_some_and(|activity| activity.is_critical())
    }
}

/// Order works so every task comes after all of its predecessors.
fn topological_sort(index: &TaskIndex) -> Result<Vec<WorkId>, PertError> {
    let mut in_degree: Vec<usize> = index.works.iter().map(|w| w.predecessors.len()).collect();

    let mut queue: VecDeque<WorkId> = (0..index.len()).filter(|&w| in_degree[w] == 0).collect();
    let mut result: Vec<WorkId> = Vec::with_capacity(index.len());

    while let Some(work) = queue.pop_front() {
        result.push(work);
        for &succ in &index.work(work).successors {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                queue.push_back(succ);
            }
        }
    }

    if result.len() != index.len() {
        let mut cyclic: Vec<String> = (0..index.len())
            .filter(|&w| in_degree[w] > 0)
            .map(|w| index.work(w).id.clone())
            .collect();
        cyclic.sort();
        return Err(PertError::CircularDependency(cyclic));
    }

    Ok(result)
}

fn validate_estimates(task: &PertTask) -> Result<(), PertError> {
    for (field, value) in task.estimates() {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(PertError::InvalidEstimate {
                    task: task.id.clone(),
                    field,
                    value,
                });
            }
        }
    }
    Ok(())
}

fn variance(task: &PertTask) -> f64 {
    match (task.optimistic, task.pessimistic) {
        (Some(o), Some(p)) => round3(((p - o) / 6.0).powi(2)),
        _ => 0.0,
    }
}

/// Compute earliest/latest start/finish, slack and variance for every task.
///
/// # Arguments
/// * `index` - Resolved task dependencies
/// * `rows` - Input rows the index was built from
/// * `calculator` - Expected duration of one task
/// * `verbosity` - Logging level
///
/// # Returns
/// * `Err(PertError::CircularDependency)` if the dependencies contain a cycle
/// * `Err(PertError::InvalidEstimate)` / `InvalidDuration` for non-numeric input
pub fn calculate_schedule(
    index: &TaskIndex,
    rows: &[PertTask],
    calculator: &dyn ExpectedTimeCalculator,
    verbosity: u8,
) -> Result<Schedule, PertError> {
    let topo_order = topological_sort(index)?;

    if index.start_activities.is_empty() || index.finish_activities.is_empty() {
        log_warn!(verbosity, "no start or finish activities, nothing to schedule");
        return Ok(Schedule {
            activities: vec![ActivityData::default(); index.len()],
            topo_order,
            is_degenerate: true,
            ..Schedule::default()
        });
    }

    let mut activities = vec![ActivityData::default(); index.len()];

    // Forward pass: durations, earliest start/finish
    for &work in &topo_order {
        let task = &rows[index.work(work).row];
        validate_estimates(task)?;

        let duration = calculator
            .expected_time(&TaskContext::new(task))
            .map_err(|message| PertError::ExpectedTime {
                task: task.id.clone(),
                message,
            })?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(PertError::InvalidDuration {
                task: task.id.clone(),
                value: duration,
            });
        }
        let duration = round3(duration);

        let earliest_start = index
            .work(work)
            .predecessors
            .iter()
            .map(|&pred| activities[pred].earliest_finish)
            .fold(0.0, f64::max);

        let activity = &mut activities[work];
        activity.duration = duration;
        activity.variance = variance(task);
        activity.earliest_start = round3(earliest_start);
        activity.earliest_finish = round3(earliest_start + duration);
    }

    let project_duration = index
        .finish_activities
        .iter()
        .map(|&work| activities[work].earliest_finish)
        .fold(0.0, f64::max);

    // Backward pass: latest start/finish in reverse topological order
    for &work in topo_order.iter().rev() {
        let successors = &index.work(work).successors;
        let latest_finish = if successors.is_empty() {
            project_duration
        } else {
            successors
                .iter()
                .map(|&succ| activities[succ].latest_start)
                .fold(f64::MAX, f64::min)
        };

        let activity = &mut activities[work];
        activity.latest_finish = round3(latest_finish);
        activity.latest_start = round3(latest_finish - activity.duration);
        activity.slack = round3(activity.latest_finish - activity.earliest_finish);
    }

    let critical_variance: f64 = activities
        .iter()
        .filter(|a| a.is_critical())
        .map(|a| a.variance)
        .sum();

    log_stage!(
        verbosity,
        "schedule: {} tasks, duration {}, critical tasks {}",
        activities.len(),
        project_duration,
        activities.iter().filter(|a| a.is_critical()).count()
    );

    Ok(Schedule {
        activities,
        topo_order,
        project_duration,
        critical_path_std_dev: critical_variance.sqrt(),
        is_degenerate: false,
    })
}
