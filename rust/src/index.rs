//! Task/dependency index.
//!
//! Turns flat, possibly unordered task rows into work records with resolved
//! predecessor and successor lists. Task id strings are mapped to dense
//! integer ids so every later stage can use plain vector indexing.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::log_warn;
use crate::models::PertTask;

/// Dense work id (index into [`TaskIndex::works`]).
pub type WorkId = usize;

/// Derived record for one task.
#[derive(Clone, Debug)]
pub struct Work {
    /// Task id as given in the input row.
    pub id: String,
    /// Position of this work in the index.
    pub index: WorkId,
    /// Row of the input data this work was built from.
    pub row: usize,
    pub successors: Vec<WorkId>,
    pub predecessors: Vec<WorkId>,
    /// Zero slack, filled in once the schedule is known.
    pub is_critical: bool,
    /// Sorted ids of the predecessors.
    pub dep_left: Vec<String>,
    /// Sorted ids of the successors.
    pub dep_right: Vec<String>,
}

impl Work {
    fn new(id: &str, index: WorkId, row: usize) -> Self {
        Self {
            id: id.to_string(),
            index,
            row,
            successors: Vec::new(),
            predecessors: Vec::new(),
            is_critical: false,
            dep_left: Vec::new(),
            dep_right: Vec::new(),
        }
    }
}

/// Non-fatal input diagnostics collected while building a layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PertWarning {
    /// A dependency names a task that does not exist; the link is skipped.
    MissingDependency { task: String, dependency: String },
    /// A task depends on itself; the link is skipped.
    SelfDependency { task: String },
    /// Two rows share an id; the later row is ignored.
    DuplicateTaskId { task: String },
    /// No start or no finish activities were found.
    EmptySchedule,
    /// A milestone is not reachable from the start milestone.
    UnreachableMilestone { milestone: usize },
}

impl fmt::Display for PertWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDependency { task, dependency } => write!(
                f,
                "Task {:?} depends on unknown task {:?}; dependency ignored",
                task, dependency
            ),
            Self::SelfDependency { task } => {
                write!(f, "Task {:?} depends on itself; dependency ignored", task)
            }
            Self::DuplicateTaskId { task } => {
                write!(f, "Duplicate task id {:?}; later row ignored", task)
            }
            Self::EmptySchedule => write!(f, "No start or finish activities; schedule is empty"),
            Self::UnreachableMilestone { milestone } => {
                write!(f, "Milestone {} is unreachable from the start", milestone)
            }
        }
    }
}

/// Work records plus the start/finish activity sets.
#[derive(Clone, Debug, Default)]
pub struct TaskIndex {
    pub works: Vec<Work>,
    ids: FxHashMap<String, WorkId>,
    /// Tasks without any resolved predecessor.
    pub start_activities: Vec<WorkId>,
    /// Tasks nobody depends on.
    pub finish_activities: Vec<WorkId>,
    pub warnings: Vec<PertWarning>,
}

impl TaskIndex {
    /// Build the index from input rows in a single pass.
    ///
    /// A dependency on a task that has not been seen yet is resolved by looking
    /// the id up in the full data set and creating its work on the fly.
    pub fn build(rows: &[PertTask], verbosity: u8) -> Self {
        // First row wins for duplicated ids
        let mut rows_by_id: FxHashMap<&str, usize> =
            FxHashMap::with_capacity_and_hasher(rows.len(), Default::default());
        let mut duplicate = vec![false; rows.len()];
        for (row, task) in rows.iter().enumerate() {
            if rows_by_id.contains_key(task.id.as_str()) {
                duplicate[row] = true;
            } else {
                rows_by_id.insert(task.id.as_str(), row);
            }
        }

        let mut index = TaskIndex {
            works: Vec::with_capacity(rows_by_id.len()),
            ids: FxHashMap::with_capacity_and_hasher(rows_by_id.len(), Default::default()),
            ..Default::default()
        };

        for (row, task) in rows.iter().enumerate() {
            if duplicate[row] {
                log_warn!(verbosity, "duplicate task id {:?} at row {}", task.id, row);
                index.warnings.push(PertWarning::DuplicateTaskId {
                    task: task.id.clone(),
                });
                continue;
            }

            let work = index.ensure_work(&task.id, row);

            let Some(depends_on) = &task.depends_on else {
                continue;
            };
            for dep_id in depends_on {
                if dep_id == &task.id {
                    log_warn!(verbosity, "task {:?} depends on itself", task.id);
                    index.warnings.push(PertWarning::SelfDependency {
                        task: task.id.clone(),
                    });
                    continue;
                }
                let pred = match index.get(dep_id) {
                    Some(pred) => pred,
                    None => match rows_by_id.get(dep_id.as_str()) {
                        Some(&dep_row) => index.ensure_work(dep_id, dep_row),
                        None => {
                            log_warn!(
                                verbosity,
                                "task {:?} depends on unknown task {:?}",
                                task.id,
                                dep_id
                            );
                            index.warnings.push(PertWarning::MissingDependency {
                                task: task.id.clone(),
                                dependency: dep_id.clone(),
                            });
                            continue;
                        }
                    },
                };
                index.link(pred, work);
            }
        }

        index.finish_activity_sets();
        index
    }

    fn ensure_work(&mut self, id: &str, row: usize) -> WorkId {
        if let Some(&work) = self.ids.get(id) {
            return work;
        }
        let work = self.works.len();
        self.works.push(Work::new(id, work, row));
        self.ids.insert(id.to_string(), work);
        work
    }

    /// Link `pred -> succ` both ways, ignoring duplicates and self-loops.
    fn link(&mut self, pred: WorkId, succ: WorkId) {
        if pred == succ || self.works[pred].successors.contains(&succ) {
            return;
        }
        self.works[pred].successors.push(succ);
        self.works[succ].predecessors.push(pred);
    }

    fn finish_activity_sets(&mut self) {
        for i in 0..self.works.len() {
            let mut left: Vec<String> = self.works[i]
                .predecessors
                .iter()
                .map(|&p| self.works[p].id.clone())
                .collect();
            left.sort();
            let mut right: Vec<String> = self.works[i]
                .successors
                .iter()
                .map(|&s| self.works[s].id.clone())
                .collect();
            right.sort();
            self.works[i].dep_left = left;
            self.works[i].dep_right = right;
        }

        self.start_activities = self
            .works
            .iter()
            .filter(|w| w.predecessors.is_empty())
            .map(|w| w.index)
            .collect();
        self.finish_activities = self
            .works
            .iter()
            .filter(|w| w.successors.is_empty())
            .map(|w| w.index)
            .collect();
    }

    /// Work id for a task id string.
    #[inline]
    pub fn get(&self, id: &str) -> Option<WorkId> {
        self.ids.get(id).copied()
    }

    pub fn work(&self, id: WorkId) -> &Work {
        &self.works[id]
    }

    pub fn len(&self) -> usize {
        self.works.len()
    }

    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}
