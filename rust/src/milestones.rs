//! Milestone synthesis.
//!
//! Every task becomes an edge between a start milestone and a finish milestone;
//! dependencies become dummy edges from the predecessor's finish milestone to the
//! successor's start milestone. Chains of milestones joined by a single dummy
//! edge are then contracted so only the join/fork points a PERT chart needs are
//! left.
//!
//! Milestones live in an arena and are identified by their index in it.

use crate::cpm::Schedule;
use crate::index::{TaskIndex, WorkId};
use crate::layout::{EdgeId, ElementRef};
use crate::{log_debug, log_stage};

/// Dense milestone id (index into [`MilestoneGraph::milestones`]).
pub type MilestoneId = usize;

/// Synthesized graph node: the start or finish event of one or more tasks.
#[derive(Clone, Debug, Default)]
pub struct Milestone {
    pub label: String,
    /// Tasks leaving this milestone.
    pub successors: Vec<WorkId>,
    /// Tasks ending in this milestone.
    pub predecessors: Vec<WorkId>,
    /// Dummy (structural) edges leaving this milestone.
    pub m_successors: Vec<MilestoneId>,
    /// Dummy (structural) edges entering this milestone.
    pub m_predecessors: Vec<MilestoneId>,
    /// Longest path distance from the start milestone.
    pub level: usize,
    pub is_critical: bool,
    /// Created as the start event of its creator.
    pub is_start: bool,
    /// Work that created this milestone, None for the global start/finish.
    pub creator: Option<WorkId>,
    /// Subdivision point of a long edge.
    pub is_fake: bool,
    /// Long edge a fake milestone subdivides.
    pub real_edge: Option<EdgeId>,
    /// Incident edges (both directions).
    pub edges: Vec<EdgeId>,
    /// Neighbor directly above in the same level column.
    pub upper_milestone: Option<MilestoneId>,
    /// Neighbor directly below in the same level column.
    pub lower_milestone: Option<MilestoneId>,
    pub left: f64,
    pub top: f64,
    pub radius: f64,
    /// Drawing order of non-fake milestones.
    pub index: Option<usize>,
    pub(crate) plotted: bool,
    pub(crate) removed: bool,
}

impl Milestone {
    fn new(label: &str, creator: Option<WorkId>, is_start: bool) -> Self {
        Self {
            label: label.to_string(),
            creator,
            is_start,
            ..Self::default()
        }
    }

    pub(crate) fn fake(level: usize, real_edge: EdgeId, is_critical: bool) -> Self {
        Self {
            level,
            real_edge: Some(real_edge),
            is_fake: true,
            is_critical,
            ..Self::default()
        }
    }
}

/// Milestones of one calculation plus the work -> milestone mapping.
#[derive(Clone, Debug)]
pub struct MilestoneGraph {
    pub milestones: Vec<Milestone>,
    /// Global start milestone (no predecessors).
    pub start: MilestoneId,
    /// Global finish milestone (no successors).
    pub finish: MilestoneId,
    work_start: Vec<MilestoneId>,
    work_finish: Vec<MilestoneId>,
}

impl MilestoneGraph {
    /// Create, wire and contract the milestones for every work of `index`.
    pub fn synthesize(index: &TaskIndex, schedule: &Schedule, verbosity: u8) -> Self {
        let mut graph = Self::create_all_milestones(index);
        let created = graph.milestones.len();
        let blocked = graph.clear_excessive_milestones(verbosity);
        graph.compact();
        graph.mark_critical(schedule);
        log_stage!(
            verbosity,
            "milestones: {} created, {} after contraction, {} contractions blocked",
            created,
            graph.milestones.len(),
            blocked
        );
        graph
    }

    fn create_all_milestones(index: &TaskIndex) -> Self {
        let mut milestones = vec![
            Milestone::new("Start", None, true),
            Milestone::new("Finish", None, false),
        ];
        let (start, finish) = (0, 1);

        let mut work_start: Vec<Option<MilestoneId>> = vec![None; index.len()];
        let mut work_finish: Vec<Option<MilestoneId>> = vec![None; index.len()];

        fn ensure(
            slot: &mut Option<MilestoneId>,
            milestones: &mut Vec<Milestone>,
            work: WorkId,
            is_start: bool,
        ) -> MilestoneId {
            *slot.get_or_insert_with(|| {
                milestones.push(Milestone::new("", Some(work), is_start));
                milestones.len() - 1
            })
        }

        for work in &index.works {
            let w = work.index;
            let s = ensure(&mut work_start[w], &mut milestones, w, true);
            let f = ensure(&mut work_finish[w], &mut milestones, w, false);
            milestones[s].successors.push(w);
            milestones[f].predecessors.push(w);
            for &succ in &work.successors {
                ensure(&mut work_start[succ], &mut milestones, succ, true);
            }
        }

        let mut graph = Self {
            milestones,
            start,
            finish,
            work_start: work_start.into_iter().flatten().collect(),
            work_finish: work_finish.into_iter().flatten().collect(),
        };

        for work in &index.works {
            let w = work.index;
            for &succ in &work.successors {
                graph.add_milestone_successors(graph.work_finish[w], graph.work_start[succ]);
            }
            if work.successors.is_empty() {
                graph.add_milestone_successors(graph.work_finish[w], finish);
            }
            if work.predecessors.is_empty() {
                graph.add_milestone_successors(start, graph.work_start[w]);
            }
        }

        graph
    }

    /// Add a dummy edge `from -> to`; never links a milestone to itself.
    pub fn add_milestone_successors(&mut self, from: MilestoneId, to: MilestoneId) {
        if from == to || self.milestones[from].m_successors.contains(&to) {
            return;
        }
        self.milestones[from].m_successors.push(to);
        self.milestones[to].m_predecessors.push(from);
    }

    fn unlink_dummy(&mut self, from: MilestoneId, to: MilestoneId) {
        self.milestones[from].m_successors.retain(|&m| m != to);
        self.milestones[to].m_predecessors.retain(|&m| m != from);
    }

    fn remove(&mut self, id: MilestoneId) {
        let milestone = &mut self.milestones[id];
        milestone.removed = true;
        milestone.successors.clear();
        milestone.predecessors.clear();
        milestone.m_successors.clear();
        milestone.m_predecessors.clear();
    }

    /// Any edge, task or dummy, from `from` to `to`.
    fn has_edge(&self, from: MilestoneId, to: MilestoneId) -> bool {
        let milestone = &self.milestones[from];
        milestone.m_successors.contains(&to)
            || milestone
                .successors
                .iter()
                .any(|&w| self.work_finish[w] == to)
    }

    fn is_global(&self, id: MilestoneId) -> bool {
        id == self.start || id == self.finish
    }

    /// `candidate` only exists to start exactly one task after `upstream`.
    fn can_merge_forward(&self, upstream: MilestoneId, candidate: MilestoneId) -> bool {
        let m = &self.milestones[candidate];
        !self.is_global(candidate)
            && !m.removed
            && m.m_predecessors == [upstream]
            && m.predecessors.is_empty()
            && m.m_successors.is_empty()
            && m.successors.len() == 1
    }

    /// `candidate` only exists to finish exactly one task before `downstream`.
    fn can_merge_backward(&self, downstream: MilestoneId, candidate: MilestoneId) -> bool {
        let m = &self.milestones[candidate];
        !self.is_global(candidate)
            && !m.removed
            && m.m_successors == [downstream]
            && m.successors.is_empty()
            && m.m_predecessors.is_empty()
            && m.predecessors.len() == 1
    }

    /// Contract single-dummy chains in two passes; returns how many merges
    /// were refused because they would make two tasks share both endpoints.
    fn clear_excessive_milestones(&mut self, verbosity: u8) -> usize {
        let mut cant_be_shortened = 0;

        // Pass 1: upstream -> dummy -> start(task) becomes upstream -task->
        for m in 0..self.milestones.len() {
            if self.milestones[m].removed {
                continue;
            }
            let candidates = self.milestones[m].m_successors.clone();
            for d in candidates {
                if !self.can_merge_forward(m, d) {
                    continue;
                }
                let work = self.milestones[d].successors[0];
                if self.has_edge(m, self.work_finish[work]) {
                    log_debug!(verbosity, "keep milestone {}: parallel task from {}", d, m);
                    cant_be_shortened += 1;
                    continue;
                }
                self.unlink_dummy(m, d);
                self.milestones[m].successors.push(work);
                self.work_start[work] = m;
                self.remove(d);
            }
        }

        // Pass 2: finish(task) -> dummy -> downstream becomes -task-> downstream
        for m in 0..self.milestones.len() {
            if self.milestones[m].removed {
                continue;
            }
            let candidates = self.milestones[m].m_predecessors.clone();
            for d in candidates {
                if !self.can_merge_backward(m, d) {
                    continue;
                }
                let work = self.milestones[d].predecessors[0];
                if self.has_edge(self.work_start[work], m) {
                    log_debug!(verbosity, "keep milestone {}: parallel task into {}", d, m);
                    cant_be_shortened += 1;
                    continue;
                }
                self.unlink_dummy(d, m);
                self.milestones[m].predecessors.push(work);
                self.work_finish[work] = m;
                self.remove(d);
            }
        }

        cant_be_shortened
    }

    /// Drop removed milestones and renumber the survivors densely.
    fn compact(&mut self) {
        let mut remap: Vec<Option<MilestoneId>> = vec![None; self.milestones.len()];
        let mut next = 0;
        for (old, milestone) in self.milestones.iter().enumerate() {
            if !milestone.removed {
                remap[old] = Some(next);
                next += 1;
            }
        }
        let map = |id: MilestoneId| remap[id].unwrap_or(id);

        let old = std::mem::take(&mut self.milestones);
        self.milestones = old
            .into_iter()
            .filter(|m| !m.removed)
            .map(|mut m| {
                m.m_successors = m.m_successors.iter().map(|&id| map(id)).collect();
                m.m_predecessors = m.m_predecessors.iter().map(|&id| map(id)).collect();
                m
            })
            .collect();
        self.start = map(self.start);
        self.finish = map(self.finish);
        for id in self.work_start.iter_mut().chain(self.work_finish.iter_mut()) {
            *id = map(*id);
        }
    }

    /// Start/finish are critical; others iff an incident task is critical.
    fn mark_critical(&mut self, schedule: &Schedule) {
        for (id, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.is_critical = id == self.start
                || id == self.finish
                || milestone
                    .successors
                    .iter()
                    .chain(milestone.predecessors.iter())
                    .any(|&w| schedule.is_critical(w));
        }
    }

    /// Graph over hand-made milestones without any works.
    #[cfg(test)]
    pub(crate) fn from_milestones(
        milestones: Vec<Milestone>,
        start: MilestoneId,
        finish: MilestoneId,
    ) -> Self {
        Self {
            milestones,
            start,
            finish,
            work_start: Vec::new(),
            work_finish: Vec::new(),
        }
    }

    pub fn work_start(&self, work: WorkId) -> MilestoneId {
        self.work_start[work]
    }

    pub fn work_finish(&self, work: WorkId) -> MilestoneId {
        self.work_finish[work]
    }

    pub fn milestone(&self, id: MilestoneId) -> &Milestone {
        &self.milestones[id]
    }

    pub fn element_ref(&self, id: MilestoneId) -> ElementRef {
        ElementRef::Milestone(id)
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpm::calculate_schedule;
    use crate::models::{PertFormula, PertTask};

    fn make_task(id: &str, duration: f64, deps: &[&str]) -> PertTask {
        PertTask::with_duration(id, duration, deps)
    }

    fn synthesize(rows: &[PertTask]) -> (TaskIndex, MilestoneGraph) {
        let index = TaskIndex::build(rows, 0);
        let schedule = calculate_schedule(&index, rows, &PertFormula, 0).unwrap();
        let graph = MilestoneGraph::synthesize(&index, &schedule, 0);
        (index, graph)
    }

    fn work(index: &TaskIndex, id: &str) -> WorkId {
        index.get(id).unwrap()
    }

    #[test]
    fn test_two_task_chain_shares_milestone() {
        let rows = vec![make_task("a", 1.0, &[]), make_task("b", 1.0, &["a"])];
        let (index, graph) = synthesize(&rows);
        let (a, b) = (work(&index, "a"), work(&index, "b"));

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.work_start(a), graph.start);
        assert_eq!(graph.work_finish(a), graph.work_start(b));
        assert_eq!(graph.work_finish(b), graph.finish);
        assert!(graph.milestones.iter().all(|m| m.m_successors.is_empty()));
        assert_eq!(
            graph.element_ref(graph.start),
            ElementRef::Milestone(graph.start)
        );
    }

    #[test]
    fn test_diamond_keeps_one_dummy() {
        let rows = vec![
            make_task("a", 2.0, &[]),
            make_task("b", 3.0, &["a"]),
            make_task("c", 5.0, &["a"]),
            make_task("d", 1.0, &["b", "c"]),
        ];
        let (index, graph) = synthesize(&rows);
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|id| work(&index, id));

        assert_eq!(graph.len(), 5);
        assert_eq!(graph.work_start(b), graph.work_finish(a));
        assert_eq!(graph.work_start(c), graph.work_finish(a));
        assert_eq!(graph.work_finish(b), graph.work_start(d));
        // c cannot end in d's start too: it would duplicate b's endpoints
        let c_finish = graph.work_finish(c);
        assert_ne!(c_finish, graph.work_start(d));
        assert_eq!(graph.milestone(c_finish).m_successors, vec![graph.work_start(d)]);
    }

    #[test]
    fn test_milestone_count_bound_and_distinct_endpoints() {
        let rows = vec![
            make_task("a", 1.0, &[]),
            make_task("b", 2.0, &[]),
            make_task("c", 1.0, &["a", "b"]),
            make_task("d", 4.0, &["a", "b"]),
            make_task("e", 1.0, &["a"]),
            make_task("f", 2.0, &["c", "d", "e"]),
            make_task("g", 1.0, &[]),
        ];
        let (index, graph) = synthesize(&rows);

        assert!(graph.len() <= 2 * index.len() + 2);
        let mut endpoints: Vec<(MilestoneId, MilestoneId)> = (0..index.len())
            .map(|w| (graph.work_start(w), graph.work_finish(w)))
            .collect();
        endpoints.sort();
        endpoints.dedup();
        assert_eq!(endpoints.len(), index.len());
        for (s, f) in endpoints {
            assert_ne!(s, f);
        }
    }

    #[test]
    fn test_independent_tasks_stay_distinguishable() {
        let rows = vec![make_task("a", 1.0, &[]), make_task("b", 1.0, &[])];
        let (index, graph) = synthesize(&rows);
        let (a, b) = (work(&index, "a"), work(&index, "b"));

        assert_eq!(graph.work_start(a), graph.start);
        assert_eq!(graph.work_start(b), graph.start);
        assert_eq!(graph.work_finish(a), graph.finish);
        // b needs its own finish milestone plus a dummy to the global finish
        assert_ne!(graph.work_finish(b), graph.finish);
        assert_eq!(
            graph.milestone(graph.work_finish(b)).m_successors,
            vec![graph.finish]
        );
    }

    #[test]
    fn test_no_self_links() {
        let rows = vec![make_task("a", 1.0, &[])];
        let (_, mut graph) = synthesize(&rows);
        let start = graph.start;
        graph.add_milestone_successors(start, start);
        assert!(!graph.milestone(start).m_successors.contains(&start));
    }

    #[test]
    fn test_critical_marks() {
        let rows = vec![
            make_task("a", 5.0, &[]),
            make_task("b", 1.0, &[]),
            make_task("c", 1.0, &["a", "b"]),
        ];
        let (index, graph) = synthesize(&rows);
        let b = work(&index, "b");

        assert!(graph.milestone(graph.start).is_critical);
        assert!(graph.milestone(graph.finish).is_critical);
        // b has slack, its own finish milestone is not critical
        let b_finish = graph.work_finish(b);
        assert!(!graph.milestone(b_finish).is_critical);
        assert!(graph.milestones.iter().all(|m| !m.removed));
    }
}
