//! Planar layout engine.
//!
//! Runs five stages over the synthesized milestone graph, each one consuming the
//! output of the previous:
//! 1. `prepare_gamma` turns task and dummy links into edges
//! 2. `build_paths` assigns longest-path levels
//! 3. `cut_edges` subdivides edges that skip levels with fake milestones
//! 4. `gamma` embeds the graph in the plane, producing faces
//! 5. `calculate_levels` orders the milestones of each level column

mod columns;
mod gamma;

use std::collections::VecDeque;
use thiserror::Error;

use crate::cpm::Schedule;
use crate::index::{PertWarning, WorkId};
use crate::milestones::{Milestone, MilestoneGraph, MilestoneId};
use crate::{log_stage, log_warn};

pub use gamma::cut_face;

/// Dense edge id (index into [`PlanarLayout::edges`]).
pub type EdgeId = usize;

/// Cyclic sequence of milestones bounding one region of the embedding.
pub type Face = Vec<MilestoneId>;

/// Tag attached to drawable primitives so a renderer can map them back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Milestone(MilestoneId),
    Work(WorkId),
    /// Dependency edge without a task, carrying its criticality.
    DummyEdge(bool),
}

/// Errors that abort a layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("non planar: no face contains all contacts {contacts:?}")]
    NonPlanarGraph { contacts: Vec<MilestoneId> },
    #[error("Milestone {0} has no slot in the layout grid")]
    IncompleteGrid(MilestoneId),
    #[error("Milestone {0} occupies more than one slot in the layout grid")]
    OverlappingGrid(MilestoneId),
}

/// Directed edge between two milestones.
#[derive(Clone, Debug)]
pub struct Edge {
    pub from: MilestoneId,
    pub to: MilestoneId,
    pub is_critical: bool,
    /// Task drawn by this edge, None for dummy edges.
    pub work: Option<WorkId>,
    pub is_fake: bool,
    /// Long edge this fake edge is a piece of.
    pub real_edge: Option<EdgeId>,
    /// False once replaced by a chain of fake edges.
    pub alive: bool,
    pub(crate) flag: bool,
    pub(crate) plotted: bool,
}

impl Edge {
    fn new(from: MilestoneId, to: MilestoneId, work: Option<WorkId>, is_critical: bool) -> Self {
        Self {
            from,
            to,
            is_critical,
            work,
            is_fake: false,
            real_edge: None,
            alive: true,
            flag: false,
            plotted: false,
        }
    }

    fn fake(from: MilestoneId, to: MilestoneId, real: &Edge, real_edge: EdgeId) -> Self {
        Self {
            is_fake: true,
            real_edge: Some(real_edge),
            ..Self::new(from, to, real.work, real.is_critical)
        }
    }

    pub fn element_ref(&self) -> ElementRef {
        match self.work {
            Some(work) => ElementRef::Work(work),
            None => ElementRef::DummyEdge(self.is_critical),
        }
    }
}

/// Milestone graph plus everything the layout stages derive from it.
#[derive(Clone, Debug)]
pub struct PlanarLayout {
    pub graph: MilestoneGraph,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
    /// Milestones of each level, top to bottom.
    pub columns: Vec<Vec<MilestoneId>>,
    pub max_level: usize,
    /// Number of start to finish paths (saturating).
    pub path_count: u64,
    pub warnings: Vec<PertWarning>,
    round_flag: bool,
    verbosity: u8,
}

impl PlanarLayout {
    fn new(graph: MilestoneGraph, verbosity: u8) -> Self {
        Self {
            graph,
            edges: Vec::new(),
            faces: Vec::new(),
            columns: Vec::new(),
            max_level: 0,
            path_count: 0,
            warnings: Vec::new(),
            round_flag: false,
            verbosity,
        }
    }

    /// Run all layout stages over a freshly synthesized graph.
    ///
    /// # Errors
    /// * `LayoutError::NonPlanarGraph` if the graph has no planar embedding
    pub fn build(
        graph: MilestoneGraph,
        schedule: &Schedule,
        verbosity: u8,
    ) -> Result<Self, LayoutError> {
        let mut layout = Self::new(graph, verbosity);
        layout.prepare_gamma(schedule);
        layout.build_paths();
        layout.cut_edges();
        layout.gamma()?;
        layout.calculate_levels();
        log_stage!(
            verbosity,
            "layout: {} milestones, {} edges, {} faces, {} levels, {} paths",
            layout.graph.len(),
            layout.live_edges().count(),
            layout.faces.len(),
            layout.max_level + 1,
            layout.path_count
        );
        Ok(layout)
    }

    pub fn start(&self) -> MilestoneId {
        self.graph.start
    }

    pub fn finish(&self) -> MilestoneId {
        self.graph.finish
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.graph.milestones
    }

    /// Edges that are still part of the graph (long edges are replaced).
    pub fn live_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(|edge| edge.alive)
    }

    fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = self.edges.len();
        self.graph.milestones[edge.from].edges.push(id);
        self.graph.milestones[edge.to].edges.push(id);
        self.edges.push(edge);
        id
    }

    /// Rebuild every edge from the milestones' task and dummy links.
    fn prepare_gamma(&mut self, schedule: &Schedule) {
        self.edges.clear();
        for milestone in &mut self.graph.milestones {
            milestone.edges.clear();
        }

        for from in 0..self.graph.milestones.len() {
            let tasks = self.graph.milestones[from].successors.clone();
            for work in tasks {
                let to = self.graph.work_finish(work);
                self.add_edge(Edge::new(from, to, Some(work), schedule.is_critical(work)));
            }
            let dummies = self.graph.milestones[from].m_successors.clone();
            for to in dummies {
                let is_critical = self.graph.milestones[from].is_critical
                    && self.graph.milestones[to].is_critical;
                self.add_edge(Edge::new(from, to, None, is_critical));
            }
        }
    }

    /// Longest-path levels in topological order, counting start to finish paths.
    fn build_paths(&mut self) {
        let n = self.graph.milestones.len();
        let start = self.graph.start;
        let finish = self.graph.finish;

        let mut in_degree = vec![0usize; n];
        let mut outgoing: Vec<Vec<MilestoneId>> = vec![Vec::new(); n];
        for edge in self.edges.iter().filter(|e| e.alive) {
            in_degree[edge.to] += 1;
            outgoing[edge.from].push(edge.to);
        }

        let mut levels = vec![0usize; n];
        let mut paths = vec![0u64; n];
        let mut reached = vec![false; n];
        paths[start] = 1;
        reached[start] = true;

        let mut queue: VecDeque<MilestoneId> = (0..n).filter(|&m| in_degree[m] == 0).collect();
        while let Some(m) = queue.pop_front() {
            for &next in &outgoing[m] {
                levels[next] = levels[next].max(levels[m] + 1);
                paths[next] = paths[next].saturating_add(paths[m]);
                reached[next] |= reached[m];
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        for (id, &is_reached) in reached.iter().enumerate() {
            if !is_reached && !self.edges.is_empty() {
                log_warn!(self.verbosity, "milestone {} is unreachable from the start", id);
                self.warnings
                    .push(PertWarning::UnreachableMilestone { milestone: id });
            }
        }

        // An empty chart still keeps start and finish in separate columns
        if finish != start && levels[finish] == 0 {
            levels[finish] = 1;
        }

        for (milestone, level) in self.graph.milestones.iter_mut().zip(levels) {
            milestone.level = level;
        }
        self.max_level = self
            .graph
            .milestones
            .iter()
            .map(|m| m.level)
            .max()
            .unwrap_or(0);
        self.path_count = paths[finish];
    }

    /// Replace every edge spanning more than one level by a chain of fake edges.
    fn cut_edges(&mut self) {
        let original = self.edges.len();
        let mut fakes = 0usize;

        for id in 0..original {
            let edge = self.edges[id].clone();
            if !edge.alive || edge.is_fake {
                continue;
            }
            let low = self.graph.milestones[edge.from].level;
            let high = self.graph.milestones[edge.to].level;
            if high <= low + 1 {
                continue;
            }

            let mut prev = edge.from;
            for level in low + 1..high {
                let fake = self.graph.milestones.len();
                self.graph
                    .milestones
                    .push(Milestone::fake(level, id, edge.is_critical));
                self.add_edge(Edge::fake(prev, fake, &edge, id));
                prev = fake;
                fakes += 1;
            }
            self.add_edge(Edge::fake(prev, edge.to, &edge, id));

            self.edges[id].alive = false;
            self.graph.milestones[edge.from].edges.retain(|&e| e != id);
            self.graph.milestones[edge.to].edges.retain(|&e| e != id);
        }

        log_stage!(self.verbosity, "cut edges: {} fake milestones", fakes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpm::calculate_schedule;
    use crate::index::TaskIndex;
    use crate::models::{PertFormula, PertTask};
    use rustc_hash::FxHashMap;

    fn make_task(id: &str, duration: f64, deps: &[&str]) -> PertTask {
        PertTask::with_duration(id, duration, deps)
    }

    fn layout_of(rows: &[PertTask]) -> (TaskIndex, PlanarLayout) {
        let index = TaskIndex::build(rows, 0);
        let schedule = calculate_schedule(&index, rows, &PertFormula, 0).unwrap();
        let graph = MilestoneGraph::synthesize(&index, &schedule, 0);
        let layout = PlanarLayout::build(graph, &schedule, 0).unwrap();
        (index, layout)
    }

    fn diamond() -> Vec<PertTask> {
        vec![
            make_task("a", 2.0, &[]),
            make_task("b", 3.0, &["a"]),
            make_task("c", 5.0, &["a"]),
            make_task("d", 1.0, &["b", "c"]),
        ]
    }

    fn long_edge() -> Vec<PertTask> {
        vec![
            make_task("a", 1.0, &[]),
            make_task("b", 1.0, &["a"]),
            make_task("c", 1.0, &["b"]),
            make_task("d", 1.0, &["c"]),
            make_task("e", 1.0, &["a"]),
            make_task("g", 1.0, &["d", "e"]),
        ]
    }

    fn level_of_start(index: &TaskIndex, layout: &PlanarLayout, id: &str) -> usize {
        let work = index.get(id).unwrap();
        layout.milestones()[layout.graph.work_start(work)].level
    }

    fn level_of_finish(index: &TaskIndex, layout: &PlanarLayout, id: &str) -> usize {
        let work = index.get(id).unwrap();
        layout.milestones()[layout.graph.work_finish(work)].level
    }

    /// Every live edge borders two faces and Euler's formula holds,
    /// counting the closing edge from finish back to start.
    fn assert_valid_embedding(layout: &PlanarLayout) {
        let mut sides: FxHashMap<(MilestoneId, MilestoneId), usize> = FxHashMap::default();
        for face in &layout.faces {
            let n = face.len();
            for i in 0..n {
                let (a, b) = (face[i], face[(i + 1) % n]);
                *sides.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }

        let (s, f) = (layout.start(), layout.finish());
        let closing = (s.min(f), s.max(f));
        let mut edges = 0;
        for edge in layout.live_edges() {
            let key = (edge.from.min(edge.to), edge.from.max(edge.to));
            assert_ne!(key, closing, "direct start to finish edge not expected here");
            assert_eq!(sides.get(&key), Some(&2), "edge {:?}", key);
            edges += 1;
        }
        assert_eq!(sides.get(&closing), Some(&2));
        assert_eq!(sides.len(), edges + 1);

        let vertices = layout.milestones().len() as i64;
        let edges = edges as i64 + 1;
        let faces = layout.faces.len() as i64;
        assert_eq!(vertices - edges + faces, 2);

        for id in 0..layout.milestones().len() {
            assert!(layout.faces.iter().any(|face| face.contains(&id)));
        }
    }

    #[test]
    fn test_trivial_chain_levels() {
        let rows = vec![make_task("a", 1.0, &[]), make_task("b", 1.0, &["a"])];
        let (index, layout) = layout_of(&rows);

        assert_eq!(layout.max_level, 2);
        assert_eq!(level_of_start(&index, &layout, "a"), 0);
        assert_eq!(level_of_start(&index, &layout, "b"), 1);
        assert_eq!(level_of_finish(&index, &layout, "b"), 2);
        assert!(layout.milestones().iter().all(|m| !m.is_fake));
        assert_eq!(layout.path_count, 1);
        assert_valid_embedding(&layout);
    }

    #[test]
    fn test_diamond_layout() {
        let (index, layout) = layout_of(&diamond());

        assert_eq!(
            level_of_start(&index, &layout, "b"),
            level_of_start(&index, &layout, "c")
        );
        let d_start = level_of_start(&index, &layout, "d");
        assert!(d_start > level_of_start(&index, &layout, "b"));
        assert_eq!(d_start, level_of_finish(&index, &layout, "c") + 1);
        assert_eq!(layout.path_count, 2);
        assert_valid_embedding(&layout);
    }

    #[test]
    fn test_diamond_column_order() {
        let (_, layout) = layout_of(&diamond());

        // level 2 holds c's finish and the fake milestone of b's long edge
        let column = &layout.columns[2];
        assert_eq!(column.len(), 2);
        let fake = layout.milestones()[column[0]].is_fake;
        let real = layout.milestones()[column[1]].is_fake;
        assert!(fake && !real);
        assert_eq!(layout.milestones()[column[0]].lower_milestone, Some(column[1]));
        assert_eq!(layout.milestones()[column[1]].upper_milestone, Some(column[0]));
    }

    #[test]
    fn test_levels_are_adjacent_after_cut() {
        for rows in [diamond(), long_edge()] {
            let (_, layout) = layout_of(&rows);
            for edge in layout.live_edges() {
                let from = layout.milestones()[edge.from].level;
                let to = layout.milestones()[edge.to].level;
                assert_eq!(to, from + 1);
            }
        }
    }

    #[test]
    fn test_long_edge_gets_two_fakes() {
        let (index, layout) = layout_of(&long_edge());
        let e = index.get("e").unwrap();
        let low = level_of_start(&index, &layout, "e");
        let high = level_of_finish(&index, &layout, "e");
        assert_eq!(high - low, 3);

        let fakes: Vec<MilestoneId> = (0..layout.milestones().len())
            .filter(|&m| layout.milestones()[m].is_fake)
            .collect();
        assert_eq!(fakes.len(), 2);
        for &fake in &fakes {
            let level = layout.milestones()[fake].level;
            assert!(low < level && level < high);

            let incoming: Vec<&Edge> = layout.live_edges().filter(|e| e.to == fake).collect();
            let outgoing: Vec<&Edge> = layout.live_edges().filter(|e| e.from == fake).collect();
            assert_eq!(incoming.len(), 1);
            assert_eq!(outgoing.len(), 1);
            assert!(incoming[0].is_fake && outgoing[0].is_fake);
            assert_eq!(incoming[0].work, Some(e));
        }

        let real = layout.milestones()[fakes[0]].real_edge.unwrap();
        assert!(!layout.edges[real].alive);
        assert_valid_embedding(&layout);
    }

    #[test]
    fn test_indices_skip_fakes() {
        let (_, layout) = layout_of(&long_edge());
        let mut indices: Vec<usize> = layout
            .milestones()
            .iter()
            .filter(|m| !m.is_fake)
            .map(|m| m.index.unwrap())
            .collect();
        indices.sort();
        assert_eq!(indices, (0..indices.len()).collect::<Vec<_>>());
        assert!(layout
            .milestones()
            .iter()
            .filter(|m| m.is_fake)
            .all(|m| m.index.is_none()));

        let start = &layout.milestones()[layout.start()];
        assert_eq!(start.label, "Start");
        assert_eq!(start.index, Some(0));
        assert_eq!(layout.milestones()[layout.finish()].label, "Finish");
    }

    #[test]
    fn test_empty_graph() {
        let (_, layout) = layout_of(&[]);
        assert_eq!(layout.max_level, 1);
        assert_eq!(layout.faces, vec![vec![layout.start(), layout.finish()]]);
        assert_eq!(layout.columns, vec![vec![layout.start()], vec![layout.finish()]]);
        assert_eq!(layout.path_count, 0);
    }

    #[test]
    fn test_edge_element_refs() {
        let (index, layout) = layout_of(&diamond());
        let d = index.get("d").unwrap();
        assert!(layout
            .live_edges()
            .any(|e| e.element_ref() == ElementRef::Work(d)));
        // c's finish reaches d's start through a dummy edge
        assert!(layout
            .live_edges()
            .any(|e| matches!(e.element_ref(), ElementRef::DummyEdge(_))));
    }
}
