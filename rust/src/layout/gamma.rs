//! Gamma planar embedding.
//!
//! Starts from the single face `[start, finish]` (the implicit closing edge
//! finish -> start) and repeatedly embeds a path of the segment that fits the
//! fewest faces, splitting that face in two.

use rustc_hash::FxHashSet;

use super::{EdgeId, Face, LayoutError, PlanarLayout};
use crate::log_debug;
use crate::milestones::MilestoneId;

/// Connected group of edges that are not embedded yet.
#[derive(Debug, Default)]
struct Segment {
    edges: FxHashSet<EdgeId>,
    /// Already embedded milestones the segment touches, in discovery order.
    contacts: Vec<MilestoneId>,
}

impl PlanarLayout {
    pub(super) fn gamma(&mut self) -> Result<(), LayoutError> {
        let (start, finish) = (self.graph.start, self.graph.finish);
        for edge in &mut self.edges {
            edge.plotted = false;
            edge.flag = false;
        }
        for milestone in &mut self.graph.milestones {
            milestone.plotted = false;
        }
        self.round_flag = false;
        self.graph.milestones[start].plotted = true;
        self.graph.milestones[finish].plotted = true;
        self.faces = vec![vec![start, finish]];

        loop {
            let segments = self.find_segments();
            let Some((segment, face)) = self.choose_segment(&segments)? else {
                break;
            };
            let (path, path_edges) = self.find_path(&segments[segment])?;
            log_debug!(
                self.verbosity,
                "gamma: {} segments, embedding path {:?} into face {}",
                segments.len(),
                path,
                face
            );

            for &edge in &path_edges {
                self.edges[edge].plotted = true;
            }
            for &milestone in &path {
                self.graph.milestones[milestone].plotted = true;
            }

            let (first, second) =
                cut_face(&self.faces[face], &path).ok_or_else(|| LayoutError::NonPlanarGraph {
                    contacts: vec![path[0], path[path.len() - 1]],
                })?;
            self.faces[face] = first;
            self.faces.insert(face + 1, second);
        }

        Ok(())
    }

    /// Flood fill unplotted edges into segments, passing only through
    /// unplotted milestones. Flags alternate per round so nothing is reset.
    fn find_segments(&mut self) -> Vec<Segment> {
        self.round_flag = !self.round_flag;
        let flag = self.round_flag;
        let mut segments = Vec::new();

        for seed in 0..self.edges.len() {
            let edge = &self.edges[seed];
            if !edge.alive || edge.plotted || edge.flag == flag {
                continue;
            }
            self.edges[seed].flag = flag;

            let mut segment = Segment::default();
            let mut stack = vec![seed];
            while let Some(current) = stack.pop() {
                segment.edges.insert(current);
                let ends = [self.edges[current].from, self.edges[current].to];
                for milestone in ends {
                    if self.graph.milestones[milestone].plotted {
                        if !segment.contacts.contains(&milestone) {
                            segment.contacts.push(milestone);
                        }
                        continue;
                    }
                    for &next in &self.graph.milestones[milestone].edges {
                        let edge = &mut self.edges[next];
                        if edge.alive && !edge.plotted && edge.flag != flag {
                            edge.flag = flag;
                            stack.push(next);
                        }
                    }
                }
            }
            segments.push(segment);
        }

        segments
    }

    /// Segment admissible in the fewest faces, with the first such face.
    fn choose_segment(
        &self,
        segments: &[Segment],
    ) -> Result<Option<(usize, usize)>, LayoutError> {
        let mut best: Option<(usize, usize, usize)> = None;
        for (index, segment) in segments.iter().enumerate() {
            let mut count = 0;
            let mut first_face = None;
            for (face_index, face) in self.faces.iter().enumerate() {
                if segment.contacts.iter().all(|c| face.contains(c)) {
                    count += 1;
                    first_face.get_or_insert(face_index);
                }
            }
            let Some(face) = first_face else {
                return Err(LayoutError::NonPlanarGraph {
                    contacts: segment.contacts.clone(),
                });
            };
            if best.map_or(true, |(best_count, _, _)| count < best_count) {
                best = Some((count, index, face));
            }
        }
        Ok(best.map(|(_, segment, face)| (segment, face)))
    }

    /// Walk forward from the leftmost contact along the segment's unplotted
    /// edges until another embedded milestone is reached.
    fn find_path(
        &self,
        segment: &Segment,
    ) -> Result<(Vec<MilestoneId>, Vec<EdgeId>), LayoutError> {
        let milestones = &self.graph.milestones;
        let stuck = || LayoutError::NonPlanarGraph {
            contacts: segment.contacts.clone(),
        };

        let mut origin = *segment.contacts.first().ok_or_else(stuck)?;
        for &contact in &segment.contacts {
            if milestones[contact].level == 0 {
                origin = contact;
                break;
            }
            if milestones[contact].level < milestones[origin].level {
                origin = contact;
            }
        }

        let mut path = vec![origin];
        let mut path_edges = Vec::new();
        let mut current = origin;
        loop {
            let step = milestones[current].edges.iter().copied().find(|&e| {
                let edge = &self.edges[e];
                edge.from == current && !edge.plotted && segment.edges.contains(&e)
            });
            let edge = step.ok_or_else(stuck)?;
            current = self.edges[edge].to;
            path.push(current);
            path_edges.push(edge);
            if milestones[current].plotted {
                break;
            }
        }

        Ok((path, path_edges))
    }
}

/// Split `face` along `path`, whose two ends must lie on the face.
///
/// Both new faces keep the orientation of the old one: the first runs along
/// the face from the path's origin to its end and returns through the path
/// reversed, the second runs on from the end back to the origin and then
/// follows the path.
pub fn cut_face(face: &[MilestoneId], path: &[MilestoneId]) -> Option<(Face, Face)> {
    let (&origin, &end) = (path.first()?, path.last()?);
    let ia = face.iter().position(|&m| m == origin)?;
    let ib = face.iter().position(|&m| m == end)?;
    if ia == ib {
        return None;
    }

    let n = face.len();
    let arc = |from: usize, to: usize| -> Face {
        let len = (to + n - from) % n + 1;
        (0..len).map(|k| face[(from + k) % n]).collect()
    };
    let interior = &path[1..path.len() - 1];

    let mut first = arc(ia, ib);
    first.extend(interior.iter().rev());
    let mut second = arc(ib, ia);
    second.extend(interior.iter());
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Edge;
    use crate::milestones::{Milestone, MilestoneGraph};

    /// Layout over hand-made milestones at the given levels; milestone 0 is
    /// the start and milestone 1 the finish.
    fn hand_made(levels: &[usize], edges: &[(MilestoneId, MilestoneId)]) -> PlanarLayout {
        let milestones = levels
            .iter()
            .map(|&level| Milestone {
                level,
                ..Milestone::default()
            })
            .collect();
        let graph = MilestoneGraph::from_milestones(milestones, 0, 1);
        let mut layout = PlanarLayout::new(graph, 0);
        for &(from, to) in edges {
            layout.add_edge(Edge::new(from, to, None, false));
        }
        layout
    }

    #[test]
    fn test_cut_face_keeps_orientation() {
        let (first, second) = cut_face(&[0, 1], &[0, 2, 3, 1]).unwrap();
        assert_eq!(first, vec![0, 1, 3, 2]);
        assert_eq!(second, vec![1, 0, 2, 3]);

        // path ends given in reverse face order
        let (first, second) = cut_face(&[0, 1, 3, 4, 2], &[2, 5, 3]).unwrap();
        assert_eq!(first, vec![2, 0, 1, 3, 5]);
        assert_eq!(second, vec![3, 4, 2, 5]);
    }

    #[test]
    fn test_cut_face_requires_both_ends() {
        assert!(cut_face(&[0, 1, 2], &[0, 7]).is_none());
        assert!(cut_face(&[0, 1, 2], &[]).is_none());
    }

    #[test]
    fn test_gamma_on_two_parallel_chains() {
        // start -> 2 -> finish and start -> 3 -> finish
        let mut layout = hand_made(&[0, 2, 1, 1], &[(0, 2), (2, 1), (0, 3), (3, 1)]);
        layout.gamma().unwrap();

        assert_eq!(layout.faces.len(), 3);
        assert!(layout.edges.iter().all(|e| e.plotted));
        assert!(layout.milestones().iter().all(|m| m.plotted));
    }

    fn segment(contacts: &[MilestoneId]) -> Segment {
        Segment {
            edges: FxHashSet::default(),
            contacts: contacts.to_vec(),
        }
    }

    #[test]
    fn test_choose_segment_prefers_fewest_faces() {
        let mut layout = hand_made(&[0, 2, 1, 1], &[]);
        layout.faces = vec![vec![0, 1, 2], vec![1, 0, 3, 2], vec![0, 1, 3]];

        // [0, 2] fits faces 0 and 1, [3, 2] only face 1
        let segments = [segment(&[0, 2]), segment(&[3, 2])];
        assert_eq!(layout.choose_segment(&segments), Ok(Some((1, 1))));
    }

    #[test]
    fn test_choose_segment_ties_take_first_segment_and_face() {
        let mut layout = hand_made(&[0, 2, 1, 1], &[]);
        layout.faces = vec![vec![0, 1, 2], vec![1, 0, 3, 2], vec![0, 1, 3]];

        // both fit two faces: [0, 3] faces 1 and 2, [0, 2] faces 0 and 1
        let segments = [segment(&[0, 3]), segment(&[0, 2])];
        assert_eq!(layout.choose_segment(&segments), Ok(Some((0, 1))));

        let none: [Segment; 0] = [];
        assert_eq!(layout.choose_segment(&none), Ok(None));
    }

    #[test]
    fn test_choose_segment_without_face_is_non_planar() {
        let mut layout = hand_made(&[0, 2, 1, 1], &[]);
        layout.faces = vec![vec![0, 1, 2], vec![0, 1, 3]];

        let segments = [segment(&[0, 1]), segment(&[2, 3])];
        assert_eq!(
            layout.choose_segment(&segments),
            Err(LayoutError::NonPlanarGraph {
                contacts: vec![2, 3]
            })
        );
    }

    /// a1..a3 (2, 3, 4) all feed b1..b3 (5, 6, 7): contains K3,3
    fn k33_edges() -> Vec<(MilestoneId, MilestoneId)> {
        let mut edges = vec![(0, 2), (0, 3), (0, 4), (5, 1), (6, 1), (7, 1)];
        for a in 2..5 {
            for b in 5..8 {
                edges.push((a, b));
            }
        }
        edges
    }

    #[test]
    fn test_gamma_rejects_k33() {
        let mut layout = hand_made(&[0, 3, 1, 1, 1, 2, 2, 2], &k33_edges());
        assert!(matches!(
            layout.gamma(),
            Err(LayoutError::NonPlanarGraph { .. })
        ));
    }

    #[test]
    fn test_leveled_k33_is_still_rejected() {
        let mut layout = hand_made(&[0; 8], &k33_edges());
        layout.build_paths();
        layout.cut_edges();
        assert_eq!(layout.max_level, 3);
        assert!(layout.edges.iter().all(|e| !e.is_fake));
        assert!(layout.gamma().is_err());
    }
}
