//! Vertical order of the milestones inside each level column.

use super::PlanarLayout;
use crate::milestones::{Milestone, MilestoneId};

/// Faces bordering the closing edge finish -> start.
fn is_outer_face(face: &[MilestoneId], start: MilestoneId, finish: MilestoneId) -> bool {
    let n = face.len();
    (0..n).any(|i| {
        let (a, b) = (face[i], face[(i + 1) % n]);
        (a == start && b == finish) || (a == finish && b == start)
    })
}

/// Position of the lowest-level milestone; a level 0 milestone ends the search.
fn most_left(face: &[MilestoneId], milestones: &[Milestone]) -> usize {
    let mut best = 0;
    for (i, &m) in face.iter().enumerate() {
        if milestones[m].level == 0 {
            return i;
        }
        if milestones[m].level < milestones[face[best]].level {
            best = i;
        }
    }
    best
}

impl PlanarLayout {
    pub(super) fn calculate_levels(&mut self) {
        let (start, finish) = (self.graph.start, self.graph.finish);
        let milestones = &mut self.graph.milestones;
        for milestone in milestones.iter_mut() {
            milestone.upper_milestone = None;
            milestone.lower_milestone = None;
            milestone.index = None;
        }

        // Both sides of an inner face, walked outward from its leftmost milestone,
        // pair up the milestones that are vertical neighbours.
        for face in &self.faces {
            if is_outer_face(face, start, finish) {
                continue;
            }
            let n = face.len();
            let source = most_left(face, milestones);
            for k in 1..n {
                let up = face[(source + k) % n];
                let low = face[(source + n - k) % n];
                if up == low || up == finish || low == finish {
                    break;
                }
                if milestones[up].level != milestones[low].level {
                    break;
                }
                milestones[up].lower_milestone.get_or_insert(low);
                milestones[low].upper_milestone.get_or_insert(up);
            }
        }

        let mut by_level: Vec<Vec<MilestoneId>> = vec![Vec::new(); self.max_level + 1];
        for (id, milestone) in milestones.iter().enumerate() {
            by_level[milestone.level].push(id);
        }

        let mut placed = vec![false; milestones.len()];
        let mut columns = Vec::with_capacity(by_level.len());
        for members in by_level {
            let mut column = Vec::with_capacity(members.len());
            for &head in &members {
                if milestones[head].upper_milestone.is_some() {
                    continue;
                }
                let mut current = Some(head);
                while let Some(m) = current {
                    if placed[m] {
                        break;
                    }
                    placed[m] = true;
                    column.push(m);
                    current = milestones[m].lower_milestone;
                }
            }
            for &m in &members {
                if !placed[m] {
                    placed[m] = true;
                    column.push(m);
                }
            }
            columns.push(column);
        }

        let mut next = 0;
        for &id in columns.iter().flatten() {
            let milestone = &mut milestones[id];
            if milestone.is_fake {
                continue;
            }
            milestone.index = Some(next);
            if id != start && id != finish {
                milestone.label = next.to_string();
            }
            next += 1;
        }

        self.columns = columns;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_levels(levels: &[usize]) -> Vec<Milestone> {
        levels
            .iter()
            .map(|&level| Milestone {
                level,
                ..Milestone::default()
            })
            .collect()
    }

    #[test]
    fn test_outer_face_detection() {
        assert!(is_outer_face(&[0, 1, 3, 2], 0, 1));
        assert!(is_outer_face(&[2, 1, 0], 0, 1));
        assert!(!is_outer_face(&[3, 4, 2, 5], 0, 1));
    }

    #[test]
    fn test_most_left_stops_at_level_zero() {
        let milestones = at_levels(&[0, 4, 1, 2, 1]);
        assert_eq!(most_left(&[3, 2, 4], &milestones), 1);
        assert_eq!(most_left(&[3, 0, 2], &milestones), 1);
        assert_eq!(most_left(&[1, 3, 0, 2], &milestones), 2);
    }
}
