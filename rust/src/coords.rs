//! Grid to pixel mapping for laid out milestones.

use crate::config::PertConfig;
use crate::layout::{LayoutError, PlanarLayout};
use crate::log_stage;

/// Snap a coordinate so a line of `stroke_thickness` lands on whole pixels:
/// odd thicknesses are centred on half pixels.
pub fn apply_pixel_shift(value: f64, stroke_thickness: f64) -> f64 {
    let shift = (stroke_thickness.round() as i64).rem_euclid(2) as f64 / 2.0;
    value.round() + shift
}

/// Every milestone must occupy exactly one slot of the level grid.
fn validate_grid(layout: &PlanarLayout) -> Result<(), LayoutError> {
    let mut slots = vec![0u32; layout.milestones().len()];
    for &id in layout.columns.iter().flatten() {
        match slots.get_mut(id) {
            Some(count) => *count += 1,
            None => return Err(LayoutError::IncompleteGrid(id)),
        }
    }
    for (id, &count) in slots.iter().enumerate() {
        match count {
            0 => return Err(LayoutError::IncompleteGrid(id)),
            1 => {}
            _ => return Err(LayoutError::OverlappingGrid(id)),
        }
    }
    Ok(())
}

/// Set `left`/`top` (centres) and `radius` of every milestone.
///
/// Columns are one level apart horizontally; rows one slot apart vertically.
/// Both pitches include the largest milestone size so critical milestones
/// never overlap their neighbours.
pub fn assign_coordinates(
    layout: &mut PlanarLayout,
    config: &PertConfig,
) -> Result<(), LayoutError> {
    validate_grid(layout)?;

    let max_size = config.max_size();
    let horizontal_step = config.horizontal_spacing + max_size;
    let vertical_step = config.vertical_spacing + max_size;
    let thickness = config.stroke_thickness;

    let mut rows = 0;
    for (level, column) in layout.columns.iter().enumerate() {
        let left = config.left + max_size / 2.0 + level as f64 * horizontal_step;
        for (row, &id) in column.iter().enumerate() {
            let top = config.top + max_size / 2.0 + row as f64 * vertical_step;
            let milestone = &mut layout.graph.milestones[id];
            milestone.left = apply_pixel_shift(left, thickness);
            milestone.top = apply_pixel_shift(top, thickness);
            milestone.radius = if milestone.is_fake {
                0.0
            } else {
                config.size_for(milestone.is_critical) / 2.0
            };
        }
        rows = rows.max(column.len());
    }

    log_stage!(
        config.verbosity,
        "coordinates: {} columns x {} rows",
        layout.columns.len(),
        rows
    );
    Ok(())
}
