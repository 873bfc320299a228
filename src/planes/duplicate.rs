use tracing::debug;

use crate::index::{PlaneEdit, Result, RoiComponent};
use crate::model::{RoiId, ShapeId};

use super::selection::select_distinct_planes;

/// Copies the listed shapes of `roi` into a new ROI cloned from it, on the same
/// planes. The originals are untouched.
pub fn duplicate(
    index: &mut RoiComponent,
    roi: RoiId,
    shapes: &[ShapeId],
) -> Result<(RoiId, PlaneEdit)> {
    let selected = select_distinct_planes(index, shapes, Some(roi))?;

    let target = index.clone_roi(roi)?;
    let mut edit = PlaneEdit::for_target(target);
    for original in &selected {
        let id = index.allocate_shape_id();
        index.insert_shape(original.copy_to(id, target, original.coord))?;
        edit.written.push(id);
    }
    debug!(source = %roi, %target, copies = edit.written.len(), "duplicated shapes");
    Ok((target, edit))
}
