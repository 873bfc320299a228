use tracing::debug;

use crate::index::{PlaneEdit, Result, RoiComponent};
use crate::model::{RoiId, ShapeId};

use super::selection::select_distinct_planes;

/// Moves the listed shapes of `roi` into a new ROI cloned from it. The shapes
/// keep their ids and planes; `roi` keeps whatever was not listed and is
/// deleted if nothing remains.
pub fn split(
    index: &mut RoiComponent,
    roi: RoiId,
    shapes: &[ShapeId],
) -> Result<(RoiId, PlaneEdit)> {
    let selected = select_distinct_planes(index, shapes, Some(roi))?;

    let target = index.clone_roi(roi)?;
    let mut edit = PlaneEdit::for_target(target);
    edit.touched_rois.insert(roi);
    for original in selected {
        if let Some(mut shape) = index.take_shape(original.id) {
            shape.roi = target;
            edit.moved.push(shape.id);
            index.insert_shape(shape)?;
        }
    }
    if index.remove_if_empty(roi) {
        edit.roi_deleted(roi);
    }
    debug!(source = %roi, %target, moved = edit.moved.len(), "split ROI");
    Ok((target, edit))
}
