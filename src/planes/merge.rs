use std::collections::BTreeSet;

use tracing::debug;

use crate::index::{PlaneEdit, Result, RoiComponent};
use crate::model::{RoiId, ShapeId};

use super::selection::{ensure_deletable, select_distinct_planes};

/// Gathers shapes from any number of ROIs into one new ROI cloned from the
/// first shape's owner. Source ROIs left empty are deleted.
pub fn merge(index: &mut RoiComponent, shapes: &[ShapeId]) -> Result<(RoiId, PlaneEdit)> {
    let selected = select_distinct_planes(index, shapes, None)?;
    for shape in &selected {
        ensure_deletable(shape)?;
    }

    let target = index.clone_roi(selected[0].roi)?;
    let mut edit = PlaneEdit::for_target(target);
    let mut sources = BTreeSet::new();
    for original in &selected {
        index.take_shape(original.id);
        let id = index.allocate_shape_id();
        index.insert_shape(original.copy_to(id, target, original.coord))?;
        edit.removed.push(original.id);
        edit.written.push(id);
        sources.insert(original.roi);
    }
    for roi in sources {
        edit.touched_rois.insert(roi);
        if index.remove_if_empty(roi) {
            edit.roi_deleted(roi);
        }
    }
    debug!(%target, shapes = edit.written.len(), "merged shapes");
    Ok((target, edit))
}
