use tracing::debug;

use crate::index::{IndexError, PlaneEdit, Result, RoiComponent};
use crate::model::{Coord3D, MAX_RANGE_PLANES, ShapeId};

use super::selection::ensure_deletable;

/// Removes every shape of `shape`'s ROI inside the `(z, t)` rectangle spanned
/// by `from` and `to`, both ends included. The ROI is deleted when nothing is
/// left in it.
pub fn delete_range(
    index: &mut RoiComponent,
    shape: ShapeId,
    from: Coord3D,
    to: Coord3D,
) -> Result<PlaneEdit> {
    let roi = index.require_shape(shape)?.roi;
    let owner = index.require_roi(roi)?;
    let doomed = Coord3D::range(from, to)
        .ok_or(IndexError::RangeTooLarge {
            from,
            to,
            limit: MAX_RANGE_PLANES,
        })?
        .iter()
        .filter_map(|coord| owner.shape_at(coord))
        .collect::<Vec<_>>();
    for id in &doomed {
        ensure_deletable(index.require_shape(*id)?)?;
    }

    let mut edit = PlaneEdit::default();
    edit.touched_rois.insert(roi);
    for id in doomed {
        index.take_shape(id);
        edit.removed.push(id);
    }
    if index.remove_if_empty(roi) {
        edit.roi_deleted(roi);
    }
    debug!(%roi, removed = edit.removed.len(), "deleted plane range");
    Ok(edit)
}
