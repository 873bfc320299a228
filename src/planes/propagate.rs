use tracing::debug;

use crate::index::{IndexError, PlaneEdit, Result, RoiComponent};
use crate::model::{Coord3D, MAX_RANGE_PLANES, ShapeId};

/// Copies `shape` onto every plane of the `(z, t)` rectangle spanned by `from`
/// and `to`, except `from` itself and the source shape's own plane.
///
/// Existing shapes of the same ROI on those planes are replaced, which makes
/// repeated propagation idempotent. The returned edit lists the new shapes in
/// `written` and the replaced ones in `removed`.
pub fn propagate(
    index: &mut RoiComponent,
    shape: ShapeId,
    from: Coord3D,
    to: Coord3D,
) -> Result<PlaneEdit> {
    let source = index.require_shape(shape)?.clone();
    let targets = Coord3D::range(from, to)
        .ok_or(IndexError::RangeTooLarge {
            from,
            to,
            limit: MAX_RANGE_PLANES,
        })?
        .into_iter()
        .filter(|coord| *coord != from && *coord != source.coord)
        .map(|coord| coord.on_channel(source.coord.channel))
        .collect::<Vec<_>>();

    let owner = index.require_roi(source.roi)?;
    for coord in &targets {
        let Some(existing) = owner.shape_at(coord) else {
            continue;
        };
        if index.require_shape(existing)?.annotations.read_only {
            return Err(IndexError::ShapeProtected {
                shape: existing,
                reason: "read-only",
            });
        }
    }

    let mut edit = PlaneEdit::for_target(source.roi);
    for coord in targets {
        let id = index.allocate_shape_id();
        let copy = source.copy_to(id, source.roi, coord);
        if let Some(replaced) = index.insert_shape(copy)? {
            edit.removed.push(replaced.id);
        }
        edit.written.push(id);
    }
    debug!(
        %shape,
        written = edit.written.len(),
        replaced = edit.removed.len(),
        "propagated shape"
    );
    Ok(edit)
}
