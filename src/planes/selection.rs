use std::collections::BTreeSet;

use crate::index::{IndexError, Result, RoiComponent};
use crate::model::{RoiId, RoiShape, ShapeId};

/// Resolves a shape selection, rejecting empty input, unknown ids, shapes
/// outside `owner` and two shapes on the same plane.
pub(super) fn select_distinct_planes(
    index: &RoiComponent,
    shapes: &[ShapeId],
    owner: Option<RoiId>,
) -> Result<Vec<RoiShape>> {
    if shapes.is_empty() {
        return Err(IndexError::EmptySelection);
    }
    if let Some(owner) = owner {
        index.require_roi(owner)?;
    }
    let mut planes = BTreeSet::new();
    let mut selected = Vec::with_capacity(shapes.len());
    for id in shapes {
        let shape = index.require_shape(*id)?;
        if let Some(owner) = owner {
            if shape.roi != owner {
                return Err(IndexError::ForeignShape {
                    shape: *id,
                    roi: owner,
                });
            }
        }
        if !planes.insert(shape.coord) {
            return Err(IndexError::OverlappingPlanes { coord: shape.coord });
        }
        selected.push(shape.clone());
    }
    Ok(selected)
}

pub(super) fn ensure_deletable(shape: &RoiShape) -> Result<()> {
    if shape.annotations.deletable {
        Ok(())
    } else {
        Err(IndexError::ShapeProtected {
            shape: shape.id,
            reason: "not deletable",
        })
    }
}
