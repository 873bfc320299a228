use std::collections::BTreeSet;

use crate::model::{RoiId, ShapeId};

/// What a structural mutation did to the index.
///
/// `written` shapes are new arena entries, `removed` shapes no longer exist and
/// `moved` shapes kept their id but changed owner or figure. Statistics for
/// every listed shape are stale once the edit is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaneEdit {
    pub target: Option<RoiId>,
    pub written: Vec<ShapeId>,
    pub removed: Vec<ShapeId>,
    pub moved: Vec<ShapeId>,
    pub touched_rois: BTreeSet<RoiId>,
    pub deleted_rois: BTreeSet<RoiId>,
}

impl PlaneEdit {
    pub fn for_target(target: RoiId) -> Self {
        let mut edit = Self {
            target: Some(target),
            ..Self::default()
        };
        edit.touched_rois.insert(target);
        edit
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
            && self.deleted_rois.is_empty()
    }

    /// Shapes whose cached statistics must be dropped.
    pub fn stale_shapes(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.removed
            .iter()
            .chain(self.moved.iter())
            .chain(self.written.iter())
            .copied()
    }

    pub(crate) fn roi_deleted(&mut self, roi: RoiId) {
        self.touched_rois.remove(&roi);
        self.deleted_rois.insert(roi);
    }
}
