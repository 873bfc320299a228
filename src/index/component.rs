use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::{
    Coord3D, FolderRef, Geometry, Roi, RoiId, RoiShape, ShapeAnnotations, ShapeId,
};

use super::{IndexError, PlaneEdit, Result};

pub const DEFAULT_NAMESPACE: &str = "roi-rs/measurement";

/// How a newly created ROI gets its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Allocate the next client-side (negative) id.
    ClientSide,
    /// Use an id already assigned by the server.
    Persisted(RoiId),
}

/// Owns every ROI and every shape of one image.
///
/// Shapes live in a single arena keyed by [`ShapeId`]; each [`Roi`] only maps
/// plane coordinates to arena ids. A shape is therefore reachable from exactly
/// one ROI, and one ROI can hold at most one shape per plane.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiComponent {
    rois: BTreeMap<RoiId, Roi>,
    shapes: HashMap<ShapeId, RoiShape>,
    next_client_id: i64,
    next_shape_id: u64,
    namespace: String,
}

impl Default for RoiComponent {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl RoiComponent {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            rois: BTreeMap::new(),
            shapes: HashMap::new(),
            next_client_id: -1,
            next_shape_id: 1,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn roi(&self, id: RoiId) -> Option<&Roi> {
        self.rois.get(&id)
    }

    pub fn rois(&self) -> impl Iterator<Item = &Roi> {
        self.rois.values()
    }

    pub fn roi_ids(&self) -> Vec<RoiId> {
        self.rois.keys().copied().collect()
    }

    pub fn shape(&self, id: ShapeId) -> Option<&RoiShape> {
        self.shapes.get(&id)
    }

    pub fn get_shape(&self, roi: RoiId, coord: Coord3D) -> Option<&RoiShape> {
        self.rois
            .get(&roi)
            .and_then(|roi| roi.shape_at(&coord))
            .and_then(|id| self.shapes.get(&id))
    }

    /// Shapes of one ROI in plane order.
    pub fn shapes_of(&self, roi: RoiId) -> Result<Vec<&RoiShape>> {
        let roi = self.require_roi(roi)?;
        roi.shape_ids().map(|id| self.require_shape(id)).collect()
    }

    /// Creates a ROI holding a single shape at `coord`.
    pub fn create_roi(
        &mut self,
        geometry: Geometry,
        coord: Coord3D,
        policy: IdPolicy,
    ) -> Result<RoiId> {
        geometry.validate()?;
        let id = match policy {
            IdPolicy::ClientSide => self.allocate_client_id(),
            IdPolicy::Persisted(id) => {
                if id.is_client_side() {
                    return Err(IndexError::InvalidRoiId(id));
                }
                if self.rois.contains_key(&id) {
                    return Err(IndexError::DuplicateRoi(id));
                }
                id
            }
        };
        let mut roi = Roi::new(id, self.namespace.clone());
        let shape_id = self.allocate_shape_id();
        roi.insert_plane(coord, shape_id);
        self.shapes
            .insert(shape_id, RoiShape::new(shape_id, id, coord, geometry));
        self.rois.insert(id, roi);
        debug!(%id, %coord, "created ROI");
        Ok(id)
    }

    /// Adds a shape to an existing ROI on a plane it does not occupy yet.
    pub fn add_shape(
        &mut self,
        roi: RoiId,
        geometry: Geometry,
        coord: Coord3D,
    ) -> Result<ShapeId> {
        geometry.validate()?;
        if self.require_roi(roi)?.contains_plane(&coord) {
            return Err(IndexError::DuplicatePlane { roi, coord });
        }
        let shape_id = self.allocate_shape_id();
        self.insert_shape(RoiShape::new(shape_id, roi, coord, geometry))?;
        debug!(%roi, %coord, shape = %shape_id, "added shape");
        Ok(shape_id)
    }

    pub fn delete_roi(&mut self, id: RoiId) -> Result<PlaneEdit> {
        let roi = self.require_roi(id)?;
        if !roi.deletable {
            return Err(IndexError::RoiProtected(id));
        }
        let mut edit = PlaneEdit::default();
        if let Some(roi) = self.rois.remove(&id) {
            for shape in roi.shape_ids() {
                self.shapes.remove(&shape);
                edit.removed.push(shape);
            }
        }
        edit.deleted_rois.insert(id);
        debug!(%id, shapes = edit.removed.len(), "deleted ROI");
        Ok(edit)
    }

    /// Removes one shape; the ROI goes too if it is left empty.
    pub fn delete_shape(&mut self, roi: RoiId, coord: Coord3D) -> Result<PlaneEdit> {
        let shape = self
            .get_shape(roi, coord)
            .ok_or(IndexError::PlaneNotFound { roi, coord })?;
        if !shape.annotations.deletable {
            return Err(IndexError::ShapeProtected {
                shape: shape.id,
                reason: "not deletable",
            });
        }
        let shape_id = shape.id;
        let mut edit = PlaneEdit::default();
        edit.touched_rois.insert(roi);
        self.take_shape(shape_id);
        edit.removed.push(shape_id);
        if self.remove_if_empty(roi) {
            edit.roi_deleted(roi);
        }
        Ok(edit)
    }

    /// Copies a ROI's metadata, not its shapes, into a new client-side ROI.
    pub fn clone_roi(&mut self, id: RoiId) -> Result<RoiId> {
        let source = self.require_roi(id)?;
        let clone_id = RoiId(self.next_client_id);
        let clone = source.clone_metadata(clone_id);
        self.next_client_id -= 1;
        self.rois.insert(clone_id, clone);
        debug!(source = %id, clone = %clone_id, "cloned ROI metadata");
        Ok(clone_id)
    }

    /// Drops every ROI and shape. Id counters keep running so ids handed out
    /// before the reset are never reissued.
    pub fn reset(&mut self) {
        debug!(rois = self.rois.len(), "reset ROI index");
        self.rois.clear();
        self.shapes.clear();
    }

    pub fn update_geometry(&mut self, shape: ShapeId, geometry: Geometry) -> Result<PlaneEdit> {
        geometry.validate()?;
        let record = self
            .shapes
            .get_mut(&shape)
            .ok_or(IndexError::ShapeNotFound(shape))?;
        if record.annotations.read_only {
            return Err(IndexError::ShapeProtected {
                shape,
                reason: "read-only",
            });
        }
        record.annotations.refresh_measurements(&geometry);
        record.geometry = geometry;
        let mut edit = PlaneEdit::for_target(record.roi);
        edit.moved.push(shape);
        Ok(edit)
    }

    pub fn set_annotations(
        &mut self,
        shape: ShapeId,
        annotations: ShapeAnnotations,
    ) -> Result<()> {
        let record = self
            .shapes
            .get_mut(&shape)
            .ok_or(IndexError::ShapeNotFound(shape))?;
        record.annotations = annotations;
        Ok(())
    }

    pub fn add_folder(&mut self, roi: RoiId, folder: FolderRef) -> Result<bool> {
        let roi = self.rois.get_mut(&roi).ok_or(IndexError::RoiNotFound(roi))?;
        Ok(roi.folders.insert(folder))
    }

    pub fn remove_folder(&mut self, roi: RoiId, folder: &FolderRef) -> Result<bool> {
        let roi = self.rois.get_mut(&roi).ok_or(IndexError::RoiNotFound(roi))?;
        Ok(roi.folders.remove(folder))
    }

    /// Verifies plane-disjointness and single ownership across the index.
    pub fn check_invariants(&self) -> Result<()> {
        let mut owners: HashMap<ShapeId, RoiId> = HashMap::new();
        for roi in self.rois.values() {
            for (coord, shape_id) in roi.planes() {
                if let Some(previous) = owners.insert(*shape_id, roi.id) {
                    return Err(IndexError::Corrupted(format!(
                        "{shape_id} is referenced by {previous} and {}",
                        roi.id
                    )));
                }
                let shape = self.shapes.get(shape_id).ok_or_else(|| {
                    IndexError::Corrupted(format!("{} points at missing {shape_id}", roi.id))
                })?;
                if shape.roi != roi.id || shape.coord != *coord {
                    return Err(IndexError::Corrupted(format!(
                        "{shape_id} records {} at {} but is indexed by {} at {coord}",
                        shape.roi, shape.coord, roi.id
                    )));
                }
            }
        }
        if owners.len() != self.shapes.len() {
            return Err(IndexError::Corrupted(format!(
                "{} shapes in the arena but {} reachable from ROIs",
                self.shapes.len(),
                owners.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn require_roi(&self, id: RoiId) -> Result<&Roi> {
        self.rois.get(&id).ok_or(IndexError::RoiNotFound(id))
    }

    pub(crate) fn require_shape(&self, id: ShapeId) -> Result<&RoiShape> {
        self.shapes.get(&id).ok_or(IndexError::ShapeNotFound(id))
    }

    pub(crate) fn allocate_client_id(&mut self) -> RoiId {
        let id = RoiId(self.next_client_id);
        self.next_client_id -= 1;
        id
    }

    pub(crate) fn allocate_shape_id(&mut self) -> ShapeId {
        let id = ShapeId(self.next_shape_id);
        self.next_shape_id += 1;
        id
    }

    pub(crate) fn insert_roi(&mut self, roi: Roi) -> Result<()> {
        if self.rois.contains_key(&roi.id) {
            return Err(IndexError::DuplicateRoi(roi.id));
        }
        self.rois.insert(roi.id, roi);
        Ok(())
    }

    /// Binds `shape` into its ROI's plane map, replacing whatever occupied the
    /// plane. The replaced shape is removed from the arena and returned.
    pub(crate) fn insert_shape(&mut self, shape: RoiShape) -> Result<Option<RoiShape>> {
        let roi = self
            .rois
            .get_mut(&shape.roi)
            .ok_or(IndexError::RoiNotFound(shape.roi))?;
        let replaced = roi.insert_plane(shape.coord, shape.id);
        let replaced = replaced.and_then(|id| self.shapes.remove(&id));
        self.shapes.insert(shape.id, shape);
        Ok(replaced)
    }

    /// Unbinds a shape from its ROI and the arena. Leaves an emptied ROI in
    /// place; callers decide whether to drop it.
    pub(crate) fn take_shape(&mut self, id: ShapeId) -> Option<RoiShape> {
        let shape = self.shapes.remove(&id)?;
        if let Some(roi) = self.rois.get_mut(&shape.roi) {
            roi.remove_plane(&shape.coord);
        }
        Some(shape)
    }

    pub(crate) fn remove_if_empty(&mut self, id: RoiId) -> bool {
        let empty = self.rois.get(&id).is_some_and(Roi::is_empty);
        if empty {
            self.rois.remove(&id);
            debug!(%id, "removed emptied ROI");
        }
        empty
    }

    pub(crate) fn bump_counters_past(&mut self, id: RoiId) {
        if id.is_client_side() && id.0 <= self.next_client_id {
            self.next_client_id = id.0 - 1;
        }
    }
}
