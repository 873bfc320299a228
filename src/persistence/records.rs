use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::{IndexError, RoiComponent};
use crate::model::{Coord3D, FolderRef, Geometry, Roi, RoiId, RoiShape, ShapeAnnotations};

use super::{PersistError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub coord: Coord3D,
    pub geometry: Geometry,
    #[serde(default)]
    pub annotations: ShapeAnnotations,
}

/// One ROI with all of its shapes in plane order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub id: RoiId,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub client_side: bool,
    #[serde(default = "default_true")]
    pub deletable: bool,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub folders: Vec<FolderRef>,
    pub shapes: Vec<ShapeRecord>,
}

fn default_true() -> bool {
    true
}

/// File layout of a saved ROI set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoiDocument {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub rois: Vec<RoiRecord>,
}

impl RoiDocument {
    pub fn new(image: Option<String>, rois: Vec<RoiRecord>) -> Self {
        Self { image, rois }
    }

    pub fn shape_count(&self) -> usize {
        self.rois.iter().map(|roi| roi.shapes.len()).sum()
    }
}

pub fn export_records(index: &RoiComponent) -> Vec<RoiRecord> {
    index
        .rois()
        .map(|roi| RoiRecord {
            id: roi.id,
            owner_id: roi.owner_id,
            client_side: roi.client_side,
            deletable: roi.deletable,
            namespace: Some(roi.namespace.clone()),
            folders: roi.folders.iter().cloned().collect(),
            shapes: roi
                .shape_ids()
                .filter_map(|id| index.shape(id))
                .map(|shape| ShapeRecord {
                    coord: shape.coord,
                    geometry: shape.geometry.clone(),
                    annotations: shape.annotations.clone(),
                })
                .collect(),
        })
        .collect()
}

fn check_records(index: &RoiComponent, records: &[RoiRecord]) -> Result<()> {
    let mut ids = BTreeSet::new();
    for record in records {
        if !ids.insert(record.id) || index.roi(record.id).is_some() {
            return Err(IndexError::DuplicateRoi(record.id).into());
        }
        if record.shapes.is_empty() {
            return Err(PersistError::Parse(format!("{} has no shapes", record.id)));
        }
        let mut planes = BTreeSet::new();
        for shape in &record.shapes {
            if !planes.insert(shape.coord) {
                return Err(IndexError::DuplicatePlane {
                    roi: record.id,
                    coord: shape.coord,
                }
                .into());
            }
            shape.geometry.validate().map_err(IndexError::from)?;
        }
    }
    Ok(())
}

/// Adds every record to the index. Nothing is inserted unless all records
/// fit: ids must be new and each ROI's planes distinct.
pub fn import_records(index: &mut RoiComponent, records: Vec<RoiRecord>) -> Result<Vec<RoiId>> {
    check_records(index, &records)?;
    let mut loaded = Vec::with_capacity(records.len());
    for record in records {
        let namespace = record
            .namespace
            .unwrap_or_else(|| index.namespace().to_string());
        let mut roi = Roi::new(record.id, namespace);
        roi.owner_id = record.owner_id;
        roi.client_side = record.client_side || record.id.is_client_side();
        roi.deletable = record.deletable;
        roi.folders = record.folders.into_iter().collect();
        index.bump_counters_past(record.id);
        index.insert_roi(roi)?;
        for shape in record.shapes {
            let id = index.allocate_shape_id();
            let mut restored = RoiShape::new(id, record.id, shape.coord, shape.geometry);
            restored.annotations = shape.annotations;
            restored.annotations.refresh_measurements(&restored.geometry);
            index.insert_shape(restored)?;
        }
        loaded.push(record.id);
    }
    debug!(rois = loaded.len(), "imported ROI records");
    Ok(loaded)
}
