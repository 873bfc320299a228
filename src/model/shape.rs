use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coord3D, Geometry, RoiId, ShapeAnnotations};

/// Stable arena id of a shape. Never reused inside one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(pub u64);

impl fmt::Display for ShapeId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "shape#{}", self.0)
    }
}

/// One figure bound to one plane of one ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiShape {
    pub id: ShapeId,
    pub roi: RoiId,
    pub coord: Coord3D,
    pub geometry: Geometry,
    pub annotations: ShapeAnnotations,
}

impl RoiShape {
    pub fn new(id: ShapeId, roi: RoiId, coord: Coord3D, geometry: Geometry) -> Self {
        let annotations = ShapeAnnotations::measured(&geometry);
        Self {
            id,
            roi,
            coord,
            geometry,
            annotations,
        }
    }

    /// Deep copy of the figure and annotations under a new identity.
    pub fn copy_to(&self, id: ShapeId, roi: RoiId, coord: Coord3D) -> Self {
        Self {
            id,
            roi,
            coord,
            geometry: self.geometry.clone(),
            annotations: self.annotations.clone(),
        }
    }

    pub fn is_open_path(&self) -> bool {
        self.geometry.is_open_path()
    }
}
