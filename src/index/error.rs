use crate::model::{Coord3D, ModelError, RoiId, ShapeId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("{0} not found")]
    RoiNotFound(RoiId),

    #[error("{0} not found")]
    ShapeNotFound(ShapeId),

    #[error("{roi} has no shape at {coord}")]
    PlaneNotFound { roi: RoiId, coord: Coord3D },

    #[error("{roi} already holds a shape at {coord}")]
    DuplicatePlane { roi: RoiId, coord: Coord3D },

    #[error("more than one selected shape lies on plane {coord}")]
    OverlappingPlanes { coord: Coord3D },

    #[error("{0} already exists")]
    DuplicateRoi(RoiId),

    #[error("persisted ROI ids must be non-negative, got {0}")]
    InvalidRoiId(RoiId),

    #[error("{shape} does not belong to {roi}")]
    ForeignShape { shape: ShapeId, roi: RoiId },

    #[error("operation needs at least one shape")]
    EmptySelection,

    #[error("{shape} is {reason}")]
    ShapeProtected { shape: ShapeId, reason: &'static str },

    #[error("range {from} to {to} spans more than {limit} planes")]
    RangeTooLarge {
        from: Coord3D,
        to: Coord3D,
        limit: usize,
    },

    #[error("{0} cannot be deleted")]
    RoiProtected(RoiId),

    #[error("invalid geometry: {0}")]
    Geometry(#[from] ModelError),

    #[error("index invariant violated: {0}")]
    Corrupted(String),
}

impl IndexError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IndexError::RoiNotFound(_)
                | IndexError::ShapeNotFound(_)
                | IndexError::PlaneNotFound { .. }
        )
    }
}
