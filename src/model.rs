mod annotations;
mod coord;
mod error;
mod geometry;
mod roi;
mod shape;

#[cfg(test)]
mod tests;

pub use annotations::ShapeAnnotations;
pub use coord::{Coord3D, MAX_RANGE_PLANES};
pub use error::{ModelError, Result};
pub use geometry::{Bounds, FigureKind, Geometry, Point2};
pub use roi::{FolderRef, Roi, RoiId, parse_selector};
pub use shape::{RoiShape, ShapeId};
