use std::collections::BTreeMap;

use crate::model::RoiShape;

use super::Result;

/// Intensity samples per channel index.
pub type ChannelSamples = BTreeMap<usize, Vec<f64>>;

/// Reads raw intensities under a shape's footprint on the shape's plane.
///
/// Open paths must be sampled in path order. Other figures may use any order
/// as long as it is stable between calls.
pub trait PixelSampler: Send + Sync {
    fn sample(&self, shape: &RoiShape, channels: &[usize]) -> Result<ChannelSamples>;
}
