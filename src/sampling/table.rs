use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{RoiId, RoiShape};

use super::{ChannelSamples, PixelSampler, Result, SampleError};

/// Samples recorded ahead of time for one ROI plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub roi: RoiId,
    pub z: usize,
    pub t: usize,
    pub channels: BTreeMap<usize, Vec<f64>>,
}

/// A sampler answering from pre-recorded samples, e.g. exported by the image
/// server for offline analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleTable {
    #[serde(default)]
    pub samples: Vec<SampleEntry>,
}

impl SampleTable {
    pub fn new(samples: Vec<SampleEntry>) -> Self {
        Self { samples }
    }

    fn entry(&self, roi: RoiId, z: usize, t: usize) -> Option<&SampleEntry> {
        self.samples
            .iter()
            .find(|entry| entry.roi == roi && entry.z == z && entry.t == t)
    }
}

impl PixelSampler for SampleTable {
    fn sample(&self, shape: &RoiShape, channels: &[usize]) -> Result<ChannelSamples> {
        let entry = self
            .entry(shape.roi, shape.coord.z, shape.coord.t)
            .ok_or_else(|| SampleError::Missing(format!("{} at {}", shape.roi, shape.coord)))?;
        Ok(channels
            .iter()
            .filter_map(|channel| {
                entry
                    .channels
                    .get(channel)
                    .map(|values| (*channel, values.clone()))
            })
            .collect())
    }
}
