use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::{Geometry, ShapeId};

/// Monotonic tag of a statistics request. Higher ids are newer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "request#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
    pub pixel_count: usize,
    /// Samples in path order; empty unless the figure is an open path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ordered_samples: Vec<f64>,
}

/// Statistics of one shape on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub shape: ShapeId,
    pub channel: usize,
    pub request: RequestId,
    #[serde(flatten)]
    pub values: Aggregate,
}

/// Reduces one channel's samples. Returns `None` for an empty array.
pub fn aggregate(samples: &[f64], keep_order: bool) -> Option<Aggregate> {
    if samples.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for value in samples {
        min = min.min(*value);
        max = max.max(*value);
        sum += value;
    }
    let count = samples.len() as f64;
    let mean = sum / count;
    let variance = samples
        .iter()
        .map(|value| (value - mean) * (value - mean))
        .sum::<f64>()
        / count;
    Some(Aggregate {
        min,
        max,
        sum,
        mean,
        stddev: variance.sqrt(),
        pixel_count: samples.len(),
        ordered_samples: if keep_order {
            samples.to_vec()
        } else {
            Vec::new()
        },
    })
}

/// Aggregates every channel of one sampled shape. Channels with no samples
/// produce no record.
pub fn summarize(
    shape: ShapeId,
    geometry: &Geometry,
    request: RequestId,
    samples: &BTreeMap<usize, Vec<f64>>,
) -> Vec<StatsRecord> {
    let keep_order = geometry.is_open_path();
    samples
        .par_iter()
        .filter_map(|(channel, values)| {
            aggregate(values, keep_order).map(|values| StatsRecord {
                shape,
                channel: *channel,
                request,
                values,
            })
        })
        .collect()
}
