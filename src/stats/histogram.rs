use serde::{Deserialize, Serialize};

use super::{Result, StatsError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Bins `samples` into `bins` equal buckets over `[min, max]`. The upper bound
/// falls into the last bucket; values outside the bounds and non-finite values
/// are not counted.
pub fn histogram(samples: &[f64], bins: usize, (min, max): (f64, f64)) -> Result<Histogram> {
    if bins == 0 {
        return Err(StatsError::NoBins);
    }
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(StatsError::InvalidBounds { min, max });
    }
    let mut counts = vec![0usize; bins];
    let scale = bins as f64 / (max - min);
    for value in samples {
        if !value.is_finite() || *value < min || *value > max {
            continue;
        }
        let bin = (((value - min) * scale) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    Ok(Histogram { min, max, counts })
}
