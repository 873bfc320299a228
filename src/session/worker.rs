use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{RoiShape, ShapeId};
use crate::sampling::PixelSampler;
use crate::stats::{RequestId, StatsRecord, summarize};

use super::{Result, SessionError};

/// A shape that produced no statistics, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unavailable {
    pub shape: ShapeId,
    pub reason: String,
}

/// Outcome of one statistics request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub request: RequestId,
    pub records: Vec<StatsRecord>,
    pub unavailable: Vec<Unavailable>,
}

impl StatisticsReport {
    pub fn new(request: RequestId) -> Self {
        Self {
            request,
            records: Vec::new(),
            unavailable: Vec::new(),
        }
    }
}

/// Snapshot of everything a worker needs; the worker never sees the index.
pub(crate) struct StatisticsJob {
    pub request: RequestId,
    pub shapes: Vec<RoiShape>,
    pub channels: Vec<usize>,
    pub retain_profiles: bool,
    pub cancel: Arc<AtomicBool>,
    pub sampler: Arc<dyn PixelSampler>,
}

impl StatisticsJob {
    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn run(self) -> Option<StatisticsReport> {
        let mut report = StatisticsReport::new(self.request);
        for shape in &self.shapes {
            if self.is_cancelled() {
                debug!(request = %self.request, "statistics request cancelled");
                return None;
            }
            match self.sampler.sample(shape, &self.channels) {
                Ok(samples) => {
                    let mut records = summarize(shape.id, &shape.geometry, self.request, &samples);
                    if records.is_empty() {
                        report.unavailable.push(Unavailable {
                            shape: shape.id,
                            reason: "sampler returned no samples".into(),
                        });
                    }
                    if !self.retain_profiles {
                        for record in &mut records {
                            record.values.ordered_samples.clear();
                        }
                    }
                    report.records.extend(records);
                }
                Err(error) => {
                    warn!(request = %self.request, shape = %shape.id, %error, "sampling failed");
                    report.unavailable.push(Unavailable {
                        shape: shape.id,
                        reason: error.to_string(),
                    });
                }
            }
        }
        if self.is_cancelled() {
            debug!(request = %self.request, "statistics request cancelled");
            return None;
        }
        Some(report)
    }
}

/// Runs `job` on its own thread and sends the report back unless cancelled.
pub(crate) fn spawn(job: StatisticsJob, reports: Sender<StatisticsReport>) -> Result<()> {
    let name = format!("roi-stats-{}", job.request.0);
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            if let Some(report) = job.run() {
                if reports.send(report).is_err() {
                    debug!("session dropped before statistics arrived");
                }
            }
        })
        .map(|_| ())
        .map_err(|error| SessionError::Worker(error.to_string()))
}
