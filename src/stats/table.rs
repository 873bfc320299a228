use serde::{Deserialize, Serialize};

use crate::index::RoiComponent;
use crate::model::{FigureKind, RoiId, ShapeId};

use super::{ChannelInfoProvider, StatisticsEngine};

/// One line of the results table: a shape on a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub roi: RoiId,
    pub shape: ShapeId,
    pub z: usize,
    pub t: usize,
    pub channel: usize,
    pub channel_name: Option<String>,
    pub figure: FigureKind,
    pub text: Option<String>,
    pub area: Option<f64>,
    pub length: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    pub stddev: f64,
    pub pixel_count: usize,
}

/// Projects the cached statistics onto the shapes still present in `index`,
/// in ROI, plane and channel order.
pub fn result_rows<P>(
    index: &RoiComponent,
    engine: &StatisticsEngine,
    channels: &P,
) -> Vec<ResultRow>
where
    P: ChannelInfoProvider + ?Sized,
{
    let mut rows = Vec::new();
    for roi in index.rois() {
        for shape_id in roi.shape_ids() {
            let Some(shape) = index.shape(shape_id) else {
                continue;
            };
            for record in engine.records_for(shape_id) {
                rows.push(ResultRow {
                    roi: roi.id,
                    shape: shape_id,
                    z: shape.coord.z,
                    t: shape.coord.t,
                    channel: record.channel,
                    channel_name: channels
                        .channel_info(record.channel)
                        .map(|info| info.name.clone()),
                    figure: shape.geometry.kind(),
                    text: shape.annotations.text.clone(),
                    area: shape.annotations.area,
                    length: shape.annotations.length,
                    min: record.values.min,
                    max: record.values.max,
                    sum: record.values.sum,
                    mean: record.values.mean,
                    stddev: record.values.stddev,
                    pixel_count: record.values.pixel_count,
                });
            }
        }
    }
    rows
}
