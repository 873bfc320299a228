use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::model::ShapeId;

use super::{ChannelInfoProvider, StatsRecord};

/// Cache of per-shape, per-channel statistics plus the shared intensity axis
/// of the active channels.
#[derive(Debug, Clone, Default)]
pub struct StatisticsEngine {
    records: BTreeMap<(ShapeId, usize), StatsRecord>,
    active_channels: BTreeSet<usize>,
    bounds: Option<(f64, f64)>,
}

impl StatisticsEngine {
    pub fn new(active_channels: impl IntoIterator<Item = usize>) -> Self {
        Self {
            records: BTreeMap::new(),
            active_channels: active_channels.into_iter().collect(),
            bounds: None,
        }
    }

    pub fn active_channels(&self) -> Vec<usize> {
        self.active_channels.iter().copied().collect()
    }

    pub fn is_active(&self, channel: usize) -> bool {
        self.active_channels.contains(&channel)
    }

    /// Replaces the active channel set. Records of channels that stay active
    /// are kept; the rest are dropped together with the cached bounds.
    /// Returns the number of dropped records.
    pub fn set_active_channels(&mut self, channels: impl IntoIterator<Item = usize>) -> usize {
        self.active_channels = channels.into_iter().collect();
        self.bounds = None;
        let before = self.records.len();
        let active = &self.active_channels;
        self.records
            .retain(|(_, channel), _| active.contains(channel));
        before - self.records.len()
    }

    /// Stores fresh records. A record is refused when the cache already holds
    /// one from a newer request or its channel is not active. Returns the
    /// records that were stored.
    pub fn store(&mut self, records: Vec<StatsRecord>) -> Vec<StatsRecord> {
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            if !self.active_channels.contains(&record.channel) {
                continue;
            }
            let key = (record.shape, record.channel);
            if let Some(existing) = self.records.get(&key) {
                if existing.request > record.request {
                    debug!(
                        shape = %record.shape,
                        channel = record.channel,
                        "ignored statistics older than cached ones"
                    );
                    continue;
                }
            }
            self.records.insert(key, record.clone());
            stored.push(record);
        }
        stored
    }

    pub fn record(&self, shape: ShapeId, channel: usize) -> Option<&StatsRecord> {
        self.records.get(&(shape, channel))
    }

    pub fn records_for(&self, shape: ShapeId) -> Vec<&StatsRecord> {
        self.records
            .range((shape, 0)..=(shape, usize::MAX))
            .map(|(_, record)| record)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &StatsRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops every channel's record of the given shapes.
    pub fn invalidate(&mut self, shapes: impl IntoIterator<Item = ShapeId>) -> usize {
        let shapes = shapes.into_iter().collect::<BTreeSet<_>>();
        if shapes.is_empty() {
            return 0;
        }
        let before = self.records.len();
        self.records.retain(|(shape, _), _| !shapes.contains(shape));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.bounds = None;
    }

    /// Smallest global minimum and largest global maximum over the active
    /// channels, from channel metadata. Cached until the active set changes.
    pub fn global_bounds<P>(&mut self, provider: &P) -> Option<(f64, f64)>
    where
        P: ChannelInfoProvider + ?Sized,
    {
        if self.bounds.is_none() {
            self.bounds = self
                .active_channels
                .iter()
                .filter_map(|channel| provider.channel_info(*channel))
                .fold(None, |bounds: Option<(f64, f64)>, info| {
                    Some(match bounds {
                        Some((min, max)) => (min.min(info.global_min), max.max(info.global_max)),
                        None => (info.global_min, info.global_max),
                    })
                });
        }
        self.bounds
    }

    pub fn cached_bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }
}
