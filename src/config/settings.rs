use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::index::DEFAULT_NAMESPACE;
use crate::stats::ChannelInfo;

use super::{ConfigError, Result};

/// Longest accepted statistics timeout, one hour.
pub const MAX_STATS_TIMEOUT_MS: u64 = 3_600_000;

/// Settings a session starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Namespace stamped on ROIs created in this session.
    pub namespace: String,
    pub active_channels: Vec<usize>,
    pub channels: Vec<ChannelInfo>,
    /// How long blocking callers wait for a statistics request.
    pub stats_timeout_ms: u64,
    /// Keep path-ordered samples of open paths in statistics records.
    pub retain_profiles: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            active_channels: vec![0],
            channels: Vec::new(),
            stats_timeout_ms: 5_000,
            retain_profiles: true,
        }
    }
}

impl SessionConfig {
    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".into()));
        }
        if self.stats_timeout_ms == 0 || self.stats_timeout_ms > MAX_STATS_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "stats_timeout_ms must be between 1 and {MAX_STATS_TIMEOUT_MS}"
            )));
        }
        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.index) {
                return Err(ConfigError::Invalid(format!(
                    "channel {} is described twice",
                    channel.index
                )));
            }
            if channel.global_min > channel.global_max {
                return Err(ConfigError::Invalid(format!(
                    "channel {} has global_min above global_max",
                    channel.index
                )));
            }
        }
        if !self.channels.is_empty() {
            if let Some(unknown) = self
                .active_channels
                .iter()
                .find(|channel| !seen.contains(*channel))
            {
                return Err(ConfigError::Invalid(format!(
                    "active channel {unknown} has no channel metadata"
                )));
            }
        }
        Ok(())
    }
}
