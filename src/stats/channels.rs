use serde::{Deserialize, Serialize};

/// Display metadata of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub index: usize,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    pub global_min: f64,
    pub global_max: f64,
}

fn default_color() -> [u8; 3] {
    [255, 255, 255]
}

impl ChannelInfo {
    pub fn new(index: usize, name: impl Into<String>, global_min: f64, global_max: f64) -> Self {
        Self {
            index,
            name: name.into(),
            color: default_color(),
            global_min,
            global_max,
        }
    }
}

pub trait ChannelInfoProvider {
    fn channel_info(&self, channel: usize) -> Option<&ChannelInfo>;
}

impl ChannelInfoProvider for [ChannelInfo] {
    fn channel_info(&self, channel: usize) -> Option<&ChannelInfo> {
        self.iter().find(|info| info.index == channel)
    }
}

impl ChannelInfoProvider for Vec<ChannelInfo> {
    fn channel_info(&self, channel: usize) -> Option<&ChannelInfo> {
        self.as_slice().channel_info(channel)
    }
}
