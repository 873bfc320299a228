use std::fs;

use crate::stats::ChannelInfo;

use super::{
    ConfigError, MAX_STATS_TIMEOUT_MS, SessionConfig, load_config, save_config,
};

#[test]
fn defaults_are_valid() {
    let config = SessionConfig::default();
    config.validate().expect("valid");
    assert_eq!(config.active_channels, vec![0]);
    assert!(config.retain_profiles);
}

#[test]
fn yaml_fills_missing_fields_with_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.yaml");
    fs::write(
        &path,
        "active_channels: [1]\nchannels:\n  - index: 1\n    name: GFP\n    global_min: 0.0\n    global_max: 255.0\n",
    )
    .expect("write");

    let config = load_config(&path).expect("load");
    assert_eq!(config.active_channels, vec![1]);
    assert_eq!(config.channels[0].color, [255, 255, 255]);
    assert_eq!(config.stats_timeout_ms, 5_000);
}

#[test]
fn json_round_trips_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    let config = SessionConfig {
        namespace: "lab/nuclei".into(),
        active_channels: vec![0, 2],
        channels: vec![
            ChannelInfo::new(0, "DAPI", 0.0, 4095.0),
            ChannelInfo::new(2, "RFP", 10.0, 900.0),
        ],
        stats_timeout_ms: 250,
        retain_profiles: false,
    };
    save_config(&path, &config).expect("save");
    assert_eq!(load_config(&path).expect("load"), config);
}

#[test]
fn active_channel_without_metadata_is_rejected() {
    let config = SessionConfig {
        active_channels: vec![0, 3],
        channels: vec![ChannelInfo::new(0, "DAPI", 0.0, 1.0)],
        ..SessionConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn inverted_channel_bounds_are_rejected() {
    let config = SessionConfig {
        channels: vec![ChannelInfo::new(0, "DAPI", 10.0, 1.0)],
        ..SessionConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn stats_timeout_is_bounded() {
    for stats_timeout_ms in [0, MAX_STATS_TIMEOUT_MS + 1, u64::MAX] {
        let config = SessionConfig {
            stats_timeout_ms,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
    let longest = SessionConfig {
        stats_timeout_ms: MAX_STATS_TIMEOUT_MS,
        ..SessionConfig::default()
    };
    longest.validate().expect("upper bound");
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.json");
    fs::write(&path, "{ not json").expect("write");
    assert!(matches!(load_config(&path), Err(ConfigError::SerdeJson(_))));
}
