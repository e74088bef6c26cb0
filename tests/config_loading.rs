//! Integration test: Configuration utilities
//!
//! Tests the bin_common path helpers together with loading the shipped
//! configuration file.

use std::env;
use std::io::Write;
use workhub_dashboard::bin_common::{load_config_from_env, ConfigType};
use workhub_dashboard::workhub::{DeliveryMode, WorkhubConfig};

#[test]
fn test_workhub_config_default() {
    // Clear env var to test default
    env::remove_var("WORKHUB_CONFIG_PATH");

    let config_path = load_config_from_env(ConfigType::Workhub);
    assert_eq!(config_path.to_str().unwrap(), "config/workhub.yaml");
}

#[test]
fn test_custom_config() {
    let custom = ConfigType::Custom("custom/path.yaml".to_string());
    let config_path = load_config_from_env(custom);

    assert_eq!(config_path.to_str().unwrap(), "custom/path.yaml");
}

#[test]
fn test_shipped_config_parses() {
    let yaml = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/config/workhub.yaml"
    ))
    .unwrap();
    let config = WorkhubConfig::from_yaml_str(&yaml).unwrap();

    config.validate().unwrap();
    assert_eq!(config.socket.base_url, "ws://localhost:8000/ws");
    assert_eq!(config.socket.reconnect.max_attempts, Some(5));
    assert_eq!(config.sync.pending_ttl_secs, 10);
    assert_eq!(config.sync.delivery, DeliveryMode::Socket);
    assert!(config.token.is_none());
}

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "sync:\n  delivery: rest\nlog_level: debug").unwrap();

    let yaml = std::fs::read_to_string(file.path()).unwrap();
    let config = WorkhubConfig::from_yaml_str(&yaml).unwrap();

    config.validate().unwrap();
    assert_eq!(config.sync.delivery, DeliveryMode::Rest);
    assert_eq!(config.sync.activity_feed_limit, 50);
    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert_eq!(config.log_level, "debug");
}
