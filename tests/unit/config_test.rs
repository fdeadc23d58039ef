//! Tests for configuration validation

use std::time::Duration;

use prometheus_deadline_queue::config::{BackendConfig, QueueConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = QueueConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.removal_threshold(), Duration::from_secs(5));
    assert_eq!(cfg.backend, BackendConfig::InMemory);
}

#[test]
fn test_negative_threshold_rejected() {
    let cfg = QueueConfig {
        removal_threshold_ms: -5,
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_interval_rejected() {
    let cfg = QueueConfig {
        poll_interval_ms: 0,
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_fanout_capacity_rejected() {
    let cfg = QueueConfig {
        fanout_capacity: 0,
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_empty_redis_url_rejected() {
    let cfg = QueueConfig {
        backend: BackendConfig::Redis {
            url: "  ".to_string(),
            key: "tasks".to_string(),
        },
        ..QueueConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "removal_threshold_ms": 1500,
        "poll_interval_ms": 20,
        "backend": { "type": "redis", "url": "redis://127.0.0.1:6379" },
        "fanout_capacity": 8
    }"#;

    let cfg = QueueConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.removal_threshold(), Duration::from_millis(1_500));
    assert_eq!(cfg.poll_interval(), Duration::from_millis(20));
    assert_eq!(
        cfg.backend,
        BackendConfig::Redis {
            url: "redis://127.0.0.1:6379".to_string(),
            key: "tasks".to_string(),
        }
    );
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = QueueConfig::from_json_str(r#"{ "poll_interval_ms": 250 }"#).unwrap();
    assert_eq!(cfg.poll_interval_ms, 250);
    assert_eq!(cfg.removal_threshold_ms, 5_000);
}

#[test]
fn test_from_json_str_invalid() {
    assert!(QueueConfig::from_json_str("not json").is_err());
    assert!(QueueConfig::from_json_str(r#"{ "removal_threshold_ms": 0 }"#).is_err());
    assert!(QueueConfig::from_json_str(r#"{ "backend": { "type": "postgres" } }"#).is_err());
}
