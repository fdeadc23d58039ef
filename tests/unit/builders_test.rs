//! Tests for builder modules

use prometheus_deadline_queue::builders::{build_fanout, build_scheduler, build_store};
use prometheus_deadline_queue::config::{BackendConfig, QueueConfig};
use prometheus_deadline_queue::core::{Item, Priority, QueueError};

#[test]
fn test_build_in_memory_store() {
    let store = build_store::<String>(&QueueConfig::default()).unwrap();
    store.insert(Item::with_deadline("a".to_string(), 10)).unwrap();
    store
        .insert(Item::with_priority("b".to_string(), Priority::HIGH))
        .unwrap();
    assert_eq!(store.len().unwrap(), 2);
    assert_eq!(store.peek_deadline().unwrap(), Some(10));
}

#[test]
fn test_build_scheduler_uses_configured_threshold() {
    let cfg = QueueConfig {
        removal_threshold_ms: 1_000,
        ..QueueConfig::default()
    };
    let scheduler = build_scheduler::<u32>(&cfg).unwrap();
    assert_eq!(scheduler.removal_threshold().as_millis(), 1_000);

    scheduler.store().insert(Item::with_deadline(1, 5_000)).unwrap();
    assert!(scheduler.poll_at(3_000).unwrap().into_ready().is_none());
    assert!(scheduler.poll_at(4_001).unwrap().into_ready().is_some());
}

#[test]
fn test_build_store_rejects_invalid_config() {
    let cfg = QueueConfig {
        backend: BackendConfig::Redis {
            url: String::new(),
            key: "tasks".to_string(),
        },
        ..QueueConfig::default()
    };
    assert!(matches!(
        build_store::<u32>(&cfg),
        Err(QueueError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_build_fanout_uses_capacity() {
    let cfg = QueueConfig {
        fanout_capacity: 2,
        ..QueueConfig::default()
    };
    let report = build_fanout::<u32>(&cfg)
        .route("all", |_| true)
        .run_consumers(0..20u32, |_, _| {})
        .unwrap();
    assert_eq!(report.delivered_to("all"), Some(20));
}
