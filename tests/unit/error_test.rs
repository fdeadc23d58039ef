//! Tests for error types

use prometheus_deadline_queue::core::{ItemId, QueueError};

#[test]
fn test_empty_queue_error() {
    let err = QueueError::EmptyQueue;
    assert_eq!(format!("{err}"), "queue is empty");
    assert!(err.is_absent());
}

#[test]
fn test_not_found_error() {
    let id = ItemId::new();
    let err = QueueError::NotFound(id);
    assert_eq!(format!("{err}"), format!("item {id} not found"));
    assert!(err.is_absent());
}

#[test]
fn test_backend_unavailable_error() {
    let err = QueueError::BackendUnavailable("connection refused".to_string());
    assert_eq!(format!("{err}"), "backend unavailable: connection refused");
    assert!(!err.is_absent());
}

#[test]
fn test_backend_error() {
    let err = QueueError::Backend("WRONGTYPE".to_string());
    assert_eq!(format!("{err}"), "backend error: WRONGTYPE");
    assert!(!err.is_absent());
}

#[test]
fn test_invalid_item_error() {
    let err = QueueError::InvalidItem("no deadline".to_string());
    assert_eq!(format!("{err}"), "invalid item: no deadline");
}

#[test]
fn test_into_anyhow_keeps_message() {
    let err: anyhow::Error = QueueError::InvalidConfiguration("threshold".to_string()).into();
    assert_eq!(err.to_string(), "invalid configuration: threshold");
    assert!(err.downcast_ref::<QueueError>().is_some());
}
