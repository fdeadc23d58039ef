//! Configuration models for the queue, its backend, and its drivers.

pub mod queue;

pub use queue::{BackendConfig, QueueConfig};
