//! Error types for queue and scheduler operations.

use thiserror::Error;

use crate::core::ItemId;

/// Errors produced by queue backends and the scheduler.
///
/// `EmptyQueue` and `NotFound` are expected outcomes a caller treats as
/// "nothing to do"; `BackendUnavailable` and `Backend` are failures the caller
/// must log or escalate.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Peek or pop on an empty backend.
    #[error("queue is empty")]
    EmptyQueue,
    /// The referenced item is not queued. Returned by
    /// [`Registry::take`](crate::core::Registry::take); the `remove` methods
    /// report absence as `false` instead.
    #[error("item {0} not found")]
    NotFound(ItemId),
    /// The backend could not be reached or has been closed.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The item cannot be admitted by this backend.
    #[error("invalid item: {0}")]
    InvalidItem(String),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
    /// Payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl QueueError {
    /// Whether this error means "empty or absent" rather than a failure.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::EmptyQueue | Self::NotFound(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
