//! Deadline-threshold eviction on top of any [`PriorityStore`].
//!
//! The scheduler owns no timer. An external driver (see [`crate::runtime`])
//! calls [`DeadlineScheduler::poll`]; each poll releases the earliest item if
//! its deadline falls inside the removal threshold (a grace window ahead of
//! the deadline that absorbs driver jitter and dispatch latency).

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::core::{Item, PriorityStore, QueueError, RemovalListener};
use crate::util::clock::{now_ms, Timestamp};
use crate::util::shutdown::ShutdownSignal;

/// Result of one poll cycle.
#[derive(Debug)]
pub enum PollOutcome<P> {
    /// No queued item carries a deadline.
    Idle,
    /// The earliest item is still outside the removal threshold.
    NotYetDue {
        /// Its deadline.
        deadline: Timestamp,
        /// Time left until the deadline itself.
        due_in: Duration,
    },
    /// The earliest item was evicted and is ready for dispatch.
    Ready(Item<P>),
}

impl<P> PollOutcome<P> {
    /// The released item, if any.
    pub fn into_ready(self) -> Option<Item<P>> {
        match self {
            Self::Ready(item) => Some(item),
            _ => None,
        }
    }
}

/// Evicts items whose deadline is closer than `removal_threshold`.
pub struct DeadlineScheduler<P, S: ?Sized = dyn PriorityStore<P>> {
    store: Arc<S>,
    removal_threshold: Duration,
    listeners: Vec<Arc<dyn RemovalListener>>,
    _payload: PhantomData<fn() -> P>,
}

impl<P, S> DeadlineScheduler<P, S>
where
    S: PriorityStore<P> + ?Sized,
{
    /// Create a scheduler over `store`.
    ///
    /// # Errors
    ///
    /// `QueueError::InvalidConfiguration` if the threshold is zero.
    pub fn new(store: Arc<S>, removal_threshold: Duration) -> Result<Self, QueueError> {
        if removal_threshold.is_zero() {
            return Err(QueueError::InvalidConfiguration(
                "removal threshold must be greater than zero".into(),
            ));
        }
        Ok(Self {
            store,
            removal_threshold,
            listeners: Vec::new(),
            _payload: PhantomData,
        })
    }

    /// Create a scheduler using the threshold from `config`.
    ///
    /// # Errors
    ///
    /// `QueueError::InvalidConfiguration` if the configuration is invalid.
    pub fn from_config(store: Arc<S>, config: &QueueConfig) -> Result<Self, QueueError> {
        config.validate().map_err(QueueError::InvalidConfiguration)?;
        Self::new(store, config.removal_threshold())
    }

    /// Register a removal listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn RemovalListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Register a removal listener on an existing scheduler.
    pub fn add_listener(&mut self, listener: Arc<dyn RemovalListener>) {
        self.listeners.push(listener);
    }

    /// The backend being drained.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Configured grace window.
    pub const fn removal_threshold(&self) -> Duration {
        self.removal_threshold
    }

    /// Run one poll cycle against the wall clock.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; an empty backend is `Ok(PollOutcome::Idle)`.
    pub fn poll(&self) -> Result<PollOutcome<P>, QueueError> {
        self.poll_at(now_ms())
    }

    /// Run one poll cycle as if the time were `now`.
    ///
    /// An item is released when `deadline - now < removal_threshold`. The
    /// check and the pop are one atomic backend operation.
    ///
    /// # Errors
    ///
    /// Propagates backend failures; an empty backend is `Ok(PollOutcome::Idle)`.
    pub fn poll_at(&self, now: Timestamp) -> Result<PollOutcome<P>, QueueError> {
        // Deadlines are whole milliseconds, so `d < now + t` is
        // `d <= now + ceil_ms(t) - 1` for fractional thresholds too.
        let threshold_ms = self.removal_threshold.as_nanos().div_ceil(1_000_000);
        let cutoff = (now + threshold_ms).saturating_sub(1);
        if let Some(item) = self.store.pop_due(cutoff)? {
            if let Some(id) = item.id() {
                info!(item = %id, deadline = ?item.deadline_ms(), now, "evicting item inside removal threshold");
                for listener in &self.listeners {
                    listener.on_removed(id);
                }
            }
            return Ok(PollOutcome::Ready(item));
        }

        Ok(match self.store.peek_deadline()? {
            None => PollOutcome::Idle,
            Some(deadline) => {
                let left = deadline.saturating_sub(now);
                debug!(deadline, due_in_ms = left, "earliest item not yet due");
                PollOutcome::NotYetDue {
                    deadline,
                    due_in: Duration::from_millis(u64::try_from(left).unwrap_or(u64::MAX)),
                }
            }
        })
    }

    /// Poll until `shutdown` fires, handing every released item to `dispatch`.
    ///
    /// Releases are drained back to back; otherwise the loop sleeps `interval`
    /// between cycles, waking early on shutdown. Backend failures are logged
    /// and retried on the next cycle. Returns the number of dispatched items.
    pub fn run_blocking(
        &self,
        shutdown: &ShutdownSignal,
        interval: Duration,
        mut dispatch: impl FnMut(Item<P>),
    ) -> u64 {
        let mut dispatched = 0;
        info!(interval_ms = interval.as_millis(), threshold_ms = self.removal_threshold.as_millis(), "deadline poller started");
        while !shutdown.is_triggered() {
            match self.poll() {
                Ok(PollOutcome::Ready(item)) => {
                    dispatched += 1;
                    dispatch(item);
                    continue;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "deadline poll failed"),
            }
            if shutdown.wait_timeout(interval) {
                break;
            }
        }
        info!(dispatched, "deadline poller stopped");
        dispatched
    }
}
