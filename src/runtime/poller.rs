//! Dedicated OS thread that drives a scheduler until shut down.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error};

use crate::core::{DeadlineScheduler, Item, PriorityStore, QueueError};
use crate::util::shutdown::ShutdownSignal;

/// Handle to a named poller thread.
///
/// Dropping the handle triggers shutdown without waiting; call
/// [`SchedulerThread::join`] to wait and collect the dispatch count.
pub struct SchedulerThread {
    shutdown: ShutdownSignal,
    handle: Option<JoinHandle<u64>>,
}

impl SchedulerThread {
    /// Start polling `scheduler` every `interval`, passing released items to
    /// `dispatch` on the poller thread.
    ///
    /// # Errors
    ///
    /// `QueueError::Backend` if the OS refuses to create the thread.
    pub fn spawn<P, S, F>(
        scheduler: Arc<DeadlineScheduler<P, S>>,
        interval: Duration,
        dispatch: F,
    ) -> Result<Self, QueueError>
    where
        P: Send + 'static,
        S: PriorityStore<P> + ?Sized + 'static,
        F: FnMut(Item<P>) + Send + 'static,
    {
        let shutdown = ShutdownSignal::new();
        let signal = shutdown.clone();
        let handle = thread::Builder::new()
            .name("dq-poller".into())
            .spawn(move || {
                debug!("poller thread started");
                scheduler.run_blocking(&signal, interval, dispatch)
            })
            .map_err(|e| QueueError::Backend(format!("failed to spawn poller thread: {e}")))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Ask the poller to stop after its current cycle.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// A clone of the signal, for stopping the poller from elsewhere.
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Stop the poller and wait for it. Returns the number of items dispatched.
    pub fn join(mut self) -> u64 {
        self.shutdown.trigger();
        self.handle.take().map_or(0, |handle| {
            handle.join().unwrap_or_else(|_| {
                error!("poller thread panicked");
                0
            })
        })
    }
}

impl Drop for SchedulerThread {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
