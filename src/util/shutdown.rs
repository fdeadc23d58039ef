//! Cooperative shutdown signal shared between a driver and its owner.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// One-shot shutdown flag with condvar wake-up.
///
/// Cloning shares the same flag. Waiters blocked in [`ShutdownSignal::wait_timeout`]
/// are released as soon as [`ShutdownSignal::trigger`] is called.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    /// Create an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger shutdown and wake every waiter. Idempotent.
    pub fn trigger(&self) {
        let (flag, condvar) = self.inner.as_ref();
        let mut triggered = flag.lock();
        *triggered = true;
        drop(triggered);
        condvar.notify_all();
    }

    /// Whether shutdown has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for up to `timeout`, returning early on shutdown.
    ///
    /// Returns `true` if shutdown was triggered.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = self.inner.as_ref();
        let mut triggered = flag.lock();
        if !*triggered {
            // Spurious wake-ups just end the sleep early; the caller polls again.
            let _ = condvar.wait_for(&mut triggered, timeout);
        }
        *triggered
    }
}
