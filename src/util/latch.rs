//! Countdown latch used to wait for a fixed set of workers to finish.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Counter that releases waiters once it reaches zero.
///
/// Cloning shares the same counter.
#[derive(Clone)]
pub struct CompletionLatch {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl CompletionLatch {
    /// Latch expecting `count` completions.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            inner: Arc::new((Mutex::new(count), Condvar::new())),
        }
    }

    /// Record one completion. Extra calls past zero are ignored.
    pub fn count_down(&self) {
        let (remaining, condvar) = self.inner.as_ref();
        let mut remaining = remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            condvar.notify_all();
        }
    }

    /// Completions still outstanding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.inner.0.lock()
    }

    /// Block until the count reaches zero.
    pub fn wait(&self) {
        let (remaining, condvar) = self.inner.as_ref();
        let mut remaining = remaining.lock();
        while *remaining > 0 {
            condvar.wait(&mut remaining);
        }
    }

    /// Block until the count reaches zero or `timeout` passes.
    ///
    /// Returns `true` if the count reached zero.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (remaining, condvar) = self.inner.as_ref();
        let mut remaining = remaining.lock();
        if *remaining > 0 {
            let _ = condvar.wait_while_for(&mut remaining, |left| *left > 0, timeout);
        }
        *remaining == 0
    }
}

/// Counts a latch down when dropped, including during a panic unwind.
pub struct CountDownGuard(CompletionLatch);

impl CountDownGuard {
    /// Guard that will count `latch` down once.
    #[must_use]
    pub const fn new(latch: CompletionLatch) -> Self {
        Self(latch)
    }
}

impl Drop for CountDownGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}
