//! Async poll loop for callers already running tokio.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::core::{DeadlineScheduler, ItemDispatcher, PollOutcome, PriorityStore};

/// Poll `scheduler` until `shutdown` carries `true` (or its sender is
/// dropped), awaiting `dispatcher` for each released item.
///
/// Backend calls may block on network I/O, so each poll runs on tokio's
/// blocking pool. Returns the number of dispatched items.
pub async fn run_async<P, S, D>(
    scheduler: Arc<DeadlineScheduler<P, S>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    dispatcher: &D,
) -> u64
where
    P: Send + 'static,
    S: PriorityStore<P> + ?Sized + 'static,
    D: ItemDispatcher<P> + ?Sized,
{
    let mut dispatched = 0;
    info!(interval_ms = interval.as_millis(), "async deadline poller started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let poller = Arc::clone(&scheduler);
        match tokio::task::spawn_blocking(move || poller.poll()).await {
            Ok(Ok(PollOutcome::Ready(item))) => {
                dispatched += 1;
                dispatcher.dispatch(item).await;
                continue;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "deadline poll failed"),
            Err(e) => warn!(error = %e, "deadline poll task failed"),
        }
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    info!(dispatched, "async deadline poller stopped");
    dispatched
}
