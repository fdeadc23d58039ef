//! Tests for the scheduler drivers

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prometheus_deadline_queue::core::{
    DeadlineScheduler, Item, ItemDispatcher, ItemId, PriorityStore, QueueError, Registry,
};
use prometheus_deadline_queue::runtime::{run_async, SchedulerThread};
use prometheus_deadline_queue::util::{now_ms, Timestamp};
use tokio::sync::{mpsc, watch};

struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<&'static str>,
}

#[async_trait]
impl ItemDispatcher<&'static str> for ChannelDispatcher {
    async fn dispatch(&self, item: Item<&'static str>) {
        let _ = self.tx.send(item.into_value());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_async_dispatches_and_stops() {
    let registry = Arc::new(Registry::new());
    let scheduler: Arc<DeadlineScheduler<&'static str, Registry<&'static str>>> =
        Arc::new(DeadlineScheduler::new(Arc::clone(&registry), Duration::from_millis(500)).unwrap());
    registry.push(Item::with_deadline("now", now_ms()));
    registry.push(Item::with_deadline("tomorrow", now_ms() + 86_400_000));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let driver = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            let dispatcher = ChannelDispatcher { tx };
            run_async(scheduler, Duration::from_millis(5), stop_rx, &dispatcher).await
        })
    };

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
    assert_eq!(first, Some("now"));

    stop_tx.send(true).unwrap();
    let dispatched = tokio::time::timeout(Duration::from_secs(2), driver).await.unwrap().unwrap();
    assert_eq!(dispatched, 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_run_async_exits_when_sender_dropped() {
    let registry: Arc<Registry<&'static str>> = Arc::new(Registry::new());
    let scheduler: Arc<DeadlineScheduler<&'static str, Registry<&'static str>>> =
        Arc::new(DeadlineScheduler::new(Arc::clone(&registry), Duration::from_secs(1)).unwrap());
    let (tx, _rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    drop(stop_tx);

    let dispatched = tokio::time::timeout(
        Duration::from_secs(2),
        run_async(scheduler, Duration::from_millis(5), stop_rx, &ChannelDispatcher { tx }),
    )
    .await
    .unwrap();
    assert_eq!(dispatched, 0);
}

// Backend whose pop stalls like a slow network round trip.
struct StallingStore;

impl PriorityStore<&'static str> for StallingStore {
    fn insert(&self, _item: Item<&'static str>) -> Result<ItemId, QueueError> {
        Ok(ItemId::new())
    }

    fn pop_due(&self, _cutoff: Timestamp) -> Result<Option<Item<&'static str>>, QueueError> {
        thread::sleep(Duration::from_millis(300));
        Ok(None)
    }

    fn peek_deadline(&self) -> Result<Option<Timestamp>, QueueError> {
        Ok(None)
    }

    fn remove(&self, _id: ItemId) -> Result<bool, QueueError> {
        Ok(false)
    }

    fn len(&self) -> Result<usize, QueueError> {
        Ok(0)
    }
}

#[tokio::test(flavor = "current_thread")]
async fn test_run_async_keeps_runtime_responsive_during_slow_poll() {
    let scheduler: Arc<DeadlineScheduler<&'static str, StallingStore>> =
        Arc::new(DeadlineScheduler::new(Arc::new(StallingStore), Duration::from_secs(1)).unwrap());
    let (tx, _rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let driver = tokio::spawn(async move {
        run_async(scheduler, Duration::from_millis(5), stop_rx, &ChannelDispatcher { tx }).await
    });

    // Let the driver start its first poll.
    tokio::task::yield_now().await;
    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(started.elapsed() < Duration::from_millis(150));

    stop_tx.send(true).unwrap();
    let dispatched = tokio::time::timeout(Duration::from_secs(2), driver).await.unwrap().unwrap();
    assert_eq!(dispatched, 0);
}

#[test]
fn test_scheduler_thread_shutdown_signal() {
    let registry: Arc<Registry<u8>> = Arc::new(Registry::new());
    let scheduler = Arc::new(DeadlineScheduler::new(registry, Duration::from_secs(1)).unwrap());
    let poller = SchedulerThread::spawn(scheduler, Duration::from_millis(10), |_item: Item<u8>| {}).unwrap();

    poller.shutdown_signal().trigger();
    assert_eq!(poller.join(), 0);
}
