//! Partition one item stream across concurrent priority-specific consumers.
//!
//! A dispatcher thread reads the source once, picks each item's route (the
//! first route whose predicate accepts it, computed once per item) and
//! forwards the item to that route's bounded output channel. When the source
//! is exhausted, or when [`FanoutRun::stop`] is called, the dispatcher drops
//! every output sender, so each consumer sees end-of-stream exactly once.
//!
//! ```
//! use prometheus_deadline_queue::core::PriorityFanout;
//!
//! let report = PriorityFanout::new(8)
//!     .route("even", |n: &u32| n % 2 == 0)
//!     .route("odd", |n: &u32| n % 2 == 1)
//!     .run_consumers(0..10u32, |_route: &str, _n: u32| {})
//!     .unwrap();
//! assert_eq!(report.delivered_to("even"), Some(5));
//! assert_eq!(report.total_delivered(), 10);
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, SendError, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::QueueError;
use crate::util::latch::{CompletionLatch, CountDownGuard};

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Route<T> {
    name: String,
    predicate: Predicate<T>,
}

/// Builder for a fan-out over named, predicate-selected routes.
pub struct PriorityFanout<T> {
    routes: Vec<Route<T>>,
    capacity: usize,
}

/// Receiving end of one route.
pub struct ConsumerOutput<T> {
    /// Route name.
    pub name: String,
    /// Items routed here; disconnects once the dispatcher finishes.
    pub receiver: Receiver<T>,
}

/// Per-route delivery count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStats {
    /// Route name.
    pub name: String,
    /// Items handed to this route's output.
    pub delivered: usize,
}

/// Outcome of a fan-out run.
#[derive(Debug)]
pub struct FanoutReport<T> {
    /// Delivery counts, in route registration order.
    pub routes: Vec<RouteStats>,
    /// Items no predicate accepted.
    pub unrouted: Vec<T>,
    /// Items taken from the source but never handed to a consumer: its
    /// consumer hung up, or a stop arrived while the item was in flight.
    pub undelivered: Vec<T>,
    /// Whether the run ended because of [`FanoutRun::stop`].
    pub stopped: bool,
}

impl<T> FanoutReport<T> {
    /// Items delivered to the named route.
    #[must_use]
    pub fn delivered_to(&self, name: &str) -> Option<usize> {
        self.routes
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.delivered)
    }

    /// Items delivered across all routes.
    #[must_use]
    pub fn total_delivered(&self) -> usize {
        self.routes.iter().map(|r| r.delivered).sum()
    }
}

struct DispatchSummary<T> {
    delivered: Vec<usize>,
    unrouted: Vec<T>,
    undelivered: Vec<T>,
    stopped: bool,
}

/// A running fan-out.
pub struct FanoutRun<T> {
    names: Vec<String>,
    outputs: Vec<ConsumerOutput<T>>,
    stop: Mutex<Option<Sender<()>>>,
    dispatcher: Option<JoinHandle<DispatchSummary<T>>>,
}

impl<T: Send + 'static> PriorityFanout<T> {
    /// Fan-out whose outputs buffer at most `capacity` items each.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            routes: Vec::new(),
            capacity,
        }
    }

    /// Add a route. Items go to the first route whose predicate accepts them.
    #[must_use]
    pub fn route(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.routes.push(Route {
            name: name.into(),
            predicate: Box::new(predicate),
        });
        self
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Start dispatching `source` on a background thread.
    ///
    /// # Errors
    ///
    /// `QueueError::InvalidConfiguration` if no route is registered or the
    /// capacity is zero; `QueueError::Backend` if the thread cannot start.
    pub fn start<I>(self, source: I) -> Result<FanoutRun<T>, QueueError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        if self.routes.is_empty() {
            return Err(QueueError::InvalidConfiguration(
                "fanout needs at least one route".into(),
            ));
        }
        if self.capacity == 0 {
            return Err(QueueError::InvalidConfiguration(
                "fanout capacity must be greater than 0".into(),
            ));
        }

        let mut senders = Vec::with_capacity(self.routes.len());
        let mut outputs = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            let (tx, rx) = bounded(self.capacity);
            senders.push(tx);
            outputs.push(ConsumerOutput {
                name: route.name.clone(),
                receiver: rx,
            });
        }
        let names = self.routes.iter().map(|r| r.name.clone()).collect();
        // Never sent on; dropping the sender is the stop signal.
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let routes = self.routes;
        let source = source.into_iter();
        let dispatcher = thread::Builder::new()
            .name("fanout-dispatcher".into())
            .spawn(move || dispatch(source, &routes, senders, &stop_rx))
            .map_err(|e| QueueError::Backend(format!("failed to spawn fanout dispatcher: {e}")))?;

        Ok(FanoutRun {
            names,
            outputs,
            stop: Mutex::new(Some(stop_tx)),
            dispatcher: Some(dispatcher),
        })
    }

    /// Dispatch `source` and drain every route on its own consumer thread.
    ///
    /// `handler` receives each item with its route name. Returns once the
    /// dispatcher has finished and every consumer has seen end-of-stream.
    ///
    /// # Errors
    ///
    /// See [`PriorityFanout::start`]; also fails if a consumer thread cannot
    /// start or the dispatcher panics.
    pub fn run_consumers<I, H>(self, source: I, handler: H) -> Result<FanoutReport<T>, QueueError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        H: Fn(&str, T) + Send + Sync + 'static,
    {
        let mut run = self.start(source)?;
        let outputs = run.take_outputs();
        let latch = CompletionLatch::new(outputs.len());
        let handler = Arc::new(handler);

        let mut consumers = Vec::with_capacity(outputs.len());
        for ConsumerOutput { name, receiver } in outputs {
            let guard = CountDownGuard::new(latch.clone());
            let handler = Arc::clone(&handler);
            let consumer = thread::Builder::new()
                .name(format!("fanout-{name}"))
                .spawn(move || {
                    let _done = guard;
                    let mut consumed = 0usize;
                    for item in &receiver {
                        handler(&name, item);
                        consumed += 1;
                    }
                    debug!(route = %name, consumed, "consumer reached end of stream");
                })
                .map_err(|e| QueueError::Backend(format!("failed to spawn fanout consumer: {e}")))?;
            consumers.push(consumer);
        }

        latch.wait();
        for consumer in consumers {
            if consumer.join().is_err() {
                warn!("fanout consumer panicked");
            }
        }
        run.join()
    }
}

fn dispatch<T, I>(
    source: I,
    routes: &[Route<T>],
    senders: Vec<Sender<T>>,
    stop_rx: &Receiver<()>,
) -> DispatchSummary<T>
where
    I: Iterator<Item = T>,
{
    let mut summary = DispatchSummary {
        delivered: vec![0; routes.len()],
        unrouted: Vec::new(),
        undelivered: Vec::new(),
        stopped: false,
    };

    for item in source {
        if matches!(stop_rx.try_recv(), Err(TryRecvError::Disconnected)) {
            summary.undelivered.push(item);
            summary.stopped = true;
            break;
        }
        let Some(idx) = routes.iter().position(|r| (r.predicate)(&item)) else {
            summary.unrouted.push(item);
            continue;
        };
        let stop_now = crossbeam_channel::select! {
            send(senders[idx], item) -> res => {
                match res {
                    Ok(()) => summary.delivered[idx] += 1,
                    Err(SendError(item)) => summary.undelivered.push(item),
                }
                false
            },
            recv(stop_rx) -> _ => {
                summary.undelivered.push(item);
                true
            },
        };
        if stop_now {
            summary.stopped = true;
            break;
        }
    }

    // Closes every output exactly once.
    drop(senders);
    info!(
        delivered = summary.delivered.iter().sum::<usize>(),
        unrouted = summary.unrouted.len(),
        stopped = summary.stopped,
        "fanout dispatcher finished"
    );
    summary
}

impl<T> FanoutRun<T> {
    /// Take the per-route receivers. Returns an empty list on later calls.
    pub fn take_outputs(&mut self) -> Vec<ConsumerOutput<T>> {
        std::mem::take(&mut self.outputs)
    }

    /// Ask the dispatcher to stop forwarding. Idempotent.
    ///
    /// The dispatcher exits even while blocked on a full output, then closes
    /// every output.
    pub fn stop(&self) {
        if self.stop.lock().take().is_some() {
            debug!("fanout stop requested");
        }
    }

    /// Wait for the dispatcher and collect its report.
    ///
    /// Receivers not yet taken are dropped first, so a dispatcher waiting on
    /// them cannot block the join.
    ///
    /// # Errors
    ///
    /// `QueueError::Backend` if the dispatcher panicked.
    pub fn join(mut self) -> Result<FanoutReport<T>, QueueError> {
        self.outputs.clear();
        let Some(dispatcher) = self.dispatcher.take() else {
            return Err(QueueError::Backend("fanout already joined".into()));
        };
        let summary = dispatcher
            .join()
            .map_err(|_| QueueError::Backend("fanout dispatcher panicked".into()))?;
        let routes = std::mem::take(&mut self.names)
            .into_iter()
            .zip(summary.delivered)
            .map(|(name, delivered)| RouteStats { name, delivered })
            .collect();
        Ok(FanoutReport {
            routes,
            unrouted: summary.unrouted,
            undelivered: summary.undelivered,
            stopped: summary.stopped,
        })
    }
}

impl<T> Drop for FanoutRun<T> {
    fn drop(&mut self) {
        // Detach rather than join; an explicit join() collects the report.
        self.stop();
    }
}
