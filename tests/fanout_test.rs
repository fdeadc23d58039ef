//! Integration tests for priority fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use prometheus_deadline_queue::core::{Item, Priority, PriorityFanout, Registry};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Job {
    id: usize,
    class: Priority,
}

fn jobs(n: usize) -> Vec<Job> {
    (0..n)
        .map(|id| Job {
            id,
            class: [Priority::CRITICAL, Priority::HIGH, Priority::NORMAL][id % 3],
        })
        .collect()
}

#[test]
fn test_three_consumers_receive_disjoint_complete_partitions() {
    let received: Arc<Mutex<HashMap<String, Vec<usize>>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&received);

    let report = PriorityFanout::new(4)
        .route("critical", |j: &Job| j.class == Priority::CRITICAL)
        .route("high", |j: &Job| j.class == Priority::HIGH)
        .route("normal", |j: &Job| j.class == Priority::NORMAL)
        .run_consumers(jobs(300), move |route: &str, job: Job| {
            sink.lock().entry(route.to_string()).or_default().push(job.id);
        })
        .unwrap();

    assert!(!report.stopped);
    assert!(report.unrouted.is_empty());
    assert!(report.undelivered.is_empty());
    assert_eq!(report.total_delivered(), 300);

    let received = received.lock();
    let mut all: Vec<usize> = received.values().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..300).collect::<Vec<_>>());
    for (route, ids) in received.iter() {
        assert_eq!(ids.len(), 100, "route {route}");
        assert_eq!(report.delivered_to(route), Some(100));
    }
}

#[test]
fn test_first_matching_route_wins_and_unmatched_reported() {
    let report = PriorityFanout::new(2)
        .route("small", |n: &u32| *n < 10)
        .route("even", |n: &u32| n % 2 == 0)
        .run_consumers(0..20u32, |_, _| {})
        .unwrap();

    assert_eq!(report.delivered_to("small"), Some(10));
    assert_eq!(report.delivered_to("even"), Some(5));
    assert_eq!(report.unrouted, vec![11, 13, 15, 17, 19]);
}

#[test]
fn test_each_output_closes_exactly_once() {
    let mut run = PriorityFanout::new(1)
        .route("a", |n: &u32| n % 2 == 0)
        .route("b", |n: &u32| n % 2 == 1)
        .start(0..50u32)
        .unwrap();

    let consumers: Vec<_> = run
        .take_outputs()
        .into_iter()
        .map(|out| {
            thread::spawn(move || {
                let count = out.receiver.iter().count();
                // Disconnected receivers stay disconnected.
                assert!(out.receiver.recv_timeout(Duration::from_millis(10)).is_err());
                count
            })
        })
        .collect();

    let counts: Vec<usize> = consumers.into_iter().map(|c| c.join().unwrap()).collect();
    assert_eq!(counts, vec![25, 25]);
    let report = run.join().unwrap();
    assert_eq!(report.total_delivered(), 50);
}

#[test]
fn test_stop_unblocks_dispatcher_with_idle_consumers() {
    let mut run = PriorityFanout::new(1)
        .route("all", |_: &u64| true)
        .start(0..u64::MAX)
        .unwrap();
    let outputs = run.take_outputs();
    let first = outputs[0].receiver.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(first, 0);

    run.stop();
    run.stop();
    let report = run.join().unwrap();
    assert!(report.stopped);
    // Buffered items drain, then the channel reports disconnection.
    let rest: Vec<u64> = outputs[0].receiver.iter().collect();
    assert!(rest.len() <= 1);
}

#[test]
fn test_fanout_from_registry_drain_preserves_order_per_route() {
    let registry = Registry::new();
    for i in (0..60u128).rev() {
        let class = if i % 2 == 0 { Priority::HIGH } else { Priority::LOW };
        registry.push(Item::with_deadline(i, i).priority(class));
    }

    let seen: Arc<Mutex<HashMap<String, Vec<u128>>>> = Arc::new(Mutex::new(HashMap::new()));
    let sink = Arc::clone(&seen);
    let report = PriorityFanout::new(8)
        .route("high", |item: &Item<u128>| item.priority_class() == Some(Priority::HIGH))
        .route("low", |item: &Item<u128>| item.priority_class() == Some(Priority::LOW))
        .run_consumers(registry.drain(), move |route: &str, item: Item<u128>| {
            sink.lock().entry(route.to_string()).or_default().push(item.value);
        })
        .unwrap();

    assert_eq!(report.total_delivered(), 60);
    let seen = seen.lock();
    assert!(seen["high"].windows(2).all(|w| w[0] < w[1]));
    assert!(seen["low"].windows(2).all(|w| w[0] < w[1]));
    assert!(registry.is_empty());
}

#[test]
fn test_stop_accounts_for_every_pulled_item() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulled);
    let source = (0..10_000u32).inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut run = PriorityFanout::new(2)
        .route("even", |n: &u32| n % 2 == 0)
        .route("odd", |n: &u32| n % 2 == 1)
        .start(source)
        .unwrap();
    // Held but never read, so the dispatcher fills both outputs and blocks.
    let _outputs = run.take_outputs();
    thread::sleep(Duration::from_millis(30));
    run.stop();
    let report = run.join().unwrap();

    assert!(report.stopped);
    assert_eq!(report.undelivered.len(), 1);
    assert_eq!(
        report.total_delivered() + report.unrouted.len() + report.undelivered.len(),
        pulled.load(Ordering::SeqCst)
    );
}
