//! Tests for utility functions

use std::thread;
use std::time::Duration;

use prometheus_deadline_queue::util::{after, now_ms, CompletionLatch, CountDownGuard, ShutdownSignal};

#[test]
fn test_after_is_in_the_future() {
    let now = now_ms();
    let later = after(Duration::from_secs(10));
    assert!(later >= now + 10_000);
}

#[test]
fn test_shutdown_wakes_waiter() {
    let signal = ShutdownSignal::new();
    let waiter = {
        let signal = signal.clone();
        thread::spawn(move || signal.wait_timeout(Duration::from_secs(30)))
    };
    thread::sleep(Duration::from_millis(20));
    signal.trigger();
    assert!(waiter.join().unwrap());
    assert!(signal.is_triggered());
}

#[test]
fn test_latch_released_by_guards() {
    let latch = CompletionLatch::new(3);
    let workers: Vec<_> = (0..3)
        .map(|_| {
            let guard = CountDownGuard::new(latch.clone());
            thread::spawn(move || {
                let _guard = guard;
                thread::sleep(Duration::from_millis(5));
            })
        })
        .collect();
    assert!(latch.wait_timeout(Duration::from_secs(5)));
    assert_eq!(latch.remaining(), 0);
    for worker in workers {
        worker.join().unwrap();
    }
}
