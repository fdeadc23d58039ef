//! # Prometheus Deadline Queue
//!
//! A deadline- and priority-aware work queue that sits in front of a
//! downstream executor (a function-invocation engine, a job runner) and
//! decides *when* and *to whom* pending work is released.
//!
//! ## Pieces
//!
//! - **[`core::PriorityHeap`]**: indexed binary min-heap with stable handles,
//!   so any queued item can be removed or re-keyed in `O(log n)`.
//! - **[`core::Registry`]**: thread-safe in-memory store; orders by deadline,
//!   then priority, items missing either sort last.
//! - **[`infra::DistributedStore`]**: the same contract over a Redis sorted
//!   set, shareable between processes.
//! - **[`core::DeadlineScheduler`]**: evicts the earliest item once its
//!   deadline is inside the removal threshold and notifies listeners.
//! - **[`core::PriorityFanout`]**: splits one item stream across named
//!   consumers by predicate, with coordinated shutdown.
//! - **[`runtime`]**: a poller thread and a tokio loop that drive the
//!   scheduler.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use prometheus_deadline_queue::core::{DeadlineScheduler, Item, Registry};
//!
//! let registry = Arc::new(Registry::new());
//! registry.push(Item::with_deadline("report", 1_000));
//! registry.push(Item::with_deadline("backup", 60_000));
//!
//! let scheduler: DeadlineScheduler<&str, Registry<&str>> =
//!     DeadlineScheduler::new(Arc::clone(&registry), Duration::from_secs(5)).unwrap();
//! let released = scheduler.poll_at(0).unwrap().into_ready().unwrap();
//! assert_eq!(released.value, "report");
//! assert_eq!(registry.len(), 1);
//! ```
//!
//! Backends and the scheduler can also be built from a
//! [`config::QueueConfig`] with [`builders::build_scheduler`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Heap, registry, scheduler, fan-out, and shared item types.
pub mod core;
/// Configuration models for the queue, backend, and drivers.
pub mod config;
/// Builders to construct queue components from configuration.
pub mod builders;
/// Out-of-process storage backends.
pub mod infra;
/// Scheduler drivers for threads and tokio.
pub mod runtime;
/// Clock, shutdown, latch, and telemetry utilities.
pub mod util;
