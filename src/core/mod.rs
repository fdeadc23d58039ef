//! Core queue abstractions: items, heap, registry, scheduler and fan-out.

pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod heap;
pub mod item;
pub mod registry;
pub mod removal;
pub mod scheduler;
pub mod store;

pub use dispatch::ItemDispatcher;
pub use error::{AppResult, QueueError};
pub use fanout::{ConsumerOutput, FanoutReport, FanoutRun, PriorityFanout, RouteStats};
pub use heap::{HeapHandle, PriorityHeap, NOT_IN_HEAP};
pub use item::{Item, ItemId, OrderKey, Priority};
pub use registry::Registry;
pub use removal::{RemovalListener, RemovalLog, RemovalRecord};
pub use scheduler::{DeadlineScheduler, PollOutcome};
pub use store::PriorityStore;
