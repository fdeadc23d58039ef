//! Infrastructure adapters for out-of-process storage backends.

pub mod store;

pub use store::{DistributedStore, InMemorySortedSet, SortedSetConnection};
