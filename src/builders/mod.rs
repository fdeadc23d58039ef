//! Builders to construct queue components from configuration.

pub mod store_builder;

pub use store_builder::{build_fanout, build_scheduler, build_store};
