//! Drivers that poll a [`DeadlineScheduler`](crate::core::DeadlineScheduler)
//! on a dedicated thread or inside a tokio runtime.

pub mod poller;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_driver;

pub use poller::SchedulerThread;
#[cfg(feature = "tokio-runtime")]
pub use tokio_driver::run_async;
