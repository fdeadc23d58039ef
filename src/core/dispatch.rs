//! Hand-off of released items to the downstream executor.

use async_trait::async_trait;

use crate::core::Item;

/// Receives items the scheduler has released for execution.
///
/// The executor behind it (a function-invocation engine, a job runner) is
/// outside this crate; implementors only need to accept the item.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_deadline_queue::core::{Item, ItemDispatcher};
///
/// struct Invoker { tx: tokio::sync::mpsc::Sender<String> }
///
/// #[async_trait]
/// impl ItemDispatcher<String> for Invoker {
///     async fn dispatch(&self, item: Item<String>) {
///         let _ = self.tx.send(item.into_value()).await;
///     }
/// }
/// ```
#[async_trait]
pub trait ItemDispatcher<P>: Send + Sync
where
    P: Send + 'static,
{
    /// Take ownership of a released item.
    async fn dispatch(&self, item: Item<P>);
}
