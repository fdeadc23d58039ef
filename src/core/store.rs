//! The priority-store capability shared by every backend.

use crate::core::{Item, ItemId, QueueError};
use crate::util::clock::Timestamp;

/// Backend able to hold items ordered by deadline.
///
/// Implemented by the in-memory [`Registry`](crate::core::Registry) and by
/// [`DistributedStore`](crate::infra::store::DistributedStore), so choosing a
/// backend is a configuration decision. All methods take `&self`; each
/// backend serializes access internally.
pub trait PriorityStore<P>: Send + Sync {
    /// Admit an item, returning the id assigned to it.
    fn insert(&self, item: Item<P>) -> Result<ItemId, QueueError>;

    /// Atomically remove and return the earliest-deadline item if its deadline
    /// is at or before `cutoff`. Returns `Ok(None)` if nothing qualifies.
    fn pop_due(&self, cutoff: Timestamp) -> Result<Option<Item<P>>, QueueError>;

    /// Earliest deadline currently queued.
    fn peek_deadline(&self) -> Result<Option<Timestamp>, QueueError>;

    /// Remove an item by id. `Ok(false)` means it was already gone.
    fn remove(&self, id: ItemId) -> Result<bool, QueueError>;

    /// Number of queued items.
    fn len(&self) -> Result<usize, QueueError>;

    /// Whether nothing is queued.
    fn is_empty(&self) -> Result<bool, QueueError> {
        self.len().map(|n| n == 0)
    }
}
