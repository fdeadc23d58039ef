//! Removal notifications published when the scheduler evicts an item.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::ItemId;
use crate::util::clock::{now_ms, Timestamp};

/// Observer told about every evicted item, so owners of side tables can
/// drop their bookkeeping.
pub trait RemovalListener: Send + Sync {
    /// Called once per evicted item, after it left the backend.
    fn on_removed(&self, id: ItemId);
}

impl<F> RemovalListener for F
where
    F: Fn(ItemId) + Send + Sync,
{
    fn on_removed(&self, id: ItemId) {
        self(id);
    }
}

/// A recorded removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalRecord {
    /// Evicted item.
    pub id: ItemId,
    /// When the notification fired.
    pub removed_at_ms: Timestamp,
}

/// Bounded in-memory log of removals, for testing and dev.
pub struct RemovalLog {
    records: Mutex<VecDeque<RemovalRecord>>,
    max_records: usize,
}

impl RemovalLog {
    /// Create a log keeping at most `max_records` entries.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(max_records)),
            max_records,
        }
    }

    /// Snapshot of stored records, oldest first.
    pub fn records(&self) -> Vec<RemovalRecord> {
        self.records.lock().iter().copied().collect()
    }

    /// Ids in notification order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.records.lock().iter().map(|r| r.id).collect()
    }
}

impl RemovalListener for RemovalLog {
    fn on_removed(&self, id: ItemId) {
        let mut records = self.records.lock();
        if records.len() >= self.max_records {
            records.pop_front();
        }
        records.push_back(RemovalRecord {
            id,
            removed_at_ms: now_ms(),
        });
    }
}
