//! Registry: the single owner of a [`PriorityHeap`] of work items.
//!
//! Every operation takes one `parking_lot::Mutex` covering both the heap and
//! the id→handle side table, so read-decide-mutate sequences such as
//! [`Registry::pop_if`] are atomic as a whole.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::core::heap::{HeapHandle, PriorityHeap};
use crate::core::{Item, ItemId, OrderKey, PriorityStore, QueueError};
use crate::util::clock::Timestamp;

struct RegistryState<P> {
    heap: PriorityHeap<OrderKey, Item<P>>,
    handles: HashMap<ItemId, HeapHandle>,
}

impl<P> RegistryState<P> {
    fn take(&mut self, handle: HeapHandle) -> Option<Item<P>> {
        let (_, item) = self.heap.remove(handle)?;
        self.forget(&item);
        Some(item)
    }

    fn pop_min(&mut self) -> Result<Item<P>, QueueError> {
        let (_, item) = self.heap.pop_min()?;
        self.forget(&item);
        Ok(item)
    }

    fn forget(&mut self, item: &Item<P>) {
        if let Some(id) = item.id() {
            self.handles.remove(&id);
        }
    }

    fn min_deadline(&self) -> Option<Timestamp> {
        self.heap.peek().ok().and_then(|(key, _)| key.deadline)
    }
}

/// In-memory, thread-safe priority queue of [`Item`]s.
pub struct Registry<P> {
    state: Mutex<RegistryState<P>>,
}

impl<P> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Registry<P> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty registry with room for `capacity` items.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                heap: PriorityHeap::with_capacity(capacity),
                handles: HashMap::with_capacity(capacity),
            }),
        }
    }

    /// Admit an item, returning the id used for later removal.
    pub fn push(&self, mut item: Item<P>) -> ItemId {
        let id = ItemId::new();
        item.assign_id(id);
        let key = item.key();
        let mut state = self.state.lock();
        let handle = state.heap.push(key, item);
        state.handles.insert(id, handle);
        tracing::debug!(item = %id, deadline = ?key.deadline, priority = ?key.priority, "item admitted");
        id
    }

    /// Remove and return the most urgent item.
    ///
    /// # Errors
    ///
    /// `QueueError::EmptyQueue` if nothing is queued.
    pub fn pop(&self) -> Result<Item<P>, QueueError> {
        self.state.lock().pop_min()
    }

    /// Ordering key of the most urgent item.
    ///
    /// # Errors
    ///
    /// `QueueError::EmptyQueue` if nothing is queued.
    pub fn peek_key(&self) -> Result<OrderKey, QueueError> {
        self.state.lock().heap.peek().map(|(key, _)| *key)
    }

    /// Inspect the most urgent item under the lock.
    ///
    /// # Errors
    ///
    /// `QueueError::EmptyQueue` if nothing is queued.
    pub fn peek_with<R>(&self, f: impl FnOnce(&Item<P>) -> R) -> Result<R, QueueError> {
        self.state.lock().heap.peek().map(|(_, item)| f(item))
    }

    /// Pop the most urgent item only if `decide` accepts it.
    ///
    /// The peek, the decision and the pop happen inside one critical section.
    pub fn pop_if(&self, decide: impl FnOnce(&Item<P>) -> bool) -> Option<Item<P>> {
        let mut state = self.state.lock();
        let accept = state.heap.peek().is_ok_and(|(_, item)| decide(item));
        if accept {
            state.pop_min().ok()
        } else {
            None
        }
    }

    /// Pop the most urgent item if its deadline is at or before `cutoff`.
    pub fn pop_due(&self, cutoff: Timestamp) -> Option<Item<P>> {
        self.pop_if(|item| item.deadline_ms().is_some_and(|d| d <= cutoff))
    }

    /// Pop every item with a deadline at or before `cutoff`, most urgent first.
    pub fn pop_all_due(&self, cutoff: Timestamp) -> Vec<Item<P>> {
        let mut state = self.state.lock();
        let mut due = Vec::new();
        while state.min_deadline().is_some_and(|d| d <= cutoff) {
            match state.pop_min() {
                Ok(item) => due.push(item),
                Err(_) => break,
            }
        }
        due
    }

    /// Ids of every item with a deadline at or before `cutoff`, without removing them.
    pub fn due_before(&self, cutoff: Timestamp) -> Vec<ItemId> {
        let state = self.state.lock();
        let mut due: Vec<_> = state
            .heap
            .iter()
            .filter(|(_, key, _)| key.deadline.is_some_and(|d| d <= cutoff))
            .filter_map(|(_, key, item)| item.id().map(|id| (*key, id)))
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0));
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Remove an item by id. Returns `false` if it was already gone.
    pub fn remove(&self, id: ItemId) -> bool {
        self.take(id).is_ok()
    }

    /// Remove an item by id and hand it back.
    ///
    /// # Errors
    ///
    /// `QueueError::NotFound` if `id` is not queued.
    pub fn take(&self, id: ItemId) -> Result<Item<P>, QueueError> {
        let mut state = self.state.lock();
        let handle = *state.handles.get(&id).ok_or(QueueError::NotFound(id))?;
        state.take(handle).ok_or(QueueError::NotFound(id))
    }

    /// Remove every listed id, returning how many were still queued.
    pub fn remove_all(&self, ids: &[ItemId]) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0;
        for id in ids {
            let Some(&handle) = state.handles.get(id) else {
                continue;
            };
            if state.take(handle).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Move an item to a new deadline. Returns `false` if it is not queued.
    pub fn update_deadline(&self, id: ItemId, deadline: Timestamp) -> bool {
        let mut state = self.state.lock();
        let Some(&handle) = state.handles.get(&id) else {
            return false;
        };
        let Some((_, mut item)) = state.heap.remove(handle) else {
            return false;
        };
        item.set_deadline(deadline);
        let key = item.key();
        let handle = state.heap.push(key, item);
        state.handles.insert(id, handle);
        true
    }

    /// Ids of the largest group of items sharing `group(&payload)`.
    ///
    /// Used to batch items aimed at the same target. Ids are returned most
    /// urgent first; ties between equally large groups are unspecified.
    pub fn largest_group_by<G, F>(&self, group: F) -> Vec<ItemId>
    where
        G: Eq + Hash,
        F: Fn(&P) -> G,
    {
        let state = self.state.lock();
        let mut groups: HashMap<G, Vec<(OrderKey, ItemId)>> = HashMap::new();
        for (_, key, item) in state.heap.iter() {
            if let Some(id) = item.id() {
                groups.entry(group(&item.value)).or_default().push((*key, id));
            }
        }
        let mut largest = groups
            .into_values()
            .max_by_key(Vec::len)
            .unwrap_or_default();
        largest.sort_by(|a, b| a.0.cmp(&b.0));
        largest.into_iter().map(|(_, id)| id).collect()
    }

    /// Remove every item, most urgent first.
    pub fn drain(&self) -> Vec<Item<P>> {
        let mut state = self.state.lock();
        state.handles.clear();
        state
            .heap
            .drain_sorted()
            .into_iter()
            .map(|(_, item)| item)
            .collect()
    }

    /// Whether `id` is queued.
    pub fn contains(&self, id: ItemId) -> bool {
        self.state.lock().handles.contains_key(&id)
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().heap.is_empty()
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let state = self.state.lock();
        state.heap.assert_invariants();
        assert_eq!(state.handles.len(), state.heap.len());
        for (id, handle) in &state.handles {
            let (_, item) = state.heap.get(*handle).expect("side table points at a live item");
            assert_eq!(item.id(), Some(*id));
        }
    }
}

impl<P: Send> PriorityStore<P> for Registry<P> {
    fn insert(&self, item: Item<P>) -> Result<ItemId, QueueError> {
        Ok(self.push(item))
    }

    fn pop_due(&self, cutoff: Timestamp) -> Result<Option<Item<P>>, QueueError> {
        Ok(Registry::pop_due(self, cutoff))
    }

    fn peek_deadline(&self) -> Result<Option<Timestamp>, QueueError> {
        Ok(self.state.lock().min_deadline())
    }

    fn remove(&self, id: ItemId) -> Result<bool, QueueError> {
        Ok(Registry::remove(self, id))
    }

    fn len(&self) -> Result<usize, QueueError> {
        Ok(Registry::len(self))
    }
}
