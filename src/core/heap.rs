//! Array-backed binary min-heap with stable handles.
//!
//! Nodes live in a slot arena; the heap array holds slot indices and every
//! node records its own position in that array (`heap_index`). Handles
//! returned by [`PriorityHeap::push`] carry a generation so a handle to a
//! popped item can never address a recycled slot.
//!
//! Only the heap writes `heap_index`. A mismatch between a node's recorded
//! position and its real one means the heap was mutated without its owner's
//! lock, and is treated as a bug (panic), not as a recoverable error.
//!
//! ```
//! use prometheus_deadline_queue::core::PriorityHeap;
//!
//! let mut heap = PriorityHeap::new();
//! let a = heap.push(3, "a");
//! heap.push(1, "b");
//! heap.push(2, "c");
//!
//! assert_eq!(heap.peek().unwrap(), (&1, &"b"));
//! assert_eq!(heap.remove(a), Some((3, "a")));
//! assert_eq!(heap.pop_min().unwrap(), (1, "b"));
//! assert_eq!(heap.pop_min().unwrap(), (2, "c"));
//! assert!(heap.pop_min().is_err());
//! ```

use std::cmp::Ordering;

use crate::core::QueueError;

/// Sentinel `heap_index` for a node no longer in the heap.
pub const NOT_IN_HEAP: usize = usize::MAX;

/// Stable reference to a pushed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct Node<K, T> {
    key: K,
    value: T,
    heap_index: usize,
}

#[derive(Debug)]
struct Slot<K, T> {
    generation: u64,
    node: Option<Node<K, T>>,
}

/// Binary min-heap keyed by `K`, holding values of type `T`.
#[derive(Debug)]
pub struct PriorityHeap<K, T> {
    slots: Vec<Slot<K, T>>,
    free: Vec<usize>,
    order: Vec<usize>,
}

impl<K: Ord, T> Default for PriorityHeap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, T> PriorityHeap<K, T> {
    /// Create an empty heap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Create an empty heap with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the heap is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Push an element. O(log n).
    pub fn push(&mut self, key: K, value: T) -> HeapHandle {
        let pos = self.order.len();
        let node = Node {
            key,
            value,
            heap_index: pos,
        };
        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot].node = Some(node);
            slot
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            self.slots.len() - 1
        };
        self.order.push(slot);
        self.sift_up(pos);
        HeapHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    /// Minimum element without removing it. O(1).
    ///
    /// # Errors
    ///
    /// `QueueError::EmptyQueue` if the heap is empty.
    pub fn peek(&self) -> Result<(&K, &T), QueueError> {
        let slot = *self.order.first().ok_or(QueueError::EmptyQueue)?;
        let node = self.node(slot);
        Ok((&node.key, &node.value))
    }

    /// Handle of the minimum element.
    #[must_use]
    pub fn peek_handle(&self) -> Option<HeapHandle> {
        self.order.first().map(|&slot| self.handle_of(slot))
    }

    /// Remove and return the minimum element. O(log n).
    ///
    /// # Errors
    ///
    /// `QueueError::EmptyQueue` if the heap is empty.
    pub fn pop_min(&mut self) -> Result<(K, T), QueueError> {
        if self.order.is_empty() {
            return Err(QueueError::EmptyQueue);
        }
        Ok(self.remove_at(0))
    }

    /// Remove the element behind `handle`. O(log n).
    ///
    /// Returns `None` if the element was already removed.
    pub fn remove(&mut self, handle: HeapHandle) -> Option<(K, T)> {
        let pos = self.position(handle)?;
        Some(self.remove_at(pos))
    }

    /// Element behind `handle`, if still queued.
    #[must_use]
    pub fn get(&self, handle: HeapHandle) -> Option<(&K, &T)> {
        let pos = self.position(handle)?;
        let node = self.node(self.order[pos]);
        Some((&node.key, &node.value))
    }

    /// Whether `handle` still refers to a queued element.
    #[must_use]
    pub fn contains(&self, handle: HeapHandle) -> bool {
        self.position(handle).is_some()
    }

    /// Replace the key of a queued element and restore heap order. O(log n).
    ///
    /// Returns `false` if the element was already removed.
    pub fn update_key(&mut self, handle: HeapHandle, key: K) -> bool {
        let Some(pos) = self.position(handle) else {
            return false;
        };
        let node = self.node_mut(self.order[pos]);
        let old = std::mem::replace(&mut node.key, key);
        match node.key.cmp(&old) {
            Ordering::Less => self.sift_up(pos),
            Ordering::Greater => self.sift_down(pos),
            Ordering::Equal => {}
        }
        true
    }

    /// Iterate elements in heap-array order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = (HeapHandle, &K, &T)> + '_ {
        self.order.iter().map(move |&slot| {
            let node = self.node(slot);
            (self.handle_of(slot), &node.key, &node.value)
        })
    }

    /// Remove every element, returning them in ascending key order.
    pub fn drain_sorted(&mut self) -> Vec<(K, T)> {
        let mut out = Vec::with_capacity(self.order.len());
        while !self.order.is_empty() {
            out.push(self.remove_at(0));
        }
        out
    }

    fn position(&self, handle: HeapHandle) -> Option<usize> {
        let slot = self.slots.get(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        let node = slot.node.as_ref()?;
        assert_eq!(
            self.order.get(node.heap_index),
            Some(&handle.slot),
            "heap index out of sync with heap array"
        );
        Some(node.heap_index)
    }

    fn remove_at(&mut self, pos: usize) -> (K, T) {
        let last = self.order.len() - 1;
        if pos != last {
            self.swap(pos, last);
        }
        let Some(slot) = self.order.pop() else {
            unreachable!("remove_at called on an empty heap");
        };
        let node = self.release(slot);
        if pos < self.order.len() {
            self.sift_down(pos);
            self.sift_up(pos);
        }
        (node.key, node.value)
    }

    fn release(&mut self, slot: usize) -> Node<K, T> {
        let entry = &mut self.slots[slot];
        let Some(mut node) = entry.node.take() else {
            unreachable!("heap array references an empty slot");
        };
        node.heap_index = NOT_IN_HEAP;
        entry.generation += 1;
        self.free.push(slot);
        node
    }

    fn handle_of(&self, slot: usize) -> HeapHandle {
        HeapHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    fn node(&self, slot: usize) -> &Node<K, T> {
        match self.slots[slot].node.as_ref() {
            Some(node) => node,
            None => unreachable!("heap array references an empty slot"),
        }
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node<K, T> {
        match self.slots[slot].node.as_mut() {
            Some(node) => node,
            None => unreachable!("heap array references an empty slot"),
        }
    }

    fn key_at(&self, pos: usize) -> &K {
        &self.node(self.order[pos]).key
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.order.swap(a, b);
        let (slot_a, slot_b) = (self.order[a], self.order[b]);
        self.node_mut(slot_a).heap_index = a;
        self.node_mut(slot_b).heap_index = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.key_at(pos) < self.key_at(parent) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.order.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && self.key_at(right) < self.key_at(left) {
                right
            } else {
                left
            };
            if self.key_at(smallest) < self.key_at(pos) {
                self.swap(pos, smallest);
                pos = smallest;
            } else {
                break;
            }
        }
    }

    /// Panics unless the heap property and index bookkeeping both hold.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        for (pos, &slot) in self.order.iter().enumerate() {
            assert_eq!(self.node(slot).heap_index, pos, "stale heap_index at {pos}");
            for child in [2 * pos + 1, 2 * pos + 2] {
                if child < self.order.len() {
                    assert!(
                        self.key_at(pos) <= self.key_at(child),
                        "heap property broken between {pos} and {child}"
                    );
                }
            }
        }
        let live = self.slots.iter().filter(|s| s.node.is_some()).count();
        assert_eq!(live, self.order.len());
    }
}
