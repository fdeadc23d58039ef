//! Work items and their ordering key.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::Timestamp;

/// Identifier assigned to an item when a backend admits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Numeric urgency class. Lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub u32);

impl Priority {
    /// Most urgent class.
    pub const CRITICAL: Self = Self(0);
    /// Urgent work.
    pub const HIGH: Self = Self(1);
    /// Default class.
    pub const NORMAL: Self = Self(2);
    /// Background work.
    pub const LOW: Self = Self(3);
}

/// Ordering key extracted from an item at admission.
///
/// Items with a deadline come first, earliest deadline first; equal deadlines
/// fall back to priority. Items without a deadline are ordered by priority,
/// and items with neither sort last. Remaining ties are unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    /// Absolute deadline, if any.
    pub deadline: Option<Timestamp>,
    /// Priority class, if any.
    pub priority: Option<Priority>,
}

fn some_first<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        some_first(self.deadline, other.deadline)
            .then_with(|| some_first(self.priority, other.priority))
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A unit of work: an opaque payload plus its urgency.
///
/// The id is assigned by the backend on admission; items built by callers
/// carry none until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "P: Serialize"))]
#[serde(bound(deserialize = "P: serde::de::DeserializeOwned"))]
pub struct Item<P> {
    id: Option<ItemId>,
    deadline: Option<Timestamp>,
    priority: Option<Priority>,
    /// Caller payload, never inspected by the queue.
    pub value: P,
}

impl<P> Item<P> {
    /// Item with neither deadline nor priority; it sorts last.
    pub const fn new(value: P) -> Self {
        Self {
            id: None,
            deadline: None,
            priority: None,
            value,
        }
    }

    /// Item due at `deadline`.
    pub const fn with_deadline(value: P, deadline: Timestamp) -> Self {
        Self {
            id: None,
            deadline: Some(deadline),
            priority: None,
            value,
        }
    }

    /// Item ordered by `priority` only.
    pub const fn with_priority(value: P, priority: Priority) -> Self {
        Self {
            id: None,
            deadline: None,
            priority: Some(priority),
            value,
        }
    }

    /// Set the deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Identifier assigned on admission.
    pub const fn id(&self) -> Option<ItemId> {
        self.id
    }

    /// Absolute deadline, if any.
    pub const fn deadline_ms(&self) -> Option<Timestamp> {
        self.deadline
    }

    /// Priority class, if any.
    pub const fn priority_class(&self) -> Option<Priority> {
        self.priority
    }

    /// Ordering key for this item.
    pub const fn key(&self) -> OrderKey {
        OrderKey {
            deadline: self.deadline,
            priority: self.priority,
        }
    }

    /// Consume the item, returning its payload.
    pub fn into_value(self) -> P {
        self.value
    }

    pub(crate) fn assign_id(&mut self, id: ItemId) {
        self.id = Some(id);
    }

    pub(crate) fn set_deadline(&mut self, deadline: Timestamp) {
        self.deadline = Some(deadline);
    }
}
