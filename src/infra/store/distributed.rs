//! Deadline-ordered store kept in a shared sorted set.
//!
//! Each queued item is one member of the set under `key`; the member is the
//! JSON-encoded item and the score is its deadline in milliseconds. Any number
//! of processes may share a key: the pop is a single atomic server-side step,
//! so an item is handed to at most one of them.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::SortedSetConnection;
use crate::core::{Item, ItemId, PriorityStore, QueueError};
use crate::util::clock::Timestamp;

/// Sorted-set key used when none is configured.
pub const DEFAULT_KEY: &str = "tasks";

/// Shared-server backend over a [`SortedSetConnection`].
///
/// The connection is exclusively owned and guarded by a mutex; once
/// [`close`](Self::close) runs every operation fails with
/// `QueueError::BackendUnavailable`.
pub struct DistributedStore<C> {
    key: String,
    conn: Mutex<Option<C>>,
}

#[derive(Deserialize)]
struct MemberId {
    id: Option<ItemId>,
}

#[allow(clippy::cast_precision_loss)]
fn score_of(deadline: Timestamp) -> f64 {
    deadline as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp_of(score: f64) -> Timestamp {
    score as Timestamp
}

impl<C: SortedSetConnection> DistributedStore<C> {
    /// Wrap an established connection.
    pub fn with_connection(conn: C, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            conn: Mutex::new(Some(conn)),
        }
    }

    /// The sorted-set key this store uses.
    pub fn key(&self) -> &str {
        &self.key
    }

    fn with_conn<R>(&self, op: impl FnOnce(&mut C, &str) -> Result<R, QueueError>) -> Result<R, QueueError> {
        let mut guard = self.conn.lock();
        let conn = guard
            .as_mut()
            .ok_or_else(|| QueueError::BackendUnavailable(format!("store for key '{}' is closed", self.key)))?;
        op(conn, &self.key)
    }

    /// Add `member` scored by `deadline`. Re-adding a member moves it.
    ///
    /// # Errors
    ///
    /// Connectivity failures map to `QueueError::BackendUnavailable`.
    pub fn insert(&self, member: &str, deadline: Timestamp) -> Result<(), QueueError> {
        self.with_conn(|conn, key| conn.add(key, member, score_of(deadline)))?;
        debug!(key = %self.key, deadline, "member added");
        Ok(())
    }

    /// Atomically remove and return the earliest member with a deadline at or
    /// before `now`, or `None` if nothing qualifies.
    ///
    /// # Errors
    ///
    /// Connectivity failures map to `QueueError::BackendUnavailable`.
    pub fn pop_due_before(&self, now: Timestamp) -> Result<Option<String>, QueueError> {
        Ok(self.pop_scored(now)?.map(|(member, _)| member))
    }

    fn pop_scored(&self, cutoff: Timestamp) -> Result<Option<(String, Timestamp)>, QueueError> {
        let hit = self.with_conn(|conn, key| conn.pop_min_at_most(key, score_of(cutoff)))?;
        Ok(hit.map(|(member, score)| (member, timestamp_of(score))))
    }

    /// Remove `member`. `Ok(false)` if it was not queued.
    ///
    /// # Errors
    ///
    /// Connectivity failures map to `QueueError::BackendUnavailable`.
    pub fn remove_member(&self, member: &str) -> Result<bool, QueueError> {
        self.with_conn(|conn, key| conn.remove(key, member))
    }

    /// Earliest queued deadline.
    ///
    /// # Errors
    ///
    /// Connectivity failures map to `QueueError::BackendUnavailable`.
    pub fn earliest_deadline(&self) -> Result<Option<Timestamp>, QueueError> {
        Ok(self.with_conn(|conn, key| conn.min_score(key))?.map(timestamp_of))
    }

    /// Number of queued members.
    ///
    /// # Errors
    ///
    /// Connectivity failures map to `QueueError::BackendUnavailable`.
    pub fn count(&self) -> Result<usize, QueueError> {
        self.with_conn(SortedSetConnection::card)
    }

    /// Release the connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// None today; dropping either supported connection cannot fail.
    pub fn close(&self) -> Result<(), QueueError> {
        let conn = self.conn.lock().take();
        if let Some(conn) = conn {
            drop(conn);
            info!(key = %self.key, "distributed store closed");
        }
        Ok(())
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.conn.lock().is_none()
    }
}

/// Items travel as JSON members scored by deadline.
///
/// `pop_due` removes the member before decoding it; a member that does not
/// decode as `Item<P>` fails with `QueueError::Codec` carrying the raw member
/// text, and is no longer in the set.
impl<P, C> PriorityStore<P> for DistributedStore<C>
where
    P: Serialize + DeserializeOwned + Send,
    C: SortedSetConnection,
{
    fn insert(&self, mut item: Item<P>) -> Result<ItemId, QueueError> {
        let deadline = item
            .deadline_ms()
            .ok_or_else(|| QueueError::InvalidItem("distributed store requires a deadline".into()))?;
        let id = ItemId::new();
        item.assign_id(id);
        let member = serde_json::to_string(&item).map_err(|e| QueueError::Codec(e.to_string()))?;
        DistributedStore::insert(self, &member, deadline)?;
        Ok(id)
    }

    fn pop_due(&self, cutoff: Timestamp) -> Result<Option<Item<P>>, QueueError> {
        let Some((member, deadline)) = self.pop_scored(cutoff)? else {
            return Ok(None);
        };
        // The member is already gone from the set; hand it back in the error.
        let mut item: Item<P> = serde_json::from_str(&member).map_err(|e| {
            warn!(key = %self.key, error = %e, "popped undecodable member");
            QueueError::Codec(format!("undecodable member {member:?}: {e}"))
        })?;
        item.set_deadline(deadline);
        Ok(Some(item))
    }

    fn peek_deadline(&self) -> Result<Option<Timestamp>, QueueError> {
        self.earliest_deadline()
    }

    // Members are keyed by content, so finding one by id scans the set.
    fn remove(&self, id: ItemId) -> Result<bool, QueueError> {
        self.with_conn(|conn, key| {
            for member in conn.members(key)? {
                let matches = serde_json::from_str::<MemberId>(&member).is_ok_and(|m| m.id == Some(id));
                if matches {
                    return conn.remove(key, &member);
                }
            }
            Ok(false)
        })
    }

    fn len(&self) -> Result<usize, QueueError> {
        self.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::store::InMemorySortedSet;
    use std::sync::Arc;
    use std::thread;

    const T: Timestamp = 1_700_000_000_000;

    fn store() -> DistributedStore<InMemorySortedSet> {
        DistributedStore::with_connection(InMemorySortedSet::new(), DEFAULT_KEY)
    }

    #[test]
    fn test_pop_due_before_returns_member_once() {
        let store = store();
        store.insert("x", T).unwrap();
        assert_eq!(store.pop_due_before(T).unwrap(), Some("x".to_string()));
        assert_eq!(store.pop_due_before(T).unwrap(), None);
    }

    #[test]
    fn test_future_member_stays() {
        let store = store();
        store.insert("x", T + 1).unwrap();
        assert_eq!(store.pop_due_before(T).unwrap(), None);
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.earliest_deadline().unwrap(), Some(T + 1));
    }

    #[test]
    fn test_typed_roundtrip_keeps_id_and_deadline() {
        let store = store();
        let id = PriorityStore::insert(&store, Item::with_deadline(vec![1u8, 2], T)).unwrap();
        let item: Item<Vec<u8>> = PriorityStore::pop_due(&store, T).unwrap().unwrap();
        assert_eq!(item.id(), Some(id));
        assert_eq!(item.deadline_ms(), Some(T));
        assert_eq!(item.value, vec![1, 2]);
    }

    #[test]
    fn test_typed_insert_requires_deadline() {
        let store = store();
        let err = PriorityStore::insert(&store, Item::new(1u32)).unwrap_err();
        assert!(matches!(err, QueueError::InvalidItem(_)));
    }

    #[test]
    fn test_remove_by_id() {
        let store = store();
        let keep = PriorityStore::insert(&store, Item::with_deadline("keep".to_string(), T)).unwrap();
        let gone = PriorityStore::insert(&store, Item::with_deadline("gone".to_string(), T)).unwrap();
        assert!(PriorityStore::<String>::remove(&store, gone).unwrap());
        assert!(!PriorityStore::<String>::remove(&store, gone).unwrap());
        let left: Item<String> = PriorityStore::pop_due(&store, T).unwrap().unwrap();
        assert_eq!(left.id(), Some(keep));
    }

    #[test]
    fn test_undecodable_member_is_returned_in_error() {
        let store = store();
        store.insert("not-json", T).unwrap();
        let err = PriorityStore::<u32>::pop_due(&store, T).unwrap_err();
        match err {
            QueueError::Codec(msg) => assert!(msg.contains("\"not-json\""), "{msg}"),
            other => panic!("expected Codec, got {other:?}"),
        }
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_operations() {
        let store = store();
        store.close().unwrap();
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.insert("x", T), Err(QueueError::BackendUnavailable(_))));
    }

    #[test]
    fn test_shared_server_pops_each_member_once() {
        let server = InMemorySortedSet::new();
        let seed = DistributedStore::with_connection(server.clone(), "shared");
        for i in 0..200u128 {
            seed.insert(&format!("m{i}"), T + i).unwrap();
        }

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::new(DistributedStore::with_connection(server.clone(), "shared"));
                thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Some(member) = store.pop_due_before(T + 1_000).unwrap() {
                        got.push(member);
                    }
                    got
                })
            })
            .collect();

        let mut all: Vec<String> = workers.into_iter().flat_map(|w| w.join().unwrap()).collect();
        assert_eq!(all.len(), 200);
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 200);
    }
}
