//! Priority-store backends that live outside the process.

mod distributed;
#[cfg(feature = "redis-store")]
mod redis_conn;
mod sorted_set;

pub use distributed::{DistributedStore, DEFAULT_KEY};
pub use sorted_set::{InMemorySortedSet, SortedSetConnection};

#[cfg(feature = "redis-store")]
impl DistributedStore<redis::Connection> {
    /// Connect to the Redis server at `url` and use the sorted set `key`.
    ///
    /// # Errors
    ///
    /// `QueueError::BackendUnavailable` if the server cannot be reached;
    /// `QueueError::Backend` for a malformed URL.
    pub fn open(url: &str, key: impl Into<String>) -> Result<Self, crate::core::QueueError> {
        let client = redis::Client::open(url).map_err(redis_conn::map_redis_error)?;
        let conn = client.get_connection().map_err(redis_conn::map_redis_error)?;
        let store = Self::with_connection(conn, key);
        tracing::info!(key = %store.key(), "connected to redis");
        Ok(store)
    }
}
