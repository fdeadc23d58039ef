//! `SortedSetConnection` over a synchronous Redis connection.

use std::sync::LazyLock;

use redis::{Commands, RedisError, Script};

use super::SortedSetConnection;
use crate::core::QueueError;

// Range and removal run as one script so two poppers never get the same member.
static POP_DUE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
local hit = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'WITHSCORES', 'LIMIT', 0, 1)
if #hit == 0 then
    return false
end
redis.call('ZREM', KEYS[1], hit[1])
return hit
",
    )
});

/// Classify a Redis error: connectivity problems become `BackendUnavailable`.
pub(crate) fn map_redis_error(err: RedisError) -> QueueError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        QueueError::BackendUnavailable(err.to_string())
    } else {
        QueueError::Backend(err.to_string())
    }
}

impl SortedSetConnection for redis::Connection {
    fn add(&mut self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        let _: usize = self.zadd(key, member, score).map_err(map_redis_error)?;
        Ok(())
    }

    fn pop_min_at_most(&mut self, key: &str, max_score: f64) -> Result<Option<(String, f64)>, QueueError> {
        POP_DUE
            .key(key)
            .arg(max_score)
            .invoke(self)
            .map_err(map_redis_error)
    }

    fn remove(&mut self, key: &str, member: &str) -> Result<bool, QueueError> {
        let removed: usize = self.zrem(key, member).map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    fn min_score(&mut self, key: &str) -> Result<Option<f64>, QueueError> {
        let first: Vec<(String, f64)> = self.zrange_withscores(key, 0, 0).map_err(map_redis_error)?;
        Ok(first.first().map(|(_, score)| *score))
    }

    fn card(&mut self, key: &str) -> Result<usize, QueueError> {
        self.zcard(key).map_err(map_redis_error)
    }

    fn members(&mut self, key: &str) -> Result<Vec<String>, QueueError> {
        self.zrange(key, 0, -1).map_err(map_redis_error)
    }
}
