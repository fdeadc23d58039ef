//! Sorted-set connection abstraction and an in-process implementation.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::QueueError;

/// The sorted-set operations [`DistributedStore`](super::DistributedStore) needs.
///
/// Mirrors Redis `ZSET` semantics: adding an existing member updates its
/// score; equal scores order by member.
pub trait SortedSetConnection: Send {
    /// Add `member` with `score`, replacing any previous score.
    fn add(&mut self, key: &str, member: &str, score: f64) -> Result<(), QueueError>;

    /// Atomically remove and return the lowest-scored member whose score is
    /// at most `max_score`.
    fn pop_min_at_most(&mut self, key: &str, max_score: f64) -> Result<Option<(String, f64)>, QueueError>;

    /// Remove `member`. Returns `false` if it was absent.
    fn remove(&mut self, key: &str, member: &str) -> Result<bool, QueueError>;

    /// Lowest score in the set.
    fn min_score(&mut self, key: &str) -> Result<Option<f64>, QueueError>;

    /// Number of members.
    fn card(&mut self, key: &str) -> Result<usize, QueueError>;

    /// Every member, lowest score first.
    fn members(&mut self, key: &str) -> Result<Vec<String>, QueueError>;
}

#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Default)]
struct SetState {
    scores: HashMap<String, Score>,
    ordered: BTreeSet<(Score, String)>,
}

impl SetState {
    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.ordered.remove(&(score, member.to_owned())),
            None => false,
        }
    }
}

/// In-process sorted sets with Redis semantics.
///
/// Clones share state, so several stores can model processes sharing one
/// server. [`InMemorySortedSet::set_available`] simulates an outage.
#[derive(Clone)]
pub struct InMemorySortedSet {
    sets: Arc<Mutex<HashMap<String, SetState>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemorySortedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySortedSet {
    /// Create an empty, reachable instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Toggle reachability for every clone.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::Release);
    }

    fn check(&self) -> Result<(), QueueError> {
        if self.available.load(AtomicOrdering::Acquire) {
            Ok(())
        } else {
            Err(QueueError::BackendUnavailable("connection refused".into()))
        }
    }
}

impl SortedSetConnection for InMemorySortedSet {
    fn add(&mut self, key: &str, member: &str, score: f64) -> Result<(), QueueError> {
        self.check()?;
        let mut sets = self.sets.lock();
        let set = sets.entry(key.to_owned()).or_default();
        set.remove(member);
        set.scores.insert(member.to_owned(), Score(score));
        set.ordered.insert((Score(score), member.to_owned()));
        Ok(())
    }

    fn pop_min_at_most(&mut self, key: &str, max_score: f64) -> Result<Option<(String, f64)>, QueueError> {
        self.check()?;
        let mut sets = self.sets.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(None);
        };
        let due = set
            .ordered
            .first()
            .is_some_and(|(score, _)| *score <= Score(max_score));
        if !due {
            return Ok(None);
        }
        Ok(set.ordered.pop_first().map(|(score, member)| {
            set.scores.remove(&member);
            (member, score.0)
        }))
    }

    fn remove(&mut self, key: &str, member: &str) -> Result<bool, QueueError> {
        self.check()?;
        Ok(self
            .sets
            .lock()
            .get_mut(key)
            .is_some_and(|set| set.remove(member)))
    }

    fn min_score(&mut self, key: &str) -> Result<Option<f64>, QueueError> {
        self.check()?;
        Ok(self
            .sets
            .lock()
            .get(key)
            .and_then(|set| set.ordered.first().map(|(score, _)| score.0)))
    }

    fn card(&mut self, key: &str) -> Result<usize, QueueError> {
        self.check()?;
        Ok(self.sets.lock().get(key).map_or(0, |set| set.scores.len()))
    }

    fn members(&mut self, key: &str) -> Result<Vec<String>, QueueError> {
        self.check()?;
        Ok(self
            .sets
            .lock()
            .get(key)
            .map(|set| set.ordered.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default())
    }
}
