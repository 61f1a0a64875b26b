//! Aggregate vote counters per `(poll, option)`.
//!
//! Counters only move by one in either direction. Nothing outside this module
//! sets a count directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use shared::models::{OptionId, OptionTally, PollId};

use crate::store::{poisoned, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Increment,
    Decrement,
}

impl Delta {
    pub const fn inverse(self) -> Self {
        match self {
            Delta::Increment => Delta::Decrement,
            Delta::Decrement => Delta::Increment,
        }
    }
}

#[rocket::async_trait]
pub trait TallyStore: Send + Sync {
    /// Applies `delta` atomically and returns the count after this adjustment.
    ///
    /// A decrement that would go below zero leaves the counter untouched and
    /// fails with [`StoreError::TallyUnderflow`].
    async fn adjust(&self, poll_id: PollId, option_id: OptionId, delta: Delta) -> Result<i64, StoreError>;

    /// Current counts of every option that has ever been incremented, ordered by option id.
    async fn snapshot(&self, poll_id: PollId) -> Result<Vec<OptionTally>, StoreError>;
}

type Counter = Arc<AtomicI64>;

#[derive(Debug, Default)]
pub struct MemoryTally {
    counters: RwLock<HashMap<(PollId, OptionId), Counter>>,
}

impl MemoryTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing counts, e.g. ones recomputed from the ledger at boot.
    ///
    /// A negative seed fails with [`StoreError::TallyUnderflow`].
    pub fn with_counts(counts: impl IntoIterator<Item = ((PollId, OptionId), i64)>) -> Result<Self, StoreError> {
        let mut counters = HashMap::new();
        for ((poll_id, option_id), votes) in counts {
            if votes < 0 {
                warn!("Refusing negative seed count {} for option {} on poll {}", votes, option_id, poll_id);
                return Err(StoreError::TallyUnderflow { poll_id, option_id });
            }
            counters.insert((poll_id, option_id), Arc::new(AtomicI64::new(votes)));
        }
        Ok(Self { counters: RwLock::new(counters) })
    }

    fn counter(&self, key: (PollId, OptionId)) -> Result<Counter, StoreError> {
        if let Some(counter) = self.counters.read().map_err(poisoned)?.get(&key) {
            return Ok(Arc::clone(counter));
        }
        let mut counters = self.counters.write().map_err(poisoned)?;
        Ok(Arc::clone(counters.entry(key).or_default()))
    }
}

#[rocket::async_trait]
impl TallyStore for MemoryTally {
    async fn adjust(&self, poll_id: PollId, option_id: OptionId, delta: Delta) -> Result<i64, StoreError> {
        let counter = self.counter((poll_id, option_id))?;

        match delta {
            Delta::Increment => Ok(counter.fetch_add(1, Ordering::AcqRel) + 1),
            Delta::Decrement => counter
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |votes| {
                    (votes > 0).then(|| votes - 1)
                })
                .map(|previous| previous - 1)
                .map_err(|_| StoreError::TallyUnderflow { poll_id, option_id }),
        }
    }

    async fn snapshot(&self, poll_id: PollId) -> Result<Vec<OptionTally>, StoreError> {
        let counters = self.counters.read().map_err(poisoned)?;
        let mut options: Vec<_> = counters
            .iter()
            .filter(|((poll, _), _)| *poll == poll_id)
            .map(|((_, option_id), votes)| OptionTally {
                option_id: *option_id,
                votes: votes.load(Ordering::Acquire),
            })
            .collect();
        options.sort_by_key(|tally| tally.option_id);
        Ok(options)
    }
}
