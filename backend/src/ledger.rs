//! Durable record of each voter's current choice per poll.
//!
//! The ledger is the only authority on whether a voter has already voted.
//! Records are created and removed, never updated in place.

use std::collections::HashMap;
use std::sync::Mutex;

use shared::models::{PollId, Vote, VoteId, VoterToken};

use crate::store::{poisoned, StoreError};

#[rocket::async_trait]
pub trait VoteLedger: Send + Sync {
    async fn find(&self, poll_id: PollId, voter: &VoterToken) -> Result<Option<Vote>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if `(poll_id, voter)` already has a vote.
    async fn create(&self, vote: Vote) -> Result<Vote, StoreError>;

    /// Removing an id that is not present is a no-op.
    async fn remove(&self, vote_id: VoteId) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct LedgerTables {
    by_voter: HashMap<(PollId, VoterToken), Vote>,
    by_id: HashMap<VoteId, (PollId, VoterToken)>,
}

#[derive(Debug, Default)]
pub struct MemoryLedger {
    tables: Mutex<LedgerTables>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn votes_for_poll(&self, poll_id: PollId) -> Vec<Vote> {
        match self.tables.lock() {
            Ok(tables) => tables
                .by_voter
                .values()
                .filter(|vote| vote.poll_id == poll_id)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.lock().map(|t| t.by_voter.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[rocket::async_trait]
impl VoteLedger for MemoryLedger {
    async fn find(&self, poll_id: PollId, voter: &VoterToken) -> Result<Option<Vote>, StoreError> {
        let tables = self.tables.lock().map_err(poisoned)?;
        Ok(tables.by_voter.get(&(poll_id, voter.clone())).cloned())
    }

    async fn create(&self, vote: Vote) -> Result<Vote, StoreError> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        let key = (vote.poll_id, vote.voter.clone());

        if tables.by_voter.contains_key(&key) || tables.by_id.contains_key(&vote.id) {
            return Err(StoreError::Conflict {
                poll_id: vote.poll_id,
                voter: vote.voter,
            });
        }

        tables.by_id.insert(vote.id, key.clone());
        tables.by_voter.insert(key, vote.clone());
        Ok(vote)
    }

    async fn remove(&self, vote_id: VoteId) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().map_err(poisoned)?;
        if let Some(key) = tables.by_id.remove(&vote_id) {
            tables.by_voter.remove(&key);
        }
        Ok(())
    }
}
