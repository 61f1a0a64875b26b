//! Vote submission: the state machine tying ledger, tally and broadcast together.
//!
//! Per `(poll, voter)` the state is either no vote or a vote for one option.
//! A submission records a first vote, rejects a repeat of the current option,
//! or moves the vote to another option. Submissions for the same key are
//! serialized; every applied step is undone in reverse if a later one fails.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use shared::models::*;

use crate::broadcast::Broadcaster;
use crate::catalog::{CatalogLookup, PollCatalog};
use crate::ledger::VoteLedger;
use crate::locks::KeyedLocks;
use crate::session::SessionIdentity;
use crate::store::StoreError;
use crate::tally::{Delta, TallyStore};

#[derive(Debug, Clone, thiserror::Error)]
pub enum VoteError {
    #[error("User already voted on this poll")]
    DuplicateVote,
    #[error("Poll {0} not found")]
    PollNotFound(PollId),
    #[error("Option {option_id} not found on poll {poll_id}")]
    OptionNotFound { poll_id: PollId, option_id: OptionId },
    #[error("Ledger conflict: {0}")]
    Conflict(String),
    #[error("Tally underflow: {0}")]
    TallyUnderflow(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for VoteError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { .. } => VoteError::Conflict(e.to_string()),
            StoreError::TallyUnderflow { .. } => VoteError::TallyUnderflow(e.to_string()),
            StoreError::Unavailable(msg) => VoteError::StoreUnavailable(msg),
            StoreError::Backend(msg) => VoteError::Internal(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteReceipt {
    pub voter: VoterToken,
    /// Set only when the token was minted by this submission.
    pub issued_token: Option<VoterToken>,
    pub status: VoteStatus,
    pub vote: Vote,
    pub votes: i64,
    pub previous_option: Option<OptionId>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorOptions {
    /// Also publish the old option's count when a vote moves.
    pub announce_retractions: bool,
}

#[derive(Debug)]
enum Undo {
    Remove(VoteId),
    Restore(Vote),
    Adjust(OptionId, Delta),
}

pub struct VoteCoordinator {
    catalog: Arc<dyn PollCatalog>,
    ledger: Arc<dyn VoteLedger>,
    tally: Arc<dyn TallyStore>,
    broadcaster: Broadcaster,
    sessions: SessionIdentity,
    locks: KeyedLocks<(PollId, VoterToken)>,
    options: CoordinatorOptions,
}

impl VoteCoordinator {
    pub fn new(
        catalog: Arc<dyn PollCatalog>,
        ledger: Arc<dyn VoteLedger>,
        tally: Arc<dyn TallyStore>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            catalog,
            ledger,
            tally,
            broadcaster,
            sessions: SessionIdentity,
            locks: KeyedLocks::new(),
            options: CoordinatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }

    #[instrument(skip(self, token), fields(poll_id = %poll_id, option_id = %option_id))]
    pub async fn submit_vote(
        &self,
        poll_id: PollId,
        option_id: OptionId,
        token: Option<VoterToken>,
    ) -> Result<VoteReceipt, VoteError> {
        let session = self.sessions.resolve(token);

        match self.catalog.lookup(poll_id, option_id).await? {
            CatalogLookup::Found => {}
            CatalogLookup::UnknownPoll => return Err(VoteError::PollNotFound(poll_id)),
            CatalogLookup::UnknownOption => return Err(VoteError::OptionNotFound { poll_id, option_id }),
        }

        let _guard = self.locks.lock((poll_id, session.token.clone())).await;

        let existing = self.ledger.find(poll_id, &session.token).await?;
        let (vote, votes, previous_option) = match existing {
            None => {
                let (vote, votes) = self.record_first(poll_id, option_id, &session.token).await?;
                (vote, votes, None)
            }
            Some(current) if current.option_id == option_id => {
                debug!("Rejecting repeat vote for current option");
                return Err(VoteError::DuplicateVote);
            }
            Some(current) => {
                let previous = current.option_id;
                let (vote, votes) = self.change(current, option_id).await?;
                (vote, votes, Some(previous))
            }
        };

        let status = if previous_option.is_some() { VoteStatus::Changed } else { VoteStatus::Recorded };
        info!(?status, votes, "Vote accepted");

        Ok(VoteReceipt {
            issued_token: session.is_new.then(|| session.token.clone()),
            voter: session.token,
            status,
            vote,
            votes,
            previous_option,
        })
    }

    pub async fn results(&self, poll_id: PollId) -> Result<PollResults, VoteError> {
        if !self.catalog.poll_exists(poll_id).await? {
            return Err(VoteError::PollNotFound(poll_id));
        }
        let options = self.tally.snapshot(poll_id).await?;
        Ok(PollResults { poll_id, options })
    }

    async fn record_first(
        &self,
        poll_id: PollId,
        option_id: OptionId,
        voter: &VoterToken,
    ) -> Result<(Vote, i64), VoteError> {
        let mut undo = Vec::new();

        let vote = self.ledger.create(Vote::new(poll_id, voter.clone(), option_id)).await?;
        undo.push(Undo::Remove(vote.id));

        let votes = match self.tally.adjust(poll_id, option_id, Delta::Increment).await {
            Ok(votes) => votes,
            Err(e) => return Err(self.abort(poll_id, undo, e).await),
        };

        self.announce(poll_id, option_id, votes);
        Ok((vote, votes))
    }

    async fn change(&self, current: Vote, option_id: OptionId) -> Result<(Vote, i64), VoteError> {
        let poll_id = current.poll_id;
        let previous = current.option_id;
        let mut undo = Vec::new();

        self.ledger.remove(current.id).await?;
        undo.push(Undo::Restore(current.clone()));

        let retracted = match self.tally.adjust(poll_id, previous, Delta::Decrement).await {
            Ok(votes) => votes,
            Err(e) => return Err(self.abort(poll_id, undo, e).await),
        };
        undo.push(Undo::Adjust(previous, Delta::Decrement));

        let vote = match self.ledger.create(current.recast(option_id)).await {
            Ok(vote) => vote,
            Err(e) => return Err(self.abort(poll_id, undo, e).await),
        };
        undo.push(Undo::Remove(vote.id));

        let votes = match self.tally.adjust(poll_id, option_id, Delta::Increment).await {
            Ok(votes) => votes,
            Err(e) => return Err(self.abort(poll_id, undo, e).await),
        };

        if self.options.announce_retractions {
            self.announce(poll_id, previous, retracted);
        }
        self.announce(poll_id, option_id, votes);
        Ok((vote, votes))
    }

    /// Replays `undo` newest first and returns the error that triggered it.
    async fn abort(&self, poll_id: PollId, undo: Vec<Undo>, cause: StoreError) -> VoteError {
        warn!("Vote submission failed, rolling back {} steps: {}", undo.len(), cause);

        for step in undo.into_iter().rev() {
            let outcome = match &step {
                Undo::Remove(vote_id) => self.ledger.remove(*vote_id).await,
                Undo::Restore(vote) => self.ledger.create(vote.clone()).await.map(|_| ()),
                Undo::Adjust(option_id, delta) => {
                    self.tally.adjust(poll_id, *option_id, delta.inverse()).await.map(|_| ())
                }
            };
            if let Err(e) = outcome {
                error!("Rollback step {:?} failed on poll {}: {}", step, poll_id, e);
            }
        }

        cause.into()
    }

    fn announce(&self, poll_id: PollId, option_id: OptionId, votes: i64) {
        self.broadcaster.publish(TallyEvent { poll_id, option_id, votes });
    }
}
