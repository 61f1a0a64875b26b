use shared::models::{OptionId, PollId, VoterToken};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Vote already exists for voter {voter} on poll {poll_id}")]
    Conflict { poll_id: PollId, voter: VoterToken },
    #[error("Tally for option {option_id} on poll {poll_id} would drop below zero")]
    TallyUnderflow { poll_id: PollId, option_id: OptionId },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub(crate) fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend("store lock poisoned".into())
}
