//! Postgres adapters for the catalog, ledger and tally.

use sqlx::{PgPool, Row};
use uuid::Uuid;
use time::OffsetDateTime;
use std::collections::HashMap;
use shared::models::*;

use crate::catalog::{CatalogLookup, PollCatalog};
use crate::ledger::VoteLedger;
use crate::store::StoreError;
use crate::tally::{Delta, TallyStore};

#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl PollCatalog for PgCatalog {
    async fn lookup(&self, poll_id: PollId, option_id: OptionId) -> Result<CatalogLookup, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM polls WHERE id = $1) AS poll_found,
                    EXISTS (SELECT 1 FROM poll_options WHERE id = $2 AND poll_id = $1) AS option_found"
        )
        .bind(poll_id.as_uuid())
        .bind(option_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        let poll_found: bool = row.try_get("poll_found")?;
        let option_found: bool = row.try_get("option_found")?;

        Ok(match (poll_found, option_found) {
            (false, _) => CatalogLookup::UnknownPoll,
            (true, false) => CatalogLookup::UnknownOption,
            (true, true) => CatalogLookup::Found,
        })
    }

    async fn poll_exists(&self, poll_id: PollId) -> Result<bool, StoreError> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM polls WHERE id = $1)")
            .bind(poll_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }
}

#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Live vote counts per option, used to warm an in-memory tally.
    pub async fn count_by_option(&self) -> Result<HashMap<(PollId, OptionId), i64>, StoreError> {
        let rows = sqlx::query(
            "SELECT poll_id, poll_option_id, COUNT(*) AS votes FROM votes GROUP BY poll_id, poll_option_id"
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<_, StoreError> {
                let poll_id: Uuid = row.try_get("poll_id")?;
                let option_id: Uuid = row.try_get("poll_option_id")?;
                let votes: i64 = row.try_get("votes")?;
                Ok(((PollId::from(poll_id), OptionId::from(option_id)), votes))
            })
            .collect()
    }
}

#[rocket::async_trait]
impl VoteLedger for PgLedger {
    async fn find(&self, poll_id: PollId, voter: &VoterToken) -> Result<Option<Vote>, StoreError> {
        let record = sqlx::query(
            "SELECT id, poll_option_id, created_at FROM votes WHERE session_id = $1 AND poll_id = $2"
        )
        .bind(voter.as_str())
        .bind(poll_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = record else { return Ok(None) };

        let id: Uuid = row.try_get("id")?;
        let option_id: Uuid = row.try_get("poll_option_id")?;
        let cast_at: OffsetDateTime = row.try_get("created_at")?;

        Ok(Some(Vote {
            id: VoteId::from(id),
            poll_id,
            voter: voter.clone(),
            option_id: OptionId::from(option_id),
            cast_at,
        }))
    }

    async fn create(&self, vote: Vote) -> Result<Vote, StoreError> {
        sqlx::query(
            "INSERT INTO votes (id, session_id, poll_id, poll_option_id, created_at)
             VALUES ($1, $2, $3, $4, $5)"
        )
        .bind(vote.id.as_uuid())
        .bind(vote.voter.as_str())
        .bind(vote.poll_id.as_uuid())
        .bind(vote.option_id.as_uuid())
        .bind(vote.cast_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                StoreError::Conflict { poll_id: vote.poll_id, voter: vote.voter.clone() }
            } else {
                StoreError::from(e)
            }
        })?;

        Ok(vote)
    }

    async fn remove(&self, vote_id: VoteId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(vote_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgTally {
    pool: PgPool,
}

impl PgTally {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl TallyStore for PgTally {
    async fn adjust(&self, poll_id: PollId, option_id: OptionId, delta: Delta) -> Result<i64, StoreError> {
        match delta {
            Delta::Increment => {
                let votes = sqlx::query_scalar::<_, i64>(
                    "INSERT INTO poll_tallies (poll_id, poll_option_id, votes) VALUES ($1, $2, 1)
                     ON CONFLICT (poll_id, poll_option_id)
                     DO UPDATE SET votes = poll_tallies.votes + 1
                     RETURNING votes"
                )
                .bind(poll_id.as_uuid())
                .bind(option_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
                Ok(votes)
            }
            // Never inserts: a missing or zero row is an underflow.
            Delta::Decrement => {
                let votes = sqlx::query_scalar::<_, i64>(
                    "UPDATE poll_tallies SET votes = votes - 1
                     WHERE poll_id = $1 AND poll_option_id = $2 AND votes > 0
                     RETURNING votes"
                )
                .bind(poll_id.as_uuid())
                .bind(option_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
                votes.ok_or(StoreError::TallyUnderflow { poll_id, option_id })
            }
        }
    }

    async fn snapshot(&self, poll_id: PollId) -> Result<Vec<OptionTally>, StoreError> {
        let rows = sqlx::query(
            "SELECT poll_option_id, votes FROM poll_tallies WHERE poll_id = $1 ORDER BY poll_option_id"
        )
        .bind(poll_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<_, StoreError> {
                let option_id: Uuid = row.try_get("poll_option_id")?;
                Ok(OptionTally {
                    option_id: OptionId::from(option_id),
                    votes: row.try_get("votes")?,
                })
            })
            .collect()
    }
}
