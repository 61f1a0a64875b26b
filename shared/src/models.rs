use serde::{Serialize, Deserialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::validation::{self, ValidationError};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                validation::parse_uuid(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a poll in the external catalog.
    PollId
);
uuid_id!(
    /// Identifier of one option of a poll.
    OptionId
);
uuid_id!(
    /// Identifier of a logical vote. Survives option changes.
    VoteId
);

/// Opaque, anonymous, client-held voter identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterToken(String);

impl VoterToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        validation::validate_voter_token(raw)?;
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One voter's current choice on one poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: VoteId,
    pub poll_id: PollId,
    pub voter: VoterToken,
    pub option_id: OptionId,
    pub cast_at: OffsetDateTime,
}

impl Vote {
    pub fn new(poll_id: PollId, voter: VoterToken, option_id: OptionId) -> Self {
        Self {
            id: VoteId::new(),
            poll_id,
            voter,
            option_id,
            cast_at: OffsetDateTime::now_utc(),
        }
    }

    /// The replacement record for an option change: same id, new option.
    pub fn recast(&self, option_id: OptionId) -> Self {
        Self {
            id: self.id,
            poll_id: self.poll_id,
            voter: self.voter.clone(),
            option_id,
            cast_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoteStatus {
    Recorded,
    Changed,
}

/// Published to live subscribers whenever an option's count moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEvent {
    pub poll_id: PollId,
    #[serde(rename = "pollOptionId")]
    pub option_id: OptionId,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub poll_option_id: OptionId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteResponse {
    pub status: VoteStatus,
    pub poll_option_id: OptionId,
    pub votes: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    #[serde(rename = "pollOptionId")]
    pub option_id: OptionId,
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollResults {
    pub poll_id: PollId,
    pub options: Vec<OptionTally>,
}

impl PollResults {
    pub fn votes_for(&self, option_id: OptionId) -> i64 {
        self.options
            .iter()
            .find(|tally| tally.option_id == option_id)
            .map_or(0, |tally| tally.votes)
    }

    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|tally| tally.votes).sum()
    }
}
