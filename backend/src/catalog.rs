use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use shared::models::{OptionId, PollId};

use crate::store::{poisoned, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLookup {
    Found,
    UnknownPoll,
    UnknownOption,
}

/// Read-only view of the poll catalog. Polls are created elsewhere.
#[rocket::async_trait]
pub trait PollCatalog: Send + Sync {
    async fn lookup(&self, poll_id: PollId, option_id: OptionId) -> Result<CatalogLookup, StoreError>;

    async fn poll_exists(&self, poll_id: PollId) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    polls: RwLock<HashMap<PollId, HashSet<OptionId>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_poll(&self, poll_id: PollId, options: impl IntoIterator<Item = OptionId>) {
        if let Ok(mut polls) = self.polls.write() {
            polls.entry(poll_id).or_default().extend(options);
        }
    }
}

#[rocket::async_trait]
impl PollCatalog for MemoryCatalog {
    async fn lookup(&self, poll_id: PollId, option_id: OptionId) -> Result<CatalogLookup, StoreError> {
        let polls = self.polls.read().map_err(poisoned)?;
        Ok(match polls.get(&poll_id) {
            None => CatalogLookup::UnknownPoll,
            Some(options) if options.contains(&option_id) => CatalogLookup::Found,
            Some(_) => CatalogLookup::UnknownOption,
        })
    }

    async fn poll_exists(&self, poll_id: PollId) -> Result<bool, StoreError> {
        Ok(self.polls.read().map_err(poisoned)?.contains_key(&poll_id))
    }
}
