use std::str::FromStr;

use crate::broadcast::DEFAULT_CAPACITY;

pub const DEFAULT_SESSION_MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be at least {min}")]
    TooSmall { key: &'static str, min: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TallyBackend {
    #[default]
    Postgres,
    /// In-process counters rebuilt from the ledger at start-up.
    Memory,
}

impl FromStr for TallyBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(TallyBackend::Postgres),
            "memory" => Ok(TallyBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub cookie_secret: Option<String>,
    pub session_max_age_days: i64,
    pub broadcast_capacity: usize,
    pub tally_backend: TallyBackend,
    pub announce_retractions: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cookie_secret: None,
            session_max_age_days: DEFAULT_SESSION_MAX_AGE_DAYS,
            broadcast_capacity: DEFAULT_CAPACITY,
            tally_backend: TallyBackend::default(),
            announce_retractions: false,
        }
    }
}

impl AppConfig {
    /// Builds the config from a key lookup such as the Shuttle secret store.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cookie_secret = lookup("COOKIE_SECRET").filter(|secret| !secret.trim().is_empty());

        let session_max_age_days = parse_or("SESSION_MAX_AGE_DAYS", &lookup, defaults.session_max_age_days)?;
        if session_max_age_days < 1 {
            return Err(ConfigError::TooSmall { key: "SESSION_MAX_AGE_DAYS", min: 1 });
        }

        let broadcast_capacity: usize = parse_or("BROADCAST_CAPACITY", &lookup, defaults.broadcast_capacity)?;
        if broadcast_capacity < 1 {
            return Err(ConfigError::TooSmall { key: "BROADCAST_CAPACITY", min: 1 });
        }

        Ok(Self {
            cookie_secret,
            session_max_age_days,
            broadcast_capacity,
            tally_backend: parse_or("TALLY_STORE", &lookup, defaults.tally_backend)?,
            announce_retractions: parse_or("ANNOUNCE_RETRACTIONS", &lookup, defaults.announce_retractions)?,
        })
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
