use serde::{Serialize, Deserialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    #[error("Invalid input provided")]
    InvalidInput,
    #[error("Resource not found")]
    NotFound,
    #[error("Duplicate vote")]
    DuplicateVote,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Internal system error")]
    SystemError,
}

/// JSON error body returned by every failing API call.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}
