use uuid::Uuid;

pub const MAX_TOKEN_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("Voter token is empty")]
    EmptyToken,
    #[error("Voter token exceeds maximum length of {MAX_TOKEN_LENGTH}")]
    TokenTooLong,
    #[error("Voter token contains invalid character {0:?}")]
    InvalidTokenCharacter(char),
}

pub fn parse_uuid(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::InvalidId(raw.to_owned()))
}

pub fn validate_voter_token(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() { return Err(ValidationError::EmptyToken); }
    if raw.len() > MAX_TOKEN_LENGTH { return Err(ValidationError::TokenTooLong); }

    match raw.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_')) {
        Some(c) => Err(ValidationError::InvalidTokenCharacter(c)),
        None => Ok(()),
    }
}
