use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::error::{Error, ErrorCode};
use thiserror::Error;
use tracing::error;

use crate::coordinator::VoteError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("User already voted on this poll")]
    DuplicateVote,
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    InvalidInput(String),
    #[error("Service temporarily unavailable")]
    Unavailable(String),
    #[error("Internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::DuplicateVote => Status::BadRequest,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::InvalidInput(_) => Status::UnprocessableEntity,
            ApiError::Unavailable(_) => Status::ServiceUnavailable,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn body(&self) -> Error {
        let code = match self {
            ApiError::DuplicateVote => ErrorCode::DuplicateVote,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::InvalidInput(_) => ErrorCode::InvalidInput,
            ApiError::Unavailable(_) => ErrorCode::Unavailable,
            ApiError::Internal(_) => ErrorCode::SystemError,
        };
        Error::new(code, self.to_string())
    }
}

impl From<VoteError> for ApiError {
    fn from(e: VoteError) -> Self {
        match e {
            VoteError::DuplicateVote => ApiError::DuplicateVote,
            VoteError::PollNotFound(_) | VoteError::OptionNotFound { .. } => ApiError::NotFound(e.to_string()),
            VoteError::StoreUnavailable(msg) => ApiError::Unavailable(msg),
            VoteError::Conflict(_) | VoteError::TallyUnderflow(_) | VoteError::Internal(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) | ApiError::Unavailable(detail) => {
                error!("{} {} failed: {}", req.method(), req.uri(), detail);
            }
            _ => {}
        }

        rocket::Response::build_from(Json(self.body()).respond_to(req)?)
            .status(status)
            .ok()
    }
}
