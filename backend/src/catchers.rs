use rocket::{Request, catch, serde::json::Json};
use shared::error::{Error, ErrorCode};

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::InvalidInput, "Invalid request parameters."))
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::NotFound, "The requested resource was not found."))
}

#[catch(422)]
pub fn unprocessable(req: &Request) -> Json<Error> {
    let message = match req.uri().path().segments().last() {
        Some("votes") => "Expected a JSON body with a valid pollOptionId.",
        _ => "Request could not be parsed.",
    };
    Json(Error::new(ErrorCode::InvalidInput, message))
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::SystemError, "An internal server error occurred."))
}

#[catch(503)]
pub fn unavailable(_req: &Request) -> Json<Error> {
    Json(Error::new(ErrorCode::Unavailable, "Service temporarily unavailable, please retry."))
}
