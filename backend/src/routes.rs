use rocket::http::{CookieJar, Status};
use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::tokio::select;
use rocket::{State, Shutdown, get, post};
use tracing::{debug, instrument};
use shared::models::*;
use shared::validation::ValidationError;

use crate::coordinator::VoteCoordinator;
use crate::error::ApiError;
use crate::session::{issue_session_cookie, VoterSession};
use crate::config::AppConfig;

pub struct AppState {
    pub coordinator: VoteCoordinator,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(coordinator: VoteCoordinator, config: AppConfig) -> Self {
        Self { coordinator, config }
    }
}

fn poll_param(poll_id: Result<PollId, ValidationError>) -> Result<PollId, ApiError> {
    poll_id.map_err(|e| ApiError::InvalidInput(e.to_string()))
}

#[instrument(skip(state, cookies, session, request))]
#[post("/polls/<poll_id>/votes", data = "<request>")]
pub async fn vote_on_poll(
    state: &State<AppState>,
    cookies: &CookieJar<'_>,
    session: VoterSession,
    poll_id: Result<PollId, ValidationError>,
    request: Json<SubmitVoteRequest>,
) -> Result<(Status, Json<SubmitVoteResponse>), ApiError> {
    let poll_id = poll_param(poll_id)?;

    let receipt = state
        .coordinator
        .submit_vote(poll_id, request.poll_option_id, session.0)
        .await?;

    if let Some(token) = &receipt.issued_token {
        debug!("Issuing new voter session");
        issue_session_cookie(cookies, token, state.config.session_max_age_days);
    }

    Ok((Status::Created, Json(SubmitVoteResponse {
        status: receipt.status,
        poll_option_id: receipt.vote.option_id,
        votes: receipt.votes,
    })))
}

#[get("/polls/<poll_id>/results")]
pub async fn poll_results(
    state: &State<AppState>,
    poll_id: Result<PollId, ValidationError>,
) -> Result<Json<PollResults>, ApiError> {
    let poll_id = poll_param(poll_id)?;
    Ok(Json(state.coordinator.results(poll_id).await?))
}

#[get("/polls/<poll_id>/results/live")]
pub async fn live_results(
    state: &State<AppState>,
    poll_id: Result<PollId, ValidationError>,
    mut shutdown: Shutdown,
) -> Result<EventStream![], ApiError> {
    let poll_id = poll_param(poll_id)?;
    // Resolves 404 before the stream is opened.
    state.coordinator.results(poll_id).await?;

    let mut subscription = state.coordinator.broadcaster().subscribe(poll_id);
    Ok(EventStream! {
        loop {
            let event = select! {
                event = subscription.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&event);
        }
    })
}
