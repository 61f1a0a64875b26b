pub mod broadcast;
pub mod catalog;
pub mod catchers;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod queries;
pub mod routes;
pub mod session;
pub mod store;
pub mod tally;
pub use shared::{models::*, error::*};

use rocket::{catchers, routes, Build, Rocket};

use crate::catchers::{bad_request, internal_error, not_found, unavailable, unprocessable};
use crate::routes::{live_results, poll_results, vote_on_poll, AppState};

/// Assembles the Rocket instance. `secret_key` encrypts the session cookie.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let mut figment = rocket::Config::figment();
    if let Some(secret) = state.config.cookie_secret.clone() {
        figment = figment.merge(("secret_key", secret));
    }

    rocket::custom(figment)
        .manage(state)
        .mount("/api", routes![vote_on_poll, poll_results, live_results])
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable, internal_error, unavailable],
        )
}
