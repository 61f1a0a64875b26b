use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use tracing::debug;

use shared::models::VoterToken;

pub const SESSION_COOKIE: &str = "sessionId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub token: VoterToken,
    pub is_new: bool,
}

/// Resolves the caller's voter identity, minting one when none was supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionIdentity;

impl SessionIdentity {
    pub fn resolve(&self, token: Option<VoterToken>) -> ResolvedSession {
        match token {
            Some(token) => ResolvedSession { token, is_new: false },
            None => ResolvedSession { token: VoterToken::generate(), is_new: true },
        }
    }
}

/// Token carried in the private session cookie, if any.
///
/// Cookies that fail decryption or token validation are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct VoterSession(pub Option<VoterToken>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterSession {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = req
            .cookies()
            .get_private(SESSION_COOKIE)
            .and_then(|cookie| match VoterToken::parse(cookie.value()) {
                Ok(token) => Some(token),
                Err(e) => {
                    debug!("Ignoring session cookie: {}", e);
                    None
                }
            });

        Outcome::Success(VoterSession(token))
    }
}

pub fn issue_session_cookie(jar: &CookieJar<'_>, token: &VoterToken, max_age_days: i64) {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .max_age(rocket::time::Duration::days(max_age_days))
        .http_only(true)
        .same_site(SameSite::Lax);

    jar.add_private(cookie);
}
