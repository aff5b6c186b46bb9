//! The session capability that gates the YNAB transactions API.
//!
//! Logging in is handled elsewhere. This module only needs to know whether a
//! request carries an active session, which it reads from an encrypted cookie.

use axum::http::HeaderMap;
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The name of the private cookie holding the serialized [Session].
pub(crate) const COOKIE_SESSION: &str = "session";

/// An authenticated user's session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    /// The identifier of the logged in user.
    pub user_id: String,

    /// When the session stops being valid.
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Whether the session is still valid at `now`.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at > now
    }
}

/// Retrieves the session for a request, if there is one.
pub trait SessionStore: Send + Sync {
    /// Get the active session from the request `headers`, or `None` if the
    /// request is not authenticated.
    fn get_session(&self, headers: &HeaderMap) -> Option<Session>;
}

impl<F> SessionStore for F
where
    F: Fn(&HeaderMap) -> Option<Session> + Send + Sync,
{
    fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        self(headers)
    }
}

/// A [SessionStore] that reads the session from a private cookie.
#[derive(Clone)]
pub struct CookieSessionStore {
    cookie_key: Key,
}

impl CookieSessionStore {
    /// Create a store that decrypts session cookies with `cookie_key`.
    pub fn new(cookie_key: Key) -> Self {
        Self { cookie_key }
    }
}

impl SessionStore for CookieSessionStore {
    fn get_session(&self, headers: &HeaderMap) -> Option<Session> {
        let jar = PrivateCookieJar::from_headers(headers, self.cookie_key.clone());
        let cookie = jar.get(COOKIE_SESSION)?;

        let session: Session = match serde_json::from_str(cookie.value_trimmed()) {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!("Could not parse session cookie: {error}");
                return None;
            }
        };

        if session.is_active_at(OffsetDateTime::now_utc()) {
            Some(session)
        } else {
            tracing::debug!("Session for user {} has expired", session.user_id);
            None
        }
    }
}

/// Add a session cookie for `session` to the cookie jar.
///
/// The cookie expires together with the session.
///
/// # Errors
///
/// Returns a [serde_json::Error] if the session cannot be serialized.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    session: &Session,
) -> Result<PrivateCookieJar, serde_json::Error> {
    let value = serde_json::to_string(session)?;

    Ok(jar.add(
        Cookie::build((COOKIE_SESSION, value))
            .expires(session.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}
