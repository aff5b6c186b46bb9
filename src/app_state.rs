//! Implements a struct that holds the state of the REST server.

use std::{sync::Arc, time::Duration};

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    config::{Config, UpstreamMode},
    session::{CookieSessionStore, Session, SessionStore},
    upstream::Upstream,
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The upstream API that transactions are fetched from.
    pub upstream: Upstream,

    /// Looks up the session for requests that need one.
    pub session_store: Arc<dyn SessionStore>,
}

impl AppState {
    /// Create a new [AppState] from an upstream client and session store.
    pub fn new(upstream: Upstream, session_store: Arc<dyn SessionStore>) -> Self {
        Self {
            upstream,
            session_store,
        }
    }

    /// Create the [AppState] described by `config`.
    ///
    /// `vars` supplies the environment variables that category mappings are
    /// read from, usually [std::env::vars].
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(
        config: &Config,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, Error> {
        let timeout = Duration::from_secs(config.upstream_timeout_secs);

        let upstream = match config.mode {
            UpstreamMode::Proxy => Upstream::proxy(config.proxy_config(), timeout)?,
            UpstreamMode::Ynab => Upstream::ynab(config.ynab_config(vars), timeout)?,
        };

        let session_store: Arc<dyn SessionStore> = match &config.session_secret {
            Some(secret) => Arc::new(CookieSessionStore::new(create_cookie_key(secret))),
            None => Arc::new(|_: &axum::http::HeaderMap| None::<Session>),
        };

        Ok(Self::new(upstream, session_store))
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
