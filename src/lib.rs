//! Budget Lens is a small web service for viewing the transactions in a
//! spending category for a given month.
//!
//! This library provides a JSON API that fetches transactions from an upstream
//! budgeting service and normalizes them into a single, canonical shape.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod config;
mod endpoints;
mod logging;
mod routing;
mod session;
mod transaction;
mod upstream;

#[cfg(test)]
mod test_utils;

pub use app_state::{AppState, create_cookie_key};
pub use config::{
    Config, ProxyConfig, UpstreamMode, YnabConfig, category_ids_from_vars, unicode_vars,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use session::{CookieSessionStore, Session, SessionStore, set_session_cookie};
pub use transaction::{DateRange, Transaction, TransactionQuery, ValidatedQuery};
pub use upstream::{PROXY_TRANSACTIONS_PATH, ProxyClient, Upstream, YnabClient};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur while serving a request.
///
/// Every error is terminal for the request that produced it, none are retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required query parameter was absent or empty.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A query parameter was present but could not be parsed or was out of range.
    #[error("Invalid {0}")]
    InvalidParameter(&'static str),

    /// The requested category has no upstream category ID configured.
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// The request does not carry an active session.
    #[error("Unauthorized")]
    Unauthorized,

    /// A setting the server needs to contact the upstream API is missing or invalid.
    ///
    /// This is always detected before any network call is made.
    #[error("Server not configured: {0}")]
    ServerMisconfigured(String),

    /// The upstream API answered with a non-success status code.
    #[error("Upstream request failed")]
    UpstreamError {
        /// The status code returned by the upstream API.
        status: u16,
    },

    /// The upstream API could not be reached, timed out, or sent a body that
    /// was not JSON.
    ///
    /// The string holds the underlying error for the server logs and is not
    /// shown to the client.
    #[error("Failed to contact upstream")]
    UpstreamUnreachable(String),
}

impl Error {
    /// The HTTP status code that this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingParameter(_) | Error::InvalidParameter(_) | Error::UnknownCategory(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::ServerMisconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::UpstreamError { .. } | Error::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            Error::UpstreamError { status } => {
                tracing::error!("Upstream responded with status {status}");
                json!({ "error": self.to_string(), "status": status })
            }
            Error::UpstreamUnreachable(reason) => {
                tracing::error!("Could not contact upstream: {reason}");
                json!({ "error": self.to_string() })
            }
            Error::ServerMisconfigured(_) => {
                tracing::error!("{self}");
                json!({ "error": self.to_string() })
            }
            error => {
                tracing::warn!("Rejected request: {error}");
                json!({ "error": error.to_string() })
            }
        };

        (status, Json(body)).into_response()
    }
}
