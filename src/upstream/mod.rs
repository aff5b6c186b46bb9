//! Clients for the upstream APIs that transactions are fetched from.
//!
//! Both clients take the same validated query and return canonical
//! [Transaction]s, so the route handler does not need to know which one is
//! configured.

mod proxy;
mod ynab;

use std::time::Duration;

use axum::http::header::{ACCEPT, CACHE_CONTROL};
use reqwest::RequestBuilder;
use serde_json::Value;

pub use proxy::{PROXY_TRANSACTIONS_PATH, ProxyClient};
pub use ynab::YnabClient;

use crate::{
    Error,
    config::{ProxyConfig, YnabConfig},
    transaction::{DateRange, Transaction, ValidatedQuery},
};

/// The upstream API selected by the server configuration.
#[derive(Clone)]
pub enum Upstream {
    /// A generic REST proxy.
    Proxy(ProxyClient),
    /// The YNAB API.
    Ynab(YnabClient),
}

impl Upstream {
    /// Create a client for the generic proxy whose calls time out after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created or the amount
    /// scale is not a positive number.
    pub fn proxy(config: ProxyConfig, timeout: Duration) -> Result<Self, Error> {
        ProxyClient::new(build_http_client(timeout)?, config).map(Self::Proxy)
    }

    /// Create a client for the YNAB API whose calls time out after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn ynab(config: YnabConfig, timeout: Duration) -> Result<Self, Error> {
        Ok(Self::Ynab(YnabClient::new(build_http_client(timeout)?, config)))
    }

    /// Whether requests must carry an active session before this upstream is
    /// called.
    pub fn requires_session(&self) -> bool {
        matches!(self, Self::Ynab(_))
    }

    /// Fetch the transactions for `query`, which covers the days in `range`.
    ///
    /// # Errors
    /// Returns an error if the server is not configured for this upstream,
    /// the category is unknown, or the upstream call fails.
    pub async fn fetch_transactions(
        &self,
        query: &ValidatedQuery,
        range: DateRange,
    ) -> Result<Vec<Transaction>, Error> {
        match self {
            Self::Proxy(client) => client.fetch_transactions(query).await,
            Self::Ynab(client) => client.fetch_transactions(query, range).await,
        }
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| Error::ServerMisconfigured(format!("could not create HTTP client: {error}")))
}

/// Send `request` and decode the JSON body of a successful response.
///
/// The request is sent with a no-cache directive so stale transactions are
/// never served.
///
/// # Errors
///
/// Returns:
/// - [Error::UpstreamError] if the upstream responds with a non-success status.
/// - [Error::UpstreamUnreachable] if the request could not be sent, timed out,
///   or the body is not JSON.
async fn get_json(request: RequestBuilder) -> Result<Value, Error> {
    let response = request
        .header(CACHE_CONTROL, "no-cache")
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|error| Error::UpstreamUnreachable(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!("Upstream responded with {status} for {}", response.url().path());
        return Err(Error::UpstreamError {
            status: status.as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|error| Error::UpstreamUnreachable(format!("invalid JSON body: {error}")))
}
