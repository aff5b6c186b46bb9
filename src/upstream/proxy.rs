//! Client for a generic REST proxy that serves transactions by category and month.

use axum::http::{HeaderName, HeaderValue};
use reqwest::Url;

use crate::{
    Error,
    config::ProxyConfig,
    transaction::{Normalizer, Transaction, ValidatedQuery},
};

use super::get_json;

/// The path on the proxy under which transactions are served as
/// `{category}/{year}/{month}`.
pub const PROXY_TRANSACTIONS_PATH: &str = "/Prod/api/transactions";

/// Fetches transactions from the generic proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    http: reqwest::Client,
    config: ProxyConfig,
    normalizer: Normalizer,
}

impl ProxyClient {
    /// Create a proxy client that sends requests with `http`.
    ///
    /// # Errors
    /// Returns [Error::ServerMisconfigured] if the amount scale is not a
    /// positive, finite number.
    pub fn new(http: reqwest::Client, config: ProxyConfig) -> Result<Self, Error> {
        if !(config.amount_scale.is_finite() && config.amount_scale > 0.0) {
            return Err(Error::ServerMisconfigured(format!(
                "PROXY_AMOUNT_SCALE must be a positive number, got {}",
                config.amount_scale
            )));
        }

        Ok(Self {
            http,
            normalizer: Normalizer::new(config.amount_scale),
            config,
        })
    }

    /// Build the URL for the transactions in `query`.
    ///
    /// The path of the configured base URL is replaced by
    /// [PROXY_TRANSACTIONS_PATH], and the category is percent-encoded as a
    /// single path segment.
    ///
    /// # Errors
    /// Returns [Error::ServerMisconfigured] if the base URL is not set or is
    /// not a valid URL.
    pub fn transactions_url(&self, query: &ValidatedQuery) -> Result<Url, Error> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| Error::ServerMisconfigured("missing UPSTREAM_BASE_URL".to_owned()))?;

        let invalid_url = || Error::ServerMisconfigured("invalid UPSTREAM_BASE_URL".to_owned());

        let mut url = Url::parse(base_url).map_err(|_| invalid_url())?;
        url.set_path(PROXY_TRANSACTIONS_PATH);
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| invalid_url())?
            .push(&query.category)
            .push(&query.year.to_string())
            .push(&query.month_number().to_string());

        Ok(url)
    }

    fn auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>, Error> {
        let Some((name, value)) = &self.config.auth_header else {
            return Ok(None);
        };

        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::ServerMisconfigured("invalid UPSTREAM_AUTH_HEADER".to_owned()))?;
        let mut value = HeaderValue::from_str(value)
            .map_err(|_| Error::ServerMisconfigured("invalid UPSTREAM_AUTH_TOKEN".to_owned()))?;
        value.set_sensitive(true);

        Ok(Some((name, value)))
    }

    /// Fetch and normalize the transactions for `query`.
    ///
    /// A response body that is not a JSON array is treated as no transactions.
    ///
    /// # Errors
    /// Returns an error if the proxy is not configured or the call fails.
    pub async fn fetch_transactions(
        &self,
        query: &ValidatedQuery,
    ) -> Result<Vec<Transaction>, Error> {
        let url = self.transactions_url(query)?;
        let auth_header = self.auth_header()?;

        tracing::debug!("Fetching transactions from proxy path {}", url.path());

        let mut request = self.http.get(url);
        if let Some((name, value)) = auth_header {
            request = request.header(name, value);
        }

        let payload = get_json(request).await?;

        let Some(records) = payload.as_array() else {
            tracing::warn!("Proxy response was not a list of transactions, returning no transactions");
            return Ok(Vec::new());
        };

        Ok(self
            .normalizer
            .normalize_records(records)
            .into_iter()
            .map(|pending| pending.into_transaction())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::{Value, json};
    use time::Month;

    use super::ProxyClient;
    use crate::{
        Error,
        config::{DEFAULT_PROXY_AMOUNT_SCALE, ProxyConfig},
        test_utils::{closed_port_url, spawn_stub_upstream},
        transaction::{Transaction, ValidatedQuery},
    };

    fn client(base_url: Option<&str>, auth_header: Option<(&str, &str)>) -> ProxyClient {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        ProxyClient::new(
            http,
            ProxyConfig {
                base_url: base_url.map(str::to_owned),
                auth_header: auth_header
                    .map(|(name, value)| (name.to_owned(), value.to_owned())),
                amount_scale: DEFAULT_PROXY_AMOUNT_SCALE,
            },
        )
        .unwrap()
    }

    fn query(category: &str) -> ValidatedQuery {
        ValidatedQuery {
            category: category.to_owned(),
            year: 2024,
            month: Month::February,
        }
    }

    #[test]
    fn builds_path_from_query() {
        let client = client(Some("https://example.com/ignored/path?x=1"), None);

        let url = client.transactions_url(&query("Tripp")).unwrap();

        assert_eq!(
            url.as_str(),
            "https://example.com/Prod/api/transactions/Tripp/2024/2"
        );
    }

    #[test]
    fn percent_encodes_category() {
        let client = client(Some("https://example.com"), None);

        let url = client.transactions_url(&query("eating out/bars?")).unwrap();

        assert_eq!(
            url.path(),
            "/Prod/api/transactions/eating%20out%2Fbars%3F/2024/2"
        );
    }

    #[test]
    fn missing_or_invalid_base_url_is_misconfiguration() {
        assert_eq!(
            client(None, None).transactions_url(&query("food")),
            Err(Error::ServerMisconfigured(
                "missing UPSTREAM_BASE_URL".to_owned()
            ))
        );
        assert_eq!(
            client(Some("not a url"), None).transactions_url(&query("food")),
            Err(Error::ServerMisconfigured(
                "invalid UPSTREAM_BASE_URL".to_owned()
            ))
        );
    }

    #[test]
    fn rejects_non_positive_scale() {
        let got = ProxyClient::new(
            reqwest::Client::new(),
            ProxyConfig {
                base_url: None,
                auth_header: None,
                amount_scale: 0.0,
            },
        );

        assert!(matches!(got, Err(Error::ServerMisconfigured(_))));
    }

    #[tokio::test]
    async fn invalid_auth_header_fails_before_fetching() {
        // Nothing listens on this port, so reaching the network would be
        // reported as an unreachable upstream instead.
        let base_url = closed_port_url().await;
        let client = client(Some(&base_url), Some(("bad header", "token")));

        let got = client.fetch_transactions(&query("food")).await;

        assert_eq!(
            got,
            Err(Error::ServerMisconfigured(
                "invalid UPSTREAM_AUTH_HEADER".to_owned()
            ))
        );
    }

    #[tokio::test]
    async fn fetches_and_normalizes_transactions() {
        let router = Router::new().route(
            "/Prod/api/transactions/{category}/{year}/{month}",
            get(
                |Path((category, year, month)): Path<(String, i32, u8)>, headers: HeaderMap| async move {
                    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("secret") {
                        return (StatusCode::FORBIDDEN, Json(json!({"message": "Forbidden"})));
                    }

                    (
                        StatusCode::OK,
                        Json(json!([
                            {"date": "2024-02-10", "payee_name": format!("{category} {year}-{month}"), "decimal_amount": -8.5},
                            {"date": "2024-02-11", "payeeName": "Bakery", "decimalAmount": -3.25},
                            {"date": "2024-02-12", "payee": "Market", "amount": -250_000},
                            {"date": "2024-02-13", "parent_transaction_id": "p-1"}
                        ])),
                    )
                },
            ),
        );
        let stub = spawn_stub_upstream(router).await;
        let client = client(Some(&stub.base_url), Some(("x-api-key", "secret")));

        let got = client.fetch_transactions(&query("food")).await.unwrap();

        assert_eq!(
            got,
            vec![
                Transaction {
                    date: "2024-02-10".to_owned(),
                    payee_name: "food 2024-2".to_owned(),
                    decimal_amount: -8.5,
                },
                Transaction {
                    date: "2024-02-11".to_owned(),
                    payee_name: "Bakery".to_owned(),
                    decimal_amount: -3.25,
                },
                Transaction {
                    date: "2024-02-12".to_owned(),
                    payee_name: "Market".to_owned(),
                    decimal_amount: -2.5,
                },
                Transaction {
                    date: "2024-02-13".to_owned(),
                    payee_name: String::new(),
                    decimal_amount: 0.0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn non_list_body_means_no_transactions() {
        let router = Router::new().route(
            "/Prod/api/transactions/{category}/{year}/{month}",
            get(|| async { Json(json!({"items": []})) }),
        );
        let stub = spawn_stub_upstream(router).await;

        let got = client(Some(&stub.base_url), None)
            .fetch_transactions(&query("food"))
            .await
            .unwrap();

        assert_eq!(got, Vec::<Transaction>::new());
    }

    #[tokio::test]
    async fn upstream_status_is_reported() {
        let router = Router::new().route(
            "/Prod/api/transactions/{category}/{year}/{month}",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(Value::Null)) }),
        );
        let stub = spawn_stub_upstream(router).await;

        let got = client(Some(&stub.base_url), None)
            .fetch_transactions(&query("food"))
            .await;

        assert_eq!(got, Err(Error::UpstreamError { status: 503 }));
    }
}
