//! Client for the YNAB API.
//!
//! Transactions are read from a single category of a single budget. Split
//! transactions appear as subtransactions that carry no payee of their own, so
//! their payee is looked up from the parent transaction.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use reqwest::Url;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::{
    Error,
    config::YnabConfig,
    transaction::{
        DateRange, Normalizer, PendingTransaction, Transaction, ValidatedQuery,
        YNAB_MILLIUNIT_SCALE, sort_by_amount_descending,
    },
};

use super::get_json;

/// Fetches transactions from the YNAB API.
#[derive(Debug, Clone)]
pub struct YnabClient {
    http: reqwest::Client,
    config: Arc<YnabConfig>,
    normalizer: Normalizer,
}

/// The budget ID and access token needed for every YNAB call.
struct Credentials<'a> {
    budget_id: &'a str,
    access_token: &'a str,
}

impl YnabClient {
    /// Create a YNAB client that sends requests with `http`.
    pub fn new(http: reqwest::Client, config: YnabConfig) -> Self {
        Self {
            http,
            config: Arc::new(config),
            normalizer: Normalizer::new(YNAB_MILLIUNIT_SCALE),
        }
    }

    /// The YNAB settings this client was created with.
    pub fn config(&self) -> &YnabConfig {
        &self.config
    }

    fn credentials(&self) -> Result<Credentials<'_>, Error> {
        let budget_id = non_empty(&self.config.budget_id)
            .ok_or_else(|| Error::ServerMisconfigured("missing YNAB_BUDGET_ID".to_owned()))?;
        let access_token = non_empty(&self.config.access_token)
            .ok_or_else(|| Error::ServerMisconfigured("missing YNAB_ACCESS_TOKEN".to_owned()))?;

        Ok(Credentials {
            budget_id,
            access_token,
        })
    }

    /// Build a URL by appending `segments` to the base URL, percent-encoding
    /// each one.
    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let invalid_url = || Error::ServerMisconfigured("invalid YNAB_BASE_URL".to_owned());

        let mut url = Url::parse(&self.config.base_url).map_err(|_| invalid_url())?;
        url.path_segments_mut()
            .map_err(|_| invalid_url())?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    /// Fetch the transactions in the category named by `query` that fall within
    /// `range`, sorted from the largest amount to the smallest.
    ///
    /// Transactions without a payee whose parent transaction is known have the
    /// parent's payee filled in.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::ServerMisconfigured] if the budget ID, access token or base URL
    ///   is missing or invalid.
    /// - [Error::UnknownCategory] if no YNAB category ID is configured for the
    ///   category.
    /// - [Error::UpstreamError] or [Error::UpstreamUnreachable] if the call fails.
    pub async fn fetch_transactions(
        &self,
        query: &ValidatedQuery,
        range: DateRange,
    ) -> Result<Vec<Transaction>, Error> {
        let credentials = self.credentials()?;
        let category_id = self
            .config
            .category_id(&query.category)
            .ok_or_else(|| Error::UnknownCategory(query.category.clone()))?;

        let url = self.url(&[
            "budgets",
            credentials.budget_id,
            "categories",
            category_id,
            "transactions",
        ])?;

        tracing::debug!("Fetching YNAB transactions for {} ({range})", query.category);

        let request = self
            .http
            .get(url)
            .bearer_auth(credentials.access_token)
            .query(&[("since_date", range.start_date())]);
        let payload = get_json(request).await?;

        let pending: Vec<PendingTransaction> = self
            .normalizer
            .normalize_records(transaction_records(&payload))
            .into_iter()
            .filter(|pending| range.contains_iso_date(&pending.transaction.date))
            .collect();

        let mut transactions = self.resolve_parent_payees(pending).await;
        sort_by_amount_descending(&mut transactions);

        Ok(transactions)
    }

    /// Look up the payee of the transaction `parent_id`.
    ///
    /// This is best effort: any failure is logged and gives an empty string.
    pub async fn lookup_parent_payee(&self, parent_id: &str) -> String {
        match self.try_lookup_parent_payee(parent_id).await {
            Ok(payee_name) => payee_name,
            Err(error) => {
                tracing::warn!("Could not look up parent transaction {parent_id}: {error:?}");
                String::new()
            }
        }
    }

    async fn try_lookup_parent_payee(&self, parent_id: &str) -> Result<String, Error> {
        let credentials = self.credentials()?;
        let url = self.url(&["budgets", credentials.budget_id, "transactions", parent_id])?;

        let request = self.http.get(url).bearer_auth(credentials.access_token);
        let payload = get_json(request).await?;

        Ok(payload
            .pointer("/data/transaction/payee_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned())
    }

    /// Fill in the payee of every pending transaction that references a parent.
    ///
    /// Each distinct parent is looked up once and all lookups run concurrently.
    /// A failed lookup only affects the transactions referencing that parent.
    async fn resolve_parent_payees(&self, pending: Vec<PendingTransaction>) -> Vec<Transaction> {
        let parent_ids: HashSet<&str> = pending
            .iter()
            .filter_map(|pending| pending.parent_id.as_deref())
            .collect();

        let mut lookups = JoinSet::new();
        for parent_id in parent_ids {
            let client = self.clone();
            let parent_id = parent_id.to_owned();

            lookups.spawn(async move {
                let payee_name = client.lookup_parent_payee(&parent_id).await;
                (parent_id, payee_name)
            });
        }

        let mut payee_names = HashMap::new();
        while let Some(result) = lookups.join_next().await {
            match result {
                Ok((parent_id, payee_name)) => {
                    payee_names.insert(parent_id, payee_name);
                }
                Err(error) => tracing::warn!("Parent transaction lookup task failed: {error}"),
            }
        }

        pending
            .into_iter()
            .map(|pending| {
                let mut transaction = pending.transaction;
                if let Some(parent_id) = pending.parent_id {
                    transaction.payee_name =
                        payee_names.get(&parent_id).cloned().unwrap_or_default();
                }
                transaction
            })
            .collect()
    }
}

/// The transaction list in a YNAB category transactions response, or an empty
/// list if the response does not have one.
fn transaction_records(payload: &Value) -> &[Value] {
    match payload.pointer("/data/transactions").and_then(Value::as_array) {
        Some(records) => records,
        None => {
            tracing::warn!("YNAB response has no transaction list, returning no transactions");
            &[]
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.trim().is_empty())
}
