//! The route handler that serves the transactions for a category and month.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
};

use crate::{AppState, Error};

use super::{DateRange, Transaction, TransactionQuery, ValidatedQuery};

/// Get the transactions in a category for a calendar month.
///
/// Expects the query parameters `category`, `year` and `month` (1 to 12).
/// Responds with a JSON list of transactions, which is empty when there are no
/// transactions, or a JSON error object.
///
/// When the YNAB upstream is configured the request must carry an active
/// session, which is checked before anything else.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, Error> {
    if state.upstream.requires_session() && state.session_store.get_session(&headers).is_none() {
        return Err(Error::Unauthorized);
    }

    let Query(query) = query.map_err(|rejection| {
        tracing::debug!("Could not parse transactions query: {rejection}");
        Error::InvalidParameter("query string")
    })?;
    let query = ValidatedQuery::try_from(query)?;
    let range = DateRange::for_month(query.year, query.month)?;

    let transactions = state.upstream.fetch_transactions(&query, range).await?;
    tracing::info!(
        "Serving {} transaction(s) for {} from {range}",
        transactions.len(),
        query.category
    );

    Ok(Json(transactions))
}
