//! Transactions for a category and month.
//!
//! This module contains everything between the HTTP request and the upstream clients:
//! - Validation of the category, year and month query parameters
//! - The calendar-month date range for a query
//! - Normalization of upstream records into the `Transaction` served to clients
//! - The route handler for the transactions API

mod normalize;
mod query;
mod range;
mod transactions_endpoint;

pub use normalize::{
    Normalizer, PendingTransaction, Transaction, YNAB_MILLIUNIT_SCALE, sort_by_amount_descending,
};
pub use query::{TransactionQuery, ValidatedQuery};
pub use range::DateRange;
pub use transactions_endpoint::get_transactions_endpoint;
