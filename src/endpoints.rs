//! The API endpoints URIs.

/// The route for getting the transactions in a category for a month.
pub const TRANSACTIONS_API: &str = "/api/transactions";
