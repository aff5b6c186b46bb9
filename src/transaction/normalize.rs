//! Mapping upstream transaction records of varying shapes onto [Transaction].
//!
//! Upstream APIs disagree on field names and on how amounts are encoded. The
//! fields tried for each value, and the order they are tried in, live in one
//! table, [FIELD_POLICY], rather than being spread over the mapping code.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transaction in the shape served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction date, copied verbatim from upstream (usually `YYYY-MM-DD`).
    pub date: String,
    /// Who the money was paid to or received from, empty if unknown.
    pub payee_name: String,
    /// The amount in major currency units, e.g. dollars rather than cents.
    pub decimal_amount: f64,
}

/// A field that an amount can be read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountField {
    /// The field already holds a decimal amount.
    Decimal(&'static str),
    /// The field holds an integer count of minor units that must be divided by
    /// the upstream's scale.
    MinorUnits(&'static str),
}

/// The fields tried for each value of a [Transaction], in priority order.
///
/// The first field that yields a value wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldPolicy {
    /// Fields holding the payee name.
    pub payee: &'static [&'static str],
    /// Fields holding the amount.
    pub amount: &'static [AmountField],
    /// Fields referencing the parent of a split transaction.
    pub parent_id: &'static [&'static str],
}

/// The field names seen across the supported upstream APIs.
pub const FIELD_POLICY: FieldPolicy = FieldPolicy {
    payee: &["payee_name", "payeeName", "payee"],
    amount: &[
        AmountField::Decimal("decimal_amount"),
        AmountField::Decimal("decimalAmount"),
        AmountField::MinorUnits("amount"),
    ],
    parent_id: &["parent_transaction_id", "parentTransactionId"],
};

/// YNAB amounts are in milliunits, thousandths of the currency unit.
pub const YNAB_MILLIUNIT_SCALE: f64 = 1000.0;

/// A normalized transaction that may still need its payee looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    /// The transaction with everything the record itself could provide.
    pub transaction: Transaction,
    /// The parent transaction to take the payee from, set only when the record
    /// has no payee of its own.
    pub parent_id: Option<String>,
}

impl PendingTransaction {
    /// Give up on looking up the payee and keep whatever the record had.
    pub fn into_transaction(self) -> Transaction {
        self.transaction
    }
}

/// Maps raw upstream records onto [Transaction]s.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    policy: FieldPolicy,
    minor_unit_scale: f64,
}

impl Normalizer {
    /// Create a normalizer using [FIELD_POLICY] that divides minor unit amounts
    /// by `minor_unit_scale`.
    pub fn new(minor_unit_scale: f64) -> Self {
        Self {
            policy: FIELD_POLICY,
            minor_unit_scale,
        }
    }

    /// Normalize a single upstream record.
    ///
    /// A record without a payee or amount still produces a transaction, with an
    /// empty payee or a zero amount. Returns `None` only for records that are
    /// not JSON objects or have no string `date`.
    pub fn normalize_record(&self, record: &Value) -> Option<PendingTransaction> {
        let record = record.as_object()?;
        let date = record.get("date")?.as_str()?.to_owned();

        let payee_name = self.payee(record);
        let parent_id = match payee_name {
            Some(_) => None,
            None => self.parent_id(record),
        };

        Some(PendingTransaction {
            transaction: Transaction {
                date,
                payee_name: payee_name.unwrap_or_default(),
                decimal_amount: self.amount(record).unwrap_or(0.0),
            },
            parent_id,
        })
    }

    /// Normalize every record in `records`, preserving their order.
    ///
    /// Records that [Normalizer::normalize_record] cannot use are skipped and
    /// reported in the logs.
    pub fn normalize_records(&self, records: &[Value]) -> Vec<PendingTransaction> {
        let pending: Vec<PendingTransaction> = records
            .iter()
            .filter_map(|record| self.normalize_record(record))
            .collect();

        let skipped = records.len() - pending.len();
        if skipped > 0 {
            tracing::warn!("Skipped {skipped} upstream record(s) without a date");
        }

        pending
    }

    fn payee(&self, record: &Map<String, Value>) -> Option<String> {
        self.policy
            .payee
            .iter()
            .find_map(|field| record.get(*field)?.as_str())
            .map(str::to_owned)
    }

    fn amount(&self, record: &Map<String, Value>) -> Option<f64> {
        self.policy
            .amount
            .iter()
            .find_map(|source| match source {
                AmountField::Decimal(field) => record.get(*field)?.as_f64(),
                AmountField::MinorUnits(field) => record
                    .get(*field)?
                    .as_f64()
                    .map(|minor_units| minor_units / self.minor_unit_scale),
            })
    }

    fn parent_id(&self, record: &Map<String, Value>) -> Option<String> {
        self.policy
            .parent_id
            .iter()
            .find_map(|field| record.get(*field)?.as_str())
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }
}

/// Sort `transactions` from the largest amount to the smallest.
///
/// The sort is stable, transactions with equal amounts keep their order.
pub fn sort_by_amount_descending(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.decimal_amount.total_cmp(&a.decimal_amount));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        Normalizer, PendingTransaction, Transaction, YNAB_MILLIUNIT_SCALE,
        sort_by_amount_descending,
    };

    fn transaction(date: &str, payee_name: &str, decimal_amount: f64) -> Transaction {
        Transaction {
            date: date.to_owned(),
            payee_name: payee_name.to_owned(),
            decimal_amount,
        }
    }

    #[test]
    fn canonical_records_pass_through_unchanged() {
        let want = transaction("2024-02-03", "Corner Store", -12.5);
        let record = serde_json::to_value(&want).unwrap();

        let got = Normalizer::new(100_000.0).normalize_record(&record).unwrap();

        assert_eq!(got.transaction, want);
        assert_eq!(got.parent_id, None);
    }

    #[test]
    fn first_amount_field_wins() {
        let normalizer = Normalizer::new(YNAB_MILLIUNIT_SCALE);

        let got = normalizer
            .normalize_record(&json!({"date": "2024-02-03", "decimal_amount": 12.5, "amount": 5000}))
            .unwrap();
        assert_eq!(got.transaction.decimal_amount, 12.5);

        let got = normalizer
            .normalize_record(&json!({"date": "2024-02-03", "decimalAmount": 7.25, "amount": 5000}))
            .unwrap();
        assert_eq!(got.transaction.decimal_amount, 7.25);
    }

    #[test]
    fn minor_units_are_divided_by_the_scale() {
        let record = json!({"date": "2024-02-03", "amount": -45_670});

        let ynab = Normalizer::new(YNAB_MILLIUNIT_SCALE)
            .normalize_record(&record)
            .unwrap();
        assert_eq!(ynab.transaction.decimal_amount, -45.67);

        let proxy = Normalizer::new(100_000.0).normalize_record(&record).unwrap();
        assert_eq!(proxy.transaction.decimal_amount, -0.4567);
    }

    #[test]
    fn non_numeric_amounts_are_skipped() {
        let got = Normalizer::new(YNAB_MILLIUNIT_SCALE)
            .normalize_record(&json!({"date": "2024-02-03", "decimal_amount": "12.50", "amount": 2000}))
            .unwrap();

        assert_eq!(got.transaction.decimal_amount, 2.0);
    }

    #[test]
    fn missing_amount_is_zero() {
        let got = Normalizer::new(YNAB_MILLIUNIT_SCALE)
            .normalize_record(&json!({"date": "2024-02-03", "payee_name": "Cafe"}))
            .unwrap();

        assert_eq!(got.transaction, transaction("2024-02-03", "Cafe", 0.0));
    }

    #[test]
    fn payee_aliases_in_priority_order() {
        let normalizer = Normalizer::new(YNAB_MILLIUNIT_SCALE);

        let got = normalizer
            .normalize_record(&json!({"date": "d", "payeeName": "B", "payee": "C"}))
            .unwrap();
        assert_eq!(got.transaction.payee_name, "B");

        let got = normalizer
            .normalize_record(&json!({"date": "d", "payee_name": null, "payee": "C"}))
            .unwrap();
        assert_eq!(got.transaction.payee_name, "C");
    }

    #[test]
    fn parent_is_only_needed_without_a_payee() {
        let normalizer = Normalizer::new(YNAB_MILLIUNIT_SCALE);

        let got = normalizer
            .normalize_record(&json!({
                "date": "2024-02-03",
                "payee_name": null,
                "amount": -1000,
                "parent_transaction_id": "parent-1"
            }))
            .unwrap();
        assert_eq!(
            got,
            PendingTransaction {
                transaction: transaction("2024-02-03", "", -1.0),
                parent_id: Some("parent-1".to_owned()),
            }
        );

        let got = normalizer
            .normalize_record(&json!({
                "date": "2024-02-03",
                "payee_name": "Grocer",
                "parent_transaction_id": "parent-1"
            }))
            .unwrap();
        assert_eq!(got.parent_id, None);
    }

    #[test]
    fn records_without_a_date_are_skipped() {
        let records = vec![
            json!({"payee_name": "No date", "amount": 1000}),
            json!({"date": 20240203, "payee_name": "Numeric date"}),
            json!("not an object"),
            json!({"date": "2024-02-03", "payee_name": "Kept"}),
        ];

        let got = Normalizer::new(YNAB_MILLIUNIT_SCALE).normalize_records(&records);

        assert_eq!(got.len(), 1);
        assert_eq!(got[0].transaction.payee_name, "Kept");
    }

    #[test]
    fn sorts_by_amount_descending_and_keeps_ties_in_order() {
        let mut transactions = vec![
            transaction("2024-02-01", "first tie", 5.0),
            transaction("2024-02-02", "smallest", -20.0),
            transaction("2024-02-03", "largest", 50.0),
            transaction("2024-02-04", "second tie", 5.0),
        ];

        sort_by_amount_descending(&mut transactions);

        let payees: Vec<&str> = transactions
            .iter()
            .map(|transaction| transaction.payee_name.as_str())
            .collect();
        assert_eq!(payees, ["largest", "first tie", "second tie", "smallest"]);
    }
}
