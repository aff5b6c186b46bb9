//! Parsing and validation of the transactions query string.

use serde::Deserialize;
use time::Month;

use crate::Error;

/// The raw query parameters for the transactions API, exactly as the client
/// sent them.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// The spending category to fetch transactions for.
    pub category: Option<String>,
    /// The four digit year.
    pub year: Option<String>,
    /// The month number, 1 for January through 12 for December.
    pub month: Option<String>,
}

/// A [TransactionQuery] that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    /// The case-sensitive category name.
    pub category: String,
    /// The calendar year.
    pub year: i32,
    /// The calendar month.
    pub month: Month,
}

impl ValidatedQuery {
    /// The month as a number from 1 to 12.
    pub fn month_number(&self) -> u8 {
        u8::from(self.month)
    }
}

impl TryFrom<TransactionQuery> for ValidatedQuery {
    type Error = Error;

    /// Check that the category, year and month are all present and well formed.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::MissingParameter] if the category is absent or empty.
    /// - [Error::InvalidParameter] if the year is absent or not an integer.
    /// - [Error::InvalidParameter] if the month is absent, not an integer, or
    ///   outside 1 to 12.
    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        let category = query
            .category
            .filter(|category| !category.is_empty())
            .ok_or(Error::MissingParameter("category"))?;

        let year = parse_integer(query.year.as_deref()).ok_or(Error::InvalidParameter("year"))?;

        let month = parse_integer(query.month.as_deref())
            .and_then(|month| u8::try_from(month).ok())
            .and_then(|month| Month::try_from(month).ok())
            .ok_or(Error::InvalidParameter("month"))?;

        Ok(Self {
            category,
            year,
            month,
        })
    }
}

fn parse_integer(text: Option<&str>) -> Option<i32> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .and_then(|text| text.parse().ok())
}
