//! Calendar-month date ranges for transaction queries.

use std::fmt::Display;

use time::{Date, Month, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The `YYYY-MM-DD` format used in upstream queries and transaction dates.
const ISO_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

/// An inclusive range of calendar dates.
///
/// Dates carry no time or offset, so a range means the same days regardless of
/// the server's local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

impl DateRange {
    /// The range covering every day of `month` in `year`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidParameter] if the year is outside the range the
    /// calendar supports.
    pub fn for_month(year: i32, month: Month) -> Result<Self, Error> {
        let start =
            Date::from_calendar_date(year, month, 1).map_err(|_| Error::InvalidParameter("year"))?;

        // The day before the first of next month, which works out February
        // in leap years for us.
        let end = match month.next() {
            Month::January => Date::from_calendar_date(year, Month::December, 31).ok(),
            next_month => Date::from_calendar_date(year, next_month, 1)
                .ok()
                .and_then(Date::previous_day),
        }
        .ok_or(Error::InvalidParameter("year"))?;

        Ok(Self { start, end })
    }

    /// The first day formatted as `YYYY-MM-DD`.
    pub fn start_date(&self) -> String {
        format_iso_date(self.start)
    }

    /// The last day formatted as `YYYY-MM-DD`.
    pub fn end_date(&self) -> String {
        format_iso_date(self.end)
    }

    /// Whether the ISO formatted `date` falls within the range.
    ///
    /// Only the leading `YYYY-MM-DD` is read, so a trailing time component is
    /// ignored. Dates that cannot be parsed are never in the range.
    pub fn contains_iso_date(&self, date: &str) -> bool {
        let Some(day) = date.get(..10) else {
            return false;
        };

        match Date::parse(day, ISO_DATE_FORMAT) {
            Ok(day) => (self.start..=self.end).contains(&day),
            Err(_) => false,
        }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_date(), self.end_date())
    }
}

fn format_iso_date(date: Date) -> String {
    date.format(ISO_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}
