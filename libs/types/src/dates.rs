//! Calendar date handling
//!
//! Every date literal exchanged with upstream sources and API callers is
//! `YYYY-MM-DD`. Records keep the raw text so that a malformed date on one
//! record never prevents the rest of a batch from being read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DateError;

/// `chrono` format string for `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` literal.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| DateError {
        input: input.to_string(),
    })
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Inclusive calendar date range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Range covering exactly one day.
    pub fn single(day: NaiveDate) -> Self {
        Self { from: day, to: day }
    }

    /// Whether `day` lies within the range, bounds included.
    ///
    /// An inverted range (`from > to`) contains nothing.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.from && day <= self.to
    }
}
